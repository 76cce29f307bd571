//! The durable application record.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use qifa_shared::constants::SNAPSHOT_VERSION;
use qifa_shared::{ChatMessage, ChatSession, Preferences, ServerMode, StudyResource, Task, UserProfile};

use crate::database::Database;
use crate::error::Result;

/// The device-owned slice of application state.
///
/// Posts, reports and feedback are provider-owned and deliberately absent.
/// Credentials are never part of any field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub server_mode: ServerMode,
    pub is_authenticated: bool,
    pub is_guest: bool,
    pub user: UserProfile,
    pub registered_users: Vec<UserProfile>,
    pub tasks: Vec<Task>,
    pub chat_sessions: Vec<ChatSession>,
    pub current_session_id: Option<String>,
    pub preferences: Preferences,
    pub resources: Vec<StudyResource>,
    /// Flat transcript written by clients that predate chat sessions.
    /// Read for migration only, never written back.
    #[serde(skip_serializing)]
    pub chat_history: Option<Vec<ChatMessage>>,
}

impl Database {
    // ---- Read ----

    /// The stored record, or `None` on a fresh install.
    ///
    /// A row that fails to decode is reported as [`crate::StoreError::Json`];
    /// callers decide whether to fall back to defaults.
    pub fn load_snapshot(&self) -> Result<Option<PersistedState>> {
        let row: Option<(u32, String)> = self
            .conn()
            .query_row("SELECT version, json FROM app_snapshot WHERE id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;

        let Some((version, json)) = row else {
            return Ok(None);
        };
        if version != SNAPSHOT_VERSION {
            tracing::debug!(version, current = SNAPSHOT_VERSION, "loading snapshot from another layout version");
        }
        Ok(Some(serde_json::from_str(&json)?))
    }

    // ---- Write ----

    pub fn save_snapshot(&self, state: &PersistedState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO app_snapshot (id, version, json, saved_at) VALUES (1, ?1, ?2, ?3)",
            params![SNAPSHOT_VERSION, json, Utc::now().to_rfc3339()],
        )?;
        tracing::trace!(bytes = json.len(), "snapshot saved");
        Ok(())
    }

    // ---- Delete ----

    pub fn clear_snapshot(&self) -> Result<()> {
        self.conn().execute("DELETE FROM app_snapshot", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qifa_shared::{Sender, TaskCategory};

    fn sample() -> PersistedState {
        PersistedState {
            server_mode: ServerMode::China,
            is_authenticated: true,
            user: UserProfile {
                name: "Lin".into(),
                email: "lin@example.com".into(),
                ..Default::default()
            },
            tasks: vec![Task {
                id: "t1".into(),
                title: "办签证".into(),
                category: TaskCategory::PreDeparture,
                status: Default::default(),
                priority: Default::default(),
                due_date: None,
            }],
            chat_sessions: vec![ChatSession::new("新对话", vec![ChatMessage::new(Sender::Bot, "hi")])],
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_database_has_no_snapshot() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_snapshot().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_returns_same_record() {
        let db = Database::open_in_memory().unwrap();
        let state = sample();
        db.save_snapshot(&state).unwrap();
        db.save_snapshot(&state).unwrap();

        assert_eq!(db.load_snapshot().unwrap(), Some(state));
    }

    #[test]
    fn test_clear_removes_record() {
        let db = Database::open_in_memory().unwrap();
        db.save_snapshot(&sample()).unwrap();
        db.clear_snapshot().unwrap();
        assert!(db.load_snapshot().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_row_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO app_snapshot (id, version, json, saved_at) VALUES (1, 2, '{not json', '')",
                [],
            )
            .unwrap();
        assert!(matches!(db.load_snapshot(), Err(crate::StoreError::Json(_))));
    }

    #[test]
    fn test_legacy_record_is_read_with_defaults() {
        let db = Database::open_in_memory().unwrap();
        let legacy = r#"{
            "isAuthenticated": true,
            "chatHistory": [{"id": "m1", "sender": "user", "content": "hello", "timestamp": 5}]
        }"#;
        db.conn()
            .execute(
                "INSERT INTO app_snapshot (id, version, json, saved_at) VALUES (1, 1, ?1, '')",
                params![legacy],
            )
            .unwrap();

        let state = db.load_snapshot().unwrap().unwrap();
        assert_eq!(state.server_mode, ServerMode::Global);
        assert!(state.chat_sessions.is_empty());
        assert_eq!(state.chat_history.unwrap()[0].content, "hello");
        assert!(state.preferences.daily_reminders);
    }

    #[test]
    fn test_legacy_history_is_not_written_back() {
        let state = PersistedState {
            chat_history: Some(vec![]),
            ..Default::default()
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("chatHistory"));
        assert!(!json.contains("posts"));
    }
}
