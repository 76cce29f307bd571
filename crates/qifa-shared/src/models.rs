//! Domain records shared between the local store, the cloud providers and
//! the application state.
//!
//! Field names serialise in camelCase so that records written by earlier
//! clients load unchanged.

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Current wall-clock time in Unix epoch millis.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fresh opaque identifier for locally created records.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Identity plus study-plan attributes. Never carries a credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub student_id: String,
    pub school: String,
    pub degree_level: String,
    pub program: String,
    /// ISO calendar date (`YYYY-MM-DD`) the program starts, or empty.
    pub start_date: String,
    pub current_location: String,
    pub target_city: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub is_online: bool,
}

impl UserProfile {
    /// The identifier used for authorship and likes: email, else phone.
    pub fn identifier(&self) -> &str {
        if self.email.is_empty() {
            &self.phone
        } else {
            &self.email
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Muted and banned users may read but not publish.
    pub fn can_publish(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn apply(&mut self, patch: ProfilePatch) {
        let ProfilePatch {
            name,
            phone,
            student_id,
            school,
            degree_level,
            program,
            start_date,
            current_location,
            target_city,
        } = patch;
        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = phone {
            self.phone = v;
        }
        if let Some(v) = student_id {
            self.student_id = v;
        }
        if let Some(v) = school {
            self.school = v;
        }
        if let Some(v) = degree_level {
            self.degree_level = v;
        }
        if let Some(v) = program {
            self.program = v;
        }
        if let Some(v) = start_date {
            self.start_date = v;
        }
        if let Some(v) = current_location {
            self.current_location = v;
        }
        if let Some(v) = target_city {
            self.target_city = v;
        }
    }
}

/// Partial profile update. Role, status and email are not user-editable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub student_id: Option<String>,
    pub school: Option<String>,
    pub degree_level: Option<String>,
    pub program: Option<String>,
    pub start_date: Option<String>,
    pub current_location: Option<String>,
    pub target_city: Option<String>,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A local to-do item. Tasks never leave the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub category: TaskCategory,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// In-place edit of a task; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub category: Option<TaskCategory>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<String>>,
}

impl Task {
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due) = patch.due_date {
            self.due_date = due.filter(|d| !d.is_empty());
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

// ---------------------------------------------------------------------------
// Community
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub timestamp: i64,
}

/// Community post. `likes` is a set kept as a list; `comments` only grows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_role: UserRole,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub timestamp: i64,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    /// Add or remove `user_id` from the like set. Adding twice is a no-op.
    pub fn set_like(&mut self, user_id: &str, like: bool) {
        if like {
            if !self.is_liked_by(user_id) {
                self.likes.push(user_id.to_string());
            }
        } else {
            self.likes.retain(|id| id != user_id);
        }
    }

    /// Append unless a comment with the same id is already present.
    pub fn push_comment(&mut self, comment: Comment) {
        if !self.comments.iter().any(|c| c.id == comment.id) {
            self.comments.push(comment);
        }
    }

    pub fn find_comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    /// Moderator removal; the only way a comment ever leaves a post.
    pub fn remove_comment(&mut self, comment_id: &str) -> Option<Comment> {
        let pos = self.comments.iter().position(|c| c.id == comment_id)?;
        Some(self.comments.remove(pos))
    }
}

/// What a client submits to create a post; the provider assigns id and time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub author_id: String,
    pub author_name: String,
    pub author_role: UserRole,
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn into_post(self, id: String, timestamp: i64) -> Post {
        Post {
            id,
            author_id: self.author_id,
            author_name: self.author_name,
            author_role: self.author_role,
            title: self.title,
            content: self.content,
            likes: Vec::new(),
            comments: Vec::new(),
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            sender,
            content: content.into(),
            timestamp: now_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChatSession {
    pub fn new(title: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        let now = now_millis();
        Self {
            id: new_id(),
            title: title.into(),
            messages,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.updated_at = message.timestamp.max(self.updated_at);
        self.messages.push(message);
    }
}

// ---------------------------------------------------------------------------
// Moderation tickets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub target_id: String,
    pub target_type: ReportTarget,
    pub reporter_id: String,
    /// Author of the reported content, captured when the report is filed.
    #[serde(default)]
    pub target_author_id: String,
    /// Post holding the reported comment; `None` for post reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_post_id: Option<String>,
    pub reason: String,
    pub status: ReportStatus,
    pub timestamp: i64,
    /// Copy of the reported text, kept in case the target is deleted.
    pub content_snapshot: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ReportAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(rename = "type")]
    pub kind: FeedbackType,
    pub content: String,
    pub timestamp: i64,
    pub status: FeedbackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_timestamp: Option<i64>,
}

// ---------------------------------------------------------------------------
// Study resources
// ---------------------------------------------------------------------------

/// Where a resource can be downloaded from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "value")]
pub enum ResourceSource {
    Url(String),
    Upload(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudyResource {
    pub id: String,
    pub title: String,
    pub category: ResourceCategory,
    pub description: String,
    pub author: String,
    pub download_count: u64,
    pub size: String,
    pub file_type: FileType,
    pub upload_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResourceSource>,
}

/// Admin input for a new catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDraft {
    pub title: String,
    pub category: ResourceCategory,
    pub description: String,
    pub author: String,
    pub size: String,
    pub file_type: FileType,
    pub source: Option<ResourceSource>,
}

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub dark_mode: bool,
    pub daily_reminders: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            daily_reminders: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreferenceKey {
    DarkMode,
    DailyReminders,
}

impl Preferences {
    pub fn toggle(&mut self, key: PreferenceKey) {
        match key {
            PreferenceKey::DarkMode => self.dark_mode = !self.dark_mode,
            PreferenceKey::DailyReminders => self.daily_reminders = !self.daily_reminders,
        }
    }
}
