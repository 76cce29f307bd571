//! The in-memory application aggregate.
//!
//! [`AppState`] is owned by [`crate::AppStore`], which is the only code that
//! mutates it. Presentation code reads it through `AppStore::state()`.

use qifa_shared::constants::{BOT_GREETING, LEGACY_SESSION_TITLE, NEW_SESSION_TITLE};
use qifa_shared::seed::{admin_profile, seed_resources};
use qifa_shared::{
    now_millis, ChatMessage, ChatSession, Feedback, Post, Preferences, Report, Sender, ServerMode,
    StudyResource, Task, UserProfile,
};
use qifa_store::PersistedState;

/// Per-session auth state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
}

/// Whether the provider for the current mode can be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Ready,
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Selects the active provider. Exactly one is active at a time.
    pub server_mode: ServerMode,
    pub provider_status: ProviderStatus,

    pub phase: SessionPhase,
    /// Guests are authenticated locally only and cannot write remotely.
    pub is_guest: bool,
    pub user: UserProfile,
    /// Message from the last failed sign-in, cleared on success.
    pub auth_error: Option<String>,

    /// Known profiles, for admin actions. Always contains the admin seed.
    pub registered_users: Vec<UserProfile>,

    /// Device-local, newest first.
    pub tasks: Vec<Task>,
    pub chat_sessions: Vec<ChatSession>,
    pub current_session_id: Option<String>,
    pub preferences: Preferences,

    /// Provider-owned; replaced wholesale by each feed delivery.
    pub posts: Vec<Post>,
    pub reports: Vec<Report>,
    pub feedbacks: Vec<Feedback>,
    pub resources: Vec<StudyResource>,
}

impl AppState {
    /// State of a fresh install.
    pub fn fresh(server_mode: ServerMode) -> Self {
        let greeting = ChatMessage {
            id: "init-1".into(),
            sender: Sender::Bot,
            content: BOT_GREETING.into(),
            timestamp: now_millis(),
        };
        let session = ChatSession::new(NEW_SESSION_TITLE, vec![greeting]);

        Self {
            server_mode,
            provider_status: ProviderStatus::Ready,
            phase: SessionPhase::Anonymous,
            is_guest: false,
            user: UserProfile::default(),
            auth_error: None,
            registered_users: vec![admin_profile()],
            tasks: Vec::new(),
            current_session_id: Some(session.id.clone()),
            chat_sessions: vec![session],
            preferences: Preferences::default(),
            posts: Vec::new(),
            reports: Vec::new(),
            feedbacks: Vec::new(),
            resources: seed_resources(),
        }
    }

    /// Rebuild from the durable record, repairing what older records lack.
    pub fn from_persisted(record: PersistedState) -> Self {
        let mut chat_sessions = record.chat_sessions;
        let mut current_session_id = record.current_session_id;

        if chat_sessions.is_empty() {
            if let Some(history) = record.chat_history {
                let session = ChatSession::new(LEGACY_SESSION_TITLE, history);
                current_session_id = Some(session.id.clone());
                chat_sessions.push(session);
            }
        }

        let mut state = Self::fresh(record.server_mode);
        if !chat_sessions.is_empty() {
            state.chat_sessions = chat_sessions;
            state.current_session_id = current_session_id;
        }

        let mut users = record.registered_users;
        let admin = admin_profile();
        if !users.iter().any(|u| u.email == admin.email) {
            users.insert(0, admin);
        }
        state.registered_users = users;

        if !record.resources.is_empty() {
            state.resources = record.resources;
        }

        state.phase = if record.is_authenticated {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        };
        state.is_guest = record.is_guest;
        state.user = record.user;
        state.tasks = record.tasks;
        state.preferences = record.preferences;
        state
    }

    /// The durable slice. Posts, reports and feedback are left out.
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            server_mode: self.server_mode,
            is_authenticated: self.is_authenticated(),
            is_guest: self.is_guest,
            user: self.user.clone(),
            registered_users: self.registered_users.clone(),
            tasks: self.tasks.clone(),
            chat_sessions: self.chat_sessions.clone(),
            current_session_id: self.current_session_id.clone(),
            preferences: self.preferences,
            resources: self.resources.clone(),
            chat_history: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    /// Drop back to the signed-out default user.
    pub fn sign_out_locally(&mut self) {
        self.phase = SessionPhase::Anonymous;
        self.is_guest = false;
        self.user = UserProfile::default();
    }

    pub fn current_session(&self) -> Option<&ChatSession> {
        let id = self.current_session_id.as_deref()?;
        self.chat_sessions.iter().find(|s| s.id == id)
    }

    pub fn session_mut(&mut self, id: &str) -> Option<&mut ChatSession> {
        self.chat_sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn post_mut(&mut self, id: &str) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == id)
    }

    /// Insert or replace a known profile, matched by identifier.
    pub fn remember_user(&mut self, profile: &UserProfile) {
        let key = profile.identifier();
        if key.is_empty() {
            return;
        }
        match self.registered_users.iter_mut().find(|u| u.identifier() == key) {
            Some(existing) => *existing = profile.clone(),
            None => self.registered_users.push(profile.clone()),
        }
    }
}
