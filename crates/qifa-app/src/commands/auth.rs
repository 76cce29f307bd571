use qifa_shared::constants::{GUEST_NAME, GUEST_SESSION_TITLE, MIN_PASSWORD_LEN};
use qifa_shared::error::require_text;
use qifa_shared::{now_millis, ChatSession, ProfilePatch, UserProfile, UserRole, UserStatus, ValidationError};

use crate::error::{AppError, Result};
use crate::state::SessionPhase;
use crate::store::AppStore;

fn check_new_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(ValidationError::MissingPassword.into());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort { min: MIN_PASSWORD_LEN }.into());
    }
    Ok(())
}

impl AppStore {
    /// Sign in through the active provider.
    ///
    /// On failure the session returns to anonymous and the message is kept
    /// in `auth_error`.
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<UserProfile> {
        let identifier = require_text(identifier, ValidationError::MissingIdentifier)?.to_string();
        if password.is_empty() {
            return Err(ValidationError::MissingPassword.into());
        }
        let provider = self.require_provider()?;

        self.state.phase = SessionPhase::Authenticating;
        match provider.authenticate(&identifier, password).await {
            Ok(user) => {
                tracing::info!(mode = %self.state.server_mode, "login succeeded");
                self.complete_sign_in(user.clone());
                Ok(user)
            }
            Err(e) => {
                tracing::info!(mode = %self.state.server_mode, error = %e, "login failed");
                self.fail_sign_in(e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Enter read-only guest mode. No provider is contacted.
    pub fn login_as_guest(&mut self) -> &UserProfile {
        let now = now_millis();
        let user = UserProfile {
            name: GUEST_NAME.into(),
            email: format!("guest_{now}@temp.com"),
            role: UserRole::User,
            status: UserStatus::Active,
            ..Default::default()
        };

        let mut session = ChatSession::new(GUEST_SESSION_TITLE, Vec::new());
        session.id = format!("guest-{now}");

        self.state.current_session_id = Some(session.id.clone());
        self.state.chat_sessions = vec![session];
        self.state.user = user;
        self.state.is_guest = true;
        self.state.phase = SessionPhase::Authenticated;
        self.state.auth_error = None;
        self.persist();

        tracing::info!("guest session started");
        &self.state.user
    }

    /// Create an account, then sign straight into it.
    pub async fn register(&mut self, profile: UserProfile, password: &str) -> Result<UserProfile> {
        require_text(profile.identifier(), ValidationError::MissingIdentifier)?;
        check_new_password(password)?;
        let provider = self.require_provider()?;

        self.state.phase = SessionPhase::Authenticating;
        let result = match provider.create_account(&profile, password).await {
            Ok(()) => provider.authenticate(profile.identifier(), password).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(user) => {
                tracing::info!(mode = %self.state.server_mode, "account registered");
                self.complete_sign_in(user.clone());
                Ok(user)
            }
            Err(e) => {
                tracing::info!(mode = %self.state.server_mode, error = %e, "registration failed");
                self.fail_sign_in(e.to_string()).await;
                Err(e.into())
            }
        }
    }

    pub async fn logout(&mut self) {
        if !self.state.is_guest {
            if let Some(provider) = &self.provider {
                if let Err(e) = provider.sign_out().await {
                    tracing::warn!(error = %e, "provider sign-out failed");
                }
            }
        }
        self.state.sign_out_locally();
        self.persist();
        tracing::info!("signed out");
    }

    /// Apply a profile edit remotely, then locally.
    pub async fn update_profile(&mut self, patch: ProfilePatch) -> Result<&UserProfile> {
        self.require_member()?;
        let provider = self.require_provider()?;

        let mut updated = self.state.user.clone();
        updated.apply(patch);
        provider.update_profile(&updated).await?;

        self.state.remember_user(&updated);
        self.state.user = updated;
        self.persist();
        Ok(&self.state.user)
    }

    pub async fn change_password(&mut self, current: &str, new: &str) -> Result<()> {
        self.require_member()?;
        if current.is_empty() {
            return Err(ValidationError::MissingPassword.into());
        }
        check_new_password(new)?;
        let provider = self.require_provider()?;
        provider.change_password(current, new).await.map_err(AppError::from)
    }

    /// A failed attempt ends any earlier session, remote and local, so the
    /// next start cannot resurrect it.
    async fn fail_sign_in(&mut self, message: String) {
        if let Some(provider) = &self.provider {
            if let Err(e) = provider.sign_out().await {
                tracing::warn!(error = %e, "provider sign-out failed");
            }
        }
        self.state.sign_out_locally();
        self.state.auth_error = Some(message);
        self.persist();
    }

    fn complete_sign_in(&mut self, mut user: UserProfile) {
        // A local mute or ban outlives the provider's view of the account.
        let known = self
            .state
            .registered_users
            .iter()
            .find(|u| u.identifier() == user.identifier());
        if let Some(known) = known.filter(|k| !k.can_publish()) {
            user.status = known.status;
        }
        self.state.remember_user(&user);
        self.state.user = user;
        self.state.is_guest = false;
        self.state.phase = SessionPhase::Authenticated;
        self.state.auth_error = None;
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use qifa_cloud::MemoryBackend;
    use qifa_shared::ServerMode;

    use crate::testing::{profile, store_with};

    #[tokio::test]
    async fn test_missing_password_rejected_before_provider() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        let err = store.login("a@x.com", "").await.unwrap_err();
        assert_eq!(err, AppError::Validation(ValidationError::MissingPassword));
        assert_eq!(store.state().phase, SessionPhase::Anonymous);
    }

    #[tokio::test]
    async fn test_wrong_password_returns_to_anonymous_with_message() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        let err = store.login("nobody@x.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
        assert_eq!(store.state().phase, SessionPhase::Anonymous);
        assert!(store.state().auth_error.as_deref().unwrap().starts_with("登录失败"));
    }

    #[tokio::test]
    async fn test_failed_login_ends_previous_member_session() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = store_with(backend.clone()).await;
        store.register(profile("lin@x.com"), "secret1").await.unwrap();

        store.login("lin@x.com", "wrong-pw").await.unwrap_err();
        let state = store.state();
        assert_eq!(state.phase, SessionPhase::Anonymous);
        assert!(!state.is_guest);
        assert_eq!(state.user, UserProfile::default());
        assert!(state.auth_error.is_some());
        assert!(!state.to_persisted().is_authenticated);

        use qifa_cloud::RemoteBackend;
        assert!(backend.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_login_ends_guest_session() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        store.login_as_guest();

        store.login("nobody@x.com", "secret1").await.unwrap_err();
        let state = store.state();
        assert_eq!(state.phase, SessionPhase::Anonymous);
        assert!(!state.is_guest);
        assert_eq!(state.user, UserProfile::default());
        assert!(!state.to_persisted().is_guest);
    }

    #[tokio::test]
    async fn test_failed_registration_ends_previous_session() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        store.register(profile("lin@x.com"), "secret1").await.unwrap();

        let err = store.register(profile("lin@x.com"), "secret1").await.unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
        assert!(!store.state().is_authenticated());
        assert_eq!(store.state().user, UserProfile::default());
    }

    #[tokio::test]
    async fn test_register_signs_in_and_remembers_user() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        let user = store.register(profile("lin@x.com"), "secret1").await.unwrap();
        assert_eq!(user.email, "lin@x.com");
        assert!(store.state().is_authenticated());
        assert!(!store.state().is_guest);
        assert!(store.state().registered_users.iter().any(|u| u.email == "lin@x.com"));
    }

    #[tokio::test]
    async fn test_short_password_rejected_at_registration() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        let err = store.register(profile("lin@x.com"), "12345").await.unwrap_err();
        assert_eq!(err.to_string(), "密码至少需要 6 位");
    }

    #[tokio::test]
    async fn test_guest_login_synthesizes_profile_and_session() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        let guest = store.login_as_guest().clone();
        assert_eq!(guest.name, GUEST_NAME);
        assert!(guest.email.starts_with("guest_") && guest.email.ends_with("@temp.com"));

        let state = store.state();
        assert!(state.is_guest && state.is_authenticated());
        assert_eq!(state.chat_sessions.len(), 1);
        let session = state.current_session().unwrap();
        assert!(session.id.starts_with("guest-"));
        assert!(session.messages.is_empty());
    }

    #[tokio::test]
    async fn test_guest_cannot_edit_profile() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        store.login_as_guest();
        let err = store.update_profile(ProfilePatch::default()).await.unwrap_err();
        assert_eq!(err, AppError::GuestReadOnly);
    }

    #[tokio::test]
    async fn test_profile_update_reaches_provider() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = store_with(backend.clone()).await;
        store.register(profile("lin@x.com"), "secret1").await.unwrap();

        let patch = ProfilePatch {
            target_city: Some("Grenoble".into()),
            ..Default::default()
        };
        store.update_profile(patch).await.unwrap();
        assert_eq!(store.state().user.target_city, "Grenoble");

        use qifa_cloud::RemoteBackend;
        assert_eq!(backend.current_user().await.unwrap().unwrap().target_city, "Grenoble");
    }

    #[tokio::test]
    async fn test_china_mode_refuses_password_change() {
        let backend = Arc::new(MemoryBackend::new());
        let mut store = store_with(backend).await;
        store.switch_server_mode(ServerMode::China).await;
        store.register(profile("lin@x.com"), "secret1").await.unwrap();

        let err = store.change_password("secret1", "secret2").await.unwrap_err();
        assert_eq!(err.to_string(), "中国模式暂不支持修改密码，请联系管理员");
    }

    #[tokio::test]
    async fn test_logout_resets_to_default_user() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        store.register(profile("lin@x.com"), "secret1").await.unwrap();
        store.logout().await;
        assert!(!store.state().is_authenticated());
        assert_eq!(store.state().user, UserProfile::default());
    }
}
