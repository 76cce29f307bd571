//! The application store: owns [`AppState`], the active provider and its
//! feed, and local persistence.
//!
//! Mutations are grouped by concern under [`crate::commands`]; this module
//! holds the lifecycle (open, provider activation, mode switch, reset) and
//! the guards the commands share.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Local, NaiveDate};

use qifa_cloud::{CloudError, Delivery, Provider, ProviderRegistry, Subscription};
use qifa_shared::{ContentFilter, ServerMode};
use qifa_store::Database;

use crate::error::{AppError, Result};
use crate::events::FeedChannel;
use crate::generation::TextGenerator;
use crate::state::{AppState, ProviderStatus};

pub struct AppStore {
    pub(crate) state: AppState,
    db: Option<Database>,
    registry: ProviderRegistry,
    initial_mode: ServerMode,
    pub(crate) provider: Option<Arc<dyn Provider>>,
    subscription: Option<Subscription>,
    feed: FeedChannel,
    pub(crate) filter: ContentFilter,
    pub(crate) generator: Option<Arc<dyn TextGenerator>>,
    /// Sessions with a reply still streaming.
    pub(crate) generating: HashSet<String>,
    today_override: Option<NaiveDate>,
}

impl AppStore {
    /// Load the persisted record from `db` (or start fresh), activate the
    /// provider for its mode and restore the provider-side session.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn open(db: Database, registry: ProviderRegistry, initial_mode: ServerMode) -> Self {
        Self::start(Some(db), registry, initial_mode).await
    }

    /// A store without durable storage.
    pub async fn ephemeral(registry: ProviderRegistry, initial_mode: ServerMode) -> Self {
        Self::start(None, registry, initial_mode).await
    }

    async fn start(db: Option<Database>, registry: ProviderRegistry, initial_mode: ServerMode) -> Self {
        let state = match db.as_ref().map(Database::load_snapshot) {
            Some(Ok(Some(record))) => {
                tracing::info!(mode = %record.server_mode, "restored local state");
                AppState::from_persisted(record)
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "failed to load local state, starting fresh");
                AppState::fresh(initial_mode)
            }
            Some(Ok(None)) | None => AppState::fresh(initial_mode),
        };

        let mut store = Self {
            state,
            db,
            registry,
            initial_mode,
            provider: None,
            subscription: None,
            feed: FeedChannel::new(),
            filter: ContentFilter::default(),
            generator: None,
            generating: HashSet::new(),
            today_override: None,
        };
        store.activate_provider();
        store.restore_session().await;
        store
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Pin the calendar date used for due-date inference.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today_override = Some(today);
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn server_mode(&self) -> ServerMode {
        self.state.server_mode
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.today_override.unwrap_or_else(|| Local::now().date_naive())
    }

    // ---- Persistence ----

    /// Write the durable slice. Failure is logged; memory stays authoritative.
    pub(crate) fn persist(&self) {
        let Some(db) = &self.db else {
            return;
        };
        if let Err(e) = db.save_snapshot(&self.state.to_persisted()) {
            tracing::warn!(error = %e, "failed to save local state");
        }
    }

    // ---- Provider lifecycle ----

    fn activate_provider(&mut self) {
        self.deactivate_provider();
        let mode = self.state.server_mode;

        match self.registry.get(mode) {
            Ok(provider) => {
                let subscription = provider.subscribe_posts(self.feed.callback());
                tracing::info!(%mode, generation = self.feed.generation(), "provider activated");
                self.provider = Some(provider);
                self.subscription = Some(subscription);
                self.state.provider_status = ProviderStatus::Ready;
            }
            Err(e) => {
                let reason = match e {
                    CloudError::Unavailable(reason) => reason,
                    other => other.to_string(),
                };
                tracing::warn!(%mode, %reason, "provider unavailable");
                self.state.provider_status = ProviderStatus::Unavailable(reason);
            }
        }
    }

    fn deactivate_provider(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.provider = None;
        self.feed.advance();
    }

    async fn restore_session(&mut self) {
        if self.state.is_guest {
            return;
        }

        let restored = match &self.provider {
            Some(provider) => match provider.fetch_current_user().await {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!(error = %e, "could not restore provider session");
                    None
                }
            },
            None => None,
        };

        match restored {
            Some(user) => {
                tracing::info!(mode = %self.state.server_mode, "provider session restored");
                self.state.remember_user(&user);
                self.state.user = user;
                self.state.phase = crate::state::SessionPhase::Authenticated;
            }
            None if self.state.is_authenticated() => {
                tracing::info!("stored sign-in has no provider session, signing out");
                self.state.sign_out_locally();
                self.persist();
            }
            None => {}
        }
    }

    /// Switch to another provider. The session ends, the old feed is torn
    /// down and the post list is emptied until the new feed delivers.
    pub async fn switch_server_mode(&mut self, mode: ServerMode) {
        if mode == self.state.server_mode {
            return;
        }

        if self.state.is_authenticated() && !self.state.is_guest {
            if let Some(provider) = &self.provider {
                if let Err(e) = provider.sign_out().await {
                    tracing::warn!(error = %e, "sign-out during mode switch failed");
                }
            }
        }

        self.deactivate_provider();
        tracing::info!(from = %self.state.server_mode, to = %mode, "switching server mode");
        self.state.server_mode = mode;
        self.state.sign_out_locally();
        self.state.auth_error = None;
        self.state.posts.clear();
        self.activate_provider();
        self.persist();
    }

    /// Erase the local record and return to a fresh install.
    pub async fn reset(&mut self) {
        if let Some(db) = &self.db {
            if let Err(e) = db.clear_snapshot() {
                tracing::warn!(error = %e, "failed to clear local state");
            }
        }
        if let Some(provider) = &self.provider {
            if let Err(e) = provider.sign_out().await {
                tracing::warn!(error = %e, "sign-out during reset failed");
            }
        }
        self.deactivate_provider();
        self.generating.clear();
        self.state = AppState::fresh(self.initial_mode);
        self.activate_provider();
        tracing::info!("local data reset");
    }

    // ---- Feed ----

    /// Apply the newest queued post snapshot. Returns whether posts changed.
    pub fn sync_feed(&mut self) -> bool {
        match self.feed.drain() {
            Some(posts) => {
                tracing::debug!(count = posts.len(), "applying post snapshot");
                self.state.posts = posts;
                true
            }
            None => false,
        }
    }

    /// Wait for the active feed to deliver, then apply it.
    pub async fn next_feed_update(&mut self) {
        let posts = self.feed.next().await;
        self.state.posts = posts;
        self.sync_feed();
    }

    pub fn subscription_active(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    // ---- Guards ----

    pub(crate) fn require_provider(&self) -> Result<Arc<dyn Provider>> {
        self.provider.clone().ok_or_else(|| {
            let reason = match &self.state.provider_status {
                ProviderStatus::Unavailable(reason) => reason.clone(),
                ProviderStatus::Ready => self.state.server_mode.to_string(),
            };
            AppError::ProviderUnavailable(reason)
        })
    }

    pub(crate) fn optimistic(&self, provider: &Arc<dyn Provider>) -> bool {
        provider.delivery() == Delivery::Poll
    }

    pub(crate) fn require_signed_in(&self) -> Result<()> {
        if self.state.is_authenticated() {
            Ok(())
        } else {
            Err(AppError::NotAuthenticated)
        }
    }

    /// Signed in with a real account.
    pub(crate) fn require_member(&self) -> Result<()> {
        self.require_signed_in()?;
        if self.state.is_guest {
            return Err(AppError::GuestReadOnly);
        }
        Ok(())
    }

    /// A member whose account is neither muted nor banned.
    pub(crate) fn require_publisher(&self) -> Result<()> {
        self.require_member()?;
        let user = &self.state.user;
        let known_restricted = self
            .state
            .registered_users
            .iter()
            .any(|u| u.identifier() == user.identifier() && !u.can_publish());
        if !user.can_publish() || known_restricted {
            return Err(AppError::Restricted);
        }
        Ok(())
    }

    pub(crate) fn require_admin(&self) -> Result<()> {
        self.require_member()?;
        if !self.state.user.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }

    pub(crate) fn moderate(&self, text: &str) -> Result<()> {
        match AppError::from_verdict(self.filter.check(text)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for AppStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStore")
            .field("mode", &self.state.server_mode)
            .field("phase", &self.state.phase)
            .field("persistent", &self.db.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}
