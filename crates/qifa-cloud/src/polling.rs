use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;

use qifa_shared::constants::{POLL_FETCH_LIMIT, POLL_INTERVAL_SECS};
use qifa_shared::{Comment, Post, PostDraft, ServerMode, UserProfile};

use crate::backend::RemoteBackend;
use crate::error::{CloudError, Result};
use crate::provider::{Delivery, Provider};
use crate::subscription::{PostsCallback, Subscription};

/// Poll-based provider: one fetch on subscribe, then one per period.
///
/// A failed fetch is logged and skipped; the previous snapshot stays in
/// place until the next successful tick.
pub struct PollingProvider<B> {
    mode: ServerMode,
    backend: Arc<B>,
    interval: Duration,
}

impl<B> PollingProvider<B>
where
    B: RemoteBackend + 'static,
{
    pub fn new(mode: ServerMode, backend: Arc<B>) -> Self {
        Self {
            mode,
            backend,
            interval: Duration::from_secs(POLL_INTERVAL_SECS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl<B> Provider for PollingProvider<B>
where
    B: RemoteBackend + 'static,
{
    fn mode(&self) -> ServerMode {
        self.mode
    }

    fn delivery(&self) -> Delivery {
        Delivery::Poll
    }

    fn supports_generation(&self) -> bool {
        false
    }

    async fn authenticate(&self, identifier: &str, secret: &str) -> Result<UserProfile> {
        let user = self.backend.sign_in(identifier, secret).await?;
        tracing::info!(mode = %self.mode, "signed in");
        Ok(user)
    }

    async fn fetch_current_user(&self) -> Result<Option<UserProfile>> {
        self.backend.current_user().await
    }

    async fn create_account(&self, profile: &UserProfile, secret: &str) -> Result<()> {
        self.backend.sign_up(profile, secret).await
    }

    async fn sign_out(&self) -> Result<()> {
        self.backend.sign_out().await
    }

    fn subscribe_posts(&self, on_update: PostsCallback) -> Subscription {
        let backend = self.backend.clone();
        let period = self.interval;
        let mode = self.mode;
        Subscription::spawn(move |gate| async move {
            // The first tick completes immediately.
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match backend.list_posts(POLL_FETCH_LIMIT).await {
                    Ok(posts) => {
                        tracing::debug!(%mode, count = posts.len(), "polled posts");
                        if !gate.deliver(&on_update, posts) {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(%mode, error = %e, "post poll failed"),
                }
            }
        })
    }

    async fn create_post(&self, draft: PostDraft) -> Result<Post> {
        self.backend.insert_post(draft).await
    }

    async fn like_post(&self, post_id: &str, user_id: &str, like: bool) -> Result<()> {
        self.backend.set_like(post_id, user_id, like).await
    }

    async fn add_comment(&self, post_id: &str, comment: Comment) -> Result<()> {
        self.backend.append_comment(post_id, comment).await
    }

    async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.backend.delete_post(post_id).await
    }

    async fn remove_comment(&self, post_id: &str, comment: &Comment) -> Result<()> {
        self.backend.remove_comment(post_id, comment).await
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        self.backend.update_profile(profile).await
    }

    async fn change_password(&self, _current: &str, _new: &str) -> Result<()> {
        Err(CloudError::Unsupported("中国模式暂不支持修改密码，请联系管理员"))
    }
}
