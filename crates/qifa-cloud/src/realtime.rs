use std::sync::Arc;

use async_trait::async_trait;

use qifa_shared::{Comment, Post, PostDraft, ServerMode, UserProfile};

use crate::backend::{RealtimeFeed, RemoteBackend};
use crate::error::Result;
use crate::provider::{Delivery, Provider};
use crate::subscription::{PostsCallback, Subscription};

/// Push-based provider: every change in the backend reaches subscribers
/// without local merging.
pub struct RealtimeProvider<B> {
    mode: ServerMode,
    backend: Arc<B>,
}

impl<B> RealtimeProvider<B>
where
    B: RemoteBackend + RealtimeFeed + 'static,
{
    pub fn new(mode: ServerMode, backend: Arc<B>) -> Self {
        Self { mode, backend }
    }
}

#[async_trait]
impl<B> Provider for RealtimeProvider<B>
where
    B: RemoteBackend + RealtimeFeed + 'static,
{
    fn mode(&self) -> ServerMode {
        self.mode
    }

    fn delivery(&self) -> Delivery {
        Delivery::Push
    }

    fn supports_generation(&self) -> bool {
        true
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
        let mut rx = self.backend.watch_posts();
        let mode = self.mode;
        Subscription::spawn(move |gate| async move {
            loop {
                let mut posts: Vec<Post> = rx.borrow_and_update().clone();
                posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                tracing::debug!(%mode, count = posts.len(), "pushing post snapshot");
                if !gate.deliver(&on_update, posts) {
                    break;
                }
                if rx.changed().await.is_err() {
                    tracing::debug!(%mode, "post feed closed");
                    break;
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

    async fn change_password(&self, current: &str, new: &str) -> Result<()> {
        self.backend.change_password(current, new).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use qifa_shared::UserRole;
    use tokio::sync::mpsc;

    fn draft(title: &str) -> PostDraft {
        PostDraft {
            author_id: "a@x.com".into(),
            author_name: "A".into(),
            author_role: UserRole::User,
            title: title.into(),
            content: "body".into(),
        }
    }

    fn channel_callback() -> (PostsCallback, mpsc::UnboundedReceiver<Vec<Post>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cb: PostsCallback = Arc::new(move |posts| {
            let _ = tx.send(posts);
        });
        (cb, rx)
    }

    #[tokio::test]
    async fn test_subscriber_gets_initial_and_pushed_snapshots() {
        let backend = Arc::new(MemoryBackend::new());
        let provider = RealtimeProvider::new(ServerMode::Global, backend);
        let (cb, mut rx) = channel_callback();
        let _sub = provider.subscribe_posts(cb);

        assert!(rx.recv().await.unwrap().is_empty());

        provider.create_post(draft("one")).await.unwrap();
        provider.create_post(draft("two")).await.unwrap();

        // Intermediate snapshots may coalesce; the latest must arrive.
        let mut latest = rx.recv().await.unwrap();
        while latest.len() < 2 {
            latest = rx.recv().await.unwrap();
        }
        assert_eq!(latest[0].title, "two");
        assert_eq!(latest[1].title, "one");
    }

    #[tokio::test]
    async fn test_nothing_delivered_after_unsubscribe() {
        let backend = Arc::new(MemoryBackend::new());
        let provider = RealtimeProvider::new(ServerMode::Global, backend);
        let (cb, mut rx) = channel_callback();
        let sub = provider.subscribe_posts(cb);
        rx.recv().await.unwrap();

        sub.unsubscribe();
        provider.create_post(draft("late")).await.unwrap();
        tokio::task::yield_now().await;

        // The sender was dropped with the aborted task.
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_realtime_provider_pushes() {
        let provider = RealtimeProvider::new(ServerMode::Global, Arc::new(MemoryBackend::new()));
        assert_eq!(provider.delivery(), Delivery::Push);
        assert!(provider.supports_generation());
    }
}
