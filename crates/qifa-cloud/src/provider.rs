use async_trait::async_trait;

use qifa_shared::{Comment, Post, PostDraft, ServerMode, UserProfile};

use crate::error::Result;
use crate::subscription::{PostsCallback, Subscription};

/// How a provider delivers the post feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Every remote change is pushed; local writes show up through the feed.
    Push,
    /// Fetched on a timer; callers merge their own writes locally.
    Poll,
}

/// The single capability set the application talks to, whichever backend is
/// active. No method panics or leaks a backend-specific error type.
#[async_trait]
pub trait Provider: Send + Sync {
    fn mode(&self) -> ServerMode;

    fn delivery(&self) -> Delivery;

    /// Whether the chat assistant can reach a text generator in this mode.
    fn supports_generation(&self) -> bool;

    async fn authenticate(&self, identifier: &str, secret: &str) -> Result<UserProfile>;

    /// The provider-side session, used to restore sign-in on startup.
    async fn fetch_current_user(&self) -> Result<Option<UserProfile>>;

    async fn create_account(&self, profile: &UserProfile, secret: &str) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;

    /// Start delivering the post collection to `on_update`. Must be called
    /// from within a Tokio runtime.
    fn subscribe_posts(&self, on_update: PostsCallback) -> Subscription;

    async fn create_post(&self, draft: PostDraft) -> Result<Post>;

    async fn like_post(&self, post_id: &str, user_id: &str, like: bool) -> Result<()>;

    async fn add_comment(&self, post_id: &str, comment: Comment) -> Result<()>;

    async fn delete_post(&self, post_id: &str) -> Result<()>;

    async fn remove_comment(&self, post_id: &str, comment: &Comment) -> Result<()>;

    async fn update_profile(&self, profile: &UserProfile) -> Result<()>;

    async fn change_password(&self, current: &str, new: &str) -> Result<()>;
}
