//! Collaborator contracts for the remote document store and auth service.

use async_trait::async_trait;
use tokio::sync::watch;

use qifa_shared::{Comment, Post, PostDraft, UserProfile};

use crate::error::Result;

/// Auth plus the `users` and `posts` collections of a remote store.
///
/// Implementations keep their own signed-in session; at most one user is
/// signed in per backend.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<UserProfile>;

    /// Register a new account. Role is always forced to USER.
    async fn sign_up(&self, profile: &UserProfile, secret: &str) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;

    async fn current_user(&self) -> Result<Option<UserProfile>>;

    async fn update_profile(&self, profile: &UserProfile) -> Result<()>;

    async fn change_password(&self, current: &str, new: &str) -> Result<()>;

    /// Up to `limit` posts, newest first.
    async fn list_posts(&self, limit: usize) -> Result<Vec<Post>>;

    /// Store a new post with empty likes and comments and return it as saved.
    async fn insert_post(&self, draft: PostDraft) -> Result<Post>;

    async fn delete_post(&self, post_id: &str) -> Result<()>;

    /// Set-add or set-remove `user_id` on the post's likes.
    async fn set_like(&self, post_id: &str, user_id: &str, like: bool) -> Result<()>;

    async fn append_comment(&self, post_id: &str, comment: Comment) -> Result<()>;

    /// Moderator removal of a single comment.
    async fn remove_comment(&self, post_id: &str, comment: &Comment) -> Result<()>;
}

/// A backend that can push the full post collection on every change.
pub trait RealtimeFeed: Send + Sync {
    /// The receiver starts with the current collection, newest first.
    fn watch_posts(&self) -> watch::Receiver<Vec<Post>>;
}
