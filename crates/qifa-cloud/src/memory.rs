//! In-process realtime document store.
//!
//! Stands in for a hosted realtime database: it keeps accounts and posts in
//! memory and pushes the full post collection to every watcher after each
//! write.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;

use qifa_shared::{new_id, now_millis, Comment, Post, PostDraft, UserProfile, UserRole, UserStatus};

use crate::backend::{RealtimeFeed, RemoteBackend};
use crate::error::{CloudError, Result};

struct Account {
    profile: UserProfile,
    secret: String,
}

#[derive(Default)]
struct Inner {
    /// Keyed by email, else phone.
    accounts: HashMap<String, Account>,
    session: Option<String>,
    /// Newest first.
    posts: Vec<Post>,
    last_timestamp: i64,
    offline: bool,
}

pub struct MemoryBackend {
    inner: Mutex<Inner>,
    feed: watch::Sender<Vec<Post>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (feed, _) = watch::channel(Vec::new());
        Self {
            inner: Mutex::new(Inner::default()),
            feed,
        }
    }

    /// Register an account directly, keeping its role and status.
    pub fn seed_account(&self, profile: UserProfile, secret: &str) {
        let mut inner = self.lock();
        inner.accounts.insert(
            profile.identifier().to_string(),
            Account {
                profile,
                secret: secret.to_string(),
            },
        );
    }

    /// While offline every call fails with [`CloudError::Network`].
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a writer panicked mid-update; the data
        // is still structurally valid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn online(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.offline {
            return Err(CloudError::Network("backend offline".into()));
        }
        Ok(inner)
    }

    fn publish(&self, inner: &Inner) {
        self.feed.send_replace(inner.posts.clone());
    }

    fn post_mut<'a>(inner: &'a mut Inner, post_id: &str) -> Result<&'a mut Post> {
        inner
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| CloudError::NotFound(format!("post {post_id}")))
    }
}

impl Inner {
    fn session_key(&self) -> Result<String> {
        self.session.clone().ok_or_else(|| CloudError::Auth("未登录".into()))
    }

    // Strictly increasing so newest-first order never ties.
    fn next_timestamp(&mut self) -> i64 {
        let ts = now_millis().max(self.last_timestamp + 1);
        self.last_timestamp = ts;
        ts
    }
}

#[async_trait]
impl RemoteBackend for MemoryBackend {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<UserProfile> {
        let mut inner = self.online()?;
        let account = inner
            .accounts
            .get(identifier)
            .filter(|a| a.secret == secret)
            .ok_or_else(|| CloudError::Auth("账号或密码错误".into()))?;

        let mut profile = account.profile.clone();
        profile.is_online = true;
        inner.session = Some(identifier.to_string());
        Ok(profile)
    }

    async fn sign_up(&self, profile: &UserProfile, secret: &str) -> Result<()> {
        let mut inner = self.online()?;
        let key = profile.identifier().to_string();
        if key.is_empty() {
            return Err(CloudError::Auth("请输入账号".into()));
        }
        if inner.accounts.contains_key(&key) {
            return Err(CloudError::Auth("账号已存在".into()));
        }

        let mut stored = profile.clone();
        stored.role = UserRole::User;
        stored.status = UserStatus::Active;
        stored.is_online = false;
        inner.accounts.insert(
            key,
            Account {
                profile: stored,
                secret: secret.to_string(),
            },
        );
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.lock().session = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<UserProfile>> {
        let inner = self.online()?;
        Ok(inner
            .session
            .as_ref()
            .and_then(|key| inner.accounts.get(key))
            .map(|a| UserProfile {
                is_online: true,
                ..a.profile.clone()
            }))
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut inner = self.online()?;
        let key = inner.session_key()?;
        let account = inner
            .accounts
            .get_mut(&key)
            .ok_or_else(|| CloudError::NotFound(format!("user {key}")))?;

        let UserProfile {
            email, role, status, ..
        } = account.profile.clone();
        account.profile = UserProfile {
            email,
            role,
            status,
            ..profile.clone()
        };
        Ok(())
    }

    async fn change_password(&self, current: &str, new: &str) -> Result<()> {
        let mut inner = self.online()?;
        let key = inner.session_key()?;
        let account = inner
            .accounts
            .get_mut(&key)
            .ok_or_else(|| CloudError::NotFound(format!("user {key}")))?;
        if account.secret != current {
            return Err(CloudError::Auth("当前密码错误".into()));
        }
        account.secret = new.to_string();
        Ok(())
    }

    async fn list_posts(&self, limit: usize) -> Result<Vec<Post>> {
        let inner = self.online()?;
        Ok(inner.posts.iter().take(limit).cloned().collect())
    }

    async fn insert_post(&self, draft: PostDraft) -> Result<Post> {
        let mut inner = self.online()?;
        let timestamp = inner.next_timestamp();
        let post = draft.into_post(new_id(), timestamp);
        inner.posts.insert(0, post.clone());
        self.publish(&inner);
        Ok(post)
    }

    async fn delete_post(&self, post_id: &str) -> Result<()> {
        let mut inner = self.online()?;
        let before = inner.posts.len();
        inner.posts.retain(|p| p.id != post_id);
        if inner.posts.len() == before {
            return Err(CloudError::NotFound(format!("post {post_id}")));
        }
        self.publish(&inner);
        Ok(())
    }

    async fn set_like(&self, post_id: &str, user_id: &str, like: bool) -> Result<()> {
        let mut inner = self.online()?;
        Self::post_mut(&mut inner, post_id)?.set_like(user_id, like);
        self.publish(&inner);
        Ok(())
    }

    async fn append_comment(&self, post_id: &str, comment: Comment) -> Result<()> {
        let mut inner = self.online()?;
        Self::post_mut(&mut inner, post_id)?.push_comment(comment);
        self.publish(&inner);
        Ok(())
    }

    async fn remove_comment(&self, post_id: &str, comment: &Comment) -> Result<()> {
        let mut inner = self.online()?;
        Self::post_mut(&mut inner, post_id)?
            .remove_comment(&comment.id)
            .ok_or_else(|| CloudError::NotFound(format!("comment {}", comment.id)))?;
        self.publish(&inner);
        Ok(())
    }
}

impl RealtimeFeed for MemoryBackend {
    fn watch_posts(&self) -> watch::Receiver<Vec<Post>> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qifa_shared::UserRole;

    fn draft(title: &str) -> PostDraft {
        PostDraft {
            author_id: "a@x.com".into(),
            author_name: "A".into(),
            author_role: UserRole::User,
            title: title.into(),
            content: "body".into(),
        }
    }

    fn profile(email: &str) -> UserProfile {
        UserProfile {
            name: "Lin".into(),
            email: email.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let backend = MemoryBackend::new();
        let mut p = profile("lin@x.com");
        p.role = UserRole::Admin;
        backend.sign_up(&p, "secret1").await.unwrap();

        assert!(matches!(backend.sign_in("lin@x.com", "nope").await, Err(CloudError::Auth(_))));
        let user = backend.sign_in("lin@x.com", "secret1").await.unwrap();
        assert_eq!(user.role, UserRole::User);
        assert!(user.is_online);
        assert_eq!(backend.current_user().await.unwrap().unwrap().email, "lin@x.com");

        backend.sign_out().await.unwrap();
        assert!(backend.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_account_rejected() {
        let backend = MemoryBackend::new();
        backend.sign_up(&profile("a@x.com"), "pw1234").await.unwrap();
        assert!(backend.sign_up(&profile("a@x.com"), "pw1234").await.is_err());
    }

    #[tokio::test]
    async fn test_posts_listed_newest_first() {
        let backend = MemoryBackend::new();
        let first = backend.insert_post(draft("one")).await.unwrap();
        let second = backend.insert_post(draft("two")).await.unwrap();
        assert!(second.timestamp > first.timestamp);

        let titles: Vec<_> = backend
            .list_posts(50)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, ["two", "one"]);
        assert_eq!(backend.list_posts(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_likes_are_a_set() {
        let backend = MemoryBackend::new();
        let post = backend.insert_post(draft("p")).await.unwrap();
        backend.set_like(&post.id, "u", true).await.unwrap();
        backend.set_like(&post.id, "u", true).await.unwrap();
        assert_eq!(backend.list_posts(50).await.unwrap()[0].likes, ["u"]);

        backend.set_like(&post.id, "u", false).await.unwrap();
        assert!(backend.list_posts(50).await.unwrap()[0].likes.is_empty());
    }

    #[tokio::test]
    async fn test_watchers_see_every_write() {
        let backend = MemoryBackend::new();
        let mut rx = backend.watch_posts();
        assert!(rx.borrow_and_update().is_empty());

        let post = backend.insert_post(draft("p")).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update()[0].id, post.id);

        backend.delete_post(&post.id).await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn test_missing_post_is_not_found() {
        let backend = MemoryBackend::new();
        assert!(matches!(backend.delete_post("nope").await, Err(CloudError::NotFound(_))));
        assert!(matches!(backend.set_like("nope", "u", true).await, Err(CloudError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_offline_backend_fails_with_network_error() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(matches!(backend.list_posts(50).await, Err(CloudError::Network(_))));
    }

    #[tokio::test]
    async fn test_profile_update_keeps_role_and_email() {
        let backend = MemoryBackend::new();
        let mut admin = profile("root@x.com");
        admin.role = UserRole::Admin;
        backend.seed_account(admin, "pw1234");
        backend.sign_in("root@x.com", "pw1234").await.unwrap();

        let edited = UserProfile {
            name: "New".into(),
            email: "hijack@x.com".into(),
            ..Default::default()
        };
        backend.update_profile(&edited).await.unwrap();
        let now = backend.current_user().await.unwrap().unwrap();
        assert_eq!(now.name, "New");
        assert_eq!(now.email, "root@x.com");
        assert_eq!(now.role, UserRole::Admin);
    }
}
