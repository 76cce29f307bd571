//! Community posts, likes and comments.
//!
//! Every write goes through the active provider. On the poll path the
//! change is also merged into the local post list at once, since the next
//! fetch may be up to a poll interval away. On the push path the provider's
//! own feed delivers it.

use qifa_shared::error::require_text;
use qifa_shared::{new_id, now_millis, Comment, Post, PostDraft, ValidationError};

use crate::error::{AppError, Result};
use crate::store::AppStore;

impl AppStore {
    pub async fn create_post(&mut self, title: &str, content: &str) -> Result<Post> {
        self.require_publisher()?;
        let title = require_text(title, ValidationError::EmptyTitle)?.to_string();
        let content = require_text(content, ValidationError::EmptyContent)?.to_string();
        self.moderate(&format!("{title}{content}"))?;
        let provider = self.require_provider()?;

        let user = &self.state.user;
        let draft = PostDraft {
            author_id: user.identifier().to_string(),
            author_name: user.name.clone(),
            author_role: user.role,
            title,
            content,
        };
        let post = provider.create_post(draft).await?;
        tracing::info!(post = %post.id, "post created");

        if self.optimistic(&provider) && !self.state.posts.iter().any(|p| p.id == post.id) {
            self.state.posts.insert(0, post.clone());
        }
        Ok(post)
    }

    /// Only the author or an administrator may delete a post.
    pub async fn delete_post(&mut self, post_id: &str) -> Result<()> {
        self.require_member()?;
        let post = self.find_post(post_id)?;
        let user = &self.state.user;
        if post.author_id != user.identifier() && !user.is_admin() {
            return Err(AppError::Forbidden);
        }
        let provider = self.require_provider()?;

        provider.delete_post(post_id).await?;
        tracing::info!(post = %post_id, "post deleted");

        if self.optimistic(&provider) {
            self.state.posts.retain(|p| p.id != post_id);
        }
        Ok(())
    }

    /// Like the post, or remove the like if the user already gave one.
    /// Returns whether the post is now liked.
    pub async fn toggle_like(&mut self, post_id: &str) -> Result<bool> {
        self.require_member()?;
        let user_id = self.state.user.identifier().to_string();
        let like = !self.find_post(post_id)?.is_liked_by(&user_id);
        let provider = self.require_provider()?;

        provider.like_post(post_id, &user_id, like).await?;

        if self.optimistic(&provider) {
            if let Some(post) = self.state.post_mut(post_id) {
                post.set_like(&user_id, like);
            }
        }
        Ok(like)
    }

    pub async fn add_comment(&mut self, post_id: &str, content: &str) -> Result<Comment> {
        self.require_publisher()?;
        let content = require_text(content, ValidationError::EmptyContent)?.to_string();
        self.moderate(&content)?;
        self.find_post(post_id)?;
        let provider = self.require_provider()?;

        let user = &self.state.user;
        let comment = Comment {
            id: new_id(),
            post_id: post_id.to_string(),
            author_id: user.identifier().to_string(),
            author_name: user.name.clone(),
            content,
            timestamp: now_millis(),
        };
        provider.add_comment(post_id, comment.clone()).await?;

        if self.optimistic(&provider) {
            if let Some(post) = self.state.post_mut(post_id) {
                post.push_comment(comment.clone());
            }
        }
        Ok(comment)
    }

    pub(crate) fn find_post(&self, post_id: &str) -> Result<&Post> {
        self.state
            .posts
            .iter()
            .find(|p| p.id == post_id)
            .ok_or_else(|| AppError::NotFound(format!("post {post_id}")))
    }
}
