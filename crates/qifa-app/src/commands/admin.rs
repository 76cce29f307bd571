//! Reports, moderation actions, account status and user feedback.

use qifa_cloud::CloudError;
use qifa_shared::error::require_text;
use qifa_shared::{
    new_id, now_millis, Feedback, FeedbackStatus, FeedbackType, Report, ReportAction, ReportStatus,
    ReportTarget, UserStatus, ValidationError,
};

use crate::error::{AppError, Result};
use crate::store::AppStore;

impl AppStore {
    // ---- Reports ----

    /// File a report against a post or a comment. The reported text and its
    /// author are captured so the report outlives the content.
    pub fn report_content(&mut self, target_id: &str, target: ReportTarget, reason: &str) -> Result<Report> {
        self.require_member()?;
        let reason = require_text(reason, ValidationError::EmptyContent)?.to_string();

        let (snapshot, author, parent_post_id) = match target {
            ReportTarget::Post => {
                let post = self.find_post(target_id)?;
                (format!("{}\n{}", post.title, post.content), post.author_id.clone(), None)
            }
            ReportTarget::Comment => self
                .state
                .posts
                .iter()
                .find_map(|p| {
                    p.find_comment(target_id)
                        .map(|c| (c.content.clone(), c.author_id.clone(), Some(p.id.clone())))
                })
                .ok_or_else(|| AppError::NotFound(format!("comment {target_id}")))?,
        };

        let report = Report {
            id: new_id(),
            target_id: target_id.to_string(),
            target_type: target,
            reporter_id: self.state.user.identifier().to_string(),
            target_author_id: author,
            parent_post_id,
            reason,
            status: ReportStatus::Pending,
            timestamp: now_millis(),
            content_snapshot: snapshot,
            resolution: None,
        };
        tracing::info!(report = %report.id, target = %target_id, "content reported");
        self.state.reports.insert(0, report.clone());
        Ok(report)
    }

    /// Close a pending report. Closed reports are kept; resolving one again
    /// does nothing.
    pub async fn resolve_report(&mut self, report_id: &str, action: ReportAction) -> Result<()> {
        self.require_admin()?;
        let report = self
            .state
            .reports
            .iter()
            .find(|r| r.id == report_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("report {report_id}")))?;
        if report.status != ReportStatus::Pending {
            tracing::debug!(report = %report_id, "report already closed");
            return Ok(());
        }

        let status = match action {
            ReportAction::Dismiss => ReportStatus::Dismissed,
            ReportAction::DeleteContent => {
                self.remove_reported_content(&report).await?;
                ReportStatus::Resolved
            }
            ReportAction::BanUser => {
                self.remove_reported_content(&report).await?;
                self.apply_user_status(&report.target_author_id, UserStatus::Banned);
                ReportStatus::Resolved
            }
        };

        if let Some(r) = self.state.reports.iter_mut().find(|r| r.id == report_id) {
            r.status = status;
            r.resolution = Some(action);
        }
        tracing::info!(report = %report_id, ?action, "report resolved");
        self.persist();
        Ok(())
    }

    async fn remove_reported_content(&mut self, report: &Report) -> Result<()> {
        let provider = self.require_provider()?;
        let removed = match report.target_type {
            ReportTarget::Post => provider.delete_post(&report.target_id).await,
            ReportTarget::Comment => {
                let comment = report.parent_post_id.as_deref().and_then(|post_id| {
                    self.state
                        .posts
                        .iter()
                        .find(|p| p.id == post_id)
                        .and_then(|p| p.find_comment(&report.target_id))
                        .cloned()
                        .map(|c| (post_id.to_string(), c))
                });
                match comment {
                    Some((post_id, comment)) => provider.remove_comment(&post_id, &comment).await,
                    None => Err(CloudError::NotFound(format!("comment {}", report.target_id))),
                }
            }
        };

        match removed {
            Ok(()) => {}
            Err(CloudError::NotFound(what)) => {
                tracing::info!(%what, "reported content already gone");
            }
            Err(e) => return Err(e.into()),
        }

        if self.optimistic(&provider) {
            match (&report.target_type, report.parent_post_id.as_deref()) {
                (ReportTarget::Post, _) => self.state.posts.retain(|p| p.id != report.target_id),
                (ReportTarget::Comment, Some(post_id)) => {
                    if let Some(post) = self.state.post_mut(post_id) {
                        post.remove_comment(&report.target_id);
                    }
                }
                (ReportTarget::Comment, None) => {}
            }
        }
        Ok(())
    }

    // ---- Accounts ----

    /// Mute, ban or reactivate a known user.
    pub fn set_user_status(&mut self, identifier: &str, status: UserStatus) -> Result<()> {
        self.require_admin()?;
        if !self.state.registered_users.iter().any(|u| u.identifier() == identifier) {
            return Err(AppError::NotFound(format!("user {identifier}")));
        }
        self.apply_user_status(identifier, status);
        self.persist();
        Ok(())
    }

    fn apply_user_status(&mut self, identifier: &str, status: UserStatus) {
        for user in self
            .state
            .registered_users
            .iter_mut()
            .filter(|u| u.identifier() == identifier)
        {
            user.status = status;
        }
        if self.state.user.identifier() == identifier {
            self.state.user.status = status;
        }
        tracing::info!(user = %identifier, ?status, "user status changed");
    }

    // ---- Feedback ----

    pub fn submit_feedback(&mut self, kind: FeedbackType, content: &str) -> Result<Feedback> {
        self.require_signed_in()?;
        let content = require_text(content, ValidationError::EmptyContent)?.to_string();

        let user = &self.state.user;
        let feedback = Feedback {
            id: new_id(),
            user_id: user.identifier().to_string(),
            user_name: user.name.clone(),
            kind,
            content,
            timestamp: now_millis(),
            status: FeedbackStatus::Pending,
            admin_reply: None,
            reply_timestamp: None,
        };
        self.state.feedbacks.insert(0, feedback.clone());
        Ok(feedback)
    }

    pub fn reply_to_feedback(&mut self, feedback_id: &str, reply: &str) -> Result<()> {
        self.require_admin()?;
        let reply = require_text(reply, ValidationError::EmptyContent)?.to_string();
        let feedback = self
            .state
            .feedbacks
            .iter_mut()
            .find(|f| f.id == feedback_id)
            .ok_or_else(|| AppError::NotFound(format!("feedback {feedback_id}")))?;

        feedback.admin_reply = Some(reply);
        feedback.reply_timestamp = Some(now_millis());
        feedback.status = FeedbackStatus::Reviewed;
        Ok(())
    }
}
