//! LeanCloud REST backend, used by the CHINA provider.
//!
//! Only the slice of the API the dashboard needs: user login, sign-up,
//! session lookup and profile updates, plus the `Post` class with atomic
//! array operators for likes and comments.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use qifa_shared::{Comment, Post, PostDraft, UserProfile, UserRole, UserStatus};

use crate::backend::RemoteBackend;
use crate::error::{CloudError, Result};

const API_PREFIX: &str = "1.1";
const PLACEHOLDER_MARKER: &str = "Please-Set";

/// Application credentials. Values still holding the `Please-Set…`
/// placeholders count as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeanCloudConfig {
    pub app_id: String,
    pub app_key: String,
    pub server_url: String,
}

impl LeanCloudConfig {
    pub fn is_usable(&self) -> bool {
        [&self.app_id, &self.app_key, &self.server_url]
            .iter()
            .all(|v| !v.trim().is_empty() && !v.contains(PLACEHOLDER_MARKER))
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{API_PREFIX}/{}",
            self.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    token: String,
    object_id: String,
}

pub struct LeanCloudBackend {
    config: LeanCloudConfig,
    client: Client,
    session: Mutex<Option<Session>>,
    /// Where the session token is kept between runs, if anywhere.
    session_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LcUser {
    object_id: String,
    username: String,
    email: Option<String>,
    mobile_phone_number: Option<String>,
    name: Option<String>,
    student_id: Option<String>,
    school: Option<String>,
    degree_level: Option<String>,
    program: Option<String>,
    start_date: Option<String>,
    current_location: Option<String>,
    target_city: Option<String>,
    role: Option<UserRole>,
    session_token: Option<String>,
}

impl LcUser {
    fn into_profile(self) -> UserProfile {
        UserProfile {
            name: self.name.filter(|n| !n.is_empty()).unwrap_or(self.username),
            email: self.email.unwrap_or_default(),
            phone: self.mobile_phone_number.unwrap_or_default(),
            student_id: self.student_id.unwrap_or_default(),
            school: self.school.unwrap_or_default(),
            degree_level: self.degree_level.unwrap_or_default(),
            program: self.program.unwrap_or_default(),
            start_date: self.start_date.unwrap_or_default(),
            current_location: self.current_location.unwrap_or_default(),
            target_city: self.target_city.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            status: UserStatus::Active,
            is_online: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LcPost {
    object_id: String,
    #[serde(default)]
    author_id: String,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    author_role: UserRole,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    likes: Vec<String>,
    #[serde(default)]
    comments: Vec<Comment>,
    created_at: String,
}

impl LcPost {
    fn into_post(self) -> Result<Post> {
        let timestamp = parse_timestamp(&self.created_at)?;
        Ok(Post {
            id: self.object_id,
            author_id: self.author_id,
            author_name: self.author_name,
            author_role: self.author_role,
            title: self.title,
            content: self.content,
            likes: self.likes,
            comments: self.comments,
            timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LcResults<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LcCreated {
    object_id: String,
    created_at: String,
    #[serde(default)]
    session_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LcError {
    code: i64,
    error: String,
}

fn parse_timestamp(raw: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| CloudError::Decode(format!("createdAt {raw:?}: {e}")))
}

/// Map a non-2xx response to a [`CloudError`].
fn map_error(status: StatusCode, body: &str) -> CloudError {
    match serde_json::from_str::<LcError>(body) {
        // 210 wrong password, 211 unknown user, 219 too many attempts.
        Ok(LcError { code: 210 | 211 | 219, error }) => CloudError::Auth(error),
        // 202/203 username or email taken.
        Ok(LcError { code: 202 | 203, error }) => CloudError::Auth(error),
        Ok(LcError { code: 101, error }) => CloudError::NotFound(error),
        Ok(LcError { code, error }) => CloudError::Backend(format!("{code}: {error}")),
        Err(_) if status == StatusCode::UNAUTHORIZED => CloudError::Auth(status.to_string()),
        Err(_) => CloudError::Backend(format!("HTTP {status}")),
    }
}

impl LeanCloudBackend {
    pub fn new(config: LeanCloudConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            session: Mutex::new(None),
            session_file: None,
        }
    }

    /// Keep the session token in `path`, restoring any token already there.
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let restored = load_session(&path);
        if restored.is_some() {
            tracing::info!(path = %path.display(), "leancloud session restored from disk");
        }
        *self.session.get_mut().unwrap_or_else(|e| e.into_inner()) = restored;
        self.session_file = Some(path);
        self
    }

    fn current_session(&self) -> Option<Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_session(&self, session: Option<Session>) {
        if let Some(path) = &self.session_file {
            if let Err(e) = store_session(path, session.as_ref()) {
                tracing::warn!(path = %path.display(), error = %e, "failed to save leancloud session");
            }
        }
        *self.session.lock().unwrap_or_else(|e| e.into_inner()) = session;
    }

    fn require_session(&self) -> Result<Session> {
        self.current_session().ok_or_else(|| CloudError::Auth("未登录".into()))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, self.config.endpoint(path))
            .header("X-LC-Id", &self.config.app_id)
            .header("X-LC-Key", &self.config.app_key);
        if let Some(session) = self.current_session() {
            req = req.header("X-LC-Session", session.token);
        }
        req
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let err = map_error(status, &body);
            tracing::warn!(%status, error = %err, "leancloud request failed");
            return Err(err);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn load_session(path: &Path) -> Option<Session> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read leancloud session");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable leancloud session");
            None
        }
    }
}

fn store_session(path: &Path, session: Option<&Session>) -> io::Result<()> {
    match session {
        Some(session) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_vec(session)?)
        }
        None => match std::fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        },
    }
}

#[async_trait]
impl RemoteBackend for LeanCloudBackend {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<UserProfile> {
        let req = self
            .request(Method::POST, "login")
            .json(&json!({ "username": identifier, "password": secret }));
        let user: LcUser = self.send(req).await?;

        let token = user
            .session_token
            .clone()
            .ok_or_else(|| CloudError::Decode("login response without sessionToken".into()))?;
        self.set_session(Some(Session {
            token,
            object_id: user.object_id.clone(),
        }));
        Ok(user.into_profile())
    }

    async fn sign_up(&self, profile: &UserProfile, secret: &str) -> Result<()> {
        let mut body = json!({
            "username": profile.identifier(),
            "password": secret,
            "name": profile.name,
            "school": profile.school,
            "program": profile.program,
            "role": UserRole::User,
        });
        if !profile.email.is_empty() {
            body["email"] = json!(profile.email);
        }
        if !profile.phone.is_empty() {
            body["mobilePhoneNumber"] = json!(profile.phone);
        }
        let req = self.request(Method::POST, "users").json(&body);
        let created: LcCreated = self.send(req).await?;
        tracing::debug!(object_id = %created.object_id, created_at = %created.created_at, "leancloud user created");
        if let Some(token) = created.session_token {
            self.set_session(Some(Session {
                token,
                object_id: created.object_id,
            }));
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        self.set_session(None);
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<UserProfile>> {
        if self.current_session().is_none() {
            return Ok(None);
        }
        match self.send::<LcUser>(self.request(Method::GET, "users/me")).await {
            Ok(user) => Ok(Some(user.into_profile())),
            Err(CloudError::Auth(_)) => {
                self.set_session(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        let session = self.require_session()?;
        let body = json!({
            "name": profile.name,
            "mobilePhoneNumber": profile.phone,
            "studentId": profile.student_id,
            "school": profile.school,
            "degreeLevel": profile.degree_level,
            "program": profile.program,
            "startDate": profile.start_date,
            "currentLocation": profile.current_location,
            "targetCity": profile.target_city,
        });
        let req = self
            .request(Method::PUT, &format!("users/{}", session.object_id))
            .json(&body);
        self.send::<Value>(req).await?;
        Ok(())
    }

    async fn change_password(&self, current: &str, new: &str) -> Result<()> {
        let session = self.require_session()?;
        let req = self
            .request(Method::PUT, &format!("users/{}/updatePassword", session.object_id))
            .json(&json!({ "old_password": current, "new_password": new }));
        self.send::<Value>(req).await?;
        Ok(())
    }

    async fn list_posts(&self, limit: usize) -> Result<Vec<Post>> {
        let req = self
            .request(Method::GET, "classes/Post")
            .query(&[("order", "-createdAt".to_string()), ("limit", limit.to_string())]);
        let page: LcResults<LcPost> = self.send(req).await?;
        page.results.into_iter().map(LcPost::into_post).collect()
    }

    async fn insert_post(&self, draft: PostDraft) -> Result<Post> {
        let body = json!({
            "authorId": draft.author_id,
            "authorName": draft.author_name,
            "authorRole": draft.author_role,
            "title": draft.title,
            "content": draft.content,
            "likes": [],
            "comments": [],
        });
        let req = self.request(Method::POST, "classes/Post").json(&body);
        let created: LcCreated = self.send(req).await?;
        let timestamp = parse_timestamp(&created.created_at)?;
        Ok(draft.into_post(created.object_id, timestamp))
    }

    async fn delete_post(&self, post_id: &str) -> Result<()> {
        let req = self.request(Method::DELETE, &format!("classes/Post/{post_id}"));
        self.send::<Value>(req).await?;
        Ok(())
    }

    async fn set_like(&self, post_id: &str, user_id: &str, like: bool) -> Result<()> {
        let op = if like { "AddUnique" } else { "Remove" };
        let req = self
            .request(Method::PUT, &format!("classes/Post/{post_id}"))
            .json(&json!({ "likes": { "__op": op, "objects": [user_id] } }));
        self.send::<Value>(req).await?;
        Ok(())
    }

    async fn append_comment(&self, post_id: &str, comment: Comment) -> Result<()> {
        let req = self
            .request(Method::PUT, &format!("classes/Post/{post_id}"))
            .json(&json!({ "comments": { "__op": "Add", "objects": [comment] } }));
        self.send::<Value>(req).await?;
        Ok(())
    }

    // `Remove` matches array elements by value, so the full comment is sent.
    async fn remove_comment(&self, post_id: &str, comment: &Comment) -> Result<()> {
        let req = self
            .request(Method::PUT, &format!("classes/Post/{post_id}"))
            .json(&json!({ "comments": { "__op": "Remove", "objects": [comment] } }));
        self.send::<Value>(req).await?;
        Ok(())
    }
}
