//! Chat sessions and the assistant reply stream.
//!
//! A reply is driven as a [`ChatTurn`]: [`AppStore::begin_chat`] records the
//! user message and opens the generator stream, each event is applied with
//! [`AppStore::apply_chat_event`], and [`AppStore::finish_chat`] closes the
//! turn. Every turn is bound to the session it started in, so output never
//! lands in another session after a switch.

use futures::StreamExt;

use qifa_shared::constants::{GENERATION_FAILED, GENERATION_UNAVAILABLE, NEW_SESSION_TITLE};
use qifa_shared::error::require_text;
use qifa_shared::{ChatMessage, ChatSession, Sender, ValidationError};

use crate::error::{AppError, Result};
use crate::generation::{GenerationError, GenerationEvent, GenerationRequest, GenerationStream};
use crate::store::AppStore;

/// One in-flight assistant reply.
pub struct ChatTurn {
    session_id: String,
    bot_message_id: Option<String>,
    stream: Option<GenerationStream>,
}

impl ChatTurn {
    /// Session the turn belongs to.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether the generator was reached at all.
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub async fn next_event(&mut self) -> Option<std::result::Result<GenerationEvent, GenerationError>> {
        match &mut self.stream {
            Some(stream) => stream.next().await,
            None => None,
        }
    }
}

impl std::fmt::Debug for ChatTurn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatTurn")
            .field("session_id", &self.session_id)
            .field("bot_message_id", &self.bot_message_id)
            .field("streaming", &self.stream.is_some())
            .finish()
    }
}

impl AppStore {
    /// Send `text` and drive the reply to completion. Returns the session id
    /// the exchange was recorded in.
    pub async fn send_chat_message(&mut self, text: &str) -> Result<String> {
        let mut turn = self.begin_chat(text)?;
        while let Some(event) = turn.next_event().await {
            self.apply_chat_event(&turn, event);
        }
        let session_id = turn.session_id.clone();
        self.finish_chat(turn);
        Ok(session_id)
    }

    /// Record the user message in the current session, creating one if none
    /// is selected, and start the reply.
    ///
    /// When the active mode has no text generation a canned notice is the
    /// reply and the returned turn carries no stream.
    pub fn begin_chat(&mut self, text: &str) -> Result<ChatTurn> {
        let text = require_text(text, ValidationError::EmptyMessage)?.to_string();

        let session_id = match self.state.current_session() {
            Some(session) => session.id.clone(),
            None => self.create_session(),
        };
        if self.generating.contains(&session_id) {
            return Err(AppError::GenerationInFlight);
        }

        let user_name = self.state.user.name.clone();
        let supports_generation = self.provider.as_ref().is_some_and(|p| p.supports_generation());
        let generator = self.generator.clone();

        let session = self
            .state
            .session_mut(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;
        session.push(ChatMessage::new(Sender::User, text));

        let mut turn = ChatTurn {
            session_id: session_id.clone(),
            bot_message_id: None,
            stream: None,
        };

        match generator {
            Some(generator) if supports_generation => {
                let request = GenerationRequest::for_user(&user_name, session.messages.clone());
                let placeholder = ChatMessage::new(Sender::Bot, "");
                turn.bot_message_id = Some(placeholder.id.clone());
                session.push(placeholder);
                turn.stream = Some(generator.generate(request));
                self.generating.insert(session_id);
                tracing::debug!(session = %turn.session_id, "generation started");
            }
            None if supports_generation => {
                tracing::warn!("no text generator configured");
                session.push(ChatMessage::new(Sender::Bot, GENERATION_FAILED));
            }
            _ => {
                session.push(ChatMessage::new(Sender::Bot, GENERATION_UNAVAILABLE));
            }
        }

        self.persist();
        Ok(turn)
    }

    /// Apply one generator event to the turn's own session. Output for a
    /// session deleted meanwhile is dropped.
    pub fn apply_chat_event(
        &mut self,
        turn: &ChatTurn,
        event: std::result::Result<GenerationEvent, GenerationError>,
    ) {
        match event {
            Ok(GenerationEvent::Text { text }) => {
                let Some(message) = self.bot_message(turn) else {
                    tracing::debug!(session = %turn.session_id, "dropping chunk for missing session");
                    return;
                };
                message.content.push_str(&text);
            }
            Ok(GenerationEvent::CreateTask {
                title,
                category,
                due_date,
            }) => {
                match self.add_task(&title, category, due_date.as_deref().unwrap_or("")) {
                    Ok(task) => tracing::info!(task = %task.id, "task created from chat"),
                    Err(e) => tracing::warn!(error = %e, "generator task request rejected"),
                }
            }
            Err(e) => {
                tracing::warn!(session = %turn.session_id, error = %e, "generation failed");
                let replaced = match self.bot_message(turn) {
                    Some(message) if message.content.is_empty() => {
                        message.content = GENERATION_FAILED.to_string();
                        true
                    }
                    _ => false,
                };
                if !replaced {
                    if let Some(session) = self.state.session_mut(&turn.session_id) {
                        session.push(ChatMessage::new(Sender::Bot, GENERATION_FAILED));
                    }
                }
            }
        }
    }

    /// Close the turn. A reply that produced no text is removed.
    pub fn finish_chat(&mut self, turn: ChatTurn) {
        self.generating.remove(&turn.session_id);
        if let (Some(bot_id), Some(session)) =
            (turn.bot_message_id.as_deref(), self.state.session_mut(&turn.session_id))
        {
            session.messages.retain(|m| m.id != bot_id || !m.content.is_empty());
        }
        self.persist();
    }

    /// Whether a reply is still streaming into `session_id`.
    pub fn is_generating(&self, session_id: &str) -> bool {
        self.generating.contains(session_id)
    }

    // ---- Sessions ----

    /// Open an empty session at the top of the list and select it.
    pub fn create_session(&mut self) -> String {
        let session = ChatSession::new(NEW_SESSION_TITLE, Vec::new());
        let id = session.id.clone();
        self.state.chat_sessions.insert(0, session);
        self.state.current_session_id = Some(id.clone());
        self.persist();
        id
    }

    pub fn switch_session(&mut self, session_id: &str) -> Result<()> {
        if !self.state.chat_sessions.iter().any(|s| s.id == session_id) {
            return Err(AppError::NotFound(format!("session {session_id}")));
        }
        self.state.current_session_id = Some(session_id.to_string());
        self.persist();
        Ok(())
    }

    /// Remove a session. If it was selected, the most recently updated
    /// remaining session is selected instead, or none.
    pub fn delete_session(&mut self, session_id: &str) -> Result<()> {
        let before = self.state.chat_sessions.len();
        self.state.chat_sessions.retain(|s| s.id != session_id);
        if self.state.chat_sessions.len() == before {
            return Err(AppError::NotFound(format!("session {session_id}")));
        }
        self.generating.remove(session_id);

        if self.state.current_session_id.as_deref() == Some(session_id) {
            self.state.current_session_id = self
                .state
                .chat_sessions
                .iter()
                .max_by_key(|s| s.updated_at)
                .map(|s| s.id.clone());
        }
        self.persist();
        Ok(())
    }

    fn bot_message(&mut self, turn: &ChatTurn) -> Option<&mut ChatMessage> {
        let bot_id = turn.bot_message_id.as_deref()?;
        self.state
            .session_mut(&turn.session_id)?
            .messages
            .iter_mut()
            .find(|m| m.id == bot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use qifa_cloud::{MemoryBackend, ProviderRegistry};
    use qifa_shared::{ServerMode, TaskCategory};

    use crate::testing::{store_with, text, ScriptedGenerator};

    fn last(store: &AppStore) -> &ChatMessage {
        store.state().current_session().unwrap().messages.last().unwrap()
    }

    #[tokio::test]
    async fn test_streamed_reply_accumulates_in_one_message() {
        let generator = ScriptedGenerator::new(vec![text("你好，"), text("需要办签证吗？")]);
        let mut store = store_with(Arc::new(MemoryBackend::new()))
            .await
            .with_generator(generator.clone());
        store.state.user.name = "Lin".into();

        store.send_chat_message("签证怎么办").await.unwrap();

        let messages = &store.state().current_session().unwrap().messages;
        // greeting, user, bot
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].sender, Sender::User);
        assert_eq!(last(&store).sender, Sender::Bot);
        assert_eq!(last(&store).content, "你好，需要办签证吗？");

        let requests = generator.requests.lock().unwrap();
        assert_eq!(requests[0].system_instruction, "角色: 留学助手 Lin.");
        assert_eq!(requests[0].transcript.last().unwrap().content, "签证怎么办");
    }

    #[tokio::test]
    async fn test_poll_mode_answers_with_offline_notice() {
        let generator = ScriptedGenerator::new(vec![text("never")]);
        let mut store = store_with(Arc::new(MemoryBackend::new()))
            .await
            .with_generator(generator.clone());
        store.switch_server_mode(ServerMode::China).await;

        store.send_chat_message("hello").await.unwrap();
        assert_eq!(last(&store).content, GENERATION_UNAVAILABLE);
        assert!(generator.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_provider_also_gets_notice() {
        let mut store = AppStore::ephemeral(ProviderRegistry::new(), ServerMode::Global).await;
        store.send_chat_message("hello").await.unwrap();
        assert_eq!(last(&store).content, GENERATION_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_missing_generator_reports_failure() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        store.send_chat_message("hello").await.unwrap();
        assert_eq!(last(&store).content, GENERATION_FAILED);
    }

    #[tokio::test]
    async fn test_stream_error_appends_failure_after_partial_text() {
        let generator = ScriptedGenerator::new(vec![text("部分"), Err(GenerationError("reset".into()))]);
        let mut store = store_with(Arc::new(MemoryBackend::new()))
            .await
            .with_generator(generator);

        store.send_chat_message("hi").await.unwrap();
        let messages = &store.state().current_session().unwrap().messages;
        let n = messages.len();
        assert_eq!(messages[n - 2].content, "部分");
        assert_eq!(messages[n - 1].content, GENERATION_FAILED);
    }

    #[tokio::test]
    async fn test_tool_call_creates_task_and_empty_reply_is_dropped() {
        let generator = ScriptedGenerator::new(vec![Ok(GenerationEvent::CreateTask {
            title: "预约递签".into(),
            category: TaskCategory::PreDeparture,
            due_date: None,
        })]);
        let mut store = store_with(Arc::new(MemoryBackend::new()))
            .await
            .with_generator(generator);

        store.send_chat_message("提醒我预约递签").await.unwrap();
        assert_eq!(store.state().tasks[0].title, "预约递签");
        assert_eq!(store.state().tasks[0].due_date, None);
        assert_eq!(last(&store).sender, Sender::User);
    }

    #[tokio::test]
    async fn test_reply_stays_in_originating_session() {
        let generator = ScriptedGenerator::new(vec![text("A"), text("B")]);
        let mut store = store_with(Arc::new(MemoryBackend::new()))
            .await
            .with_generator(generator);

        let mut turn = store.begin_chat("first").unwrap();
        let origin = turn.session_id().to_string();
        assert!(store.is_generating(&origin));
        assert_eq!(store.begin_chat("again").unwrap_err(), AppError::GenerationInFlight);

        let other = store.create_session();
        while let Some(event) = turn.next_event().await {
            store.apply_chat_event(&turn, event);
        }
        store.finish_chat(turn);

        assert!(store.state().current_session().unwrap().messages.is_empty());
        assert_eq!(store.state().current_session_id.as_deref(), Some(other.as_str()));
        let origin_session = store.state().chat_sessions.iter().find(|s| s.id == origin).unwrap();
        assert_eq!(origin_session.messages.last().unwrap().content, "AB");
        assert!(!store.is_generating(&origin));
    }

    #[tokio::test]
    async fn test_chunks_for_deleted_session_are_dropped() {
        let generator = ScriptedGenerator::new(vec![text("late")]);
        let mut store = store_with(Arc::new(MemoryBackend::new()))
            .await
            .with_generator(generator);

        let mut turn = store.begin_chat("hi").unwrap();
        let origin = turn.session_id().to_string();
        store.delete_session(&origin).unwrap();

        while let Some(event) = turn.next_event().await {
            store.apply_chat_event(&turn, event);
        }
        store.finish_chat(turn);
        assert!(store.state().chat_sessions.is_empty());
        assert_eq!(store.state().current_session_id, None);
    }

    #[tokio::test]
    async fn test_sending_without_session_creates_one() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        let greeting = store.state().current_session_id.clone().unwrap();
        store.delete_session(&greeting).unwrap();

        let id = store.send_chat_message("hello").await.unwrap();
        let session = store.state().current_session().unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.title, NEW_SESSION_TITLE);
        assert_eq!(session.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        assert_eq!(
            store.send_chat_message("  ").await.unwrap_err(),
            AppError::Validation(ValidationError::EmptyMessage)
        );
    }

    #[tokio::test]
    async fn test_deleting_current_session_selects_most_recent() {
        let mut store = store_with(Arc::new(MemoryBackend::new())).await;
        let a = store.state().current_session_id.clone().unwrap();
        let b = store.create_session();
        let c = store.create_session();

        store.state.session_mut(&a).unwrap().updated_at = i64::MAX;
        store.delete_session(&c).unwrap();
        assert_eq!(store.state().current_session_id.as_deref(), Some(a.as_str()));

        store.switch_session(&b).unwrap();
        assert!(matches!(store.switch_session("missing"), Err(AppError::NotFound(_))));
        assert_eq!(store.state().current_session_id.as_deref(), Some(b.as_str()));
    }
}
