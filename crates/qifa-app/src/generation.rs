//! Text-generation collaborator interface for the chat assistant.
//!
//! The generator itself is external. The store hands it the transcript of
//! one session and consumes a stream of events: text chunks that extend the
//! bot reply, and requests to create a task.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use qifa_shared::constants::CREATE_TASK_TOOL;
use qifa_shared::{ChatMessage, TaskCategory};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("generation failed: {0}")]
pub struct GenerationError(pub String);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub system_instruction: String,
    /// The session transcript, ending with the user's new message.
    pub transcript: Vec<ChatMessage>,
    pub tools: Vec<Value>,
}

impl GenerationRequest {
    pub fn for_user(user_name: &str, transcript: Vec<ChatMessage>) -> Self {
        Self {
            system_instruction: format!("角色: 留学助手 {user_name}."),
            transcript,
            tools: vec![create_task_tool()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GenerationEvent {
    Text { text: String },
    /// The generator invoked the task-creation capability.
    #[serde(rename_all = "camelCase")]
    CreateTask {
        title: String,
        category: TaskCategory,
        #[serde(default)]
        due_date: Option<String>,
    },
}

pub type GenerationStream = BoxStream<'static, Result<GenerationEvent, GenerationError>>;

pub trait TextGenerator: Send + Sync {
    fn generate(&self, request: GenerationRequest) -> GenerationStream;
}

/// Declaration of the task-creation capability offered to the generator.
pub fn create_task_tool() -> Value {
    json!({
        "name": CREATE_TASK_TOOL,
        "description": "当用户提到需要做某事、准备某材料或担心某个流程时，调用此函数自动创建任务。能够自动根据任务内容归类到合适的板块。",
        "parameters": {
            "type": "OBJECT",
            "properties": {
                "title": {
                    "type": "STRING",
                    "description": "任务的简短标题，例如\"预约递签\"、\"购买机票\""
                },
                "category": {
                    "type": "STRING",
                    "enum": TaskCategory::ALL,
                    "description": "PRE_DEPARTURE(行前:签证/机票/行李), ARRIVAL(抵达:银行/手机卡/居留), LIFE(生活:交通/房补/购物), STUDY(学习资料:注册/选课/资料)"
                },
                "dueDate": {
                    "type": "STRING",
                    "description": "任务截止日期，格式 YYYY-MM-DD。"
                }
            },
            "required": ["title", "category"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_declares_category_enum() {
        let tool = create_task_tool();
        assert_eq!(tool["name"], "createTask");
        assert_eq!(
            tool["parameters"]["properties"]["category"]["enum"],
            json!(["PRE_DEPARTURE", "ARRIVAL", "LIFE", "STUDY"])
        );
    }

    #[test]
    fn test_tool_call_payload_decodes() {
        let event: GenerationEvent = serde_json::from_str(
            r#"{"type":"createTask","title":"预约递签","category":"PRE_DEPARTURE","dueDate":"2025-06-01"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            GenerationEvent::CreateTask {
                title: "预约递签".into(),
                category: TaskCategory::PreDeparture,
                due_date: Some("2025-06-01".into()),
            }
        );
    }

    #[test]
    fn test_request_names_the_user() {
        let req = GenerationRequest::for_user("Lin", vec![]);
        assert_eq!(req.system_instruction, "角色: 留学助手 Lin.");
        assert_eq!(req.tools.len(), 1);
    }
}
