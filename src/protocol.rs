use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    #[serde(rename = "function_call")]
    ToolCall {
        name: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    #[serde(rename = "function_response")]
    ToolResult {
        name: String,
        #[serde(rename = "response", default)]
        result: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn tool_call(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::ToolCall {
                name: name.into(),
                args,
            }],
        }
    }

    pub fn tool_result(name: impl Into<String>, result: Value) -> Self {
        Self {
            role: Role::Tool,
            parts: vec![Part::ToolResult {
                name: name.into(),
                result,
            }],
        }
    }

    /// The turn's first part.
    pub fn part(&self) -> Option<&Part> {
        self.parts.first()
    }

    pub fn text(&self) -> Option<&str> {
        match self.part()? {
            Part::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub message: &'a str,
    pub conversation_history: &'a [Turn],
}

#[derive(Debug, Serialize)]
pub struct FixErrorRequest<'a> {
    pub model: &'a str,
    pub error_message: &'a str,
    pub conversation_history: &'a [Turn],
}

/// Non-streaming body of `/chat` and `/fix_error`.
///
/// A `history` is authoritative and wins when both keys are present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ChatReply {
    History { history: Vec<Turn> },
    Response { response: String },
}

/// One decoded SSE payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub chunk: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentUpdate<'a> {
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct StateUpdate<'a> {
    pub main_plan: &'a str,
    pub scratchpad: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ExecutePlanRequest<'a> {
    pub goal: &'a str,
    pub model: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ConfirmationRequest {
    pub response: Confirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Approve,
    Deny,
}

impl std::str::FromStr for Confirmation {
    type Err = crate::error::ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "deny" => Ok(Self::Deny),
            other => Err(crate::error::ValidationError::InvalidConfirmation(
                other.to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndexResponse {
    pub status: Option<String>,
    pub error: Option<String>,
}

impl IndexResponse {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AutoApproveResponse {
    pub auto_approve: bool,
}

/// Snapshot returned by `/status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusReport {
    #[serde(default)]
    pub scratchpad: Option<String>,
    #[serde(default)]
    pub main_plan: Option<String>,
    #[serde(default)]
    pub agent_status: Option<String>,
    #[serde(default)]
    pub agent_running: bool,
    #[serde(default)]
    pub confirmation_prompt: Option<String>,
    #[serde(default)]
    pub auto_approve: Option<bool>,
}
