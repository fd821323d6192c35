//! Wire types shared by both shapes.
//!
//! Shape-specific payloads live in [`chat`] and [`responses`]. Fields that
//! are optional on the wire are `Option<T>` so "absent" and "explicitly
//! zero/false" survive a conversion.

pub mod chat;
pub mod responses;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use chat::{
    ChatChoice, ChatChunk, ChatChunkChoice, ChatContent, ChatDelta, ChatMessage, ChatRequest,
    ChatResponse, ChatTool, ChatToolCallDelta, ChatToolFunctionDelta, FunctionDefinition,
    ResponseFormat, StreamOptions,
};
pub use responses::{
    InputItem, OutputContent, OutputItem, ReasoningConfig, ResponseSnapshot, ResponseStatus,
    ResponsesRequest, ResponsesResponse, StreamEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Developer,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            "developer" => Some(Self::Developer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Developer => "developer",
        }
    }
}

fn default_tool_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_tool_call_type")]
    pub kind: String,
    #[serde(default)]
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: default_tool_call_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn is_function(&self) -> bool {
        let kind = self.kind.trim();
        kind.is_empty() || kind == "function"
    }
}

/// Arguments are an opaque string; this layer never parses them as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// One typed fragment of message content, independent of either wire vocabulary.
///
/// The per-shape encodings live in `translation::content`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text { text: String },
    Image(ImageRef),
    Audio(AudioRef),
    File(FileRef),
    Video(VideoRef),
    /// An unrecognized part type. Only the tag survives.
    Unknown { kind: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageRef {
    pub url: Option<String>,
    pub detail: Option<String>,
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioRef {
    pub data: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileRef {
    pub file_id: Option<String>,
    pub file_data: Option<String>,
    pub filename: Option<String>,
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoRef {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolChoice {
    /// One of `auto`, `none`, `required`.
    Mode(String),
    Function { name: String },
    /// A structural value with no single-function meaning; passed through.
    Other(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    InProgress,
    Completed,
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub image_tokens: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub audio_tokens: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompletionTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: u64,
}

/// Chat-shape usage: flat prompt/completion counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InputTokensDetails {
    #[serde(default)]
    pub cached_tokens: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub image_tokens: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub audio_tokens: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OutputTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: u64,
}

/// Responses-shape usage: input/output counts with nested details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResponsesUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens_details: Option<InputTokensDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens_details: Option<OutputTokensDetails>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}
