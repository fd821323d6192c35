use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ItemStatus, ResponsesUsage, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReasoningConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Vec<InputItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_cache_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_cache_retention: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_tier: Option<String>,
}

impl ResponsesRequest {
    pub fn new(model: impl Into<String>, input: Vec<InputItem>) -> Self {
        Self {
            model: model.into(),
            input,
            instructions: None,
            max_output_tokens: None,
            temperature: None,
            top_p: None,
            stream: None,
            tools: None,
            tool_choice: None,
            parallel_tool_calls: None,
            reasoning: None,
            text: None,
            user: None,
            store: None,
            metadata: None,
            prompt_cache_key: None,
            prompt_cache_retention: None,
            service_tier: None,
        }
    }
}

/// One entry of a Responses `input` list.
#[derive(Debug, Clone, PartialEq)]
pub enum InputItem {
    /// `content` is already in the Responses content vocabulary (string or parts).
    Message {
        role: Role,
        content: Value,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
    /// Anything else. Kept so callers can apply best-effort handling.
    Other {
        kind: Option<String>,
        content: Option<Value>,
    },
}

impl InputItem {
    /// Classifies a raw input entry. Non-object, non-string entries yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = match value {
            Value::String(text) => {
                return Some(Self::Message {
                    role: Role::User,
                    content: Value::String(text.clone()),
                });
            }
            Value::Object(obj) => obj,
            _ => return None,
        };

        let kind = obj.get("type").and_then(Value::as_str).map(str::trim);
        let string_field = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        match kind {
            Some("function_call") => {
                return Some(Self::FunctionCall {
                    call_id: string_field("call_id"),
                    name: string_field("name"),
                    arguments: string_field("arguments"),
                });
            }
            Some("function_call_output") => {
                let output = match obj.get("output") {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(text)) => text.clone(),
                    Some(other) => other.to_string(),
                };
                return Some(Self::FunctionCallOutput {
                    call_id: string_field("call_id"),
                    output,
                });
            }
            _ => {}
        }

        let role = obj
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse)
            .filter(|role| *role != Role::Tool);
        if let Some(role) = role {
            return Some(Self::Message {
                role,
                content: obj.get("content").cloned().unwrap_or(Value::Null),
            });
        }

        Some(Self::Other {
            kind: kind.map(str::to_string),
            content: obj.get("content").cloned(),
        })
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Message { role, content } => serde_json::json!({
                "type": "message",
                "role": role,
                "content": content,
            }),
            Self::FunctionCall {
                call_id,
                name,
                arguments,
            } => serde_json::json!({
                "type": "function_call",
                "call_id": call_id,
                "name": name,
                "arguments": arguments,
            }),
            Self::FunctionCallOutput { call_id, output } => serde_json::json!({
                "type": "function_call_output",
                "call_id": call_id,
                "output": output,
            }),
            Self::Other { kind, content } => {
                let mut obj = Map::new();
                if let Some(kind) = kind {
                    obj.insert("type".to_string(), Value::String(kind.clone()));
                }
                if let Some(content) = content {
                    obj.insert("content".to_string(), content.clone());
                }
                Value::Object(obj)
            }
        }
    }
}

impl Serialize for InputItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InputItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("input item must be an object or a string"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub annotations: Vec<Value>,
}

impl OutputContent {
    pub fn output_text(text: impl Into<String>) -> Self {
        Self {
            kind: "output_text".to_string(),
            text: text.into(),
            annotations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        id: String,
        status: ItemStatus,
        role: Role,
        content: Vec<OutputContent>,
    },
    FunctionCall {
        id: String,
        call_id: String,
        name: String,
        arguments: String,
        status: ItemStatus,
    },
}

impl OutputItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Message { id, .. } | Self::FunctionCall { id, .. } => id,
        }
    }

    pub fn status(&self) -> ItemStatus {
        match self {
            Self::Message { status, .. } | Self::FunctionCall { status, .. } => *status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    #[default]
    InProgress,
    Completed,
    Incomplete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsesResponse {
    pub id: String,
    pub object: String,
    pub created_at: u64,
    pub status: ResponseStatus,
    pub model: String,
    pub output: Vec<OutputItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<ResponsesUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete_details: Option<Value>,
}

impl ResponsesResponse {
    pub fn new(
        id: impl Into<String>,
        created_at: u64,
        model: impl Into<String>,
        status: ResponseStatus,
    ) -> Self {
        Self {
            id: id.into(),
            object: "response".to_string(),
            created_at,
            status,
            model: model.into(),
            output: Vec::new(),
            usage: None,
            incomplete_details: None,
        }
    }

    /// Concatenated `output_text` of all assistant message items.
    pub fn output_text(&self) -> String {
        let mut out = String::new();
        for item in &self.output {
            if let OutputItem::Message { role, content, .. } = item {
                if *role != Role::Assistant {
                    continue;
                }
                for part in content {
                    if part.kind == "output_text" {
                        out.push_str(&part.text);
                    }
                }
            }
        }
        out
    }
}

/// The response snapshot carried by `response.created`/`in_progress`/`completed`.
pub type ResponseSnapshot = ResponsesResponse;

/// A Responses-shape streaming lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "response.created")]
    Created { response: Box<ResponseSnapshot> },
    #[serde(rename = "response.in_progress")]
    InProgress { response: Box<ResponseSnapshot> },
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        response_id: String,
        output_index: usize,
        item: OutputItem,
    },
    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {
        response_id: String,
        item_id: String,
        output_index: usize,
        content_index: usize,
        part: OutputContent,
    },
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        response_id: String,
        item_id: String,
        output_index: usize,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.reasoning_summary_text.delta")]
    ReasoningSummaryTextDelta {
        response_id: String,
        item_id: String,
        output_index: usize,
        summary_index: usize,
        delta: String,
    },
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {
        response_id: String,
        item_id: String,
        output_index: usize,
        delta: String,
    },
    #[serde(rename = "response.output_text.done")]
    OutputTextDone {
        response_id: String,
        item_id: String,
        output_index: usize,
        content_index: usize,
        text: String,
    },
    #[serde(rename = "response.content_part.done")]
    ContentPartDone {
        response_id: String,
        item_id: String,
        output_index: usize,
        content_index: usize,
        part: OutputContent,
    },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        response_id: String,
        item_id: String,
        output_index: usize,
        arguments: String,
    },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        response_id: String,
        output_index: usize,
        item: OutputItem,
    },
    #[serde(rename = "response.completed")]
    Completed { response: Box<ResponseSnapshot> },
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "response.created",
            Self::InProgress { .. } => "response.in_progress",
            Self::OutputItemAdded { .. } => "response.output_item.added",
            Self::ContentPartAdded { .. } => "response.content_part.added",
            Self::OutputTextDelta { .. } => "response.output_text.delta",
            Self::ReasoningSummaryTextDelta { .. } => "response.reasoning_summary_text.delta",
            Self::FunctionCallArgumentsDelta { .. } => "response.function_call_arguments.delta",
            Self::OutputTextDone { .. } => "response.output_text.done",
            Self::ContentPartDone { .. } => "response.content_part.done",
            Self::FunctionCallArgumentsDone { .. } => "response.function_call_arguments.done",
            Self::OutputItemDone { .. } => "response.output_item.done",
            Self::Completed { .. } => "response.completed",
        }
    }

    pub fn response_id(&self) -> &str {
        match self {
            Self::Created { response }
            | Self::InProgress { response }
            | Self::Completed { response } => &response.id,
            Self::OutputItemAdded { response_id, .. }
            | Self::ContentPartAdded { response_id, .. }
            | Self::OutputTextDelta { response_id, .. }
            | Self::ReasoningSummaryTextDelta { response_id, .. }
            | Self::FunctionCallArgumentsDelta { response_id, .. }
            | Self::OutputTextDone { response_id, .. }
            | Self::ContentPartDone { response_id, .. }
            | Self::FunctionCallArgumentsDone { response_id, .. }
            | Self::OutputItemDone { response_id, .. } => response_id,
        }
    }

    /// The item this event belongs to, if any.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::Created { .. } | Self::InProgress { .. } | Self::Completed { .. } => None,
            Self::OutputItemAdded { item, .. } | Self::OutputItemDone { item, .. } => {
                Some(item.id())
            }
            Self::ContentPartAdded { item_id, .. }
            | Self::OutputTextDelta { item_id, .. }
            | Self::ReasoningSummaryTextDelta { item_id, .. }
            | Self::FunctionCallArgumentsDelta { item_id, .. }
            | Self::OutputTextDone { item_id, .. }
            | Self::ContentPartDone { item_id, .. }
            | Self::FunctionCallArgumentsDone { item_id, .. } => Some(item_id),
        }
    }

    pub fn output_index(&self) -> Option<usize> {
        match self {
            Self::Created { .. } | Self::InProgress { .. } | Self::Completed { .. } => None,
            Self::OutputItemAdded { output_index, .. }
            | Self::ContentPartAdded { output_index, .. }
            | Self::OutputTextDelta { output_index, .. }
            | Self::ReasoningSummaryTextDelta { output_index, .. }
            | Self::FunctionCallArgumentsDelta { output_index, .. }
            | Self::OutputTextDone { output_index, .. }
            | Self::ContentPartDone { output_index, .. }
            | Self::FunctionCallArgumentsDone { output_index, .. }
            | Self::OutputItemDone { output_index, .. } => Some(*output_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_item_classifies_by_type_then_role() {
        let call = InputItem::from_value(&json!({
            "type": "function_call", "call_id": "c1", "name": "f", "arguments": "{}"
        }));
        assert!(matches!(call, Some(InputItem::FunctionCall { ref call_id, .. }) if call_id == "c1"));

        let output = InputItem::from_value(&json!({
            "type": "function_call_output", "call_id": "c1", "output": {"ok": true}
        }));
        assert_eq!(
            output,
            Some(InputItem::FunctionCallOutput {
                call_id: "c1".to_string(),
                output: "{\"ok\":true}".to_string(),
            })
        );

        let message = InputItem::from_value(&json!({"type": "message", "role": "developer", "content": "x"}));
        assert!(matches!(message, Some(InputItem::Message { role: Role::Developer, .. })));

        let other = InputItem::from_value(&json!({"type": "item_reference", "id": "r1"}));
        assert_eq!(
            other,
            Some(InputItem::Other {
                kind: Some("item_reference".to_string()),
                content: None,
            })
        );

        assert_eq!(InputItem::from_value(&json!(42)), None);
    }

    #[test]
    fn stream_event_serializes_dotted_type_tag() -> crate::Result<()> {
        let event = StreamEvent::OutputTextDelta {
            response_id: "resp_1".to_string(),
            item_id: "msg_1".to_string(),
            output_index: 0,
            content_index: 0,
            delta: "Hel".to_string(),
        };
        let value = serde_json::to_value(&event)?;
        assert_eq!(value["type"], "response.output_text.delta");
        assert_eq!(value["delta"], "Hel");
        assert_eq!(event.kind(), "response.output_text.delta");

        let back: StreamEvent = serde_json::from_value(value)?;
        assert_eq!(back, event);
        Ok(())
    }

    #[test]
    fn output_item_uses_snake_case_type_tag() -> crate::Result<()> {
        let item = OutputItem::FunctionCall {
            id: "fc_1".to_string(),
            call_id: "call_1".to_string(),
            name: "lookup".to_string(),
            arguments: "{}".to_string(),
            status: ItemStatus::Completed,
        };
        let value = serde_json::to_value(&item)?;
        assert_eq!(value["type"], "function_call");
        assert_eq!(value["status"], "completed");
        Ok(())
    }
}
