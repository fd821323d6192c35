//! Complete request payloads, both directions.
//!
//! Input is an untyped `serde_json::Value` so that a single malformed optional
//! field can be skipped instead of rejecting the whole request.

use serde_json::{Map, Value};

use super::content::{chat_content_to_responses, responses_content_to_chat};
use super::tool_calls::{PendingToolCalls, tool_calls_to_input_items};
use crate::config::RequestConfig;
use crate::types::{
    ChatContent, ChatMessage, ChatRequest, ChatTool, FunctionDefinition, InputItem,
    ReasoningConfig, ResponseFormat, ResponsesRequest, Role, StreamOptions, ToolChoice,
};
use crate::{CompatError, Result};

fn skip_malformed(field: &'static str) {
    tracing::debug!(field, "skipping malformed request field");
}

fn required_model(obj: &Map<String, Value>) -> Result<String> {
    obj.get("model")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CompatError::invalid_input("model is required"))
}

fn present(obj: &Map<String, Value>, key: &str) -> Option<Value> {
    obj.get(key).filter(|value| !value.is_null()).cloned()
}

fn opt_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Reads an optional field that must have a specific JSON type. A value of
/// the wrong type is logged and dropped.
fn typed_field<T>(
    obj: &Map<String, Value>,
    key: &'static str,
    read: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let value = obj.get(key).filter(|value| !value.is_null())?;
    let parsed = read(value);
    if parsed.is_none() {
        skip_malformed(key);
    }
    parsed
}

fn effort_from(effort: Option<&str>) -> Option<String> {
    effort
        .map(str::trim)
        .filter(|effort| !effort.is_empty() && *effort != "none")
        .map(str::to_string)
}

/// Converts a Responses-shape request into a Chat-shape request.
pub fn responses_request_to_chat(request: &Value, config: &RequestConfig) -> Result<ChatRequest> {
    let obj = request
        .as_object()
        .ok_or_else(|| CompatError::invalid_input("request must be a JSON object"))?;
    let model = required_model(obj)?;

    let mut messages = Vec::new();
    if let Some(instructions) = obj
        .get("instructions")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
    {
        messages.push(ChatMessage::text(Role::System, instructions));
    }

    match obj.get("input") {
        Some(Value::String(text)) => messages.push(ChatMessage::text(Role::User, text.as_str())),
        Some(Value::Array(items)) => append_input_items(&mut messages, items),
        None | Some(Value::Null) => {}
        Some(_) => skip_malformed("input"),
    }

    if messages.is_empty() {
        return Err(CompatError::invalid_input(
            "no messages could be derived from input",
        ));
    }

    let mut out = ChatRequest::new(model, messages);
    out.temperature = obj.get("temperature").and_then(Value::as_f64);
    out.top_p = obj.get("top_p").and_then(Value::as_f64);
    out.max_completion_tokens = obj
        .get("max_output_tokens")
        .and_then(Value::as_u64)
        .filter(|tokens| *tokens > 0);
    out.user = opt_str(obj, "user");
    out.store = obj.get("store").and_then(Value::as_bool);
    out.metadata = present(obj, "metadata");
    out.service_tier = opt_str(obj, "service_tier");
    out.prompt_cache_retention = present(obj, "prompt_cache_retention");
    out.prompt_cache_key = typed_field(obj, "prompt_cache_key", |v| v.as_str().map(str::to_string));
    out.parallel_tool_calls = typed_field(obj, "parallel_tool_calls", Value::as_bool);
    out.reasoning_effort = effort_from(
        obj.get("reasoning")
            .and_then(|reasoning| reasoning.get("effort"))
            .and_then(Value::as_str),
    );

    out.stream = obj.get("stream").and_then(Value::as_bool);
    if out.stream == Some(true) && config.include_stream_usage {
        out.stream_options = Some(StreamOptions {
            include_usage: true,
        });
    }

    out.tools = typed_field(obj, "tools", |v| v.as_array().map(|tools| responses_tools_to_chat(tools)));
    out.tool_choice = typed_field(obj, "tool_choice", |v| {
        ToolChoice::from_responses_value(v).map(|choice| choice.to_chat_value())
    });
    out.response_format = typed_field(obj, "text", responses_text_to_response_format);

    Ok(out)
}

fn append_input_items(messages: &mut Vec<ChatMessage>, items: &[Value]) {
    let mut pending = PendingToolCalls::default();
    for raw in items {
        let Some(item) = InputItem::from_value(raw) else {
            skip_malformed("input");
            continue;
        };
        match item {
            InputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => pending.push(call_id, name, arguments),
            InputItem::FunctionCallOutput { call_id, output } => {
                pending.flush_into(messages);
                messages.push(ChatMessage::tool_result(call_id, output));
            }
            InputItem::Message { role, content } => {
                pending.flush_into(messages);
                let role = if role == Role::Developer {
                    Role::System
                } else {
                    role
                };
                let mut message = ChatMessage::new(role, responses_content_to_chat(&content));
                if content.is_null() {
                    message.content = None;
                }
                messages.push(message);
            }
            InputItem::Other { kind, content } => {
                pending.flush_into(messages);
                match content {
                    Some(content) => messages.push(ChatMessage::new(
                        Role::User,
                        responses_content_to_chat(&content),
                    )),
                    None => tracing::debug!(kind = ?kind, "dropping input item without content"),
                }
            }
        }
    }
    pending.flush_into(messages);
}

/// Flat Responses tool definitions into Chat tools. Untyped entries are dropped.
fn responses_tools_to_chat(tools: &[Value]) -> Vec<ChatTool> {
    let mut out = Vec::with_capacity(tools.len());
    for tool in tools {
        let Some(obj) = tool.as_object() else {
            skip_malformed("tools");
            continue;
        };
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if kind.is_empty() {
            skip_malformed("tools");
            continue;
        }
        if kind != "function" {
            out.push(ChatTool::Custom {
                kind: kind.to_string(),
                blob: tool.clone(),
            });
            continue;
        }
        let source = obj.get("function").and_then(Value::as_object).unwrap_or(obj);
        out.push(ChatTool::Function(FunctionDefinition {
            name: opt_str(source, "name").unwrap_or_default(),
            description: opt_str(source, "description"),
            parameters: present(source, "parameters"),
            strict: source.get("strict").and_then(Value::as_bool),
        }));
    }
    out
}

impl ToolChoice {
    fn from_value_with(
        value: &Value,
        function_name: impl FnOnce(&Map<String, Value>) -> Option<&Value>,
    ) -> Option<Self> {
        match value {
            Value::String(mode) => Some(Self::Mode(mode.clone())),
            Value::Object(obj) => {
                let name = function_name(obj)
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty());
                match name {
                    Some(name) if obj.get("type").and_then(Value::as_str) == Some("function") => {
                        Some(Self::Function {
                            name: name.to_string(),
                        })
                    }
                    _ => Some(Self::Other(value.clone())),
                }
            }
            _ => None,
        }
    }

    /// Chat nests the forced function: `{"type":"function","function":{"name":..}}`.
    pub fn from_chat_value(value: &Value) -> Option<Self> {
        Self::from_value_with(value, |obj| {
            obj.get("function").and_then(|function| function.get("name"))
        })
    }

    /// Responses keeps it flat: `{"type":"function","name":..}`.
    pub fn from_responses_value(value: &Value) -> Option<Self> {
        Self::from_value_with(value, |obj| obj.get("name"))
    }

    pub fn to_chat_value(&self) -> Value {
        match self {
            Self::Mode(mode) => Value::String(mode.clone()),
            Self::Function { name } => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            }),
            Self::Other(value) => value.clone(),
        }
    }

    pub fn to_responses_value(&self) -> Value {
        match self {
            Self::Mode(mode) => Value::String(mode.clone()),
            Self::Function { name } => serde_json::json!({ "type": "function", "name": name }),
            Self::Other(value) => value.clone(),
        }
    }
}

/// `text.format` into `response_format`. For `json_schema`, every sibling of
/// the `type` discriminator becomes part of the rebuilt schema object.
fn responses_text_to_response_format(text: &Value) -> Option<ResponseFormat> {
    let format = text.get("format")?.as_object()?;
    let kind = format
        .get("type")
        .and_then(Value::as_str)
        .filter(|kind| !kind.is_empty())?;
    let mut response_format = ResponseFormat {
        kind: kind.to_string(),
        json_schema: None,
    };
    if kind == "json_schema" {
        let schema: Map<String, Value> = format
            .iter()
            .filter(|(key, _)| key.as_str() != "type")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if !schema.is_empty() {
            response_format.json_schema = Some(Value::Object(schema));
        }
    }
    Some(response_format)
}

/// Converts a Chat-shape request into a Responses-shape request.
pub fn chat_request_to_responses(request: &Value) -> Result<ResponsesRequest> {
    let obj = request
        .as_object()
        .ok_or_else(|| CompatError::invalid_input("request must be a JSON object"))?;
    let model = required_model(obj)?;
    let raw_messages = obj
        .get("messages")
        .and_then(Value::as_array)
        .filter(|messages| !messages.is_empty())
        .ok_or_else(|| CompatError::invalid_input("messages must be a non-empty list"))?;

    let mut messages = Vec::with_capacity(raw_messages.len());
    for raw in raw_messages {
        match serde_json::from_value::<ChatMessage>(raw.clone()) {
            Ok(message) => messages.push(message),
            Err(err) => tracing::debug!(error = %err, "skipping malformed chat message"),
        }
    }

    let mut instructions = None;
    let mut rest = messages.as_slice();
    if let Some((first, tail)) = messages.split_first() {
        let leading_system = matches!(first.role, Role::System | Role::Developer);
        if let (true, Some(ChatContent::Text(text))) = (leading_system, first.content.as_ref()) {
            instructions = Some(text.clone());
            rest = tail;
        }
    }

    let mut input = Vec::with_capacity(rest.len());
    for message in rest {
        append_chat_message(&mut input, message);
    }

    let mut out = ResponsesRequest::new(model, input);
    out.instructions = instructions;
    out.temperature = obj.get("temperature").and_then(Value::as_f64);
    out.top_p = obj.get("top_p").and_then(Value::as_f64);
    out.max_output_tokens = obj
        .get("max_completion_tokens")
        .and_then(Value::as_u64)
        .or_else(|| obj.get("max_tokens").and_then(Value::as_u64))
        .filter(|tokens| *tokens > 0);
    out.stream = obj.get("stream").and_then(Value::as_bool);
    out.user = opt_str(obj, "user");
    out.store = obj.get("store").and_then(Value::as_bool);
    out.metadata = present(obj, "metadata");
    out.service_tier = opt_str(obj, "service_tier");
    out.prompt_cache_retention = present(obj, "prompt_cache_retention");
    out.prompt_cache_key = typed_field(obj, "prompt_cache_key", |v| v.as_str().map(str::to_string));
    out.parallel_tool_calls = typed_field(obj, "parallel_tool_calls", Value::as_bool);
    out.reasoning = effort_from(obj.get("reasoning_effort").and_then(Value::as_str)).map(
        |effort| ReasoningConfig {
            effort: Some(effort),
            summary: None,
        },
    );
    out.tools = typed_field(obj, "tools", |v| v.as_array().map(|tools| chat_tools_to_responses(tools)));
    out.tool_choice = typed_field(obj, "tool_choice", |v| {
        ToolChoice::from_chat_value(v).map(|choice| choice.to_responses_value())
    });
    out.text = typed_field(obj, "response_format", response_format_to_responses_text);

    Ok(out)
}

fn append_chat_message(input: &mut Vec<InputItem>, message: &ChatMessage) {
    match message.role {
        Role::Tool => input.push(InputItem::FunctionCallOutput {
            call_id: message.tool_call_id.clone().unwrap_or_default(),
            output: message.text_content(),
        }),
        Role::Assistant if !message.tool_calls().is_empty() => {
            if !message.text_content().is_empty() {
                let content = message.content.clone().unwrap_or_default();
                input.push(InputItem::Message {
                    role: Role::Assistant,
                    content: chat_content_to_responses(&content, Role::Assistant),
                });
            }
            input.extend(tool_calls_to_input_items(message.tool_calls()));
        }
        role => {
            let content = message.content.clone().unwrap_or_default();
            input.push(InputItem::Message {
                role,
                content: chat_content_to_responses(&content, role),
            });
        }
    }
}

fn chat_tools_to_responses(tools: &[Value]) -> Vec<Value> {
    let mut out = Vec::with_capacity(tools.len());
    for tool in tools {
        match ChatTool::from_value(tool) {
            Some(ChatTool::Function(function)) => {
                let mut flat = Map::new();
                flat.insert("type".to_string(), Value::String("function".to_string()));
                flat.insert("name".to_string(), Value::String(function.name));
                if let Some(description) = function.description {
                    flat.insert("description".to_string(), Value::String(description));
                }
                if let Some(parameters) = function.parameters {
                    flat.insert("parameters".to_string(), parameters);
                }
                if let Some(strict) = function.strict {
                    flat.insert("strict".to_string(), Value::Bool(strict));
                }
                out.push(Value::Object(flat));
            }
            Some(custom @ ChatTool::Custom { .. }) => out.push(custom.to_value()),
            None => skip_malformed("tools"),
        }
    }
    out
}

fn response_format_to_responses_text(value: &Value) -> Option<Value> {
    let obj = value.as_object()?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .filter(|kind| !kind.is_empty())?;
    let mut format = Map::new();
    format.insert("type".to_string(), Value::String(kind.to_string()));
    if let Some(schema) = obj.get("json_schema").and_then(Value::as_object) {
        for (key, value) in schema {
            format.insert(key.clone(), value.clone());
        }
    }
    Some(serde_json::json!({ "format": Value::Object(format) }))
}
