//! Merging and splitting tool calls between the two shapes.
//!
//! Chat carries every call of a turn as a list on one assistant message;
//! Responses carries each call as a standalone item next to other items.

use serde_json::Value;

use crate::capability::Capabilities;
use crate::types::{ChatMessage, InputItem, ItemStatus, OutputItem, Role, ToolCall};

/// Function calls seen in a Responses input list that have not been attached
/// to an assistant message yet.
#[derive(Debug, Default)]
pub(crate) struct PendingToolCalls {
    calls: Vec<ToolCall>,
}

impl PendingToolCalls {
    pub(crate) fn push(&mut self, call_id: String, name: String, arguments: String) {
        self.calls.push(ToolCall::function(call_id, name, arguments));
    }

    /// Attaches every buffered call, in order, to one assistant message.
    ///
    /// The calls join an immediately preceding assistant message that has no
    /// calls of its own; otherwise a calls-only assistant message is pushed.
    pub(crate) fn flush_into(&mut self, messages: &mut Vec<ChatMessage>) {
        if self.calls.is_empty() {
            return;
        }
        let calls = std::mem::take(&mut self.calls);
        let joinable = messages
            .last()
            .is_some_and(|last| last.role == Role::Assistant && last.tool_calls().is_empty());
        if !joinable {
            messages.push(ChatMessage::assistant_tool_calls(calls));
        } else if let Some(last) = messages.last_mut() {
            last.tool_calls = Some(calls);
        }
    }
}

/// One `function_call` input item per tool call, in order.
pub(crate) fn tool_calls_to_input_items(calls: &[ToolCall]) -> Vec<InputItem> {
    calls
        .iter()
        .map(|call| InputItem::FunctionCall {
            call_id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
        })
        .collect()
}

/// Tool calls from the `function_call` items of a Responses `output` list.
///
/// Items with a blank name are skipped; `call_id` falls back to the item id.
pub(crate) fn collect_function_calls(output: &[Value]) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    for item in output {
        let Some(obj) = item.as_object() else {
            continue;
        };
        if obj.get("type").and_then(Value::as_str) != Some("function_call") {
            continue;
        }
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let call_id = obj
            .get("call_id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .or_else(|| obj.get("id").and_then(Value::as_str))
            .unwrap_or_default();
        let arguments = match obj.get("arguments") {
            Some(Value::String(arguments)) => arguments.clone(),
            None | Some(Value::Null) => String::new(),
            Some(other) => other.to_string(),
        };
        calls.push(ToolCall::function(call_id, name, arguments));
    }
    calls
}

/// Completed `function_call` output items for a Chat tool-call list.
///
/// Non-function calls and calls without an id have no Responses equivalent
/// and are dropped.
pub(crate) fn function_call_output_items(
    calls: &[ToolCall],
    caps: &Capabilities,
) -> Vec<OutputItem> {
    calls
        .iter()
        .filter(|call| call.is_function() && !call.id.trim().is_empty())
        .map(|call| OutputItem::FunctionCall {
            id: caps.prefixed_id("fc_"),
            call_id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
            status: ItemStatus::Completed,
        })
        .collect()
}
