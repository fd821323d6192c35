use serde_json::Value;

use super::tool_calls::{collect_function_calls, function_call_output_items};
use super::usage::{chat_to_responses, parse_chat_usage, parse_responses_usage, responses_to_chat};
use crate::capability::Capabilities;
use crate::types::{
    ChatChoice, ChatContent, ChatMessage, ChatResponse, ItemStatus, OutputContent, OutputItem,
    ResponseStatus, ResponsesResponse, Role, ToolCall,
};
use crate::{CompatError, Result};

/// Maps a Chat finish reason onto a Responses status and `incomplete_details`.
pub(crate) fn finish_reason_to_status(finish_reason: Option<&str>) -> (ResponseStatus, Option<Value>) {
    match finish_reason {
        Some("length") => (
            ResponseStatus::Incomplete,
            Some(serde_json::json!({ "reason": "max_output_tokens" })),
        ),
        Some("content_filter") => (
            ResponseStatus::Incomplete,
            Some(serde_json::json!({ "reason": "content_filter" })),
        ),
        _ => (ResponseStatus::Completed, None),
    }
}

/// Converts a complete Chat response into a Responses response.
///
/// `model` overrides the model named in the payload when non-empty. The
/// response id and `created_at` come from `caps`.
pub fn chat_response_to_responses(
    response: &Value,
    model: Option<&str>,
    caps: &Capabilities,
) -> Result<ResponsesResponse> {
    let obj = response
        .as_object()
        .ok_or_else(|| CompatError::invalid_input("response must be a JSON object"))?;

    let model = model
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .or_else(|| obj.get("model").and_then(Value::as_str))
        .unwrap_or_default();

    let choice = obj
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first());
    let message = choice.and_then(|choice| choice.get("message"));
    let finish_reason = choice
        .and_then(|choice| choice.get("finish_reason"))
        .and_then(Value::as_str);

    let (status, incomplete_details) = finish_reason_to_status(finish_reason);
    let mut out = ResponsesResponse::new(
        caps.prefixed_id("resp_"),
        caps.clock.now_epoch_seconds(),
        model,
        status,
    );
    out.incomplete_details = incomplete_details;

    if let Some(text) = message
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
    {
        out.output.push(OutputItem::Message {
            id: caps.prefixed_id("msg_"),
            status: ItemStatus::Completed,
            role: Role::Assistant,
            content: vec![OutputContent::output_text(text)],
        });
    }

    let tool_calls: Vec<ToolCall> = message
        .and_then(|message| message.get("tool_calls"))
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| serde_json::from_value::<ToolCall>(call.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    out.output
        .extend(function_call_output_items(&tool_calls, caps));

    let usage = obj.get("usage").and_then(parse_chat_usage);
    out.usage = Some(chat_to_responses(usage.as_ref()));

    Ok(out)
}

/// Converts a complete Responses response into a Chat response with id `id`.
pub fn responses_response_to_chat(response: &Value, id: &str) -> Result<ChatResponse> {
    let obj = response
        .as_object()
        .ok_or_else(|| CompatError::invalid_input("response must be a JSON object"))?;

    let output: &[Value] = obj
        .get("output")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let text = extract_output_text(output);
    let tool_calls = collect_function_calls(output);
    let finish_reason = if tool_calls.is_empty() {
        "stop"
    } else {
        "tool_calls"
    };

    let mut message = ChatMessage::new(Role::Assistant, ChatContent::Text(text));
    if !tool_calls.is_empty() {
        message.tool_calls = Some(tool_calls);
    }

    let usage = obj
        .get("usage")
        .and_then(parse_responses_usage)
        .unwrap_or_default();

    Ok(ChatResponse {
        id: id.to_string(),
        object: "chat.completion".to_string(),
        created: obj.get("created_at").and_then(Value::as_u64).unwrap_or(0),
        model: obj
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message,
            finish_reason: Some(finish_reason.to_string()),
        }],
        usage: Some(responses_to_chat(&usage)),
    })
}

/// Assistant-authored `output_text` of a Responses `output` list.
///
/// Falls back to every text part of every item when no assistant text exists.
pub fn extract_output_text(output: &[Value]) -> String {
    let content_parts = |item: &Value| -> Vec<Value> {
        item.get("content")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };
    let part_text = |part: &Value| -> Option<String> {
        part.get("text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };

    let mut preferred = String::new();
    for item in output {
        if item.get("type").and_then(Value::as_str) != Some("message") {
            continue;
        }
        let role = item
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !role.is_empty() && role != "assistant" {
            continue;
        }
        for part in content_parts(item) {
            if part.get("type").and_then(Value::as_str) == Some("output_text") {
                preferred.extend(part_text(&part));
            }
        }
    }
    if !preferred.is_empty() {
        return preferred;
    }

    let mut fallback = String::new();
    for item in output {
        for part in content_parts(item) {
            fallback.extend(part_text(&part));
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_text_becomes_single_message_item() -> Result<()> {
        let caps = Capabilities::deterministic(1_700_000_000);
        let out = chat_response_to_responses(
            &json!({
                "id": "chatcmpl-1",
                "model": "gpt-x",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 1}
            }),
            None,
            &caps,
        )?;
        let value = serde_json::to_value(&out)?;
        assert_eq!(value["id"], "resp_1");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["created_at"], 1_700_000_000);
        assert_eq!(value["model"], "gpt-x");
        assert_eq!(
            value["output"],
            json!([{
                "type": "message",
                "id": "msg_2",
                "status": "completed",
                "role": "assistant",
                "content": [{"type": "output_text", "text": "hi", "annotations": []}]
            }])
        );
        assert_eq!(value["usage"]["total_tokens"], 4);
        Ok(())
    }

    #[test]
    fn length_finish_marks_response_incomplete() -> Result<()> {
        let caps = Capabilities::deterministic(0);
        let out = chat_response_to_responses(
            &json!({"model": "m", "choices": [{"message": {"content": "trunc"}, "finish_reason": "length"}]}),
            Some("override"),
            &caps,
        )?;
        assert_eq!(out.status, ResponseStatus::Incomplete);
        assert_eq!(
            out.incomplete_details,
            Some(json!({"reason": "max_output_tokens"}))
        );
        assert_eq!(out.model, "override");
        Ok(())
    }

    #[test]
    fn tool_calls_follow_message_and_skip_unusable_entries() -> Result<()> {
        let caps = Capabilities::deterministic(0);
        let out = chat_response_to_responses(
            &json!({
                "choices": [{"message": {
                    "content": null,
                    "tool_calls": [
                        {"id": "c1", "type": "function", "function": {"name": "a", "arguments": "{}"}},
                        {"id": " ", "type": "function", "function": {"name": "b", "arguments": "{}"}},
                        {"id": "c3", "type": "custom", "function": {"name": "c", "arguments": "{}"}}
                    ]
                }, "finish_reason": "tool_calls"}]
            }),
            None,
            &caps,
        )?;
        assert_eq!(out.output.len(), 1);
        assert!(
            matches!(&out.output[0], OutputItem::FunctionCall { call_id, name, .. } if call_id == "c1" && name == "a")
        );
        Ok(())
    }

    #[test]
    fn responses_output_becomes_assistant_message_with_tool_calls() -> Result<()> {
        let chat = responses_response_to_chat(
            &json!({
                "id": "resp_1",
                "created_at": 77,
                "model": "gpt-x",
                "output": [
                    {"type": "reasoning", "summary": []},
                    {"type": "message", "role": "assistant", "content": [{"type": "output_text", "text": "Let me check."}]},
                    {"type": "function_call", "id": "fc_1", "call_id": "c1", "name": "lookup", "arguments": "{\"q\":1}"}
                ],
                "usage": {"input_tokens": 5, "output_tokens": 7, "output_tokens_details": {"reasoning_tokens": 2}}
            }),
            "chatcmpl-abc",
        )?;
        assert_eq!(chat.id, "chatcmpl-abc");
        assert_eq!(chat.created, 77);
        assert_eq!(chat.model, "gpt-x");
        let choice = &chat.choices[0];
        assert_eq!(choice.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(choice.message.text_content(), "Let me check.");
        assert_eq!(
            choice.message.tool_calls(),
            &[ToolCall::function("c1", "lookup", "{\"q\":1}")]
        );
        let usage = chat.usage.expect("usage");
        assert_eq!(usage.total_tokens, 12);
        assert_eq!(usage.completion_tokens_details.map(|d| d.reasoning_tokens), Some(2));
        Ok(())
    }

    #[test]
    fn text_extraction_prefers_assistant_then_falls_back() {
        let output = vec![
            json!({"type": "message", "role": "user", "content": [{"type": "output_text", "text": "echo"}]}),
            json!({"type": "message", "content": [{"type": "output_text", "text": "A"}, {"type": "refusal", "text": "x"}]}),
            json!({"type": "message", "role": "assistant", "content": [{"type": "output_text", "text": "B"}]}),
        ];
        assert_eq!(extract_output_text(&output), "AB");

        let odd = vec![json!({"type": "note", "content": [{"type": "text", "text": "fallback"}]})];
        assert_eq!(extract_output_text(&odd), "fallback");
    }
}
