use serde_json::{Map, Value};

use crate::types::{
    ChatUsage, CompletionTokensDetails, InputTokensDetails, OutputTokensDetails,
    PromptTokensDetails, ResponsesUsage,
};

fn fill_total(total: u64, prompt: u64, completion: u64) -> u64 {
    if total == 0 {
        prompt.saturating_add(completion)
    } else {
        total
    }
}

/// Chat usage into the nested Responses form. `None` yields zeroed usage.
pub fn chat_to_responses(usage: Option<&ChatUsage>) -> ResponsesUsage {
    let Some(usage) = usage else {
        return ResponsesUsage::default();
    };
    ResponsesUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        total_tokens: fill_total(
            usage.total_tokens,
            usage.prompt_tokens,
            usage.completion_tokens,
        ),
        input_tokens_details: usage.prompt_tokens_details.map(|details| InputTokensDetails {
            cached_tokens: details.cached_tokens,
            image_tokens: details.image_tokens,
            audio_tokens: details.audio_tokens,
        }),
        output_tokens_details: usage
            .completion_tokens_details
            .map(|details| OutputTokensDetails {
                reasoning_tokens: details.reasoning_tokens,
            }),
    }
}

pub fn responses_to_chat(usage: &ResponsesUsage) -> ChatUsage {
    ChatUsage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: fill_total(usage.total_tokens, usage.input_tokens, usage.output_tokens),
        prompt_tokens_details: usage.input_tokens_details.map(|details| PromptTokensDetails {
            cached_tokens: details.cached_tokens,
            image_tokens: details.image_tokens,
            audio_tokens: details.audio_tokens,
        }),
        completion_tokens_details: usage
            .output_tokens_details
            .map(|details| CompletionTokensDetails {
                reasoning_tokens: details.reasoning_tokens,
            }),
    }
}

fn count(obj: &Map<String, Value>, key: &str) -> u64 {
    obj.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn details<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

/// Lenient parse of a Chat `usage` object. Wrongly typed counts read as zero.
pub fn parse_chat_usage(value: &Value) -> Option<ChatUsage> {
    let obj = value.as_object()?;
    Some(ChatUsage {
        prompt_tokens: count(obj, "prompt_tokens"),
        completion_tokens: count(obj, "completion_tokens"),
        total_tokens: count(obj, "total_tokens"),
        prompt_tokens_details: details(obj, "prompt_tokens_details").map(|d| {
            PromptTokensDetails {
                cached_tokens: count(d, "cached_tokens"),
                image_tokens: count(d, "image_tokens"),
                audio_tokens: count(d, "audio_tokens"),
            }
        }),
        completion_tokens_details: details(obj, "completion_tokens_details").map(|d| {
            CompletionTokensDetails {
                reasoning_tokens: count(d, "reasoning_tokens"),
            }
        }),
    })
}

/// Lenient parse of a Responses `usage` object.
pub fn parse_responses_usage(value: &Value) -> Option<ResponsesUsage> {
    let obj = value.as_object()?;
    Some(ResponsesUsage {
        input_tokens: count(obj, "input_tokens"),
        output_tokens: count(obj, "output_tokens"),
        total_tokens: count(obj, "total_tokens"),
        input_tokens_details: details(obj, "input_tokens_details").map(|d| InputTokensDetails {
            cached_tokens: count(d, "cached_tokens"),
            image_tokens: count(d, "image_tokens"),
            audio_tokens: count(d, "audio_tokens"),
        }),
        output_tokens_details: details(obj, "output_tokens_details").map(|d| {
            OutputTokensDetails {
                reasoning_tokens: count(d, "reasoning_tokens"),
            }
        }),
    })
}
