#![cfg(feature = "streaming")]

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use serde_json::Value;

use ditto_compat::translation::chat_sse_to_responses_sse;
use ditto_compat::utils::sse::{SseLimits, sse_data_stream_from_bytes};
use ditto_compat::{Capabilities, CompatConfig, Translator};

fn parse_frame(frame: &str) -> (String, Value) {
    let mut event = None;
    let mut data = None;
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event: ") {
            event = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("data: ") {
            data = Some(serde_json::from_str(rest).expect("frame json"));
        }
    }
    (event.expect("event line"), data.expect("data line"))
}

#[tokio::test]
async fn chat_sse_bytes_become_responses_sse() {
    // Split mid-line to exercise reassembly across body chunks.
    let body = [
        ": keep-alive\n\n",
        "data: {\"id\":\"chatcmpl-s1\",\"model\":\"gpt-x\",\"created\":77,",
        "\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi \"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"there\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_9\",\"function\":{\"name\":\"f\",\"arguments\":\"{}\"}}]}}]}\n\n",
        "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":2}}\n\n",
        "data: [DONE]\n\n",
    ];
    let bytes = stream::iter(
        body.into_iter()
            .map(|chunk| Ok::<_, std::io::Error>(Bytes::from(chunk))),
    );

    let translator = Translator::new(Capabilities::deterministic(1), CompatConfig::default());
    let state = translator.chat_stream(Some("chatcmpl-s1"), "");
    let frames: Vec<Bytes> = chat_sse_to_responses_sse(
        sse_data_stream_from_bytes(bytes, SseLimits::default()),
        state,
    )
    .map(|frame| frame.expect("frame"))
    .collect()
    .await;

    let parsed: Vec<(String, Value)> = frames
        .iter()
        .map(|frame| parse_frame(std::str::from_utf8(frame).expect("utf8")))
        .collect();
    let names: Vec<&str> = parsed.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "response.created",
            "response.in_progress",
            "response.output_item.added",
            "response.content_part.added",
            "response.output_text.delta",
            "response.output_text.delta",
            "response.output_item.added",
            "response.function_call_arguments.delta",
            "response.output_text.done",
            "response.content_part.done",
            "response.output_item.done",
            "response.function_call_arguments.done",
            "response.output_item.done",
            "response.completed",
        ]
    );
    for (name, data) in &parsed {
        assert_eq!(data["type"], name.as_str());
    }

    let (_, completed) = parsed.last().expect("completed frame");
    let response = &completed["response"];
    assert_eq!(response["id"], "resp_s1");
    assert_eq!(response["model"], "gpt-x");
    assert_eq!(response["created_at"], 77);
    assert_eq!(response["status"], "completed");
    assert_eq!(response["output"][0]["content"][0]["text"], "Hi there");
    assert_eq!(response["output"][1]["call_id"], "call_9");
    assert_eq!(response["usage"]["total_tokens"], 5);
}

#[tokio::test]
async fn oversized_event_surfaces_as_error() {
    let bytes = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(format!(
        "data: {}\n\n",
        "x".repeat(64)
    )))]);
    let limits = SseLimits {
        max_line_bytes: 32,
        max_event_bytes: 32,
    };
    let translator = Translator::new(Capabilities::deterministic(1), CompatConfig::default());
    let out: Vec<_> = chat_sse_to_responses_sse(
        sse_data_stream_from_bytes(bytes, limits),
        translator.chat_stream(None, "m"),
    )
    .collect()
    .await;
    assert_eq!(out.len(), 1);
    assert!(out[0].is_err());
}
