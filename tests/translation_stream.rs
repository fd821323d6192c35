use std::collections::HashSet;

use ditto_compat::types::ResponseSnapshot;
use ditto_compat::{
    Capabilities, ChatToResponsesStream, OutputItem, ResponseStatus, StreamConfig, StreamEvent,
};

fn state(response_id: &str) -> ChatToResponsesStream {
    ChatToResponsesStream::new(
        Some(response_id),
        0,
        "gpt-x",
        Capabilities::deterministic(1_700_000_000),
        StreamConfig::default(),
    )
}

fn run(mut state: ChatToResponsesStream, chunks: &[&str]) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(state.handle_chunk_json(chunk));
    }
    events.extend(state.finalize());
    events
}

fn completed(events: &[StreamEvent]) -> &ResponseSnapshot {
    match events.last() {
        Some(StreamEvent::Completed { response }) => response,
        other => panic!("expected response.completed last, got {other:?}"),
    }
}

/// Every item is added before its deltas, done after them, and never touched again.
fn assert_item_lifecycles(events: &[StreamEvent]) {
    let mut added = HashSet::new();
    let mut done = HashSet::new();
    for event in events {
        let Some(index) = event.output_index() else {
            continue;
        };
        match event {
            StreamEvent::OutputItemAdded { .. } => {
                assert!(added.insert(index), "output index {index} added twice");
            }
            StreamEvent::ReasoningSummaryTextDelta { .. } => {}
            StreamEvent::OutputItemDone { .. } => {
                assert!(added.contains(&index), "done before added at {index}");
                assert!(done.insert(index), "output index {index} done twice");
            }
            other => {
                assert!(added.contains(&index), "{} before added", other.kind());
                assert!(!done.contains(&index), "{} after done", other.kind());
            }
        }
    }
    assert_eq!(added, done);
}

#[test]
fn streamed_text_produces_full_lifecycle() {
    let events = run(
        state("chatcmpl-abc"),
        &[
            r#"{"id":"chatcmpl-abc","choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"}}]}"#,
            r#"{"id":"chatcmpl-abc","choices":[{"index":0,"delta":{"content":"lo"}}]}"#,
            r#"{"id":"chatcmpl-abc","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
        ],
    );

    let kinds: Vec<&str> = events.iter().map(StreamEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "response.created",
            "response.in_progress",
            "response.output_item.added",
            "response.content_part.added",
            "response.output_text.delta",
            "response.output_text.delta",
            "response.output_text.done",
            "response.content_part.done",
            "response.output_item.done",
            "response.completed",
        ]
    );
    assert!(events.iter().all(|event| event.response_id() == "resp_abc"));
    assert_item_lifecycles(&events);

    let response = completed(&events);
    assert_eq!(response.status, ResponseStatus::Completed);
    assert_eq!(response.output_text(), "Hello");
    assert_eq!(response.created_at, 1_700_000_000);
}

#[test]
fn interleaved_tool_calls_get_ascending_indices() {
    let events = run(
        state("resp_tools"),
        &[
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"alpha","arguments":"{\"a\":"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_2","type":"function","function":{"name":"beta","arguments":""}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"1}"}}]}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"function":{"arguments":"{}"}}]}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"tool_calls"}],"usage":{"prompt_tokens":4,"completion_tokens":6,"total_tokens":10}}"#,
        ],
    );
    assert_item_lifecycles(&events);

    let added: Vec<usize> = events
        .iter()
        .filter(|event| matches!(event, StreamEvent::OutputItemAdded { .. }))
        .filter_map(StreamEvent::output_index)
        .collect();
    assert_eq!(added, vec![0, 1]);

    let response = completed(&events);
    let calls: Vec<(&str, &str, &str)> = response
        .output
        .iter()
        .filter_map(|item| match item {
            OutputItem::FunctionCall {
                call_id,
                name,
                arguments,
                ..
            } => Some((call_id.as_str(), name.as_str(), arguments.as_str())),
            OutputItem::Message { .. } => None,
        })
        .collect();
    assert_eq!(
        calls,
        vec![("call_1", "alpha", "{\"a\":1}"), ("call_2", "beta", "{}")]
    );
    let usage = response.usage.expect("usage");
    assert_eq!(
        (usage.input_tokens, usage.output_tokens, usage.total_tokens),
        (4, 6, 10)
    );
}

#[test]
fn mixed_text_reasoning_and_tool_call_keep_invariants() {
    let events = run(
        state("chatcmpl-mix"),
        &[
            r#"{"choices":[{"delta":{"reasoning_content":"Need the weather."}}]}"#,
            r#"{"choices":[{"delta":{"content":"Let me check."}}]}"#,
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_w","function":{"name":"weather","arguments":"{}"}}]}}]}"#,
            "not json at all",
            r#"{"choices":[]}"#,
        ],
    );
    assert_item_lifecycles(&events);

    let reasoning: Vec<&StreamEvent> = events
        .iter()
        .filter(|event| event.kind() == "response.reasoning_summary_text.delta")
        .collect();
    assert_eq!(reasoning.len(), 1);
    assert_eq!(reasoning[0].item_id(), Some("rs_mix"));

    let response = completed(&events);
    assert_eq!(response.output.len(), 2);
    assert!(matches!(response.output[0], OutputItem::Message { .. }));
    assert!(matches!(response.output[1], OutputItem::FunctionCall { .. }));
    assert_eq!(response.output_text(), "Let me check.");
}

#[test]
fn empty_stream_still_completes() {
    let events = run(state("resp_empty"), &[]);
    let kinds: Vec<&str> = events.iter().map(StreamEvent::kind).collect();
    assert_eq!(
        kinds,
        vec!["response.created", "response.in_progress", "response.completed"]
    );
    let response = completed(&events);
    assert!(response.output.is_empty());
    assert_eq!(response.usage.map(|usage| usage.total_tokens), Some(0));
}
