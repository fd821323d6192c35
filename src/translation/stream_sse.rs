//! Async glue between a Chat SSE frame stream and Responses SSE bytes.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};

use super::stream::ChatToResponsesStream;
use crate::types::StreamEvent;
use crate::utils::sse::DONE_SENTINEL;
use crate::Result;

/// Encodes one event as `event: <kind>\ndata: <json>\n\n`.
pub fn event_to_sse_bytes(event: &StreamEvent) -> Result<Bytes> {
    let json = serde_json::to_vec(event)?;
    let kind = event.kind();
    let mut out = BytesMut::with_capacity(7 + kind.len() + 7 + json.len() + 2);
    out.extend_from_slice(b"event: ");
    out.extend_from_slice(kind.as_bytes());
    out.extend_from_slice(b"\ndata: ");
    out.extend_from_slice(&json);
    out.extend_from_slice(b"\n\n");
    Ok(out.freeze())
}

fn encode_into(
    buffer: &mut VecDeque<std::result::Result<Bytes, std::io::Error>>,
    events: Vec<StreamEvent>,
) {
    for event in events {
        buffer.push_back(event_to_sse_bytes(&event).map_err(std::io::Error::other));
    }
}

/// Drives `state` over Chat chunk payloads and yields Responses SSE frames.
///
/// A `[DONE]` payload or the end of `data_stream` finalizes the state. An
/// upstream error is forwarded as an `io::Error` and ends the output without
/// `response.completed`.
pub fn chat_sse_to_responses_sse<S>(
    data_stream: S,
    state: ChatToResponsesStream,
) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + 'static
where
    S: Stream<Item = Result<String>> + Unpin + Send + 'static,
{
    let buffer = VecDeque::<std::result::Result<Bytes, std::io::Error>>::new();

    stream::unfold(
        (data_stream, buffer, Some(state)),
        |(mut data_stream, mut buffer, mut state)| async move {
            loop {
                if let Some(item) = buffer.pop_front() {
                    return Some((item, (data_stream, buffer, state)));
                }

                let Some(active) = state.as_mut() else {
                    return None;
                };

                match data_stream.next().await {
                    Some(Ok(data)) if data.trim() == DONE_SENTINEL => {
                        if let Some(finished) = state.take() {
                            encode_into(&mut buffer, finished.finalize());
                        }
                    }
                    Some(Ok(data)) => {
                        let events = active.handle_chunk_json(&data);
                        encode_into(&mut buffer, events);
                    }
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "chat stream failed before completion");
                        state = None;
                        buffer.push_back(Err(std::io::Error::other(err)));
                    }
                    None => {
                        if let Some(finished) = state.take() {
                            encode_into(&mut buffer, finished.finalize());
                        }
                    }
                }
            }
        },
    )
}
