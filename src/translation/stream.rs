//! Chat delta chunks into Responses lifecycle events.
//!
//! One [`ChatToResponsesStream`] exists per in-flight streamed response. It is
//! fed every upstream chunk in order and consumed by [`ChatToResponsesStream::finalize`],
//! which closes every item it opened and emits `response.completed`.
//!
//! Output indices are handed out from a single counter shared by the message
//! item and every tool call, in first-seen order. The final output list is
//! ordered by that index, never by arrival.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::usage::{chat_to_responses, parse_chat_usage};
use crate::capability::Capabilities;
use crate::config::StreamConfig;
use crate::types::{
    ChatChunk, ChatToolCallDelta, ChatUsage, ItemStatus, OutputContent, OutputItem,
    ResponseSnapshot, ResponseStatus, Role, StreamEvent,
};

/// Canonical response id: trimmed, `resp_`-prefixed, with a `chatcmpl-` or
/// `chatcmpl_` prefix replaced. Blank input gets a fresh id.
pub fn normalize_response_id(id: Option<&str>, caps: &Capabilities) -> String {
    let id = id.map(str::trim).unwrap_or_default();
    if id.is_empty() {
        return caps.prefixed_id("resp_");
    }
    if id.starts_with("resp_") {
        return id.to_string();
    }
    let bare = id
        .strip_prefix("chatcmpl-")
        .or_else(|| id.strip_prefix("chatcmpl_"))
        .unwrap_or(id);
    format!("resp_{bare}")
}

#[derive(Debug)]
struct MessageSlot {
    item_id: String,
    output_index: usize,
    content_part_added: bool,
    text: String,
}

#[derive(Debug)]
struct ToolCallSlot {
    item_id: String,
    output_index: usize,
    name: String,
    arguments: String,
}

#[derive(Debug)]
pub struct ChatToResponsesStream {
    response_id: String,
    created_at: u64,
    model: String,
    lifecycle_sent: bool,
    message: Option<MessageSlot>,
    tool_calls: HashMap<String, ToolCallSlot>,
    tool_call_order: Vec<String>,
    /// Positional indices of calls dropped by `max_tool_calls`.
    dropped_tool_calls: HashSet<usize>,
    next_output_index: usize,
    usage: Option<ChatUsage>,
    caps: Capabilities,
    config: StreamConfig,
}

impl ChatToResponsesStream {
    /// `created_at` of 0 means unknown: the first chunk's `created` fills it,
    /// else the clock does when the lifecycle opens.
    pub fn new(
        response_id: Option<&str>,
        created_at: u64,
        model: impl Into<String>,
        caps: Capabilities,
        config: StreamConfig,
    ) -> Self {
        Self {
            response_id: normalize_response_id(response_id, &caps),
            created_at,
            model: model.into(),
            lifecycle_sent: false,
            message: None,
            tool_calls: HashMap::new(),
            tool_call_order: Vec::new(),
            dropped_tool_calls: HashSet::new(),
            next_output_index: 0,
            usage: None,
            caps,
            config,
        }
    }

    pub fn response_id(&self) -> &str {
        &self.response_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The most recent usage snapshot seen on the stream.
    pub fn usage(&self) -> Option<&ChatUsage> {
        self.usage.as_ref()
    }

    /// Parses and handles one raw chunk payload. Unparseable payloads are
    /// ignored and leave the state untouched.
    pub fn handle_chunk_json(&mut self, raw: &str) -> Vec<StreamEvent> {
        match serde_json::from_str::<ChatChunk>(raw) {
            Ok(chunk) => self.handle_chunk(&chunk),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring malformed chat stream chunk");
                Vec::new()
            }
        }
    }

    pub fn handle_chunk(&mut self, chunk: &ChatChunk) -> Vec<StreamEvent> {
        if let Some(usage) = chunk.usage.as_ref().and_then(parse_chat_usage) {
            self.usage = Some(usage);
        }
        let Some(choice) = chunk.choices.first() else {
            return Vec::new();
        };

        if let Some(model) = chunk.model.as_deref().filter(|model| !model.is_empty()) {
            self.model = model.to_string();
        }
        if self.created_at == 0 {
            if let Some(created) = chunk.created.filter(|created| *created != 0) {
                self.created_at = created;
            }
        }

        let mut events = Vec::new();
        self.open_lifecycle(&mut events);

        let delta = &choice.delta;
        if let Some(text) = delta.content.as_deref().filter(|text| !text.is_empty()) {
            self.push_text(text, &mut events);
        }

        if self.config.emit_reasoning {
            if let Some(reasoning) = delta.reasoning_text() {
                events.push(StreamEvent::ReasoningSummaryTextDelta {
                    response_id: self.response_id.clone(),
                    item_id: self.reasoning_item_id(),
                    output_index: 0,
                    summary_index: 0,
                    delta: reasoning.to_string(),
                });
            }
        }

        if let Some(fragments) = delta.tool_calls.as_deref() {
            for (position, fragment) in fragments.iter().enumerate() {
                self.push_tool_call_fragment(position, fragment, &mut events);
            }
        }

        tracing::trace!(
            response_id = %self.response_id,
            events = events.len(),
            next_output_index = self.next_output_index,
            "handled chat stream chunk"
        );
        events
    }

    /// Closes every open item and emits `response.completed`.
    pub fn finalize(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        self.open_lifecycle(&mut events);

        let mut output = BTreeMap::new();

        if let Some(message) = self.message.take() {
            if message.content_part_added {
                events.push(StreamEvent::OutputTextDone {
                    response_id: self.response_id.clone(),
                    item_id: message.item_id.clone(),
                    output_index: message.output_index,
                    content_index: 0,
                    text: message.text.clone(),
                });
                events.push(StreamEvent::ContentPartDone {
                    response_id: self.response_id.clone(),
                    item_id: message.item_id.clone(),
                    output_index: message.output_index,
                    content_index: 0,
                    part: OutputContent::output_text(message.text.clone()),
                });
            }
            let item = OutputItem::Message {
                id: message.item_id,
                status: ItemStatus::Completed,
                role: Role::Assistant,
                content: vec![OutputContent::output_text(message.text)],
            };
            events.push(StreamEvent::OutputItemDone {
                response_id: self.response_id.clone(),
                output_index: message.output_index,
                item: item.clone(),
            });
            output.insert(message.output_index, item);
        }

        for identity in std::mem::take(&mut self.tool_call_order) {
            let Some(slot) = self.tool_calls.remove(&identity) else {
                continue;
            };
            if !slot.arguments.is_empty() {
                events.push(StreamEvent::FunctionCallArgumentsDone {
                    response_id: self.response_id.clone(),
                    item_id: slot.item_id.clone(),
                    output_index: slot.output_index,
                    arguments: slot.arguments.clone(),
                });
            }
            let item = OutputItem::FunctionCall {
                id: slot.item_id,
                call_id: identity,
                name: slot.name,
                arguments: slot.arguments,
                status: ItemStatus::Completed,
            };
            events.push(StreamEvent::OutputItemDone {
                response_id: self.response_id.clone(),
                output_index: slot.output_index,
                item: item.clone(),
            });
            output.insert(slot.output_index, item);
        }

        let mut response = self.snapshot(ResponseStatus::Completed);
        response.output = output.into_values().collect();
        response.usage = Some(chat_to_responses(self.usage.as_ref()));
        events.push(StreamEvent::Completed { response });
        events
    }

    fn snapshot(&self, status: ResponseStatus) -> Box<ResponseSnapshot> {
        Box::new(ResponseSnapshot::new(
            self.response_id.clone(),
            self.created_at,
            self.model.clone(),
            status,
        ))
    }

    fn open_lifecycle(&mut self, events: &mut Vec<StreamEvent>) {
        if self.lifecycle_sent {
            return;
        }
        self.lifecycle_sent = true;
        if self.created_at == 0 {
            self.created_at = self.caps.clock.now_epoch_seconds();
        }
        events.push(StreamEvent::Created {
            response: self.snapshot(ResponseStatus::InProgress),
        });
        events.push(StreamEvent::InProgress {
            response: self.snapshot(ResponseStatus::InProgress),
        });
    }

    fn reasoning_item_id(&self) -> String {
        let bare = self
            .response_id
            .strip_prefix("resp_")
            .unwrap_or(&self.response_id);
        format!("rs_{bare}")
    }

    fn alloc_output_index(&mut self) -> usize {
        let index = self.next_output_index;
        self.next_output_index += 1;
        index
    }

    fn push_text(&mut self, text: &str, events: &mut Vec<StreamEvent>) {
        if self.message.is_none() {
            let slot = MessageSlot {
                item_id: self.caps.prefixed_id("msg_"),
                output_index: self.alloc_output_index(),
                content_part_added: false,
                text: String::new(),
            };
            events.push(StreamEvent::OutputItemAdded {
                response_id: self.response_id.clone(),
                output_index: slot.output_index,
                item: OutputItem::Message {
                    id: slot.item_id.clone(),
                    status: ItemStatus::InProgress,
                    role: Role::Assistant,
                    content: Vec::new(),
                },
            });
            self.message = Some(slot);
        }
        let Some(message) = self.message.as_mut() else {
            return;
        };

        if !message.content_part_added {
            message.content_part_added = true;
            events.push(StreamEvent::ContentPartAdded {
                response_id: self.response_id.clone(),
                item_id: message.item_id.clone(),
                output_index: message.output_index,
                content_index: 0,
                part: OutputContent::output_text(""),
            });
        }

        message.text.push_str(text);
        events.push(StreamEvent::OutputTextDelta {
            response_id: self.response_id.clone(),
            item_id: message.item_id.clone(),
            output_index: message.output_index,
            content_index: 0,
            delta: text.to_string(),
        });
    }

    /// Explicit id, then the identity first seen at the declared index, then
    /// the most recent identity, then a `call_<position>` placeholder.
    fn resolve_identity(&self, position: usize, fragment: &ChatToolCallDelta) -> String {
        if let Some(id) = fragment
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            return id.to_string();
        }
        if let Some(identity) = fragment
            .index
            .and_then(|index| self.tool_call_order.get(index))
        {
            return identity.clone();
        }
        if let Some(identity) = self.tool_call_order.last() {
            return identity.clone();
        }
        format!("call_{position}")
    }

    fn push_tool_call_fragment(
        &mut self,
        position: usize,
        fragment: &ChatToolCallDelta,
        events: &mut Vec<StreamEvent>,
    ) {
        let has_id = fragment
            .id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());
        if !has_id
            && fragment
                .index
                .is_some_and(|index| self.dropped_tool_calls.contains(&index))
        {
            tracing::debug!(
                response_id = %self.response_id,
                index = ?fragment.index,
                "ignoring fragment of dropped tool call"
            );
            return;
        }

        let identity = self.resolve_identity(position, fragment);
        let function = fragment.function.as_ref();
        let name = function
            .and_then(|function| function.name.as_deref())
            .filter(|name| !name.is_empty());
        let arguments = function
            .and_then(|function| function.arguments.as_deref())
            .filter(|arguments| !arguments.is_empty());

        if !self.tool_calls.contains_key(&identity) {
            if self.tool_call_order.len() >= self.config.max_tool_calls {
                tracing::warn!(
                    response_id = %self.response_id,
                    limit = self.config.max_tool_calls,
                    call_id = %identity,
                    "dropping tool call beyond per-stream limit"
                );
                if let Some(index) = fragment.index {
                    self.dropped_tool_calls.insert(index);
                }
                return;
            }
            let slot = ToolCallSlot {
                item_id: self.caps.prefixed_id("fc_"),
                output_index: self.alloc_output_index(),
                name: name.unwrap_or_default().to_string(),
                arguments: String::new(),
            };
            events.push(StreamEvent::OutputItemAdded {
                response_id: self.response_id.clone(),
                output_index: slot.output_index,
                item: OutputItem::FunctionCall {
                    id: slot.item_id.clone(),
                    call_id: identity.clone(),
                    name: slot.name.clone(),
                    arguments: String::new(),
                    status: ItemStatus::InProgress,
                },
            });
            self.tool_calls.insert(identity.clone(), slot);
            self.tool_call_order.push(identity.clone());
        }

        let Some(slot) = self.tool_calls.get_mut(&identity) else {
            return;
        };
        if let Some(name) = name {
            slot.name = name.to_string();
        }
        if let Some(arguments) = arguments {
            slot.arguments.push_str(arguments);
            events.push(StreamEvent::FunctionCallArgumentsDelta {
                response_id: self.response_id.clone(),
                item_id: slot.item_id.clone(),
                output_index: slot.output_index,
                delta: arguments.to_string(),
            });
        }
    }
}
