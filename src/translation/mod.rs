//! Chat ⇄ Responses shape translation.
//!
//! The free functions in the submodules are the stateless converters. The
//! [`Translator`] bundles the injected capabilities and configuration a
//! gateway needs to pick a conversion by (caller shape, backend shape).

pub mod content;
pub mod request;
pub mod response;
pub mod stream;
#[cfg(feature = "streaming")]
pub mod stream_sse;
pub(crate) mod tool_calls;
pub mod usage;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::capability::Capabilities;
use crate::config::CompatConfig;

pub use request::{chat_request_to_responses, responses_request_to_chat};
pub use response::{chat_response_to_responses, extract_output_text, responses_response_to_chat};
pub use stream::{ChatToResponsesStream, normalize_response_id};
#[cfg(feature = "streaming")]
pub use stream_sse::{chat_sse_to_responses_sse, event_to_sse_bytes};

/// Which wire representation a payload uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Chat,
    Responses,
}

impl Shape {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Responses => "responses",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Shape {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chat" | "chat_completions" | "chat-completions" => Ok(Self::Chat),
            "responses" => Ok(Self::Responses),
            other => Err(format!("unknown shape: {other} (expected chat or responses)")),
        }
    }
}

/// Caller-provided details for a response conversion.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseHints<'a> {
    /// Chat completion id to use when producing the Chat shape.
    pub id: Option<&'a str>,
    /// Model name to report when producing the Responses shape.
    pub model: Option<&'a str>,
}

#[derive(Clone, Debug, Default)]
pub struct Translator {
    caps: Capabilities,
    config: CompatConfig,
}

impl Translator {
    pub fn new(caps: Capabilities, config: CompatConfig) -> Self {
        Self { caps, config }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn config(&self) -> &CompatConfig {
        &self.config
    }

    /// Returns the request unchanged when both shapes match.
    pub fn translate_request(&self, request: &Value, from: Shape, to: Shape) -> Result<Value> {
        tracing::debug!(from = %from, to = %to, "translating request");
        match (from, to) {
            (Shape::Responses, Shape::Chat) => Ok(serde_json::to_value(
                responses_request_to_chat(request, &self.config.request)?,
            )?),
            (Shape::Chat, Shape::Responses) => {
                Ok(serde_json::to_value(chat_request_to_responses(request)?)?)
            }
            _ => Ok(request.clone()),
        }
    }

    /// Returns the response unchanged when both shapes match.
    pub fn translate_response(
        &self,
        response: &Value,
        from: Shape,
        to: Shape,
        hints: ResponseHints<'_>,
    ) -> Result<Value> {
        tracing::debug!(from = %from, to = %to, "translating response");
        match (from, to) {
            (Shape::Chat, Shape::Responses) => Ok(serde_json::to_value(
                chat_response_to_responses(response, hints.model, &self.caps)?,
            )?),
            (Shape::Responses, Shape::Chat) => {
                let id = hints
                    .id
                    .map(str::to_string)
                    .unwrap_or_else(|| self.caps.prefixed_id("chatcmpl-"));
                Ok(serde_json::to_value(responses_response_to_chat(
                    response, &id,
                )?)?)
            }
            _ => Ok(response.clone()),
        }
    }

    /// A fresh state machine for one streamed Chat response.
    pub fn chat_stream(&self, response_id: Option<&str>, model: &str) -> ChatToResponsesStream {
        ChatToResponsesStream::new(
            response_id,
            0,
            model,
            self.caps.clone(),
            self.config.stream,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shape_parses_aliases() {
        assert_eq!("chat".parse::<Shape>(), Ok(Shape::Chat));
        assert_eq!(" Responses ".parse::<Shape>(), Ok(Shape::Responses));
        assert!("anthropic".parse::<Shape>().is_err());
    }

    #[test]
    fn same_shape_is_identity() -> Result<()> {
        let translator = Translator::new(Capabilities::deterministic(0), CompatConfig::default());
        let payload = json!({"model": "m", "messages": "not validated"});
        assert_eq!(
            translator.translate_request(&payload, Shape::Chat, Shape::Chat)?,
            payload
        );
        assert_eq!(
            translator.translate_response(
                &payload,
                Shape::Responses,
                Shape::Responses,
                ResponseHints::default()
            )?,
            payload
        );
        Ok(())
    }

    #[test]
    fn response_dispatch_generates_chat_id_when_missing() -> Result<()> {
        let translator = Translator::new(Capabilities::deterministic(0), CompatConfig::default());
        let chat = translator.translate_response(
            &json!({"model": "m", "created_at": 3, "output": []}),
            Shape::Responses,
            Shape::Chat,
            ResponseHints::default(),
        )?;
        assert_eq!(chat["id"], "chatcmpl-1");
        assert_eq!(chat["choices"][0]["finish_reason"], "stop");
        Ok(())
    }
}
