pub mod capability;
pub mod config;
mod error;
pub mod translation;
pub mod types;
pub mod utils;

pub use capability::{
    Capabilities, Clock, FixedClock, IdGenerator, RandomIds, SequentialIds, SystemClock,
};
pub use config::{CompatConfig, RequestConfig, StreamConfig};
pub use error::{CompatError, Result};
pub use translation::{ChatToResponsesStream, ResponseHints, Shape, Translator};
pub use types::{
    ChatChunk, ChatContent, ChatMessage, ChatRequest, ChatResponse, ChatUsage, ContentPart,
    InputItem, ItemStatus, OutputItem, ResponseStatus, ResponsesRequest, ResponsesResponse,
    ResponsesUsage, Role, StreamEvent, ToolCall, ToolChoice,
};
