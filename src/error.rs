use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompatError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid SSE stream: {0}")]
    Sse(String),
    #[error("invalid config: {0}")]
    Config(String),
}

impl CompatError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, CompatError>;
