#[cfg(feature = "streaming")]
pub mod sse;
