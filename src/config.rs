use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CompatError, Result};

fn default_true() -> bool {
    true
}

fn default_max_tool_calls() -> usize {
    256
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CompatConfig {
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    /// Ask chat backends for a trailing usage chunk when the caller streams.
    #[serde(default = "default_true")]
    pub include_stream_usage: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            include_stream_usage: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamConfig {
    #[serde(default = "default_true")]
    pub emit_reasoning: bool,
    /// Upper bound on distinct tool-call identities tracked per stream.
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            emit_reasoning: true,
            max_tool_calls: default_max_tool_calls(),
        }
    }
}

impl CompatConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str::<Self>(raw).map_err(|err| CompatError::Config(err.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| CompatError::Config(format!("read {} failed: {err}", path.display())))?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() -> Result<()> {
        let parsed = CompatConfig::from_toml_str("")?;
        assert_eq!(parsed, CompatConfig::default());
        assert!(parsed.request.include_stream_usage);
        assert!(parsed.stream.emit_reasoning);
        assert_eq!(parsed.stream.max_tool_calls, 256);
        Ok(())
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() -> Result<()> {
        let parsed = CompatConfig::from_toml_str(
            r#"
[stream]
max_tool_calls = 4
"#,
        )?;
        assert_eq!(parsed.stream.max_tool_calls, 4);
        assert!(parsed.stream.emit_reasoning);
        assert!(parsed.request.include_stream_usage);
        Ok(())
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = CompatConfig::from_toml_str("[stream]\nbogus = 1\n").expect_err("unknown key");
        assert!(matches!(err, CompatError::Config(_)));
    }

    #[test]
    fn load_reads_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("compat.toml");
        std::fs::write(&path, "[request]\ninclude_stream_usage = false\n")?;
        let parsed = CompatConfig::load(&path)?;
        assert!(!parsed.request.include_stream_usage);
        Ok(())
    }

    #[test]
    fn load_reports_missing_file_as_config_error() {
        let err = CompatConfig::load("/definitely/not/here.toml").expect_err("missing file");
        assert!(matches!(err, CompatError::Config(_)));
    }
}
