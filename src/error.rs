use thiserror::Error;

/// Errors raised by the change-detection core.
///
/// The three domain variants mirror the failure taxonomy of the polling
/// pipeline: parser failures, external tool failures, and configuration
/// failures. Configuration errors are raised at load time, before any
/// polling occurs; the other two abort the poll that produced them.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Provider history output was structurally unparseable (not merely
    /// empty — "no changes" output parses to an empty list).
    #[error("failed to parse provider history: {0}")]
    Parse(String),

    /// An external VCS client invocation failed: spawn error, non-zero
    /// exit, or timeout.
    #[error("source control operation failed: {0}")]
    SourceControl(String),

    /// Malformed or incomplete declarative configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    State(#[from] serde_json::Error),
}

impl HarnessError {
    /// Create a Parse error from any displayable value.
    pub fn parse(msg: impl std::fmt::Display) -> Self {
        Self::Parse(msg.to_string())
    }

    /// Create a SourceControl error from any displayable value.
    pub fn source_control(msg: impl std::fmt::Display) -> Self {
        Self::SourceControl(msg.to_string())
    }

    /// Create a Configuration error from any displayable value.
    pub fn configuration(msg: impl std::fmt::Display) -> Self {
        Self::Configuration(msg.to_string())
    }
}
