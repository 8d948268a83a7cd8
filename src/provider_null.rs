//! The no-op provider.
//!
//! Useful as a placeholder in configurations and as the contract double
//! for exercising the orchestrator: it can report nothing (the default),
//! always report one sentinel change, or fail on demand.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::error::HarnessError;
use crate::modification::Modification;
use crate::provider::SourceControl;
use crate::result::PollResult;

/// Configuration for a [`NullProvider`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NullProviderConfig {
    /// Report one sentinel modification on every poll instead of none.
    #[serde(default)]
    pub always_modified: bool,
    /// Fail `get_modifications` with a source-control error.
    #[serde(default)]
    pub fail_get_modifications: bool,
    /// Fail `label_source_control` with a source-control error.
    #[serde(default)]
    pub fail_label_source_control: bool,
    /// Fail `get_source` with a source-control error.
    #[serde(default)]
    pub fail_get_source: bool,
}

/// Provider that talks to no VCS at all.
pub struct NullProvider {
    name: String,
    config: NullProviderConfig,
}

impl NullProvider {
    pub fn new(name: impl Into<String>, config: NullProviderConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

#[async_trait]
impl SourceControl for NullProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> &str {
        "null"
    }

    async fn get_modifications(
        &self,
        _from: &PollResult,
        _to: &mut PollResult,
    ) -> Result<Vec<Modification>, HarnessError> {
        if self.config.fail_get_modifications {
            return Err(HarnessError::source_control(
                "null provider configured to fail get_modifications",
            ));
        }
        if self.config.always_modified {
            let mut sentinel =
                Modification::new("0", "/", Utc::now(), "Modified", &self.name);
            sentinel.comment = Some("always modified".to_string());
            return Ok(vec![sentinel]);
        }
        Ok(Vec::new())
    }

    async fn get_source(&self, _result: &PollResult) -> Result<(), HarnessError> {
        if self.config.fail_get_source {
            return Err(HarnessError::source_control(
                "null provider configured to fail get_source",
            ));
        }
        Ok(())
    }

    async fn label_source_control(&self, _result: &PollResult) -> Result<(), HarnessError> {
        if self.config.fail_label_source_control {
            return Err(HarnessError::source_control(
                "null provider configured to fail label_source_control",
            ));
        }
        Ok(())
    }
}
