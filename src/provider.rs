//! The uniform source-control provider contract.
//!
//! Every concrete adapter — and the aggregate that composes them — exposes
//! the same polling surface. The lifecycle of a single provider is
//! `Uninitialized → initialize → Ready`, with `get_modifications`,
//! `get_source`, and `label_source_control` cycling on Ready and `purge`
//! returning to Uninitialized. No method is reentrant against the same
//! working directory.

use async_trait::async_trait;

use crate::error::HarnessError;
use crate::modification::Modification;
use crate::result::PollResult;

/// A source-control adapter exposing the uniform polling contract.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Configured instance name (e.g. `"mainline"`).
    fn name(&self) -> &str;

    /// Provider type identifier (e.g. `"vault"`, `"accurev"`, `"null"`).
    fn provider_type(&self) -> &str;

    /// Query modifications between the `from` and `to` passes.
    ///
    /// "No changes" is the empty vector; a real failure is an error.
    /// Providers read persisted state from `from.source_control_data` and
    /// write updated state into `to.source_control_data`.
    async fn get_modifications(
        &self,
        from: &PollResult,
        to: &mut PollResult,
    ) -> Result<Vec<Modification>, HarnessError>;

    /// Materialize the working copy at the polled revision.
    async fn get_source(&self, result: &PollResult) -> Result<(), HarnessError>;

    /// Tag the polled revision with the result's build label.
    async fn label_source_control(&self, result: &PollResult) -> Result<(), HarnessError>;

    /// First-time setup hook. Safe no-op where not applicable.
    async fn initialize(&self, _project: &str) -> Result<(), HarnessError> {
        Ok(())
    }

    /// Teardown hook. Safe no-op where not applicable.
    async fn purge(&self, _project: &str) -> Result<(), HarnessError> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn SourceControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceControl")
            .field("name", &self.name())
            .field("type", &self.provider_type())
            .finish()
    }
}
