//! The aggregation core: N providers behind one polling contract.
//!
//! Providers are invoked strictly in configured order, one at a time.
//! Ordering matters twice: the `require_changes_from_all` gate
//! short-circuits at the first empty result, and each provider's persisted
//! state lives in the slot matching its position. Slot bookkeeping goes
//! through [`state::reconcile_slots`] so the slot count never shrinks
//! across configuration changes.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::HarnessError;
use crate::modification::Modification;
use crate::provider::SourceControl;
use crate::result::PollResult;
use crate::state;

/// Composite provider that merges the modification sets of its children.
pub struct MultiSourceControl {
    name: String,
    providers: Vec<Box<dyn SourceControl>>,
    require_changes_from_all: bool,
}

impl MultiSourceControl {
    pub fn new(providers: Vec<Box<dyn SourceControl>>, require_changes_from_all: bool) -> Self {
        Self {
            name: "multi".to_string(),
            providers,
            require_changes_from_all,
        }
    }

    pub fn providers(&self) -> &[Box<dyn SourceControl>] {
        &self.providers
    }

    /// Child view of the aggregate `from` result: same window, the
    /// child's own unwrapped state pairs.
    fn child_from(&self, from: &PollResult, index: usize) -> Result<PollResult, HarnessError> {
        let pairs = match from.source_control_data.get(index) {
            Some(slot) => state::unwrap_state(&slot.value)?,
            None => Vec::new(),
        };
        let mut child = PollResult::new(from.start_time);
        child.label = from.label.clone();
        child.source_control_data = pairs;
        Ok(child)
    }
}

#[async_trait]
impl SourceControl for MultiSourceControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> &str {
        "multi"
    }

    async fn get_modifications(
        &self,
        from: &PollResult,
        to: &mut PollResult,
    ) -> Result<Vec<Modification>, HarnessError> {
        let mut slots = state::reconcile_slots(&from.source_control_data, self.providers.len());
        let mut merged = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            let child_from = self.child_from(from, index)?;
            let mut child_to = PollResult::new(to.start_time);
            child_to.label = to.label.clone();

            let mods = provider.get_modifications(&child_from, &mut child_to).await?;
            debug!(
                provider = provider.name(),
                kind = provider.provider_type(),
                count = mods.len(),
                "provider poll complete"
            );

            slots[index].value = state::wrap_state(&child_to.source_control_data)?;

            if self.require_changes_from_all && mods.is_empty() {
                // The gate failed: the aggregate result is empty and the
                // remaining providers are not invoked at all. Their slots
                // keep whatever reconcile gave them.
                info!(
                    provider = provider.name(),
                    "gate failed, skipping remaining providers"
                );
                merged.clear();
                break;
            }
            merged.extend(mods);
        }

        to.source_control_data = slots;
        Ok(merged)
    }

    async fn get_source(&self, result: &PollResult) -> Result<(), HarnessError> {
        for provider in &self.providers {
            provider.get_source(result).await?;
        }
        Ok(())
    }

    async fn label_source_control(&self, result: &PollResult) -> Result<(), HarnessError> {
        for provider in &self.providers {
            provider.label_source_control(result).await?;
        }
        Ok(())
    }

    async fn initialize(&self, project: &str) -> Result<(), HarnessError> {
        for provider in &self.providers {
            provider.initialize(project).await?;
        }
        Ok(())
    }

    async fn purge(&self, project: &str) -> Result<(), HarnessError> {
        for provider in &self.providers {
            provider.purge(project).await?;
        }
        Ok(())
    }
}
