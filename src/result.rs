//! The integration-result window that bounds a polling pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modification::Modification;
use crate::state::NameValuePair;

/// One end of a polling window.
///
/// A poll is bounded by two results: `from` (the previous pass, read-only)
/// and `to` (the current pass, written in place). Providers read their
/// persisted state from `from` and write updated state into `to`; the
/// aggregator owns the positional slot wrapping. A `(from, to)` pair is
/// owned exclusively by one polling pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResult {
    /// Start time of the pass. Providers use the `from`/`to` start times
    /// as the history query window.
    pub start_time: DateTime<Utc>,
    /// Build label, when the pass is labelling rather than polling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Per-provider opaque state, positionally slotted (`sc0`, `sc1`, ...)
    /// at the aggregate level; unwrapped pairs at the child level.
    #[serde(default)]
    pub source_control_data: Vec<NameValuePair>,
    /// Modifications detected by the pass.
    #[serde(default)]
    pub modifications: Vec<Modification>,
}

impl PollResult {
    /// A result starting at `start_time` with no state and no modifications.
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            label: None,
            source_control_data: Vec::new(),
            modifications: Vec::new(),
        }
    }

    /// A result carrying a build label.
    pub fn with_label(start_time: DateTime<Utc>, label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::new(start_time)
        }
    }
}
