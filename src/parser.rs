//! The history parser contract.
//!
//! A parser converts one provider's raw history output into the canonical
//! modification list. Parsers are pure: they see text and a time window,
//! nothing else. Process invocation and credentials live in the provider.

use chrono::{DateTime, Utc};

use crate::error::HarnessError;
use crate::modification::Modification;

/// Converts raw provider history output into modifications within a window.
///
/// Contract:
/// - empty or "no changes" sentinel output parses to an empty list, never
///   an error;
/// - fundamentally unparseable non-empty output is a
///   [`HarnessError::Parse`] — structural errors are never swallowed;
/// - output order follows the provider's reported order (some report
///   newest-first, some oldest-first; callers must not assume one);
/// - the window is inclusive on both ends.
pub trait HistoryParser: Send + Sync {
    fn parse(
        &self,
        history: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Modification>, HarnessError>;
}

/// Inclusive window check shared by the parser implementations.
pub fn in_window(time: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    time >= from && time <= to
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();

        assert!(in_window(from, from, to));
        assert!(in_window(to, from, to));
        assert!(!in_window(from - chrono::Duration::seconds(1), from, to));
        assert!(!in_window(to + chrono::Duration::seconds(1), from, to));
    }
}
