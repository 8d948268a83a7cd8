//! Positional per-provider state slots.
//!
//! Each provider in a multi-provider configuration persists arbitrary
//! serialized state between polls, keyed by its position in the configured
//! list (`sc0`, `sc1`, ...). A slot's value is itself a JSON-serialized
//! list of name/value pairs; the explicitly-empty state marker is the
//! serialized empty collection, distinguishable from an absent slot.
//!
//! The slot count never decreases once established: when the provider set
//! grows or shrinks, [`reconcile_slots`] migrates existing slot data
//! forward by position and pads new positions with the empty marker.

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Serialized form of a slot with no state: the empty collection marker.
pub const EMPTY_STATE: &str = "[]";

/// One named value in a provider's opaque state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValuePair {
    pub name: String,
    pub value: String,
}

impl NameValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Slot name for the provider at `index` in the configured list.
pub fn slot_name(index: usize) -> String {
    format!("sc{}", index)
}

/// Serialize a provider's state pairs into a slot value.
pub fn wrap_state(pairs: &[NameValuePair]) -> Result<String, HarnessError> {
    Ok(serde_json::to_string(pairs)?)
}

/// Deserialize a slot value back into state pairs. An empty or blank value
/// is treated as the empty state rather than an error; a structurally
/// invalid value is not.
pub fn unwrap_state(value: &str) -> Result<Vec<NameValuePair>, HarnessError> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(value)?)
}

/// Look up a named value in a state pair list.
pub fn get_value<'a>(pairs: &'a [NameValuePair], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.value.as_str())
}

/// Set a named value in a state pair list, replacing any existing entry.
pub fn set_value(pairs: &mut Vec<NameValuePair>, name: &str, value: impl Into<String>) {
    let value = value.into();
    match pairs.iter_mut().find(|p| p.name == name) {
        Some(pair) => pair.value = value,
        None => pairs.push(NameValuePair::new(name, value)),
    }
}

/// Reconcile persisted slots against the current provider count.
///
/// The result has `max(old.len(), provider_count)` entries. Existing slots
/// are preserved in their original position; positions beyond the old list
/// get the empty-state marker. Slots are never dropped, even when the
/// provider list shrank — the data may belong to a provider that comes
/// back.
pub fn reconcile_slots(old: &[NameValuePair], provider_count: usize) -> Vec<NameValuePair> {
    let len = old.len().max(provider_count);
    (0..len)
        .map(|i| match old.get(i) {
            Some(pair) => pair.clone(),
            None => NameValuePair::new(slot_name(i), EMPTY_STATE),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(i: usize, value: &str) -> NameValuePair {
        NameValuePair::new(slot_name(i), value)
    }

    #[test]
    fn reconcile_pads_new_slots_with_empty_marker() {
        let old = vec![slot(0, "{\"x\":1}")];
        let slots = reconcile_slots(&old, 3);

        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0], old[0]);
        assert_eq!(slots[1], slot(1, EMPTY_STATE));
        assert_eq!(slots[2], slot(2, EMPTY_STATE));
    }

    #[test]
    fn reconcile_never_shrinks() {
        let old = vec![slot(0, "a"), slot(1, "b"), slot(2, "c")];
        let slots = reconcile_slots(&old, 1);

        assert_eq!(slots.len(), 3);
        assert_eq!(slots, old);
    }

    #[test]
    fn reconcile_preserves_positions() {
        let old = vec![slot(0, "first"), slot(1, "second")];
        let slots = reconcile_slots(&old, 2);
        assert_eq!(slots, old);
    }

    #[test]
    fn reconcile_from_empty() {
        let slots = reconcile_slots(&[], 2);
        assert_eq!(slots, vec![slot(0, EMPTY_STATE), slot(1, EMPTY_STATE)]);
    }

    #[test]
    fn wrap_unwrap_round_trip() {
        let pairs = vec![NameValuePair::new("last_txid", "42")];
        let wrapped = wrap_state(&pairs).unwrap();
        assert_eq!(unwrap_state(&wrapped).unwrap(), pairs);
    }

    #[test]
    fn unwrap_empty_marker_is_empty_state() {
        assert!(unwrap_state(EMPTY_STATE).unwrap().is_empty());
        assert!(unwrap_state("").unwrap().is_empty());
        assert!(unwrap_state("   ").unwrap().is_empty());
    }

    #[test]
    fn unwrap_rejects_garbage() {
        assert!(unwrap_state("not json").is_err());
    }

    #[test]
    fn set_value_replaces_existing() {
        let mut pairs = vec![NameValuePair::new("cursor", "1")];
        set_value(&mut pairs, "cursor", "2");
        assert_eq!(pairs.len(), 1);
        assert_eq!(get_value(&pairs, "cursor"), Some("2"));

        set_value(&mut pairs, "other", "x");
        assert_eq!(pairs.len(), 2);
    }
}
