//! Canonical data model for detected source-control changes.
//!
//! A [`Modification`] is the normalized record every provider's history
//! parser produces, whatever the native output format looked like. It is
//! constructed once by a parser and consumed read-only downstream; the only
//! field written after construction is `issue_url`, populated by the issue
//! tracker URL builders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One detected source-control change, normalized across providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    /// Provider-native revision/transaction identifier. Opaque — only
    /// meaningful for ordering and dedup within the provider that
    /// reported it.
    pub change_number: String,
    /// Folder portion of the changed path.
    pub folder_name: String,
    /// File portion of the changed path. Some providers report
    /// folder-level events (creates, deletes) with no single file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Timestamp of the change as the provider reported it.
    pub modified_time: DateTime<Utc>,
    /// Normalized action keyword ("Created", "Checked in", "Added", ...).
    /// Each provider owns its mapping from native vocabulary onto this set.
    pub action: String,
    /// User the provider attributed the change to.
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Provider-native link to the change, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Issue-tracker link derived from the comment. Written by the issue
    /// tracker URL builders, never by parsers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
}

impl Modification {
    /// Construct a modification with the required fields; optional fields
    /// start empty.
    pub fn new(
        change_number: impl Into<String>,
        folder_name: impl Into<String>,
        modified_time: DateTime<Utc>,
        action: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            change_number: change_number.into(),
            folder_name: folder_name.into(),
            file_name: None,
            modified_time,
            action: action.into(),
            user_name: user_name.into(),
            comment: None,
            email_address: None,
            version: None,
            url: None,
            issue_url: None,
        }
    }

    /// Full path of the change: `folder/file`, or just the folder for
    /// folder-level events.
    pub fn full_path(&self) -> String {
        match &self.file_name {
            Some(file) => format!("{}/{}", self.folder_name, file),
            None => self.folder_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn equality_is_structural() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let a = Modification::new("42", "$/src", when, "Checked in", "alice");
        let mut b = a.clone();
        assert_eq!(a, b);

        b.comment = Some("fix".to_string());
        assert_ne!(a, b);
    }

    #[test]
    fn full_path_with_and_without_file() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut m = Modification::new("1", "$/src", when, "Added", "bob");
        assert_eq!(m.full_path(), "$/src");

        m.file_name = Some("lib.rs".to_string());
        assert_eq!(m.full_path(), "$/src/lib.rs");
    }
}
