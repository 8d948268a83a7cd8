//! Issue tracker URL builders.
//!
//! Builders annotate modifications with a link into an issue tracker,
//! derived from the comment text. They only ever write `issue_url`; a
//! comment that yields no issue leaves the field untouched.

use regex::Regex;

use crate::error::HarnessError;
use crate::modification::Modification;

/// Derives `issue_url` for a batch of modifications.
pub trait IssueTrackerUrlBuilder: Send + Sync {
    fn setup_modification(&self, modifications: &mut [Modification]);
}

/// Extracts a leading numeric issue id and substitutes it into a URL
/// template with a `{0}` placeholder.
///
/// Accepted comment forms: `"<id> <text>"`, `"<prefix>-<id> <text>"`,
/// `"<prefix>-<id>"`, and a bare `"<id>"`. Anything else — including a
/// blank or missing comment — leaves `issue_url` unset.
pub struct DefaultIssueTrackerUrlBuilder {
    url_template: String,
    id_pattern: Regex,
}

impl DefaultIssueTrackerUrlBuilder {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            // Optional alphanumeric prefix joined with '-', then the id,
            // terminated by whitespace or end of comment.
            id_pattern: Regex::new(r"^\s*(?:[A-Za-z][A-Za-z0-9]*-)?(\d+)(?:\s|$)")
                .expect("issue id pattern is valid"),
        }
    }

    fn issue_id<'a>(&self, comment: &'a str) -> Option<&'a str> {
        self.id_pattern
            .captures(comment)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

impl IssueTrackerUrlBuilder for DefaultIssueTrackerUrlBuilder {
    fn setup_modification(&self, modifications: &mut [Modification]) {
        for modification in modifications {
            let Some(comment) = modification.comment.as_deref() else {
                continue;
            };
            if let Some(id) = self.issue_id(comment) {
                modification.issue_url = Some(self.url_template.replace("{0}", id));
            }
        }
    }
}

/// Find/replace regex transform of the comment into an issue URL.
pub struct RegExIssueTrackerUrlBuilder {
    find: Regex,
    replace: String,
}

impl RegExIssueTrackerUrlBuilder {
    pub fn new(find: Regex, replace: impl Into<String>) -> Self {
        Self {
            find,
            replace: replace.into(),
        }
    }
}

impl IssueTrackerUrlBuilder for RegExIssueTrackerUrlBuilder {
    fn setup_modification(&self, modifications: &mut [Modification]) {
        for modification in modifications {
            let Some(comment) = modification.comment.as_deref() else {
                continue;
            };
            if self.find.is_match(comment) {
                modification.issue_url =
                    Some(self.find.replace(comment, self.replace.as_str()).to_string());
            }
        }
    }
}

/// Applies a list of builders in order to the same modification list.
/// Zero builders is a legal no-op configuration.
pub struct MultiIssueTrackerUrlBuilder {
    builders: Vec<Box<dyn IssueTrackerUrlBuilder>>,
}

impl MultiIssueTrackerUrlBuilder {
    pub fn new(builders: Vec<Box<dyn IssueTrackerUrlBuilder>>) -> Self {
        Self { builders }
    }
}

impl IssueTrackerUrlBuilder for MultiIssueTrackerUrlBuilder {
    fn setup_modification(&self, modifications: &mut [Modification]) {
        for builder in &self.builders {
            builder.setup_modification(modifications);
        }
    }
}

/// Validate a `{0}` URL template at configuration load.
pub fn validate_template(template: &str) -> Result<(), HarnessError> {
    if template.trim().is_empty() {
        return Err(HarnessError::configuration(
            "issue tracker url template must not be empty",
        ));
    }
    if !template.contains("{0}") {
        return Err(HarnessError::configuration(format!(
            "issue tracker url template '{}' is missing the {{0}} placeholder",
            template
        )));
    }
    Ok(())
}
