//! TOML configuration parsing and validation.
//!
//! All polling, provider, filter, and issue-tracker settings are read from
//! one file. Validation happens at load time: a malformed or incomplete
//! configuration is rejected before any provider is ever invoked.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

use crate::error::HarnessError;
use crate::issue_url;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub state: StateConfig,
    #[serde(default)]
    pub poll: PollConfig,
    /// Providers in declaration order. Order is load-bearing: it decides
    /// gating short-circuit order and positional state-slot assignment.
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
    #[serde(default)]
    pub filters: Option<FiltersConfig>,
    #[serde(default)]
    pub issue_trackers: Vec<IssueTrackerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    /// Where the persisted poll state document lives.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    /// Project identifier handed to provider lifecycle hooks.
    #[serde(default = "default_project")]
    pub project: String,
    /// Gate: report changes only when every provider has at least one.
    #[serde(default)]
    pub require_changes_from_all: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            require_changes_from_all: false,
        }
    }
}

fn default_project() -> String {
    "default".to_string()
}

/// One `[[providers]]` table: a type discriminator, an optional instance
/// name, and the provider-specific keys left for the factory to interpret.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub params: toml::Table,
}

impl ProviderEntry {
    /// Instance name, defaulting to the provider type.
    pub fn effective_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FiltersConfig {
    /// Action whitelist. Present-but-empty rejects every modification.
    #[serde(default)]
    pub actions: Option<Vec<String>>,
    /// Regex a comment must match to pass.
    #[serde(default)]
    pub comment_pattern: Option<String>,
}

/// One `[[issue_trackers]]` table, discriminated by `type`.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IssueTrackerConfig {
    /// Leading issue id substituted into a `{0}` template.
    Default { url: String },
    /// Find/replace regex transform of the comment.
    Regex { find: String, replace: String },
    /// Ordered list of nested builders. The `trackers` collection is
    /// required — a `multi` entry without it fails to parse.
    Multi { trackers: Vec<IssueTrackerConfig> },
}

pub fn load_config(path: &Path) -> Result<Config, HarnessError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        HarnessError::configuration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| HarnessError::configuration(format!("failed to parse config file: {}", e)))?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), HarnessError> {
    // Provider instance names key log output and diagnostics; duplicates
    // would make state migrations unreadable.
    let mut seen = Vec::new();
    for entry in &config.providers {
        let name = entry.effective_name();
        if entry.kind.trim().is_empty() {
            return Err(HarnessError::configuration(
                "provider entry is missing its type",
            ));
        }
        if seen.contains(&name) {
            return Err(HarnessError::configuration(format!(
                "duplicate provider name '{}'",
                name
            )));
        }
        seen.push(name);
    }

    if let Some(filters) = &config.filters {
        if let Some(pattern) = &filters.comment_pattern {
            Regex::new(pattern).map_err(|e| {
                HarnessError::configuration(format!(
                    "invalid comment filter pattern '{}': {}",
                    pattern, e
                ))
            })?;
        }
    }

    for tracker in &config.issue_trackers {
        validate_tracker(tracker)?;
    }

    Ok(())
}

fn validate_tracker(tracker: &IssueTrackerConfig) -> Result<(), HarnessError> {
    match tracker {
        IssueTrackerConfig::Default { url } => issue_url::validate_template(url),
        IssueTrackerConfig::Regex { find, .. } => {
            Regex::new(find).map_err(|e| {
                HarnessError::configuration(format!(
                    "invalid issue tracker pattern '{}': {}",
                    find, e
                ))
            })?;
            Ok(())
        }
        IssueTrackerConfig::Multi { trackers } => {
            for nested in trackers {
                validate_tracker(nested)?;
            }
            Ok(())
        }
    }
}
