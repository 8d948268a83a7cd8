//! Polling pass orchestration.
//!
//! Coordinates the full poll flow: persisted state → provider registry →
//! aggregate modification query → filters → issue URL builders → summary
//! and state write-back. Supports incremental polling via the stored state
//! document and a `--full` override.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Config, FiltersConfig, IssueTrackerConfig};
use crate::error::HarnessError;
use crate::filter::{self, ActionFilter, CommentFilter, ModificationFilter};
use crate::issue_url::{
    DefaultIssueTrackerUrlBuilder, IssueTrackerUrlBuilder, MultiIssueTrackerUrlBuilder,
    RegExIssueTrackerUrlBuilder,
};
use crate::multi::MultiSourceControl;
use crate::process::SystemExecutor;
use crate::provider::SourceControl;
use crate::registry::ProviderRegistry;
use crate::result::PollResult;
use crate::state::NameValuePair;

/// State document persisted between polls.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredState {
    /// Start time of the last completed poll; lower bound of the next one.
    pub last_poll: DateTime<Utc>,
    /// Positional per-provider state slots.
    #[serde(default)]
    pub source_control_data: Vec<NameValuePair>,
}

/// Load the persisted state document. An absent file is "never polled";
/// an unreadable or malformed file is an error.
pub fn load_state(path: &Path) -> Result<Option<StoredState>, HarnessError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Persist the state document, creating parent directories as needed.
pub fn store_state(path: &Path, state: &StoredState) -> Result<(), HarnessError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(state)?)?;
    Ok(())
}

/// Assemble the aggregate provider from the configuration.
pub fn build_source_control(config: &Config) -> Result<MultiSourceControl, HarnessError> {
    let registry = ProviderRegistry::with_builtins(Arc::new(SystemExecutor));
    let providers = registry.build(&config.providers)?;
    Ok(MultiSourceControl::new(
        providers,
        config.poll.require_changes_from_all,
    ))
}

/// Compile the configured filters.
pub fn build_filters(
    config: Option<&FiltersConfig>,
) -> Result<Vec<Box<dyn ModificationFilter>>, HarnessError> {
    let mut filters: Vec<Box<dyn ModificationFilter>> = Vec::new();
    let Some(config) = config else {
        return Ok(filters);
    };
    if let Some(actions) = &config.actions {
        filters.push(Box::new(ActionFilter::new(actions.clone())));
    }
    if let Some(pattern) = &config.comment_pattern {
        let regex = Regex::new(pattern).map_err(|e| {
            HarnessError::configuration(format!("invalid comment filter pattern: {}", e))
        })?;
        filters.push(Box::new(CommentFilter::new(regex)));
    }
    Ok(filters)
}

/// Compile the configured issue tracker URL builders.
pub fn build_issue_trackers(
    configs: &[IssueTrackerConfig],
) -> Result<Vec<Box<dyn IssueTrackerUrlBuilder>>, HarnessError> {
    configs.iter().map(build_tracker).collect()
}

fn build_tracker(
    config: &IssueTrackerConfig,
) -> Result<Box<dyn IssueTrackerUrlBuilder>, HarnessError> {
    match config {
        IssueTrackerConfig::Default { url } => {
            Ok(Box::new(DefaultIssueTrackerUrlBuilder::new(url)))
        }
        IssueTrackerConfig::Regex { find, replace } => {
            let regex = Regex::new(find).map_err(|e| {
                HarnessError::configuration(format!("invalid issue tracker pattern: {}", e))
            })?;
            Ok(Box::new(RegExIssueTrackerUrlBuilder::new(regex, replace)))
        }
        IssueTrackerConfig::Multi { trackers } => Ok(Box::new(MultiIssueTrackerUrlBuilder::new(
            build_issue_trackers(trackers)?,
        ))),
    }
}

/// `chg poll` — run one polling pass.
pub async fn run_poll(config: &Config, full: bool, dry_run: bool) -> Result<()> {
    let source_control = build_source_control(config)?;
    let filters = build_filters(config.filters.as_ref())?;
    let trackers = build_issue_trackers(&config.issue_trackers)?;

    let stored = if full {
        None
    } else {
        load_state(&config.state.path).context("failed to load poll state")?
    };

    let mut from = PollResult::new(
        stored
            .as_ref()
            .map(|s| s.last_poll)
            .unwrap_or(DateTime::UNIX_EPOCH),
    );
    if let Some(stored) = stored {
        from.source_control_data = stored.source_control_data;
    }
    let mut to = PollResult::new(Utc::now());

    info!(
        project = %config.poll.project,
        providers = source_control.providers().len(),
        from = %from.start_time,
        "starting poll"
    );

    let detected = source_control.get_modifications(&from, &mut to).await?;
    let detected_count = detected.len();

    let mut modifications = filter::apply(&filters, detected);
    for tracker in &trackers {
        tracker.setup_modification(&mut modifications);
    }
    to.modifications = modifications;

    println!(
        "poll {}{}",
        config.poll.project,
        if dry_run { " (dry-run)" } else { "" }
    );
    println!("  providers polled: {}", source_control.providers().len());
    println!("  detected: {} modifications", detected_count);
    println!("  after filters: {}", to.modifications.len());
    for m in &to.modifications {
        let issue = m
            .issue_url
            .as_deref()
            .map(|u| format!(" [{}]", u))
            .unwrap_or_default();
        println!(
            "    {} {} {} by {}{}",
            m.change_number,
            m.action,
            m.full_path(),
            m.user_name,
            issue
        );
    }

    if dry_run {
        println!("ok");
        return Ok(());
    }

    store_state(
        &config.state.path,
        &StoredState {
            last_poll: to.start_time,
            source_control_data: to.source_control_data.clone(),
        },
    )
    .context("failed to persist poll state")?;
    println!("  state slots: {}", to.source_control_data.len());
    println!("ok");
    Ok(())
}

/// `chg init` — write a baseline state document and run provider setup.
///
/// The baseline is stamped "now" so the first real poll is incremental.
/// Running init again is safe; an existing state file is left alone.
pub async fn run_init(config: &Config) -> Result<()> {
    let source_control = build_source_control(config)?;
    source_control.initialize(&config.poll.project).await?;

    if config.state.path.exists() {
        println!(
            "State already initialized at {}.",
            config.state.path.display()
        );
        return Ok(());
    }

    store_state(
        &config.state.path,
        &StoredState {
            last_poll: Utc::now(),
            source_control_data: Vec::new(),
        },
    )
    .context("failed to write baseline state")?;
    println!("State initialized at {}.", config.state.path.display());
    Ok(())
}

/// `chg checkout` — materialize working copies from every provider.
pub async fn run_checkout(config: &Config) -> Result<()> {
    let source_control = build_source_control(config)?;
    let result = PollResult::new(Utc::now());
    source_control.get_source(&result).await?;
    println!("checkout complete");
    Ok(())
}

/// `chg label <label>` — tag the current revision on every provider.
pub async fn run_label(config: &Config, label: &str) -> Result<()> {
    let source_control = build_source_control(config)?;
    let result = PollResult::with_label(Utc::now(), label);
    source_control.label_source_control(&result).await?;
    println!("labelled {}", label);
    Ok(())
}

/// `chg purge` — run provider teardown and drop the persisted state.
pub async fn run_purge(config: &Config) -> Result<()> {
    let source_control = build_source_control(config)?;
    source_control.purge(&config.poll.project).await?;

    if config.state.path.exists() {
        std::fs::remove_file(&config.state.path)
            .context("failed to remove state file")?;
    }
    println!("purged {}", config.poll.project);
    Ok(())
}
