//! SourceGear Vault adapter.
//!
//! Vault's client prints an XML transcript around the actual history
//! payload, frequently with connection chatter before and after the
//! document. The parser extracts the well-formed `<vault>` fragment and
//! reads `<item>` elements; the provider drives the `vault` client through
//! the injected executor.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::debug;

use crate::error::HarnessError;
use crate::modification::Modification;
use crate::parser::{in_window, HistoryParser};
use crate::process::{ProcessExecutor, ProcessInvocation};
use crate::provider::SourceControl;
use crate::result::PollResult;
use crate::state;

/// Vault history items carry their timestamp in the client's locale
/// format, e.g. `5/13/2003 10:41:30 PM`.
const VAULT_DATE_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Format used for `-begindate`/`-enddate` arguments.
const VAULT_ARG_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// State key for the newest transaction id seen by the last poll.
const LAST_TXID: &str = "last_txid";

/// Configuration for a [`VaultProvider`].
#[derive(Debug, Clone, Deserialize)]
pub struct VaultProviderConfig {
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    /// Repository folder to poll, `$` for the root.
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    /// External client timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_executable() -> String {
    "vault".to_string()
}

fn default_folder() -> String {
    "$".to_string()
}

/// Parses the XML history transcript produced by `vault history`.
pub struct VaultHistoryParser;

impl VaultHistoryParser {
    /// Map Vault's numeric history type codes onto the normalized action
    /// vocabulary. Codes outside the table keep their decimal form.
    fn action_for_code(code: &str) -> String {
        match code {
            "10" => "Added",
            "60" => "Checked in",
            "70" => "Created",
            "80" => "Deleted",
            "120" => "Moved from",
            "130" => "Moved to",
            "170" => "Renamed",
            "190" => "Shared",
            "250" => "Undeleted",
            other => other,
        }
        .to_string()
    }

    /// Slice out the well-formed `<vault>` document, dropping any client
    /// chatter before and after it.
    fn xml_fragment(history: &str) -> Result<Option<&str>, HarnessError> {
        let Some(start) = history.find("<vault") else {
            if history.trim().is_empty() {
                return Ok(None);
            }
            return Err(HarnessError::parse(
                "no <vault> element found in history output",
            ));
        };
        let end = history
            .rfind("</vault>")
            .map(|i| i + "</vault>".len())
            .or_else(|| {
                // A session with no history can end in a self-closed root.
                history[start..].find("/>").map(|i| start + i + 2)
            })
            .ok_or_else(|| HarnessError::parse("truncated <vault> element in history output"))?;
        if end <= start {
            return Err(HarnessError::parse("malformed <vault> element"));
        }
        Ok(Some(&history[start..end]))
    }

    fn item_to_modification(item: &VaultItem) -> Result<Modification, HarnessError> {
        let naive = NaiveDateTime::parse_from_str(&item.date, VAULT_DATE_FORMAT)
            .map_err(|e| HarnessError::parse(format!("bad date '{}': {}", item.date, e)))?;
        let modified_time: DateTime<Utc> = naive.and_utc();

        // "$/folder/file" splits at the last separator; a bare "$" (or any
        // path without one) is a folder-level event.
        let (folder_name, file_name) = match item.name.rsplit_once('/') {
            Some((folder, file)) => (folder.to_string(), Some(file.to_string())),
            None => (item.name.clone(), None),
        };

        let mut modification = Modification::new(
            item.txid.clone(),
            folder_name,
            modified_time,
            Self::action_for_code(&item.type_code),
            item.user.clone(),
        );
        modification.file_name = file_name;
        modification.comment = item.comment.clone();
        modification.version = item.version.clone();
        Ok(modification)
    }
}

#[derive(Default)]
struct VaultItem {
    txid: String,
    date: String,
    name: String,
    type_code: String,
    version: Option<String>,
    user: String,
    comment: Option<String>,
}

impl HistoryParser for VaultHistoryParser {
    fn parse(
        &self,
        history: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Modification>, HarnessError> {
        let Some(fragment) = Self::xml_fragment(history)? else {
            return Ok(Vec::new());
        };

        let mut reader = Reader::from_str(fragment);
        let mut modifications = Vec::new();
        loop {
            let event = reader
                .read_event()
                .map_err(|e| HarnessError::parse(format!("invalid history XML: {}", e)))?;
            let element = match &event {
                Event::Empty(e) | Event::Start(e) if e.name().as_ref() == b"item" => e,
                Event::Eof => break,
                _ => continue,
            };

            let mut item = VaultItem::default();
            for attr in element.attributes() {
                let attr =
                    attr.map_err(|e| HarnessError::parse(format!("invalid attribute: {}", e)))?;
                let value = attr
                    .unescape_value()
                    .map_err(|e| HarnessError::parse(format!("invalid attribute value: {}", e)))?
                    .to_string();
                match attr.key.as_ref() {
                    b"txid" => item.txid = value,
                    b"date" => item.date = value,
                    b"name" => item.name = value,
                    b"type" => item.type_code = value,
                    b"version" => item.version = Some(value),
                    b"user" => item.user = value,
                    b"comment" => item.comment = Some(value),
                    _ => {}
                }
            }

            let modification = Self::item_to_modification(&item)?;
            if in_window(modification.modified_time, from, to) {
                modifications.push(modification);
            }
        }

        Ok(modifications)
    }
}

/// Adapter over the SourceGear Vault command-line client.
pub struct VaultProvider {
    name: String,
    config: VaultProviderConfig,
    executor: Arc<dyn ProcessExecutor>,
    parser: VaultHistoryParser,
}

impl VaultProvider {
    pub fn new(
        name: impl Into<String>,
        config: VaultProviderConfig,
        executor: Arc<dyn ProcessExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            executor,
            parser: VaultHistoryParser,
        }
    }

    /// Connection arguments shared by every vault subcommand.
    fn connection_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(host) = &self.config.host {
            args.extend(["-host".to_string(), host.clone()]);
        }
        if let Some(username) = &self.config.username {
            args.extend(["-user".to_string(), username.clone()]);
        }
        if let Some(password) = &self.config.password {
            args.extend(["-password".to_string(), password.clone()]);
        }
        if let Some(repository) = &self.config.repository {
            args.extend(["-repository".to_string(), repository.clone()]);
        }
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<String, HarnessError> {
        let invocation = ProcessInvocation::new(&self.config.executable, args)
            .with_timeout_ms(self.config.timeout_ms)
            .with_working_dir(self.config.working_directory.clone());
        let output = self.executor.execute(&invocation).await?;
        if !output.success {
            return Err(HarnessError::source_control(format!(
                "vault exited with an error: {}",
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl SourceControl for VaultProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> &str {
        "vault"
    }

    async fn get_modifications(
        &self,
        from: &PollResult,
        to: &mut PollResult,
    ) -> Result<Vec<Modification>, HarnessError> {
        if let Some(last) = state::get_value(&from.source_control_data, LAST_TXID) {
            debug!(provider = %self.name, last_txid = %last, "resuming vault poll");
        }

        let mut args = self.connection_args();
        args.extend([
            "history".to_string(),
            self.config.folder.clone(),
            "-rowlimit".to_string(),
            "0".to_string(),
            "-begindate".to_string(),
            from.start_time.format(VAULT_ARG_DATE_FORMAT).to_string(),
            "-enddate".to_string(),
            to.start_time.format(VAULT_ARG_DATE_FORMAT).to_string(),
        ]);

        let stdout = self.run(args).await?;
        let modifications = self
            .parser
            .parse(&stdout, from.start_time, to.start_time)?;

        // High-water mark for the next poll. Transaction ids are numeric
        // and monotonic on the server.
        let newest = modifications
            .iter()
            .filter_map(|m| m.change_number.parse::<u64>().ok())
            .max();
        if let Some(txid) = newest {
            state::set_value(
                &mut to.source_control_data,
                LAST_TXID,
                txid.to_string(),
            );
        } else if let Some(last) = state::get_value(&from.source_control_data, LAST_TXID) {
            let last = last.to_string();
            state::set_value(&mut to.source_control_data, LAST_TXID, last);
        }

        Ok(modifications)
    }

    async fn get_source(&self, _result: &PollResult) -> Result<(), HarnessError> {
        let mut args = self.connection_args();
        args.extend(["get".to_string(), self.config.folder.clone()]);
        if let Some(dir) = &self.config.working_directory {
            args.extend(["-destpath".to_string(), dir.display().to_string()]);
        }
        self.run(args).await.map(|_| ())
    }

    async fn label_source_control(&self, result: &PollResult) -> Result<(), HarnessError> {
        let label = result.label.as_deref().ok_or_else(|| {
            HarnessError::source_control("cannot label: poll result carries no label")
        })?;
        let mut args = self.connection_args();
        args.extend([
            "label".to_string(),
            self.config.folder.clone(),
            label.to_string(),
        ]);
        self.run(args).await.map(|_| ())
    }
}
