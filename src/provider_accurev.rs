//! AccuRev adapter.
//!
//! `accurev hist` prints a line-oriented transcript: a header line per
//! transaction, indented `#` comment lines, and indented element/version
//! lines. One modification is emitted per element; a transaction with no
//! elements (stream operations) yields a single folder-level record.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::HarnessError;
use crate::modification::Modification;
use crate::parser::{in_window, HistoryParser};
use crate::process::{ProcessExecutor, ProcessInvocation};
use crate::provider::SourceControl;
use crate::result::PollResult;
use crate::state;

/// `accurev hist` timestamps: `2006/11/22 11:11:00`.
const ACCUREV_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// State key for the newest transaction id seen by the last poll.
const LAST_TRANSACTION: &str = "last_transaction";

/// Configuration for an [`AccuRevProvider`].
#[derive(Debug, Clone, Deserialize)]
pub struct AccuRevProviderConfig {
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default)]
    pub depot: Option<String>,
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    /// External client timeout in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_executable() -> String {
    "accurev".to_string()
}

/// Parses the plain-text transcript of `accurev hist`.
pub struct AccuRevHistoryParser;

struct Transaction {
    id: String,
    action: String,
    time: DateTime<Utc>,
    user: String,
    comment_lines: Vec<String>,
    elements: Vec<(String, Option<String>)>,
}

impl AccuRevHistoryParser {
    /// Map AccuRev's action verbs onto the normalized vocabulary.
    /// Unrecognized verbs pass through verbatim.
    fn action_for_verb(verb: &str) -> String {
        match verb {
            "add" => "Added",
            "keep" => "Checked in",
            "promote" => "Checked in",
            "defunct" => "Deleted",
            "move" => "Moved",
            "mkstream" => "Created",
            "chstream" => "Modified",
            other => other,
        }
        .to_string()
    }

    /// `transaction 12345; add; 2006/11/22 11:11:00 ; user: joe_user`
    fn parse_header(line: &str) -> Result<Transaction, HarnessError> {
        let parts: Vec<&str> = line.split(';').map(str::trim).collect();
        if parts.len() < 4 {
            return Err(HarnessError::parse(format!(
                "malformed transaction header: '{}'",
                line
            )));
        }

        let id = parts[0]
            .strip_prefix("transaction")
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| {
                HarnessError::parse(format!("bad transaction id in header: '{}'", line))
            })?;

        let naive = NaiveDateTime::parse_from_str(parts[2], ACCUREV_DATE_FORMAT)
            .map_err(|e| HarnessError::parse(format!("bad date '{}': {}", parts[2], e)))?;

        let user = parts[3]
            .strip_prefix("user:")
            .map(str::trim)
            .ok_or_else(|| HarnessError::parse(format!("bad user field in header: '{}'", line)))?;

        Ok(Transaction {
            id: id.to_string(),
            action: Self::action_for_verb(parts[1]),
            time: naive.and_utc(),
            user: user.to_string(),
            comment_lines: Vec::new(),
            elements: Vec::new(),
        })
    }

    /// `/./dir/file.c 62/1 (62/1)` → path and kept version.
    fn parse_element(line: &str) -> Option<(String, Option<String>)> {
        let stripped = line
            .strip_prefix("/./")
            .or_else(|| line.strip_prefix("\\.\\"))?;
        let mut tokens = stripped.split_whitespace();
        let path = tokens.next()?.replace('\\', "/");
        let version = tokens.next().map(str::to_string);
        Some((path, version))
    }

    fn flush(
        txn: Transaction,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        out: &mut Vec<Modification>,
    ) {
        if !in_window(txn.time, from, to) {
            return;
        }
        let comment = if txn.comment_lines.is_empty() {
            None
        } else {
            Some(txn.comment_lines.join("\n"))
        };

        if txn.elements.is_empty() {
            let mut m = Modification::new(&txn.id, "/", txn.time, &txn.action, &txn.user);
            m.comment = comment;
            out.push(m);
            return;
        }

        for (path, version) in &txn.elements {
            let (folder, file) = match path.rsplit_once('/') {
                Some((folder, file)) => (folder.to_string(), Some(file.to_string())),
                None => (String::new(), Some(path.clone())),
            };
            let mut m = Modification::new(&txn.id, folder, txn.time, &txn.action, &txn.user);
            m.file_name = file;
            m.version = version.clone();
            m.comment = comment.clone();
            out.push(m);
        }
    }
}

impl HistoryParser for AccuRevHistoryParser {
    fn parse(
        &self,
        history: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Modification>, HarnessError> {
        let mut modifications = Vec::new();
        let mut current: Option<Transaction> = None;

        for raw_line in history.lines() {
            let line = raw_line.trim();
            if line.starts_with("transaction ") {
                if let Some(txn) = current.take() {
                    Self::flush(txn, from, to, &mut modifications);
                }
                current = Some(Self::parse_header(line)?);
            } else if let Some(txn) = current.as_mut() {
                if let Some(comment) = line.strip_prefix('#') {
                    txn.comment_lines.push(comment.trim().to_string());
                } else if let Some(element) = Self::parse_element(line) {
                    txn.elements.push(element);
                }
                // Anything else (blank separators, stream banners) is noise.
            }
        }
        if let Some(txn) = current.take() {
            Self::flush(txn, from, to, &mut modifications);
        }

        Ok(modifications)
    }
}

/// Adapter over the AccuRev command-line client.
pub struct AccuRevProvider {
    name: String,
    config: AccuRevProviderConfig,
    executor: Arc<dyn ProcessExecutor>,
    parser: AccuRevHistoryParser,
}

impl AccuRevProvider {
    pub fn new(
        name: impl Into<String>,
        config: AccuRevProviderConfig,
        executor: Arc<dyn ProcessExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            executor,
            parser: AccuRevHistoryParser,
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<String, HarnessError> {
        let invocation = ProcessInvocation::new(&self.config.executable, args)
            .with_timeout_ms(self.config.timeout_ms)
            .with_working_dir(self.config.working_directory.clone());
        let output = self.executor.execute(&invocation).await?;
        if !output.success {
            return Err(HarnessError::source_control(format!(
                "accurev exited with an error: {}",
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl SourceControl for AccuRevProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provider_type(&self) -> &str {
        "accurev"
    }

    async fn get_modifications(
        &self,
        from: &PollResult,
        to: &mut PollResult,
    ) -> Result<Vec<Modification>, HarnessError> {
        if let Some(last) = state::get_value(&from.source_control_data, LAST_TRANSACTION) {
            debug!(provider = %self.name, last_transaction = %last, "resuming accurev poll");
        }

        let mut args = vec!["hist".to_string()];
        if let Some(stream) = &self.config.stream {
            args.extend(["-s".to_string(), stream.clone()]);
        } else if let Some(depot) = &self.config.depot {
            args.extend(["-p".to_string(), depot.clone()]);
        }
        args.extend([
            "-t".to_string(),
            format!(
                "{}-{}",
                from.start_time.format(ACCUREV_DATE_FORMAT),
                to.start_time.format(ACCUREV_DATE_FORMAT)
            ),
        ]);

        let stdout = self.run(args).await?;
        let modifications = self
            .parser
            .parse(&stdout, from.start_time, to.start_time)?;

        let newest = modifications
            .iter()
            .filter_map(|m| m.change_number.parse::<u64>().ok())
            .max();
        if let Some(txn) = newest {
            state::set_value(
                &mut to.source_control_data,
                LAST_TRANSACTION,
                txn.to_string(),
            );
        } else if let Some(last) = state::get_value(&from.source_control_data, LAST_TRANSACTION) {
            let last = last.to_string();
            state::set_value(&mut to.source_control_data, LAST_TRANSACTION, last);
        }

        Ok(modifications)
    }

    async fn get_source(&self, _result: &PollResult) -> Result<(), HarnessError> {
        self.run(vec!["update".to_string()]).await.map(|_| ())
    }

    async fn label_source_control(&self, result: &PollResult) -> Result<(), HarnessError> {
        let label = result.label.as_deref().ok_or_else(|| {
            HarnessError::source_control("cannot label: poll result carries no label")
        })?;

        let mut args = vec!["mksnap".to_string(), "-s".to_string(), label.to_string()];
        if let Some(stream) = &self.config.stream {
            args.extend(["-b".to_string(), stream.clone()]);
        }
        args.extend(["-t".to_string(), "now".to_string()]);
        self.run(args).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::FakeExecutor;
    use chrono::TimeZone;

    const TWO_TRANSACTION_HIST: &str = "\
transaction 12345; add; 2006/11/22 11:11:00 ; user: joe_user
  # New maintenance item
  /./dir1/file1.c 62/1 (62/1)
  /./dir1/file2.c 62/2 (62/2)

transaction 12346; keep; 2006/11/23 12:00:00 ; user: sam
  # fix defect 42
  # second comment line
  /./src/main.c 63/1 (63/1)
";

    fn window_2006() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2006, 11, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2006, 11, 30, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn parses_one_modification_per_element() {
        let (from, to) = window_2006();
        let mods = AccuRevHistoryParser
            .parse(TWO_TRANSACTION_HIST, from, to)
            .unwrap();

        assert_eq!(mods.len(), 3);
        assert_eq!(mods[0].change_number, "12345");
        assert_eq!(mods[0].action, "Added");
        assert_eq!(mods[0].user_name, "joe_user");
        assert_eq!(mods[0].folder_name, "dir1");
        assert_eq!(mods[0].file_name.as_deref(), Some("file1.c"));
        assert_eq!(mods[0].version.as_deref(), Some("62/1"));
        assert_eq!(mods[0].comment.as_deref(), Some("New maintenance item"));
        assert_eq!(mods[1].file_name.as_deref(), Some("file2.c"));

        assert_eq!(mods[2].change_number, "12346");
        assert_eq!(mods[2].action, "Checked in");
        assert_eq!(
            mods[2].comment.as_deref(),
            Some("fix defect 42\nsecond comment line")
        );
        assert_eq!(
            mods[2].modified_time,
            Utc.with_ymd_and_hms(2006, 11, 23, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn transaction_without_elements_yields_one_folder_record() {
        let hist = "transaction 900; mkstream; 2006/11/22 08:00:00 ; user: admin\n";
        let (from, to) = window_2006();
        let mods = AccuRevHistoryParser.parse(hist, from, to).unwrap();

        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].action, "Created");
        assert_eq!(mods[0].folder_name, "/");
        assert_eq!(mods[0].file_name, None);
        assert_eq!(mods[0].comment, None);
    }

    #[test]
    fn transactions_outside_the_window_are_excluded() {
        let from = Utc.with_ymd_and_hms(2006, 11, 23, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2006, 11, 30, 0, 0, 0).unwrap();
        let mods = AccuRevHistoryParser
            .parse(TWO_TRANSACTION_HIST, from, to)
            .unwrap();

        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].change_number, "12346");
    }

    #[test]
    fn empty_output_parses_to_no_modifications() {
        let (from, to) = window_2006();
        assert!(AccuRevHistoryParser.parse("", from, to).unwrap().is_empty());
    }

    #[test]
    fn malformed_header_is_a_parse_error() {
        let (from, to) = window_2006();
        let err = AccuRevHistoryParser
            .parse("transaction zzz; add; nonsense ; user: joe", from, to)
            .unwrap_err();
        assert!(matches!(err, HarnessError::Parse(_)));
    }

    #[test]
    fn unknown_verb_passes_through() {
        let hist = "transaction 901; dispatch; 2006/11/22 08:00:00 ; user: admin\n";
        let (from, to) = window_2006();
        let mods = AccuRevHistoryParser.parse(hist, from, to).unwrap();
        assert_eq!(mods[0].action, "dispatch");
    }

    #[tokio::test]
    async fn get_modifications_invokes_hist_and_records_state() {
        let executor = Arc::new(FakeExecutor::returning_stdout(TWO_TRANSACTION_HIST));
        let config = AccuRevProviderConfig {
            executable: "accurev".to_string(),
            depot: Some("acme".to_string()),
            stream: None,
            working_directory: None,
            timeout_ms: None,
        };
        let provider = AccuRevProvider::new("acme", config, executor.clone());

        let (from_time, to_time) = window_2006();
        let from = PollResult::new(from_time);
        let mut to = PollResult::new(to_time);

        let mods = provider.get_modifications(&from, &mut to).await.unwrap();
        assert_eq!(mods.len(), 3);
        assert_eq!(
            state::get_value(&to.source_control_data, LAST_TRANSACTION),
            Some("12346")
        );

        let invocations = executor.invocations();
        assert_eq!(invocations[0].args[0], "hist");
        assert!(invocations[0].args.contains(&"-p".to_string()));
    }

    #[tokio::test]
    async fn client_failure_is_a_source_control_error() {
        let executor = Arc::new(FakeExecutor::failing("Not authenticated"));
        let config = AccuRevProviderConfig {
            executable: "accurev".to_string(),
            depot: None,
            stream: Some("main".to_string()),
            working_directory: None,
            timeout_ms: None,
        };
        let provider = AccuRevProvider::new("acme", config, executor);

        let from = PollResult::new(Utc::now());
        let mut to = PollResult::new(Utc::now());
        let err = provider.get_modifications(&from, &mut to).await.unwrap_err();
        assert!(matches!(err, HarnessError::SourceControl(_)));
    }
}
