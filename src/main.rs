//! # Change Harness CLI (`chg`)
//!
//! The `chg` binary drives the change-detection engine. It provides
//! commands for baselining poll state, inspecting providers, running a
//! polling pass, and fanning out checkout/label/purge operations.
//!
//! ## Usage
//!
//! ```bash
//! chg --config ./config/chg.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chg init` | Write a baseline state document and run provider setup |
//! | `chg sources` | List configured providers and their state slots |
//! | `chg poll` | Query all providers for modifications since the last poll |
//! | `chg checkout` | Materialize working copies from every provider |
//! | `chg label <label>` | Tag the current revision on every provider |
//! | `chg purge` | Run provider teardown and drop the persisted state |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use change_harness::{config, poll, sources};

/// Change Harness — source-control change detection and aggregation for
/// CI polling.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/chg.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "chg",
    about = "Change Harness — source-control change detection and aggregation for CI polling",
    version,
    long_about = "Change Harness polls one or more version-control systems for modifications, \
    normalizes their output into canonical modification records, aggregates them across \
    providers, and persists per-provider state so repeated polling is incremental."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/chg.toml`. All provider, filter, issue
    /// tracker, and state settings are read from this file.
    #[arg(long, global = true, default_value = "./config/chg.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Baseline the poll state and run provider setup.
    ///
    /// Writes a state document stamped "now" so the first real poll is
    /// incremental, and invokes each provider's initialize hook. Running
    /// init again is safe — an existing state file is left alone.
    Init,

    /// List configured providers and their state slots.
    ///
    /// Shows each provider's name, type, positional slot, and whether the
    /// slot currently holds persisted state.
    Sources,

    /// Query all providers for modifications.
    ///
    /// Polls every provider in configured order, merges their
    /// modifications, applies filters and issue tracker URL builders,
    /// prints a summary, and persists the updated state.
    Poll {
        /// Ignore stored state — poll the full history from the epoch.
        #[arg(long)]
        full: bool,

        /// Run the poll but do not persist state.
        #[arg(long)]
        dry_run: bool,
    },

    /// Materialize working copies from every provider.
    Checkout,

    /// Tag the current revision on every provider.
    Label {
        /// The build label to apply.
        label: String,
    },

    /// Run provider teardown and drop the persisted state.
    Purge,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            poll::run_init(&cfg).await?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Poll { full, dry_run } => {
            poll::run_poll(&cfg, full, dry_run).await?;
        }
        Commands::Checkout => {
            poll::run_checkout(&cfg).await?;
        }
        Commands::Label { label } => {
            poll::run_label(&cfg, &label).await?;
        }
        Commands::Purge => {
            poll::run_purge(&cfg).await?;
        }
    }

    Ok(())
}
