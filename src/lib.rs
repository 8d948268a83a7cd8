//! # Change Harness
//!
//! A provider-driven source-control change detection and aggregation
//! engine for CI polling.
//!
//! Change Harness queries one or more heterogeneous version-control
//! systems for modifications between two points in time, normalizes their
//! output into a canonical modification record, aggregates results across
//! providers, and persists per-provider state tokens so that repeated
//! polling is idempotent and resumable.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌─────────────┐
//! │  Providers   │──▶│ MultiSource   │──▶│  Filters /  │
//! │ Vault/AccuRev│   │   Control     │   │ Issue URLs  │
//! │    /Null     │   │ merge + gate  │   └──────┬──────┘
//! └──────┬───────┘   └───────┬───────┘          │
//!        │                   │                  ▼
//!        ▼                   ▼            ┌──────────┐
//!  external VCS        state slots        │   CLI    │
//!  client tools        (sc0, sc1, …)      │  (chg)   │
//!                                         └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! chg init                      # baseline the poll state
//! chg sources                   # inspect configured providers
//! chg poll                      # detect changes since the last poll
//! chg poll --full --dry-run     # full-history poll, nothing persisted
//! chg label build-42            # tag the current revision everywhere
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`modification`] | Canonical modification record |
//! | [`parser`] | History parser contract |
//! | [`provider`] | Uniform source-control provider contract |
//! | [`provider_vault`] | SourceGear Vault adapter (XML history) |
//! | [`provider_accurev`] | AccuRev adapter (line-oriented history) |
//! | [`provider_null`] | No-op / test-mode provider |
//! | [`multi`] | Aggregation core and gating |
//! | [`state`] | Positional per-provider state slots |
//! | [`filter`] | Action and comment filters |
//! | [`issue_url`] | Issue tracker URL builders |
//! | [`registry`] | Provider type registry |
//! | [`process`] | External process execution |
//! | [`poll`] | Polling pass orchestration |

pub mod config;
pub mod error;
pub mod filter;
pub mod issue_url;
pub mod modification;
pub mod multi;
pub mod parser;
pub mod poll;
pub mod process;
pub mod provider;
pub mod provider_accurev;
pub mod provider_null;
pub mod provider_vault;
pub mod registry;
pub mod result;
pub mod sources;
pub mod state;
