//! Session-state persistence for the Authrelay authorization checker.
//!
//! This crate captures the full mutable workspace (captured exchanges, rule
//! sets, filters, secrets, toggles) into one portable line-oriented file and
//! rebuilds it later, while staying consistent with the append-only exchange
//! log that backs the live results table.
//!
//! - [`codec`] - self-tagged record lines with binary-safe payload fields
//! - [`workspace`] - the in-memory state subsets export walks
//! - [`log`] - the lock-protected exchange log and view notifications
//! - [`export`] / [`import`] - the two exposed operations
//! - [`logging`] - `tracing` setup for embedding hosts

pub mod codec;
pub mod error;
pub mod export;
pub mod import;
pub mod log;
pub mod logging;
pub mod workspace;

pub use error::StateError;
pub use export::{export_state, ExportSummary, STATE_FILE_EXTENSION};
pub use import::{import_state, RestoreHooks, RestoreSummary};
pub use log::{ExchangeLog, ViewEvent, ViewSync};
pub use logging::{init_logging, LoggingConfig};
pub use workspace::{AiConfig, ExportOptions, FilterCombinator, FilterSet, RuleTable, ToggleSet, Workspace};
