//! Common Data Model for Authrelay Modules
//!
//! This crate defines the types shared across Authrelay modules:
//! - Interception/replay - Produces exchange entries
//! - Persistence - Serializes and restores the workspace state
//! - Presentation - Renders the exchange log table

pub mod exchange;
pub mod http;
pub mod rules;

pub use exchange::{status, CapturedPair, ExchangeEntry, HttpService};
pub use rules::{MatchReplaceRule, RuleKind, SavedHeaderSet};
