//! Error types for state persistence.

use thiserror::Error;

/// Errors surfaced by export and import operations.
///
/// Every variant aborts the operation that raised it. Row-scoped failures
/// (a single malformed rule, filter or saved-header record) never become a
/// `StateError`; they are logged at the row boundary and counted in the
/// operation summary instead.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: malformed {tag} record: {reason}")]
    MalformedRecord {
        line: usize,
        tag: String,
        reason: String,
    },

    #[error("line {line}: malformed exchange record: {reason}")]
    MalformedExchange { line: usize, reason: String },

    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl StateError {
    pub(crate) fn malformed(line: usize, tag: &str, reason: impl std::fmt::Display) -> Self {
        StateError::MalformedRecord {
            line,
            tag: tag.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn exchange(line: usize, reason: impl std::fmt::Display) -> Self {
        StateError::MalformedExchange {
            line,
            reason: reason.to_string(),
        }
    }
}
