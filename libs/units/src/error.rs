//! Error types for listing parsing.

use thiserror::Error;

/// Errors that can occur when parsing `fleetctl` listing output.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A row did not have the expected number of columns.
    #[error("line {line}: expected {expected} columns, found {found}: {content:?}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
        content: String,
    },

    /// The same entry name appeared twice in one listing.
    #[error("duplicate entry '{0}' in listing")]
    DuplicateKey(String),

    /// A metadata column contained a pair without `=`.
    #[error("line {line}: invalid metadata pair '{pair}'")]
    InvalidMetadata { line: usize, pair: String },
}

impl ParseError {
    /// Returns true if this error was caused by a repeated entry name.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ParseError::DuplicateKey(_))
    }
}
