//! Error types for the ledger classifier.
//!
//! Two layers: [`ClassifierError`] aborts a call (bad catalog, unreadable input),
//! while [`RecordError`] is captured on a single record's result and never
//! interrupts a batch.

use crate::catalog::Category;
use thiserror::Error;

/// Result type alias for fallible engine operations
pub type Result<T> = std::result::Result<T, ClassifierError>;

/// Errors that abort an engine call.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Failed to open or read an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing or writing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input file parsed but does not hold a list of records
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The rule catalog is empty or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A command line argument could not be interpreted
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: ledger-classifier <input.csv|input.json> [--catalog <catalog.json>] [--threshold <value>] [--accuracy <value>] [--json]")]
    MissingArgument,
}

/// Reasons a single record ends up in the `failed` bucket.
///
/// The `Display` text is what gets stored in a result's `errors` list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// The input element is not a mapping or carries no recognizable field
    #[error("malformed record: {0}")]
    Malformed(String),

    /// A required field is absent
    #[error("missing {0}")]
    MissingField(&'static str),

    /// A required field is present but cannot be interpreted
    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    /// Amount is exactly zero, so the sign cannot route it to a category
    #[error("zero amount")]
    ZeroAmount,

    /// The catalog has no active subject for the record's category
    #[error("no candidate accounts for category {0}")]
    NoCandidates(Category),

    /// No candidate reached the uncertain floor
    #[error("no confident match")]
    NoConfidentMatch,
}
