//! Error types for the billfields-core library.

use thiserror::Error;

/// Main error type for the billfields library.
#[derive(Error, Debug)]
pub enum BillError {
    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to field extraction and normalization.
///
/// Only `InvalidInput` ever reaches a caller of the extraction engine. The
/// format errors are produced by the normalizers and absorbed by the ranker,
/// which moves on to the next candidate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// The fragment sequence is absent or not a sequence.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A date candidate could not be normalized.
    #[error("unrecognized date format: {input:?}")]
    DateFormat { input: String },

    /// An amount candidate could not be normalized.
    #[error("unrecognized amount format: {input:?}")]
    AmountFormat { input: String },

    /// An identifier candidate could not be normalized.
    #[error("unrecognized identifier format: {input:?}")]
    IdentifierFormat { input: String },
}

/// Result type for the billfields library.
pub type Result<T> = std::result::Result<T, BillError>;
