//! Core library for utility bill field extraction from OCR output.
//!
//! This crate provides:
//! - Confidence filtering of OCR text fragments
//! - Date, amount and identifier candidate scanning (Spanish and English)
//! - Date and amount normalization to canonical strings
//! - Candidate ranking, document type detection and schema validation

pub mod bill;
pub mod error;
pub mod models;

pub use bill::rules::{normalize_amount, normalize_date, normalize_identifier, PatternLibrary};
pub use bill::{BillFieldExtractor, DocumentExtractor};
pub use error::{BillError, ExtractionError, Result};
pub use models::config::{BillConfig, ExtractionConfig, KeywordConfig};
pub use models::fields::{
    CandidateOutcome, CandidateTrace, ExtractedFields, ExtractionReport, FieldCandidate, FieldKind, FieldName,
};
pub use models::fragment::{fragments_from_value, locate, Region, TextFragment};
pub use models::schema::{DocumentTypeSchema, SchemaRegistry, ValidationReport};
