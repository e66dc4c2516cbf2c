//! Bill field extraction module.

mod extractor;
pub mod filter;
pub mod ranker;
pub mod rules;

pub use extractor::BillFieldExtractor;
pub use filter::{filter_fragments, BlockSelection, CombinedText};

use crate::models::fields::ExtractionReport;
use crate::models::fragment::TextFragment;

/// Trait for document field extractors.
pub trait DocumentExtractor {
    /// Extract fields from OCR fragments.
    fn extract(&self, fragments: &[TextFragment]) -> ExtractionReport;

    /// Extract fields from plain text, one fragment per non-empty line.
    fn extract_from_text(&self, text: &str) -> ExtractionReport;
}
