//! Bill field extractor: filter, scan, rank, detect and validate.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{BillError, Result};
use crate::models::config::BillConfig;
use crate::models::fields::{ExtractedFields, ExtractionReport, FieldKind, FieldName};
use crate::models::fragment::{fragments_from_value, TextFragment};
use crate::models::schema::SchemaRegistry;

use super::filter::BlockSelection;
use super::ranker::{fill_date_slots, fill_slots};
use super::rules::{AmountScanner, CandidateScanner, DateScanner, IdentifierScanner, PatternLibrary};
use super::DocumentExtractor;

/// Rule-based extractor for utility bills.
///
/// Holds only read-only tables, so one instance can serve any number of
/// documents from any number of threads.
#[derive(Debug, Clone)]
pub struct BillFieldExtractor {
    library: PatternLibrary,
    registry: SchemaRegistry,
    /// Minimum fragment confidence for keyword-gated scanning.
    confidence_threshold: f32,
    unfiltered_fallback: bool,
    bind_date_keywords: bool,
    validate_document: bool,
}

impl BillFieldExtractor {
    /// Create an extractor with the built-in tables and default settings.
    pub fn new() -> Self {
        let config = BillConfig::default();
        Self {
            library: PatternLibrary::default(),
            registry: SchemaRegistry::default(),
            confidence_threshold: config.extraction.confidence_threshold,
            unfiltered_fallback: config.extraction.unfiltered_fallback,
            bind_date_keywords: config.extraction.bind_date_keywords,
            validate_document: config.extraction.validate_document,
        }
    }

    /// Build an extractor from configuration, validating every table.
    pub fn from_config(config: &BillConfig) -> Result<Self> {
        let extraction = &config.extraction;
        if !(0.0..=1.0).contains(&extraction.confidence_threshold) {
            return Err(BillError::Config(format!(
                "confidence threshold {} outside [0, 1]",
                extraction.confidence_threshold
            )));
        }

        Ok(Self {
            library: PatternLibrary::new(&config.keywords, &extraction.date_formats)?,
            registry: SchemaRegistry::new(config.schemas.clone())?,
            confidence_threshold: extraction.confidence_threshold,
            unfiltered_fallback: extraction.unfiltered_fallback,
            bind_date_keywords: extraction.bind_date_keywords,
            validate_document: extraction.validate_document,
        })
    }

    /// Set the confidence threshold.
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Scan unfiltered fragments when none pass the threshold.
    pub fn with_unfiltered_fallback(mut self, fallback: bool) -> Self {
        self.unfiltered_fallback = fallback;
        self
    }

    /// Assign dates to slots by their keyword.
    pub fn with_date_keyword_binding(mut self, bind: bool) -> Self {
        self.bind_date_keywords = bind;
        self
    }

    /// Validate fields against the detected document type.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_document = validate;
        self
    }

    /// Replace the document-type registry.
    pub fn with_schemas(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Extract only the field map.
    pub fn extract_fields(&self, fragments: &[TextFragment]) -> ExtractedFields {
        self.extract(fragments).fields
    }

    /// Extract from an OCR dump as loaded from JSON.
    ///
    /// Fails with `InvalidInput` when the value is null or not an array;
    /// malformed elements are skipped.
    pub fn extract_value(&self, value: &Value) -> Result<ExtractionReport> {
        let fragments = fragments_from_value(value)?;
        Ok(self.extract(&fragments))
    }
}

impl Default for BillFieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for BillFieldExtractor {
    fn extract(&self, fragments: &[TextFragment]) -> ExtractionReport {
        let start = Instant::now();
        info!("Extracting fields from {} fragments", fragments.len());

        let selection = BlockSelection::new(fragments, self.confidence_threshold, self.unfiltered_fallback);
        let mut fields = ExtractedFields::new();
        let mut candidates = BTreeMap::new();

        let dates = DateScanner.scan(&self.library, &selection);
        candidates.insert(
            FieldKind::Date.as_str().to_string(),
            fill_date_slots(dates, &self.library, self.bind_date_keywords, &mut fields),
        );

        let amounts = AmountScanner.scan(&self.library, &selection);
        candidates.insert(
            FieldKind::Amount.as_str().to_string(),
            fill_slots(amounts, &[FieldName::Total], &self.library, &mut fields),
        );

        let identifiers = IdentifierScanner.scan(&self.library, &selection);
        candidates.insert(
            FieldKind::Identifier.as_str().to_string(),
            fill_slots(identifiers, &[FieldName::Identifier], &self.library, &mut fields),
        );

        let combined = selection.combined_text();
        let schema = self.registry.detect(&combined.text);
        let validation = schema
            .filter(|_| self.validate_document)
            .map(|s| s.validate(&fields, &self.library));

        if let Some(report) = &validation {
            if !report.is_valid {
                debug!("{} validation: {}", report.document_type, report.errors.join("; "));
            }
        }

        debug!(
            "Extracted {} fields (type {:?}) in {:?}",
            fields.len(),
            schema.map(|s| s.type_name.as_str()),
            start.elapsed()
        );

        ExtractionReport {
            fields,
            document_type: schema.map(|s| s.type_name.clone()),
            validation,
            candidates,
            degraded: selection.degraded,
            confidence: selection.mean_confidence(),
        }
    }

    fn extract_from_text(&self, text: &str) -> ExtractionReport {
        let fragments: Vec<TextFragment> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| TextFragment::new(line, 1.0))
            .collect();

        self.extract(&fragments)
    }
}
