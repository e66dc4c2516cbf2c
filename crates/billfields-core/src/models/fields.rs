//! Extracted field models: candidates, canonical field map, and the
//! per-document report.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BillError;

use super::schema::ValidationReport;

/// The kind of value a candidate holds, which selects its normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Date,
    Amount,
    Identifier,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Date => "date",
            FieldKind::Amount => "amount",
            FieldKind::Identifier => "identifier",
        }
    }
}

/// Canonical output field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldName {
    /// Issue date (fecha de expedición).
    IssueDate,
    /// Payment due date (fecha de vencimiento).
    DueDate,
    /// Total amount to pay.
    Total,
    /// Customer identifier / registration number.
    Identifier,
}

impl FieldName {
    pub const ALL: [FieldName; 4] = [
        FieldName::IssueDate,
        FieldName::DueDate,
        FieldName::Total,
        FieldName::Identifier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::IssueDate => "fecha_expedicion",
            FieldName::DueDate => "fecha_vencimiento",
            FieldName::Total => "total",
            FieldName::Identifier => "identificacion",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldName::IssueDate | FieldName::DueDate => FieldKind::Date,
            FieldName::Total => FieldKind::Amount,
            FieldName::Identifier => FieldKind::Identifier,
        }
    }
}

impl FromStr for FieldName {
    type Err = BillError;

    /// Parse a canonical field name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| BillError::Config(format!("unknown field name: {}", s)))
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A regex match for a target field, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    /// Which normalizer applies.
    pub field_kind: FieldKind,

    /// Matched text as it appeared in the source.
    pub raw_value: String,

    /// Index of the fragment the match came from; `None` when it was found in
    /// the combined text.
    pub source_fragment: Option<usize>,

    /// Keyword found alongside the match, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,

    /// Whether the match was found next to a field keyword.
    pub has_context_keyword: bool,

    /// 0 = phrase-specific pattern, 1 = keyword-context generic, 2 = context-free.
    pub specificity_rank: u8,

    /// Confidence of the fragment the match came from.
    pub confidence: f32,

    /// Found in fragments that did not pass the confidence filter.
    #[serde(default)]
    pub low_trust: bool,
}

impl FieldCandidate {
    pub fn new(field_kind: FieldKind, raw_value: impl Into<String>, confidence: f32) -> Self {
        Self {
            field_kind,
            raw_value: raw_value.into(),
            source_fragment: None,
            keyword: None,
            has_context_keyword: false,
            specificity_rank: 2,
            confidence,
            low_trust: false,
        }
    }

    pub fn with_source(mut self, index: usize) -> Self {
        self.source_fragment = Some(index);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self.has_context_keyword = true;
        self
    }

    pub fn with_rank(mut self, rank: u8) -> Self {
        self.specificity_rank = rank;
        self
    }

    pub fn with_low_trust(mut self, low_trust: bool) -> Self {
        self.low_trust = low_trust;
        self
    }
}

/// Canonical field name to normalized value. A missing key means the field
/// was not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFields(BTreeMap<String, String>);

impl ExtractedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FieldName, value: impl Into<String>) {
        self.0.insert(field.as_str().to_string(), value.into());
    }

    pub fn get(&self, field: FieldName) -> Option<&str> {
        self.0.get(field.as_str()).map(String::as_str)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// What the ranker did with a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CandidateOutcome {
    /// Normalized and placed in the named field.
    Selected(String),
    /// Normalized fine but a higher-ranked candidate won.
    Outranked,
    /// Normalized to a value already taken by another slot.
    Duplicate,
    /// Normalization failed.
    Rejected(String),
}

/// Diagnostic record of one candidate, for test assertions and debug panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrace {
    pub raw_value: String,
    pub specificity_rank: u8,
    pub has_context_keyword: bool,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    pub outcome: CandidateOutcome,
}

impl CandidateTrace {
    pub fn new(candidate: &FieldCandidate, normalized: Option<String>, outcome: CandidateOutcome) -> Self {
        Self {
            raw_value: candidate.raw_value.clone(),
            specificity_rank: candidate.specificity_rank,
            has_context_keyword: candidate.has_context_keyword,
            confidence: candidate.confidence,
            normalized,
            outcome,
        }
    }
}

/// Result of extracting one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Canonical fields that were found.
    pub fields: ExtractedFields,

    /// Detected document type, if any schema keyword matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,

    /// Schema validation outcome for the detected type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,

    /// Every candidate considered, keyed by field kind, in rank order.
    pub candidates: BTreeMap<String, Vec<CandidateTrace>>,

    /// No fragment passed the confidence filter; fields came from the
    /// unfiltered fragments.
    pub degraded: bool,

    /// Mean confidence of the fragments used.
    pub confidence: f32,
}
