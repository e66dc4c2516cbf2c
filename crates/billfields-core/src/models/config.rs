//! Configuration structures for the extraction engine.

use serde::{Deserialize, Serialize};

use super::schema::{default_schemas, DocumentTypeSchema};

/// Main configuration for billfields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillConfig {
    /// Extraction behaviour.
    pub extraction: ExtractionConfig,

    /// Keyword tables, per language.
    pub keywords: KeywordConfig,

    /// Document-type registry, in detection order.
    pub schemas: Vec<DocumentTypeSchema>,
}

impl Default for BillConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            keywords: KeywordConfig::default(),
            schemas: default_schemas(),
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum fragment confidence for keyword-gated scanning (0.0 - 1.0).
    pub confidence_threshold: f32,

    /// Scan the unfiltered fragments when none pass the threshold.
    pub unfiltered_fallback: bool,

    /// chrono templates tried, in order, when a date cannot be read
    /// component by component.
    pub date_formats: Vec<String>,

    /// Assign dates to issue/due slots by the keyword next to them instead
    /// of by discovery order.
    pub bind_date_keywords: bool,

    /// Validate fields against the detected document type.
    pub validate_document: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            unfiltered_fallback: true,
            date_formats: default_date_formats(),
            bind_date_keywords: false,
            validate_document: true,
        }
    }
}

/// Templates are applied after month names have been turned into numbers
/// and every separator into `-`.
pub fn default_date_formats() -> Vec<String> {
    ["%d-%m-%Y", "%Y-%m-%d", "%m-%d-%Y", "%d-%m-%y", "%m-%d-%y", "%Y%m%d"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Keywords for one field, split by language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageKeywords {
    /// Spanish keywords.
    pub es: Vec<String>,
    /// English keywords.
    pub en: Vec<String>,
}

impl LanguageKeywords {
    fn of(es: &[&str], en: &[&str]) -> Self {
        Self {
            es: es.iter().map(|s| s.to_string()).collect(),
            en: en.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// All keywords, Spanish first.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.es.iter().chain(self.en.iter()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.es.is_empty() && self.en.is_empty()
    }
}

/// Keyword tables consulted by the scanners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Keywords that introduce an issue date.
    pub issue_date: LanguageKeywords,

    /// Keywords that introduce a due date.
    pub due_date: LanguageKeywords,

    /// Keywords that introduce a total amount.
    pub total: LanguageKeywords,

    /// Labels that introduce a customer identifier.
    pub identifier: LanguageKeywords,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            issue_date: LanguageKeywords::of(
                &["fecha", "emisión", "emision", "expedición", "expedicion", "expedida", "generada", "emitido"],
                &["date", "issued", "generated"],
            ),
            due_date: LanguageKeywords::of(
                &[
                    "vencimiento", "vence", "límite", "limite", "plazo", "pagar hasta",
                    "pago oportuno", "antes de",
                ],
                &["due", "pay by"],
            ),
            total: LanguageKeywords::of(
                &["total", "importe", "monto", "suma", "pagar", "valor", "balance"],
                &["amount", "due", "balance", "pay"],
            ),
            identifier: LanguageKeywords::of(
                &[
                    "nit", "matrícula", "matricula", "código", "codigo", "identificación",
                    "identificacion", "documento", "contrato", "referencia", "cuenta",
                ],
                &["id", "account", "customer number", "reference"],
            ),
        }
    }
}

impl BillConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
