//! Document-type schemas: which fields a bill category must carry and which
//! keywords identify it.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::bill::rules::PatternLibrary;
use crate::error::{BillError, Result};

use super::fields::{ExtractedFields, FieldName};

/// Required fields and identifying keywords for one bill category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeSchema {
    /// Type name (e.g. "AGUA").
    pub type_name: String,

    /// Canonical field names that must be present.
    pub required_fields: BTreeSet<String>,

    /// Lower-case keywords whose presence identifies this type.
    pub identifying_keywords: BTreeSet<String>,
}

impl DocumentTypeSchema {
    pub fn new<R, K>(type_name: impl Into<String>, required: R, keywords: K) -> Self
    where
        R: IntoIterator<Item = FieldName>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            required_fields: required.into_iter().map(|f| f.as_str().to_string()).collect(),
            identifying_keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether any identifying keyword occurs in the lower-cased text.
    pub fn matches(&self, text_lower: &str) -> bool {
        self.identifying_keywords
            .iter()
            .any(|k| text_lower.contains(k.as_str()))
    }

    /// Check the extracted fields against this schema.
    ///
    /// Missing required fields and present values that do not survive a
    /// second pass through their normalizer are reported as messages.
    pub fn validate(&self, fields: &ExtractedFields, library: &PatternLibrary) -> ValidationReport {
        let mut errors = Vec::new();

        for required in &self.required_fields {
            if !fields.contains(required) {
                errors.push(format!("missing required field: {}", required));
            }
        }

        for (key, value) in fields.iter() {
            let Ok(field) = key.parse::<FieldName>() else {
                continue;
            };
            match library.normalize(field.kind(), value) {
                Ok(again) if again == value => {}
                Ok(again) => errors.push(format!(
                    "malformed field {}: {:?} re-normalizes to {:?}",
                    key, value, again
                )),
                Err(e) => errors.push(format!("malformed field {}: {}", key, e)),
            }
        }

        ValidationReport {
            document_type: self.type_name.clone(),
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Outcome of validating one document against its schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub document_type: String,
    pub is_valid: bool,
    /// Human-readable problems, empty when valid.
    pub errors: Vec<String>,
}

/// Ordered, read-only set of document-type schemas.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: Vec<DocumentTypeSchema>,
}

impl SchemaRegistry {
    /// Build a registry, rejecting unknown field names, duplicate or empty
    /// type names, and schemas without usable keywords.
    pub fn new(schemas: Vec<DocumentTypeSchema>) -> Result<Self> {
        let mut seen = HashSet::new();

        for schema in &schemas {
            if schema.type_name.trim().is_empty() {
                return Err(BillError::Config("document type with empty name".to_string()));
            }
            if !seen.insert(schema.type_name.as_str()) {
                return Err(BillError::Config(format!(
                    "duplicate document type: {}",
                    schema.type_name
                )));
            }
            if schema.identifying_keywords.is_empty() {
                return Err(BillError::Config(format!(
                    "document type {} has no identifying keywords",
                    schema.type_name
                )));
            }
            if schema.identifying_keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(BillError::Config(format!(
                    "document type {} has an empty identifying keyword",
                    schema.type_name
                )));
            }
            if let Some(unknown) = schema
                .required_fields
                .iter()
                .find(|f| f.parse::<FieldName>().is_err())
            {
                return Err(BillError::Config(format!(
                    "document type {} requires unknown field {}",
                    schema.type_name, unknown
                )));
            }
        }

        // Keywords are matched against lower-cased text.
        let schemas = schemas
            .into_iter()
            .map(|mut s| {
                s.identifying_keywords = s
                    .identifying_keywords
                    .iter()
                    .map(|k| k.to_lowercase())
                    .collect();
                s
            })
            .collect();

        Ok(Self { schemas })
    }

    /// Registry with no document types; detection always yields `None`.
    pub fn empty() -> Self {
        Self { schemas: Vec::new() }
    }

    pub fn schemas(&self) -> &[DocumentTypeSchema] {
        &self.schemas
    }

    pub fn get(&self, type_name: &str) -> Option<&DocumentTypeSchema> {
        self.schemas.iter().find(|s| s.type_name == type_name)
    }

    /// First schema, in registry order, with a keyword in the text.
    pub fn detect(&self, text: &str) -> Option<&DocumentTypeSchema> {
        let lower = text.to_lowercase();
        self.schemas.iter().find(|s| s.matches(&lower))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self {
            schemas: default_schemas(),
        }
    }
}

/// Built-in utility bill categories.
pub fn default_schemas() -> Vec<DocumentTypeSchema> {
    use FieldName::*;

    vec![
        DocumentTypeSchema::new(
            "GAS",
            [Identifier, IssueDate, DueDate, Total],
            ["gas natural", "consumo de gas", "efigas"],
        ),
        DocumentTypeSchema::new(
            "LUZ",
            [Identifier, IssueDate, Total],
            ["energía eléctrica", "energia electrica", "consumo de energía", "alumbrado"],
        ),
        DocumentTypeSchema::new(
            "AGUA",
            [IssueDate, DueDate, Total],
            ["acueducto", "consumo de agua", "alcantarillado"],
        ),
        DocumentTypeSchema::new(
            "TELEFONO",
            [IssueDate, Total],
            [
                "plan móvil",
                "plan movil",
                "telefonía",
                "telefonia",
                "minutos",
                "telecomunicaciones",
            ],
        ),
        DocumentTypeSchema::new(
            "INTERNET",
            [IssueDate, Total],
            ["megabytes", "fibra óptica", "fibra optica", "banda ancha", "telecomunicaciones"],
        ),
    ]
}
