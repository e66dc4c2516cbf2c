//! Customer identifier (NIT, matrícula, account number) scanning.

use regex::Regex;

use crate::error::{BillError, ExtractionError, Result};
use crate::models::fields::FieldKind;

use super::patterns::KeywordSet;
use super::CandidateScanner;

/// Identifier candidate scanner.
pub struct IdentifierScanner;

impl CandidateScanner for IdentifierScanner {
    fn kind(&self) -> FieldKind {
        FieldKind::Identifier
    }
}

/// Build the labelled identifier pattern for a keyword set.
///
/// Matches a label, an optional qualifier word ending in `:`, `#` or `>`
/// ("Nro de contrato:"), then a value made of letters, digits, dots and
/// dashes that holds at least one digit.
pub fn labelled_pattern(keywords: &KeywordSet) -> Result<Regex> {
    Regex::new(&format!(
        r"(?i)\b(?P<keyword>{})\w*(?:\s+(?:del?\s+)?[^\W\d_]+\s*[:#>])?[\s:#.>\-]*(?P<value>[a-z0-9\-.]*\d[a-z0-9\-]*)",
        keywords.alternation()
    ))
    .map_err(|e| BillError::Config(format!("identifier pattern: {}", e)))
}

/// Canonical identifier: upper case, without dots, spaces or edge dashes.
pub fn normalize_identifier(raw: &str) -> std::result::Result<String, ExtractionError> {
    let value: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .flat_map(char::to_uppercase)
        .collect();
    let value = value.trim_matches('-');

    let well_formed = value.len() >= 3
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

    if !well_formed {
        return Err(ExtractionError::IdentifierFormat {
            input: raw.to_string(),
        });
    }

    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bill::filter::BlockSelection;
    use crate::bill::rules::PatternLibrary;
    use crate::models::fragment::TextFragment;
    use pretty_assertions::assert_eq;

    fn first_value(text: &str) -> Option<String> {
        let library = PatternLibrary::default();
        let pattern = &library.patterns(FieldKind::Identifier)[0];
        pattern
            .regex
            .captures(text)
            .map(|caps| caps["value"].to_string())
    }

    #[test]
    fn test_labelled_values() {
        assert_eq!(first_value("MATRÍCULA >> 2121717").as_deref(), Some("2121717"));
        assert_eq!(first_value("NIT: 900.123.456-7").as_deref(), Some("900.123.456-7"));
        assert_eq!(first_value("Nro de contrato: AB-12345").as_deref(), Some("AB-12345"));
        assert_eq!(first_value("Código de cliente: AB-12345").as_deref(), Some("AB-12345"));
        assert_eq!(first_value("Cuenta # 4455").as_deref(), Some("4455"));
    }

    #[test]
    fn test_value_needs_digit() {
        assert_eq!(first_value("Referencia de pago"), None);
        assert_eq!(first_value("Total de la cuenta: $100"), None);
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("2121717").unwrap(), "2121717");
        assert_eq!(normalize_identifier("900.123.456-7").unwrap(), "900123456-7");
        assert_eq!(normalize_identifier("ab-123-").unwrap(), "AB-123");
        assert!(normalize_identifier("12").is_err());
        assert!(normalize_identifier("ABCD").is_err());
    }

    #[test]
    fn test_scan_identifier_fragment() {
        let library = PatternLibrary::default();
        let fragments = vec![
            TextFragment::new("Fecha de Emisión: 17/MAY/2024", 0.97),
            TextFragment::new("MATRÍCULA >> 2121717", 0.98),
        ];
        let selection = BlockSelection::new(&fragments, 0.5, true);

        let candidates = IdentifierScanner.scan(&library, &selection);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].raw_value, "2121717");
        assert_eq!(candidates[0].source_fragment, Some(1));
        assert_eq!(candidates[0].keyword.as_deref(), Some("matrícula"));
        assert_eq!(candidates[0].specificity_rank, 0);
    }
}
