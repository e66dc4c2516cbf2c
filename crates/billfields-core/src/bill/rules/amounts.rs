//! Amount scanning and normalization.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ExtractionError;
use crate::models::fields::FieldKind;

use super::CandidateScanner;

/// Total amount candidate scanner.
pub struct AmountScanner;

impl CandidateScanner for AmountScanner {
    fn kind(&self) -> FieldKind {
        FieldKind::Amount
    }
}

/// Convert a raw amount match to a fixed two-decimal string.
///
/// Currency markers and spaces are dropped. When both `,` and `.` occur the
/// later one is the decimal separator. A lone comma is decimal only when at
/// most two digits follow it. Several dots and no comma are thousands
/// separators.
pub fn normalize_amount(raw: &str) -> Result<String, ExtractionError> {
    let error = || ExtractionError::AmountFormat {
        input: raw.to_string(),
    };

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(error());
    }

    let mut number = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(comma), None) if cleaned.len() - comma - 1 <= 2 => {
            format!("{}.{}", cleaned[..comma].replace(',', ""), &cleaned[comma + 1..])
        }
        (Some(_), None) => cleaned.replace(',', ""),
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    if number.ends_with('.') {
        number.pop();
    }
    if number.starts_with('.') {
        number.insert(0, '0');
    }

    let value = Decimal::from_str(&number).map_err(|_| error())?;
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(format!("{:.2}", rounded))
}
