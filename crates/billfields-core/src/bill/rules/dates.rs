//! Date scanning and normalization for Spanish and English bills.

use chrono::NaiveDate;
use tracing::warn;

use crate::error::ExtractionError;
use crate::models::fields::FieldKind;

use super::patterns::{KeywordMatch, PatternLibrary};
use super::CandidateScanner;

/// Date candidate scanner. Fills the issue and due date slots.
pub struct DateScanner;

impl CandidateScanner for DateScanner {
    fn kind(&self) -> FieldKind {
        FieldKind::Date
    }

    fn slots(&self) -> usize {
        2
    }

    // "Fecha de vencimiento" carries both kinds of keyword; the due one is
    // the one that says which slot the date belongs to.
    fn gate_keyword(&self, library: &PatternLibrary, text: &str) -> Option<KeywordMatch> {
        library
            .due_date_keywords()
            .find(text)
            .or_else(|| library.issue_date_keywords().find(text))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Digits(String),
    Month(u32),
}

impl Part {
    fn value(&self) -> Option<u32> {
        match self {
            Part::Digits(s) => s.parse().ok(),
            Part::Month(m) => Some(*m),
        }
    }

    fn is_year(&self) -> bool {
        matches!(self, Part::Digits(s) if s.len() == 4)
    }

    /// Year value; only a 2-digit token gets a century.
    fn year(&self) -> Option<i32> {
        match self {
            Part::Digits(s) if s.len() == 2 => Some(expand_year(s.parse().ok()?)),
            _ => self.value().map(|y| y as i32),
        }
    }

    fn translated(&self) -> String {
        match self {
            Part::Digits(s) => s.clone(),
            Part::Month(m) => format!("{:02}", m),
        }
    }
}

/// Words that can sit between date components and carry no value.
const FILLER: &[&str] = &["st", "nd", "rd", "th", "de", "del", "of", "the"];

/// Convert a raw date match to `YYYY-MM-DD`.
///
/// Components are read day first unless the first one is a 4-digit year
/// (year-month-day) or a month name (month-day-year). When that does not
/// give a real calendar date, the components are joined with `-` and each
/// template in `formats` is tried in order.
pub fn normalize_date(raw: &str, formats: &[String]) -> Result<String, ExtractionError> {
    let lowered = raw.trim().to_lowercase();
    let parts = split_parts(&lowered);

    if let Some(date) = read_components(&parts) {
        return Ok(date.format("%Y-%m-%d").to_string());
    }

    let joined = parts.iter().map(Part::translated).collect::<Vec<_>>().join("-");
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&joined, format).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .ok_or_else(|| ExtractionError::DateFormat {
            input: raw.to_string(),
        })
}

fn split_parts(text: &str) -> Vec<Part> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        let continues = current
            .chars()
            .last()
            .map(|last| last.is_ascii_digit() == c.is_ascii_digit())
            .unwrap_or(true);
        if !c.is_alphanumeric() || !continues {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        }
        if c.is_alphanumeric() {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
        .into_iter()
        .filter(|t| !FILLER.contains(&t.as_str()))
        .map(|t| {
            if t.chars().all(|c| c.is_ascii_digit()) {
                Part::Digits(t)
            } else {
                Part::Month(month_to_number(&t).unwrap_or_else(|| {
                    warn!("Unrecognized month {:?}, using 01", t);
                    1
                }))
            }
        })
        .collect()
}

fn read_components(parts: &[Part]) -> Option<NaiveDate> {
    let [first, second, third] = parts else {
        return None;
    };

    let (year, month, day) = if first.is_year() {
        (first, second, third)
    } else if matches!(first, Part::Month(_)) {
        (third, first, second)
    } else {
        (third, second, first)
    };

    NaiveDate::from_ymd_opt(year.year()?, month.value()?, day.value()?)
}

fn expand_year(year: i32) -> i32 {
    if year < 50 { 2000 + year } else { 1900 + year }
}

fn month_to_number(month: &str) -> Option<u32> {
    let number = match month {
        "enero" | "ene" | "january" | "jan" => 1,
        "febrero" | "feb" | "february" => 2,
        "marzo" | "mar" | "march" => 3,
        "abril" | "abr" | "april" | "apr" => 4,
        "mayo" | "may" => 5,
        "junio" | "jun" | "june" => 6,
        "julio" | "jul" | "july" => 7,
        "agosto" | "ago" | "august" | "aug" => 8,
        "septiembre" | "setiembre" | "sep" | "sept" | "set" | "september" => 9,
        "octubre" | "oct" | "october" => 10,
        "noviembre" | "nov" | "november" => 11,
        "diciembre" | "dic" | "december" | "dec" => 12,
        _ => return None,
    };
    Some(number)
}
