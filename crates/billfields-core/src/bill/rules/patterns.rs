//! Pattern library: date, amount and identifier regexes plus the keyword
//! tables they are gated on.

use std::collections::HashMap;

use chrono::format::{Item, StrftimeItems};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{BillError, ExtractionError, Result};
use crate::models::config::{default_date_formats, KeywordConfig};
use crate::models::fields::FieldKind;

use super::{amounts, dates, identifier};

/// Amount body: grouped thousands with optional decimals, or a plain number.
const AMOUNT_NUMBER: &str = r"(?:\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?)\b";

/// Optional currency marker in front of an amount.
const CURRENCY: &str = r"(?:[$€£]|\b(?:cop|usd|eur)\b)";

const SPANISH_MONTHS: &str =
    "enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre";

const ENGLISH_MONTHS: &str =
    "january|february|march|april|may|june|july|august|september|october|november|december";

const SPANISH_MONTHS_ABBR: &str = "ene|feb|mar|abr|may|jun|jul|ago|sept?|set|oct|nov|dic";

const ENGLISH_MONTHS_ABBR: &str = "jan|feb|mar|apr|may|jun|jul|aug|sept?|oct|nov|dec";

lazy_static! {
    // Numeric dates: DD/MM/YYYY, DD-MM-YY, DD.MM.YYYY
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[/\-.](\d{1,2})[/\-.](\d{1,2})\b"
    ).unwrap();

    // "18 de abril de 2024", "18-Abril-2024"
    pub static ref DATE_SPANISH_LONG: Regex = Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:\s+de\s+|[\s/\-.]+)({})(?:\s+del?\s+|[\s/\-.,]+)(\d{{4}}|\d{{2}})\b",
        SPANISH_MONTHS
    )).unwrap();

    // "18 April 2024", "April 18th, 2024"
    pub static ref DATE_ENGLISH_LONG: Regex = Regex::new(&format!(
        r"(?i)\b(?:(\d{{1,2}})(?:st|nd|rd|th)?[\s/\-.]+({m})[\s/\-.,]+(\d{{4}})|({m})\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}}))\b",
        m = ENGLISH_MONTHS
    )).unwrap();

    // "18-Abr-2024", "17/MAY/2024", "18Abr'24"
    pub static ref DATE_SPANISH_ABBR: Regex = Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})[\s/\-.]*({})\.?[\s/\-.']*(\d{{4}}|\d{{2}})\b",
        SPANISH_MONTHS_ABBR
    )).unwrap();

    // "18 Apr 2024", "Apr 18, 2024"
    pub static ref DATE_ENGLISH_ABBR: Regex = Regex::new(&format!(
        r"(?i)\b(?:(\d{{1,2}})[\s/\-.]*({m})\.?[\s/\-.',]*(\d{{4}}|\d{{2}})|({m})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}}))\b",
        m = ENGLISH_MONTHS_ABBR
    )).unwrap();

    // High-precision total phrases: "total a pagar $8,640", "balance due 120.00"
    pub static ref AMOUNT_PHRASE: Regex = Regex::new(&format!(
        r"(?i)\b(?P<keyword>total\s+a\s+pagar|valor\s+(?:total\s+)?a\s+pagar|pago\s+total|valor\s+total|balance\s+due|amount\s+due|total\s+due)\b[\s:=>\-]*(?P<value>{c}?\s*{n})",
        c = CURRENCY,
        n = AMOUNT_NUMBER
    )).unwrap();

    // Amount immediately following a total keyword.
    pub static ref AMOUNT_AFTER_KEYWORD: Regex = Regex::new(&format!(
        r"(?i)^[\s:=>\-]*(?P<value>{c}?\s*{n})",
        c = CURRENCY,
        n = AMOUNT_NUMBER
    )).unwrap();

    // Amount with an explicit currency marker, anywhere.
    pub static ref AMOUNT_WITH_CURRENCY: Regex = Regex::new(&format!(
        r"(?i)(?P<value>{c}\s*{n})",
        c = CURRENCY,
        n = AMOUNT_NUMBER
    )).unwrap();
}

/// How a pattern is applied, which fixes the specificity rank of its matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternRole {
    /// Phrase pattern that embeds its own keyword; rank 0 in both passes.
    Specific,
    /// Matched only directly after a field keyword; rank 1.
    KeywordAnchored,
    /// Matched anywhere in a keyword fragment (rank 1) or in the combined
    /// text (rank 2).
    Generic,
    /// Matched only in the combined text; rank 2.
    ContextFree,
}

/// A compiled pattern with its registry name and role.
#[derive(Debug, Clone)]
pub struct NamedPattern {
    pub name: &'static str,
    pub role: PatternRole,
    pub regex: Regex,
}

impl NamedPattern {
    fn new(name: &'static str, role: PatternRole, regex: &Regex) -> Self {
        Self {
            name,
            role,
            regex: regex.clone(),
        }
    }
}

/// A keyword hit inside a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    /// The keyword, lower-cased as configured.
    pub keyword: String,
    pub start: usize,
    pub end: usize,
}

/// Case-insensitive keyword list compiled into one matcher.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    words: Vec<String>,
    matcher: Regex,
}

impl KeywordSet {
    pub fn new<'a>(name: &str, words: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut words: Vec<String> = words
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        words.sort();
        words.dedup();

        if words.is_empty() {
            return Err(BillError::Config(format!("{} keyword list is empty", name)));
        }

        // Longest first so "total a pagar" wins over "total".
        let mut ordered: Vec<&String> = words.iter().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let matcher = Regex::new(&format!(r"(?i)\b(?:{})", Self::alternation_of(&ordered)))
            .map_err(|e| BillError::Config(format!("{} keywords: {}", name, e)))?;

        Ok(Self { words, matcher })
    }

    fn alternation_of(words: &[&String]) -> String {
        words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Escaped alternation of all keywords, longest first.
    pub fn alternation(&self) -> String {
        let mut ordered: Vec<&String> = self.words.iter().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self::alternation_of(&ordered)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }

    /// First keyword occurrence in the text.
    pub fn find(&self, text: &str) -> Option<KeywordMatch> {
        self.find_iter(text).next()
    }

    pub fn find_iter<'t>(&'t self, text: &'t str) -> impl Iterator<Item = KeywordMatch> + 't {
        self.matcher.find_iter(text).map(|m| KeywordMatch {
            keyword: m.as_str().to_lowercase(),
            start: m.start(),
            end: m.end(),
        })
    }
}

/// Immutable pattern and keyword tables shared by every scanner.
///
/// Built once from configuration and passed by reference; nothing in it
/// changes while documents are processed.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    issue_date_keywords: KeywordSet,
    due_date_keywords: KeywordSet,
    date_keywords: KeywordSet,
    total_keywords: KeywordSet,
    identifier_keywords: KeywordSet,
    patterns: HashMap<FieldKind, Vec<NamedPattern>>,
    date_formats: Vec<String>,
}

impl PatternLibrary {
    pub fn new(keywords: &KeywordConfig, date_formats: &[String]) -> Result<Self> {
        let issue_date_keywords = KeywordSet::new("issue date", keywords.issue_date.all())?;
        let due_date_keywords = KeywordSet::new("due date", keywords.due_date.all())?;
        let date_keywords = KeywordSet::new(
            "date",
            keywords.issue_date.all().chain(keywords.due_date.all()),
        )?;
        let total_keywords = KeywordSet::new("total", keywords.total.all())?;
        let identifier_keywords = KeywordSet::new("identifier", keywords.identifier.all())?;

        for format in date_formats {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(BillError::Config(format!("invalid date format: {}", format)));
            }
        }

        let identifier_pattern = identifier::labelled_pattern(&identifier_keywords)?;

        let mut patterns = HashMap::new();
        patterns.insert(
            FieldKind::Date,
            vec![
                NamedPattern::new("date_dmy", PatternRole::Generic, &DATE_DMY),
                NamedPattern::new("date_ymd", PatternRole::Generic, &DATE_YMD),
                NamedPattern::new("date_spanish_long", PatternRole::Generic, &DATE_SPANISH_LONG),
                NamedPattern::new("date_english_long", PatternRole::Generic, &DATE_ENGLISH_LONG),
                NamedPattern::new("date_spanish_abbr", PatternRole::Generic, &DATE_SPANISH_ABBR),
                NamedPattern::new("date_english_abbr", PatternRole::Generic, &DATE_ENGLISH_ABBR),
            ],
        );
        patterns.insert(
            FieldKind::Amount,
            vec![
                NamedPattern::new("amount_phrase", PatternRole::Specific, &AMOUNT_PHRASE),
                NamedPattern::new("amount_after_keyword", PatternRole::KeywordAnchored, &AMOUNT_AFTER_KEYWORD),
                NamedPattern::new("amount_with_currency", PatternRole::ContextFree, &AMOUNT_WITH_CURRENCY),
            ],
        );
        patterns.insert(
            FieldKind::Identifier,
            vec![NamedPattern {
                name: "identifier_labelled",
                role: PatternRole::Specific,
                regex: identifier_pattern,
            }],
        );

        Ok(Self {
            issue_date_keywords,
            due_date_keywords,
            date_keywords,
            total_keywords,
            identifier_keywords,
            patterns,
            date_formats: date_formats.to_vec(),
        })
    }

    /// Ordered patterns for a field kind, highest priority first.
    pub fn patterns(&self, kind: FieldKind) -> &[NamedPattern] {
        self.patterns.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keywords that gate the per-fragment pass for a field kind.
    pub fn keywords(&self, kind: FieldKind) -> &KeywordSet {
        match kind {
            FieldKind::Date => &self.date_keywords,
            FieldKind::Amount => &self.total_keywords,
            FieldKind::Identifier => &self.identifier_keywords,
        }
    }

    pub fn issue_date_keywords(&self) -> &KeywordSet {
        &self.issue_date_keywords
    }

    pub fn due_date_keywords(&self) -> &KeywordSet {
        &self.due_date_keywords
    }

    pub fn date_formats(&self) -> &[String] {
        &self.date_formats
    }

    /// Run the normalizer for a field kind.
    pub fn normalize(&self, kind: FieldKind, raw: &str) -> std::result::Result<String, ExtractionError> {
        match kind {
            FieldKind::Date => dates::normalize_date(raw, &self.date_formats),
            FieldKind::Amount => amounts::normalize_amount(raw),
            FieldKind::Identifier => identifier::normalize_identifier(raw),
        }
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new(&KeywordConfig::default(), &default_date_formats())
            .expect("built-in keyword tables are valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::LanguageKeywords;

    #[test]
    fn test_keyword_set_prefers_longest() {
        let set = KeywordSet::new("t", ["total", "total a pagar"]).unwrap();
        let m = set.find("TOTAL A PAGAR: $8,640").unwrap();
        assert_eq!(m.keyword, "total a pagar");
        assert_eq!((m.start, m.end), (0, 13));
    }

    #[test]
    fn test_keyword_set_word_start() {
        let set = KeywordSet::new("t", ["total"]).unwrap();
        assert!(set.find("Subtotal 100").is_none());
        assert!(set.find("Totales 100").is_some());
    }

    #[test]
    fn test_keyword_set_rejects_empty() {
        assert!(KeywordSet::new("t", ["  "]).is_err());
    }

    #[test]
    fn test_keyword_set_escapes() {
        let set = KeywordSet::new("t", ["no."]).unwrap();
        assert!(set.find("no: 12").is_none());
        assert!(set.find("No. 12").is_some());
    }

    #[test]
    fn test_library_rejects_bad_date_format() {
        let result = PatternLibrary::new(&KeywordConfig::default(), &["%d-%Q".to_string()]);
        assert!(matches!(result, Err(BillError::Config(_))));
    }

    #[test]
    fn test_library_rejects_empty_keywords() {
        let mut keywords = KeywordConfig::default();
        keywords.total = LanguageKeywords::default();
        assert!(PatternLibrary::new(&keywords, &default_date_formats()).is_err());
    }

    #[test]
    fn test_registry_covers_every_kind() {
        let library = PatternLibrary::default();
        for kind in [FieldKind::Date, FieldKind::Amount, FieldKind::Identifier] {
            assert!(!library.patterns(kind).is_empty());
        }
        assert_eq!(library.patterns(FieldKind::Date)[0].name, "date_dmy");
    }

    #[test]
    fn test_date_patterns() {
        assert!(DATE_DMY.is_match("18/04/2024"));
        assert!(DATE_YMD.is_match("2024-04-18"));
        assert!(DATE_SPANISH_LONG.is_match("18 de abril de 2024"));
        assert!(DATE_ENGLISH_LONG.is_match("April 18th, 2024"));
        assert!(DATE_SPANISH_ABBR.is_match("18-Abr-2024"));
        assert!(DATE_SPANISH_ABBR.is_match("17/MAY/2024"));
        assert!(DATE_ENGLISH_ABBR.is_match("Apr 18, 2024"));
        assert!(!DATE_SPANISH_ABBR.is_match("18 marzo 2024"));
    }

    #[test]
    fn test_amount_phrase() {
        let caps = AMOUNT_PHRASE.captures("TOTAL A PAGAR: $ 23.286").unwrap();
        assert_eq!(&caps["keyword"], "TOTAL A PAGAR");
        assert_eq!(&caps["value"], "$ 23.286");

        let caps = AMOUNT_PHRASE.captures("Balance due 1,234.56").unwrap();
        assert_eq!(&caps["value"], "1,234.56");
    }

    #[test]
    fn test_amount_after_keyword_is_anchored() {
        assert!(AMOUNT_AFTER_KEYWORD.is_match(": $35,643"));
        assert!(!AMOUNT_AFTER_KEYWORD.is_match(" hasta: 27/MAY/2024"));
    }

    #[test]
    fn test_amount_with_currency() {
        let m = AMOUNT_WITH_CURRENCY.find("pague $1.234,56 hoy").unwrap();
        assert_eq!(m.as_str(), "$1.234,56");
        assert!(AMOUNT_WITH_CURRENCY.find("2121717").is_none());
    }
}
