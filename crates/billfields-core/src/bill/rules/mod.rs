//! Rule-based candidate scanners and normalizers for bill fields.

pub mod amounts;
pub mod dates;
pub mod identifier;
pub mod patterns;

pub use amounts::{normalize_amount, AmountScanner};
pub use dates::{normalize_date, DateScanner};
pub use identifier::{normalize_identifier, IdentifierScanner};
pub use patterns::{KeywordMatch, KeywordSet, NamedPattern, PatternLibrary, PatternRole};

use tracing::debug;

use crate::models::fields::{FieldCandidate, FieldKind};

use super::filter::BlockSelection;

/// A match found by one pattern, before it becomes a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    /// Matched text.
    pub raw: String,
    /// Byte offset of the match in the scanned text.
    pub start: usize,
    /// Keyword that put the match in context.
    pub keyword: Option<String>,
    /// Specificity rank derived from the pattern role and pass.
    pub rank: u8,
}

/// Trait for per-field candidate scanners.
///
/// Scanning runs in two passes. The keyword-gated pass looks at each trusted
/// fragment on its own and yields at most one match per fragment. If that
/// leaves slots unfilled, the combined pass scans the space-joined text
/// without keyword gating.
pub trait CandidateScanner {
    /// The kind of candidate this scanner produces.
    fn kind(&self) -> FieldKind;

    /// How many distinct values the field kind fills.
    fn slots(&self) -> usize {
        1
    }

    /// Keyword that opens a fragment for the keyword-gated pass.
    fn gate_keyword(&self, library: &PatternLibrary, text: &str) -> Option<KeywordMatch> {
        library.keywords(self.kind()).find(text)
    }

    /// Keyword-gated scan of one fragment: first pattern in priority order
    /// that matches wins.
    fn scan_fragment(&self, library: &PatternLibrary, text: &str) -> Option<PatternMatch> {
        let gate = self.gate_keyword(library, text)?;
        let keywords = library.keywords(self.kind());

        for pattern in library.patterns(self.kind()) {
            let found = match pattern.role {
                PatternRole::Specific => find_specific(pattern, text).into_iter().next(),
                PatternRole::KeywordAnchored => find_anchored(pattern, keywords, text).into_iter().next(),
                PatternRole::Generic => pattern.regex.find(text).map(|m| PatternMatch {
                    raw: m.as_str().trim().to_string(),
                    start: m.start(),
                    keyword: Some(gate.keyword.clone()),
                    rank: 1,
                }),
                PatternRole::ContextFree => None,
            };
            if let Some(found) = found {
                debug!("{:?} pattern {} matched {:?}", self.kind(), pattern.name, found.raw);
                return Some(found);
            }
        }

        None
    }

    /// Scan of the combined text, every pattern, every match.
    fn scan_combined(&self, library: &PatternLibrary, text: &str) -> Vec<PatternMatch> {
        let keywords = library.keywords(self.kind());
        let mut found = Vec::new();

        for pattern in library.patterns(self.kind()) {
            match pattern.role {
                PatternRole::Specific => found.extend(find_specific(pattern, text)),
                PatternRole::KeywordAnchored => found.extend(find_anchored(pattern, keywords, text)),
                PatternRole::Generic | PatternRole::ContextFree => {
                    found.extend(pattern.regex.find_iter(text).map(|m| PatternMatch {
                        raw: m.as_str().trim().to_string(),
                        start: m.start(),
                        keyword: None,
                        rank: 2,
                    }))
                }
            }
        }

        found
    }

    /// Run both passes and return candidates in discovery order.
    fn scan(&self, library: &PatternLibrary, selection: &BlockSelection<'_>) -> Vec<FieldCandidate> {
        let kind = self.kind();
        let mut candidates: Vec<FieldCandidate> = Vec::new();

        for (index, fragment) in &selection.trusted {
            if let Some(found) = self.scan_fragment(library, &fragment.text) {
                candidates.push(into_candidate(kind, found, fragment.confidence).with_source(*index));
            }
        }

        if distinct_values(&candidates) >= self.slots() {
            return candidates;
        }

        let combined = selection.combined_text();
        for found in self.scan_combined(library, &combined.text) {
            if candidates.iter().any(|c| c.raw_value == found.raw) {
                continue;
            }
            let confidence = combined.fragment_at(found.start).map(|(_, c)| c).unwrap_or(0.0);
            candidates.push(into_candidate(kind, found, confidence).with_low_trust(selection.degraded));
        }

        debug!("{:?}: {} candidates", kind, candidates.len());
        candidates
    }
}

fn into_candidate(kind: FieldKind, found: PatternMatch, confidence: f32) -> FieldCandidate {
    let mut candidate = FieldCandidate::new(kind, found.raw, confidence).with_rank(found.rank);
    if let Some(keyword) = found.keyword {
        candidate = candidate.with_keyword(keyword);
    }
    candidate
}

fn distinct_values(candidates: &[FieldCandidate]) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for c in candidates {
        if !seen.contains(&c.raw_value.as_str()) {
            seen.push(&c.raw_value);
        }
    }
    seen.len()
}

/// Matches of a phrase pattern. The value comes from the `value` group (or
/// group 1), the keyword from the `keyword` group when the pattern has one.
fn find_specific(pattern: &NamedPattern, text: &str) -> Vec<PatternMatch> {
    pattern
        .regex
        .captures_iter(text)
        .filter_map(|caps| {
            let value = caps.name("value").or_else(|| caps.get(1))?;
            let keyword = caps
                .name("keyword")
                .map(|k| k.as_str().to_lowercase())
                .unwrap_or_else(|| pattern.name.to_string());
            Some(PatternMatch {
                raw: value.as_str().trim().to_string(),
                start: value.start(),
                keyword: Some(keyword),
                rank: 0,
            })
        })
        .collect()
}

/// Matches of an anchored pattern right after each keyword occurrence.
fn find_anchored(pattern: &NamedPattern, keywords: &KeywordSet, text: &str) -> Vec<PatternMatch> {
    keywords
        .find_iter(text)
        .filter_map(|kw| {
            let rest = &text[kw.end..];
            let caps = pattern.regex.captures(rest)?;
            let value = caps.name("value").or_else(|| caps.get(1))?;
            Some(PatternMatch {
                raw: value.as_str().trim().to_string(),
                start: kw.end + value.start(),
                keyword: Some(kw.keyword),
                rank: 1,
            })
        })
        .collect()
}
