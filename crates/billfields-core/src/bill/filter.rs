//! Confidence filtering of OCR fragments.

use tracing::warn;

use crate::models::fragment::TextFragment;

/// A fragment together with its position in the caller's sequence.
pub type IndexedFragment<'a> = (usize, &'a TextFragment);

/// Keep the fragments whose confidence reaches the threshold, in order.
pub fn filter_fragments(fragments: &[TextFragment], threshold: f32) -> Vec<IndexedFragment<'_>> {
    fragments
        .iter()
        .enumerate()
        .filter(|(_, f)| f.confidence >= threshold)
        .collect()
}

/// The fragment sets the scanners work on.
#[derive(Debug, Clone)]
pub struct BlockSelection<'a> {
    /// Fragments that passed the filter; the keyword-gated pass uses these.
    pub trusted: Vec<IndexedFragment<'a>>,

    /// Fragments the combined-text pass joins.
    pub combined: Vec<IndexedFragment<'a>>,

    /// Nothing passed the filter and `combined` holds unfiltered fragments.
    pub degraded: bool,
}

impl<'a> BlockSelection<'a> {
    /// Filter the fragments and pick the combined-text source.
    ///
    /// When no fragment passes and `fallback` is set, the combined pass runs
    /// over every fragment and the selection is marked degraded.
    pub fn new(fragments: &'a [TextFragment], threshold: f32, fallback: bool) -> Self {
        let trusted = filter_fragments(fragments, threshold);

        if trusted.is_empty() && !fragments.is_empty() && fallback {
            warn!(
                "No fragment reaches confidence {:.2}; extracting from {} unfiltered fragments",
                threshold,
                fragments.len()
            );
            return Self {
                trusted,
                combined: fragments.iter().enumerate().collect(),
                degraded: true,
            };
        }

        Self {
            combined: trusted.clone(),
            trusted,
            degraded: false,
        }
    }

    /// Join the combined fragments with single spaces.
    pub fn combined_text(&self) -> CombinedText {
        CombinedText::join(&self.combined)
    }

    /// Mean confidence of the fragments used, 0.0 when there are none.
    pub fn mean_confidence(&self) -> f32 {
        if self.combined.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.combined.iter().map(|(_, f)| f.confidence).sum();
        sum / self.combined.len() as f32
    }
}

/// Space-joined fragment text that remembers where each fragment landed.
#[derive(Debug, Clone, Default)]
pub struct CombinedText {
    pub text: String,
    spans: Vec<Span>,
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    index: usize,
    confidence: f32,
}

impl CombinedText {
    pub fn join(fragments: &[IndexedFragment<'_>]) -> Self {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(fragments.len());

        for (i, (index, fragment)) in fragments.iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            let start = text.len();
            text.push_str(&fragment.text);
            spans.push(Span {
                start,
                end: text.len(),
                index: *index,
                confidence: fragment.confidence,
            });
        }

        Self { text, spans }
    }

    /// Fragment index and confidence at a byte offset. Offsets on a joining
    /// space belong to the following fragment.
    pub fn fragment_at(&self, offset: usize) -> Option<(usize, f32)> {
        self.spans
            .iter()
            .find(|s| offset < s.end || (offset == s.end && s.start == s.end))
            .map(|s| (s.index, s.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fragments() -> Vec<TextFragment> {
        vec![
            TextFragment::new("MATRÍCULA >> 2121717", 0.98),
            TextFragment::new("ruido", 0.20),
            TextFragment::new("TOTAL $35,643", 0.99),
        ]
    }

    #[test]
    fn test_filter_by_threshold() {
        let fragments = fragments();
        let kept: Vec<usize> = filter_fragments(&fragments, 0.5).iter().map(|(i, _)| *i).collect();
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn test_filter_empty_input() {
        assert!(filter_fragments(&[], 0.5).is_empty());
        let selection = BlockSelection::new(&[], 0.5, true);
        assert!(!selection.degraded);
        assert!(selection.combined.is_empty());
    }

    #[test]
    fn test_selection_falls_back_when_all_low() {
        let fragments = vec![TextFragment::new("TOTAL A PAGAR: $100", 0.3)];

        let selection = BlockSelection::new(&fragments, 0.5, true);
        assert!(selection.trusted.is_empty());
        assert_eq!(selection.combined.len(), 1);
        assert!(selection.degraded);

        let selection = BlockSelection::new(&fragments, 0.5, false);
        assert!(selection.combined.is_empty());
        assert!(!selection.degraded);
    }

    #[test]
    fn test_combined_text_offsets() {
        let fragments = fragments();
        let selection = BlockSelection::new(&fragments, 0.5, true);
        let combined = selection.combined_text();

        assert_eq!(combined.text, "MATRÍCULA >> 2121717 TOTAL $35,643");
        let total = combined.text.find("TOTAL").unwrap();
        assert_eq!(combined.fragment_at(0), Some((0, 0.98)));
        assert_eq!(combined.fragment_at(total), Some((2, 0.99)));
        assert_eq!(combined.fragment_at(combined.text.len()), None);
    }

    #[test]
    fn test_mean_confidence() {
        let fragments = fragments();
        let selection = BlockSelection::new(&fragments, 0.5, true);
        assert!((selection.mean_confidence() - 0.985).abs() < 1e-6);
    }
}
