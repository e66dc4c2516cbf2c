//! Candidate ranking and field assembly.

use tracing::debug;

use crate::models::fields::{CandidateOutcome, CandidateTrace, ExtractedFields, FieldCandidate, FieldName};

use super::rules::PatternLibrary;

/// Sort candidates best first: specific patterns, then keyword context, then
/// trusted fragments, then confidence. Ties keep discovery order.
pub fn rank(candidates: &mut [FieldCandidate]) {
    candidates.sort_by(|a, b| {
        a.specificity_rank
            .cmp(&b.specificity_rank)
            .then_with(|| b.has_context_keyword.cmp(&a.has_context_keyword))
            .then_with(|| a.low_trust.cmp(&b.low_trust))
            .then_with(|| b.confidence.total_cmp(&a.confidence))
    });
}

/// Rank the candidates and fill `slots` in order with distinct normalized
/// values.
///
/// A candidate that fails normalization is skipped and the next one is
/// tried. Slots left without a value stay out of `fields`.
pub fn fill_slots(
    mut candidates: Vec<FieldCandidate>,
    slots: &[FieldName],
    library: &PatternLibrary,
    fields: &mut ExtractedFields,
) -> Vec<CandidateTrace> {
    rank(&mut candidates);

    let mut taken: Vec<String> = Vec::with_capacity(slots.len());
    let mut traces = Vec::with_capacity(candidates.len());

    for candidate in &candidates {
        let trace = match library.normalize(candidate.field_kind, &candidate.raw_value) {
            Err(e) => {
                debug!("Rejected {:?}: {}", candidate.raw_value, e);
                CandidateTrace::new(candidate, None, CandidateOutcome::Rejected(e.to_string()))
            }
            Ok(value) if taken.contains(&value) => {
                CandidateTrace::new(candidate, Some(value), CandidateOutcome::Duplicate)
            }
            Ok(value) if taken.len() == slots.len() => {
                CandidateTrace::new(candidate, Some(value), CandidateOutcome::Outranked)
            }
            Ok(value) => {
                let slot = slots[taken.len()];
                debug!("{} = {:?} (from {:?})", slot, value, candidate.raw_value);
                fields.insert(slot, value.clone());
                taken.push(value.clone());
                CandidateTrace::new(candidate, Some(value), CandidateOutcome::Selected(slot.to_string()))
            }
        };
        traces.push(trace);
    }

    traces
}

/// Fill the issue and due date slots.
///
/// By default the best date is the issue date and the next distinct one the
/// due date. With `bind_keywords`, dates found next to a due-date keyword
/// compete only for the due slot and every other date for the issue slot.
pub fn fill_date_slots(
    candidates: Vec<FieldCandidate>,
    library: &PatternLibrary,
    bind_keywords: bool,
    fields: &mut ExtractedFields,
) -> Vec<CandidateTrace> {
    if !bind_keywords {
        return fill_slots(candidates, &[FieldName::IssueDate, FieldName::DueDate], library, fields);
    }

    let (due, issue): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|c| {
        c.keyword
            .as_deref()
            .is_some_and(|k| library.due_date_keywords().contains(k))
    });

    let mut traces = fill_slots(issue, &[FieldName::IssueDate], library, fields);
    traces.extend(fill_slots(due, &[FieldName::DueDate], library, fields));
    traces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields::FieldKind;
    use pretty_assertions::assert_eq;

    fn amount(raw: &str, confidence: f32) -> FieldCandidate {
        FieldCandidate::new(FieldKind::Amount, raw, confidence)
    }

    fn date(raw: &str, keyword: Option<&str>) -> FieldCandidate {
        let candidate = FieldCandidate::new(FieldKind::Date, raw, 0.9).with_rank(1);
        match keyword {
            Some(k) => candidate.with_keyword(k),
            None => candidate.with_rank(2),
        }
    }

    #[test]
    fn test_keyword_beats_confidence() {
        let library = PatternLibrary::default();
        let mut fields = ExtractedFields::new();

        let candidates = vec![
            amount("$99.000", 0.99).with_rank(1),
            amount("$8,640", 0.60).with_rank(1).with_keyword("total"),
        ];
        fill_slots(candidates, &[FieldName::Total], &library, &mut fields);

        assert_eq!(fields.get(FieldName::Total), Some("8640.00"));
    }

    #[test]
    fn test_specific_beats_keyword() {
        let library = PatternLibrary::default();
        let mut fields = ExtractedFields::new();

        let candidates = vec![
            amount("$100", 0.99).with_rank(1).with_keyword("total"),
            amount("$250", 0.50).with_rank(0).with_keyword("total a pagar"),
        ];
        let traces = fill_slots(candidates, &[FieldName::Total], &library, &mut fields);

        assert_eq!(fields.get(FieldName::Total), Some("250.00"));
        assert_eq!(traces[0].outcome, CandidateOutcome::Selected("total".to_string()));
        assert_eq!(traces[1].outcome, CandidateOutcome::Outranked);
        assert_eq!(traces[1].normalized.as_deref(), Some("100.00"));
    }

    #[test]
    fn test_low_trust_ranks_after_trusted() {
        let library = PatternLibrary::default();
        let mut fields = ExtractedFields::new();

        let candidates = vec![
            amount("$1", 0.99).with_low_trust(true),
            amount("$2", 0.40),
        ];
        fill_slots(candidates, &[FieldName::Total], &library, &mut fields);

        assert_eq!(fields.get(FieldName::Total), Some("2.00"));
    }

    #[test]
    fn test_falls_back_on_normalization_failure() {
        let library = PatternLibrary::default();
        let mut fields = ExtractedFields::new();

        let candidates = vec![
            date("31/02/2024", Some("fecha")),
            date("18/04/2024", Some("fecha")),
        ];
        let traces = fill_slots(candidates, &[FieldName::IssueDate], &library, &mut fields);

        assert_eq!(fields.get(FieldName::IssueDate), Some("2024-04-18"));
        assert!(matches!(traces[0].outcome, CandidateOutcome::Rejected(_)));
    }

    #[test]
    fn test_all_candidates_fail_leaves_slot_absent() {
        let library = PatternLibrary::default();
        let mut fields = ExtractedFields::new();

        let traces = fill_slots(vec![amount("$", 0.9)], &[FieldName::Total], &library, &mut fields);

        assert!(fields.is_empty());
        assert_eq!(traces.len(), 1);
    }

    #[test]
    fn test_dates_fill_in_order_with_distinct_values() {
        let library = PatternLibrary::default();
        let mut fields = ExtractedFields::new();

        let candidates = vec![
            date("18/04/2024", Some("fecha")),
            date("18-Abr-2024", None),
            date("03/05/2024", None),
        ];
        let traces = fill_date_slots(candidates, &library, false, &mut fields);

        assert_eq!(fields.get(FieldName::IssueDate), Some("2024-04-18"));
        assert_eq!(fields.get(FieldName::DueDate), Some("2024-05-03"));
        assert_eq!(traces[1].outcome, CandidateOutcome::Duplicate);
    }

    #[test]
    fn test_date_keyword_binding() {
        let library = PatternLibrary::default();

        let candidates = vec![
            date("03/05/2024", Some("vencimiento")),
            date("18/04/2024", Some("fecha")),
        ];

        let mut unbound = ExtractedFields::new();
        fill_date_slots(candidates.clone(), &library, false, &mut unbound);
        assert_eq!(unbound.get(FieldName::IssueDate), Some("2024-05-03"));

        let mut bound = ExtractedFields::new();
        fill_date_slots(candidates, &library, true, &mut bound);
        assert_eq!(bound.get(FieldName::IssueDate), Some("2024-04-18"));
        assert_eq!(bound.get(FieldName::DueDate), Some("2024-05-03"));
    }
}
