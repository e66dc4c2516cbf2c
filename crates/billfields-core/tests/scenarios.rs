//! End-to-end extraction over OCR dumps.

use billfields_core::{
    normalize_amount, normalize_date, BillError, BillFieldExtractor, DocumentExtractor, ExtractedFields,
    ExtractionError, FieldName, TextFragment,
};
use billfields_core::models::config::default_date_formats;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn extract(value: Value) -> ExtractedFields {
    BillFieldExtractor::new().extract_value(&value).unwrap().fields
}

fn expected(pairs: &[(&str, &str)]) -> ExtractedFields {
    pairs.iter().copied().collect()
}

#[test]
fn issue_date_with_abbreviated_month_and_total() {
    let fields = extract(json!([
        {"text": "Fecha de la factura: 18-Abr-2024", "confidence": 0.95},
        {"text": "TOTAL A PAGAR: $8,640", "confidence": 0.98}
    ]));

    assert_eq!(fields, expected(&[("fecha_expedicion", "2024-04-18"), ("total", "8640.00")]));
}

#[test]
fn registration_number_and_issue_date() {
    let fields = extract(json!([
        {"text": "MATRÍCULA >> 2121717", "confidence": 0.98},
        {"text": "Fecha de Emisión: 17/MAY/2024", "confidence": 0.97}
    ]));

    assert_eq!(fields.get(FieldName::Identifier), Some("2121717"));
    assert_eq!(fields.get(FieldName::IssueDate), Some("2024-05-17"));
}

#[test]
fn dot_decimal_total() {
    let fields = extract(json!([{"text": "Total a pagar: $1,234.56", "confidence": 0.95}]));
    assert_eq!(fields, expected(&[("total", "1234.56")]));
}

#[test]
fn comma_decimal_total() {
    let fields = extract(json!([{"text": "TOTAL: $1.234,56", "confidence": 0.95}]));
    assert_eq!(fields, expected(&[("total", "1234.56")]));
}

#[test]
fn null_input_is_invalid() {
    let err = BillFieldExtractor::new().extract_value(&Value::Null).unwrap_err();
    assert!(matches!(err, BillError::Extraction(ExtractionError::InvalidInput(_))));
}

#[test]
fn empty_input_yields_empty_fields() {
    assert!(extract(json!([])).is_empty());
}

#[test]
fn whitespace_fragments_yield_empty_fields() {
    let extractor = BillFieldExtractor::new();
    let fragments = vec![TextFragment::new("   ", 0.9), TextFragment::new("", 0.9)];

    assert!(extractor.extract(&fragments).fields.is_empty());
    assert!(extractor.extract_from_text("  \n\t\n").fields.is_empty());
}

#[test]
fn low_confidence_document_still_extracts() {
    let extractor = BillFieldExtractor::new();
    let fragments = vec![
        TextFragment::new("TOTAL A PAGAR: $8,640", 0.30),
        TextFragment::new("Fecha límite de pago 03/05/2024", 0.25),
    ];

    let report = extractor.extract(&fragments);
    assert!(report.degraded);
    assert_eq!(report.fields.get(FieldName::Total), Some("8640.00"));
    assert_eq!(report.fields.get(FieldName::IssueDate), Some("2024-05-03"));
}

#[test]
fn extracted_values_are_stable_under_renormalization() {
    let fields = extract(json!([
        {"text": "Fecha de emisión: 18 de abril de 2024", "confidence": 0.9},
        {"text": "Pague antes de: 3-May-24", "confidence": 0.9},
        {"text": "Valor a pagar $ 23.286", "confidence": 0.9}
    ]));

    let formats = default_date_formats();
    for field in [FieldName::IssueDate, FieldName::DueDate] {
        let value = fields.get(field).unwrap();
        assert_eq!(normalize_date(value, &formats).unwrap(), value);
    }
    let total = fields.get(FieldName::Total).unwrap();
    assert_eq!(normalize_amount(total).unwrap(), total);
}

#[test]
fn report_serializes_for_display() {
    let report = BillFieldExtractor::new()
        .extract_value(&json!([{"text": "TOTAL: $1.234,56", "confidence": 0.95}]))
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["fields"], json!({"total": "1234.56"}));
    assert_eq!(json["candidates"]["amount"][0]["outcome"]["status"], "selected");
    assert_eq!(json["candidates"]["amount"][0]["outcome"]["detail"], "total");
    assert_eq!(json["degraded"], false);
}
