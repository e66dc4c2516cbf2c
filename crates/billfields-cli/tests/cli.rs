use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn billfields(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("billfields").unwrap();
    // Keep every run away from the user's own configuration.
    let config = dir.join("config.json");
    if !config.exists() {
        fs::write(&config, "{}").unwrap();
    }
    cmd.arg("--config").arg(config);
    cmd
}

fn write_dump(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

const GAS_BILL: &str = r#"[
    {"text": "EFIGAS GAS NATURAL S.A. E.S.P.", "confidence": 0.99},
    {"text": "MATRÍCULA >> 2121717", "confidence": 0.98},
    {"text": "Fecha de Emisión: 17/MAY/2024", "confidence": 0.97},
    {"text": "TOTAL A PAGAR $35,643", "confidence": 0.97}
]"#;

#[test]
fn extract_json_dump() {
    let dir = TempDir::new().unwrap();
    let input = write_dump(
        dir.path(),
        "bill.json",
        r#"[{"text": "Fecha de la factura: 18-Abr-2024", "confidence": 0.95},
            {"text": "TOTAL A PAGAR: $8,640", "confidence": 0.98}]"#,
    );

    billfields(dir.path())
        .arg("extract")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#""fields":{"fecha_expedicion":"2024-04-18","total":"8640.00"}"#,
        ));
}

#[test]
fn extract_csv_output() {
    let dir = TempDir::new().unwrap();
    let input = write_dump(dir.path(), "gas.json", GAS_BILL);

    billfields(dir.path())
        .args(["extract", "--format", "csv"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "fecha_expedicion,fecha_vencimiento,total,identificacion,document_type,valid,confidence",
        ))
        .stdout(predicate::str::contains("2024-05-17,,35643.00,2121717,GAS,false"));
}

#[test]
fn extract_validate_reports_missing_fields() {
    let dir = TempDir::new().unwrap();
    let input = write_dump(dir.path(), "gas.json", GAS_BILL);

    billfields(dir.path())
        .args(["extract", "--validate"])
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("missing required field: fecha_vencimiento"));
}

#[test]
fn extract_validate_overrides_disabled_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{"extraction": {"validate_document": false}}"#,
    )
    .unwrap();
    let input = write_dump(dir.path(), "gas.json", GAS_BILL);

    billfields(dir.path())
        .arg("extract")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""validation""#).not())
        .stderr(predicate::str::contains("missing required field").not());

    billfields(dir.path())
        .args(["extract", "--validate"])
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("missing required field: fecha_vencimiento"));
}

#[test]
fn extract_plain_text() {
    let dir = TempDir::new().unwrap();
    let input = write_dump(dir.path(), "bill.txt", "TOTAL: $1.234,56\nFecha de vencimiento: 03/05/2024\n");

    billfields(dir.path())
        .args(["extract", "--format", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("1234.56"))
        .stdout(predicate::str::contains("2024-05-03"));
}

#[test]
fn extract_with_candidates() {
    let dir = TempDir::new().unwrap();
    let input = write_dump(dir.path(), "bill.json", r#"[{"text": "TOTAL: $1.234,56", "confidence": 0.95}]"#);

    billfields(dir.path())
        .args(["extract", "--candidates"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""raw_value":"$1.234,56""#));
}

#[test]
fn extract_null_dump_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_dump(dir.path(), "null.json", "null");

    billfields(dir.path())
        .arg("extract")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid input"));
}

#[test]
fn extract_rejects_bad_threshold() {
    let dir = TempDir::new().unwrap();
    let input = write_dump(dir.path(), "bill.json", "[]");

    billfields(dir.path())
        .args(["extract", "--threshold", "1.5"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("confidence threshold"));
}

#[test]
fn batch_with_summary() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("in");
    let outputs = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    write_dump(&inputs, "gas.json", GAS_BILL);
    write_dump(&inputs, "broken.json", "{not json");

    billfields(dir.path())
        .arg("batch")
        .arg(format!("{}/*.json", inputs.display()))
        .arg("--output-dir")
        .arg(&outputs)
        .args(["--summary", "--continue-on-error"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 successful, 1 failed"));

    let report = fs::read_to_string(outputs.join("gas.json")).unwrap();
    assert!(report.contains(r#""identificacion":"2121717""#));

    let summary = fs::read_to_string(outputs.join("summary.csv")).unwrap();
    assert!(summary.contains("gas.json,success,GAS,2024-05-17,,35643.00,2121717"));
    assert!(summary.contains("broken.json,error"));
}

#[test]
fn batch_continue_on_error_records_failure() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("in");
    let outputs = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    write_dump(&inputs, "gas.json", GAS_BILL);
    write_dump(&inputs, "null.json", "null");

    billfields(dir.path())
        .arg("batch")
        .arg(format!("{}/*.json", inputs.display()))
        .arg("--output-dir")
        .arg(&outputs)
        .args(["--summary", "--continue-on-error"])
        .assert()
        .success();

    assert!(outputs.join("gas.json").exists());
    assert!(!outputs.join("null.json").exists());

    let mut reader = csv::Reader::from_path(outputs.join("summary.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    let column = |name: &str| headers.iter().position(|h| h == name).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();

    let failed = rows.iter().find(|r| &r[0] == "null.json").unwrap();
    assert_eq!(&failed[column("status")], "error");
    assert!(failed[column("error")].contains("invalid input"));

    let succeeded = rows.iter().find(|r| &r[0] == "gas.json").unwrap();
    assert_eq!(&succeeded[column("status")], "success");
    assert_eq!(&succeeded[column("error")], "");
}

#[test]
fn batch_stops_on_error_by_default() {
    let dir = TempDir::new().unwrap();
    write_dump(dir.path(), "broken.json", "{not json");

    billfields(dir.path())
        .arg("batch")
        .arg(format!("{}/*.json", dir.path().display()))
        .assert()
        .failure();
}

#[test]
fn types_lists_registry() {
    let dir = TempDir::new().unwrap();

    billfields(dir.path())
        .arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("AGUA"))
        .stdout(predicate::str::contains("INTERNET"));
}

#[test]
fn config_set_and_get() {
    let dir = TempDir::new().unwrap();

    billfields(dir.path())
        .args(["config", "set", "extraction.confidence_threshold", "0.8"])
        .assert()
        .success();

    billfields(dir.path())
        .args(["config", "get", "extraction.confidence_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.8"));
}

#[test]
fn config_set_rejects_invalid_value() {
    let dir = TempDir::new().unwrap();

    billfields(dir.path())
        .args(["config", "set", "extraction.confidence_threshold", "2.0"])
        .assert()
        .failure();

    billfields(dir.path())
        .args(["config", "set", "extraction.no_such_key", "1"])
        .assert()
        .failure();
}
