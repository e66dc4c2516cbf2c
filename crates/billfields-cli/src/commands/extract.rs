//! Extract command - pull canonical fields from a single OCR dump.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use billfields_core::{ExtractionReport, FieldName};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (JSON fragment dump, or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Read the input as plain text, one fragment per line (implied for .txt)
    #[arg(long)]
    text: bool,

    /// Minimum fragment confidence (overrides the configuration)
    #[arg(short, long)]
    threshold: Option<f32>,

    /// Print validation issues to stderr. Validation itself runs whenever
    /// the configuration enables it (the default); this flag also turns it
    /// on when the configuration does not.
    #[arg(long)]
    validate: bool,

    /// Include every candidate considered in the output
    #[arg(long)]
    candidates: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut extractor = super::load_extractor(config_path, args.threshold)?;
    if args.validate {
        extractor = extractor.with_validation(true);
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let mut report = super::extract_file(&extractor, &args.input, args.text)?;

    if args.validate {
        print_validation(&report);
    }

    if !args.candidates {
        report.candidates.clear();
    }

    let output = format_report(&report, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_validation(report: &ExtractionReport) {
    match &report.validation {
        Some(validation) if validation.is_valid => {
            eprintln!(
                "{} Valid {} bill",
                style("✓").green(),
                validation.document_type
            );
        }
        Some(validation) => {
            eprintln!(
                "{}",
                style(format!("Validation issues ({}):", validation.document_type)).yellow()
            );
            for error in &validation.errors {
                eprintln!("  - {}", error);
            }
        }
        None => {
            eprintln!("{} No document type detected", style("ℹ").blue());
        }
    }
}

pub fn format_report(report: &ExtractionReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(report)?),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report)),
    }
}

fn format_csv(report: &ExtractionReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<&str> = FieldName::ALL.iter().map(|f| f.as_str()).collect();
    header.extend(["document_type", "valid", "confidence"]);
    wtr.write_record(&header)?;

    let mut row: Vec<String> = FieldName::ALL
        .iter()
        .map(|f| report.fields.get(*f).unwrap_or_default().to_string())
        .collect();
    row.push(report.document_type.clone().unwrap_or_default());
    row.push(
        report
            .validation
            .as_ref()
            .map(|v| v.is_valid.to_string())
            .unwrap_or_default(),
    );
    row.push(format!("{:.2}", report.confidence));
    wtr.write_record(&row)?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &ExtractionReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Document type: {}\n",
        report.document_type.as_deref().unwrap_or("unknown")
    ));
    output.push('\n');

    for field in FieldName::ALL {
        output.push_str(&format!(
            "  {:<18} {}\n",
            format!("{}:", field),
            report.fields.get(field).unwrap_or("-")
        ));
    }

    output.push('\n');
    output.push_str(&format!("Confidence: {:.1}%\n", report.confidence * 100.0));
    if report.degraded {
        output.push_str("Warning: no fragment passed the confidence threshold\n");
    }

    if let Some(validation) = &report.validation {
        if !validation.errors.is_empty() {
            output.push_str("\nValidation issues:\n");
            for error in &validation.errors {
                output.push_str(&format!("  - {}\n", error));
            }
        }
    }

    for (kind, traces) in &report.candidates {
        if traces.is_empty() {
            continue;
        }
        output.push_str(&format!("\nCandidates ({}):\n", kind));
        for trace in traces {
            output.push_str(&format!(
                "  [{}{}] {:?} -> {} ({:?})\n",
                trace.specificity_rank,
                if trace.has_context_keyword { "k" } else { "" },
                trace.raw_value,
                trace.normalized.as_deref().unwrap_or("-"),
                trace.outcome
            ));
        }
    }

    output
}
