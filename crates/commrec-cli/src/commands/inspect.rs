//! Inspect command - extract records from a single document without a ledger.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::{debug, info};

use commrec_core::models::ReconConfig;
use commrec_core::{
    DocumentKind, Extraction, ExtractionRecord, InboundDocument, Ledger, RecordPayload, Reconciler,
    classify_attachment,
};

use super::load_config;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Statement PDF or introducer report
    #[arg(required = true)]
    input: PathBuf,

    /// Document kind (default: inferred from the filename)
    #[arg(short, long, value_enum)]
    kind: Option<KindArg>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Disable the text line fallback for statements without tables
    #[arg(long)]
    no_fallback: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum KindArg {
    /// Lender commission statement (PDF)
    Statement,
    /// Introducer report (CSV or Excel)
    Report,
}

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Statement => DocumentKind::Statement,
            KindArg::Report => DocumentKind::Report,
        }
    }
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

pub async fn run(args: InspectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let filename = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let kind = match args.kind {
        Some(kind) => kind.into(),
        None => infer_kind(&filename, &config).ok_or_else(|| {
            anyhow::anyhow!("Cannot tell the document kind of {}. Use --kind.", filename)
        })?,
    };

    info!("Inspecting {} as {}", filename, kind);
    let document = InboundDocument::new(filename, kind, fs::read(&args.input)?);

    let mut reconciler = Reconciler::from_config(Ledger::new(config.ledger.id_column.clone()), &config);
    if args.no_fallback {
        reconciler = reconciler.with_fallback(false);
    }

    let extraction = reconciler.extract(&document)?;
    debug!("Extracted {} records from {}", extraction.records.len(), document.filename);

    if let Some(reason) = &extraction.skipped {
        eprintln!("{} Skipped: {}", style("!").yellow(), reason);
    }

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&extraction)?,
        OutputFormat::Csv => format_csv(&extraction.records)?,
        OutputFormat::Text => format_text(&document, &extraction),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

/// Kind from the intake rules, or from the extension alone.
fn infer_kind(filename: &str, config: &ReconConfig) -> Option<DocumentKind> {
    if let Some(kind) = classify_attachment(filename, &config.intake) {
        return Some(kind);
    }

    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "pdf" => Some(DocumentKind::Statement),
        "csv" | "xlsx" | "xlsm" | "xls" | "ods" => Some(DocumentKind::Report),
        _ => None,
    }
}

/// Render report fields as `name=value` pairs.
fn format_fields(record: &ExtractionRecord) -> String {
    match &record.payload {
        RecordPayload::Fee { .. } => String::new(),
        RecordPayload::Report { fields, .. } => fields
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

fn format_csv(records: &[ExtractionRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["case_id", "category", "amount", "fields", "source"])?;

    for record in records {
        let amount = record.amount().map(|a| a.to_string()).unwrap_or_default();
        let fields = format_fields(record);
        wtr.write_record([
            record.case_id.as_str(),
            record.category().unwrap_or_default(),
            amount.as_str(),
            fields.as_str(),
            record.source.as_str(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(document: &InboundDocument, extraction: &Extraction) -> String {
    let mut output = String::new();

    output.push_str(&format!("Document: {} ({})\n", document.filename, document.kind));
    output.push_str(&format!("Records: {}\n", extraction.records.len()));
    if extraction.fallback_used {
        output.push_str("Source: text line fallback\n");
    }
    output.push('\n');

    for record in &extraction.records {
        match &record.payload {
            RecordPayload::Fee { category, amount } => {
                output.push_str(&format!("  {}  {}  {}\n", record.case_id, category, amount));
            }
            RecordPayload::Report { .. } => {
                output.push_str(&format!("  {}  {}\n", record.case_id, format_fields(record)));
            }
        }
    }

    output
}
