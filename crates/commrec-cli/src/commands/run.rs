//! Run command - reconcile a batch of documents into the ledger.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use commrec_core::extract::rules::format_amount;
use commrec_core::{
    DocumentKind, DocumentOutcome, InboundDocument, Reconciler, RunReport, load_ledger, save_ledger,
};

use super::load_config;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Input files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Ledger to load (default: ledger.path from config)
    #[arg(short, long)]
    ledger: Option<PathBuf>,

    /// Where to save the updated ledger (default: the loaded ledger)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Process everything but do not save the ledger
    #[arg(long)]
    dry_run: bool,

    /// Disable the text line fallback for statements without tables
    #[arg(long)]
    no_fallback: bool,

    /// Summary format
    #[arg(short, long, value_enum, default_value = "text")]
    summary: SummaryFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SummaryFormat {
    /// Human-readable summary
    Text,
    /// JSON summary
    Json,
}

/// Result of one document in the batch.
struct DocumentResult {
    filename: String,
    outcome: Option<DocumentOutcome>,
    error: Option<String>,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.inputs.join(" "));
    }

    let mut documents = Vec::new();
    for path in &files {
        match InboundDocument::from_path(path, &config.intake)? {
            Some(document) => documents.push(document),
            None => {
                warn!("Ignoring {}: not a statement or introducer report", path.display());
                if args.summary == SummaryFormat::Text {
                    println!(
                        "{} Ignoring {}",
                        style("ℹ").blue(),
                        path.display()
                    );
                }
            }
        }
    }

    // Statements first, then reports, each in input order
    documents.sort_by_key(|d| match d.kind {
        DocumentKind::Statement => 0,
        DocumentKind::Report => 1,
    });

    let ledger_path = args.ledger.clone().unwrap_or_else(|| config.ledger.path.clone());
    let ledger = load_ledger(&ledger_path, &config.ledger.id_column).map_err(|e| {
        anyhow::anyhow!("Failed to load ledger {}: {}", ledger_path.display(), e)
    })?;
    info!("Ledger {} has {} cases", ledger_path.display(), ledger.len());

    let mut reconciler = Reconciler::from_config(ledger, &config);
    if args.no_fallback {
        reconciler = reconciler.with_fallback(false);
    }

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(documents.len());
    for document in &documents {
        pb.set_message(document.filename.clone());

        let result = match reconciler.process(document) {
            Ok(outcome) => DocumentResult {
                filename: document.filename.clone(),
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => DocumentResult {
                filename: document.filename.clone(),
                outcome: None,
                error: Some(e.to_string()),
            },
        };
        results.push(result);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let report = reconciler.finish();
    let output_path = args.output.clone().unwrap_or(ledger_path);

    let saved = if args.dry_run {
        debug!("Dry run, not saving {}", output_path.display());
        false
    } else {
        save_ledger(&report.ledger, &output_path).map_err(|e| {
            anyhow::anyhow!("Failed to save ledger {}: {}", output_path.display(), e)
        })?;
        true
    };

    match args.summary {
        SummaryFormat::Text => {
            print_text_summary(&results, &report, &config.ledger.currency_symbol);
            if saved {
                println!(
                    "{} Ledger saved to {}",
                    style("✓").green(),
                    output_path.display()
                );
            } else {
                println!("{} Dry run, ledger not saved", style("ℹ").blue());
            }
        }
        SummaryFormat::Json => {
            println!("{}", json_summary(&results, &report, &output_path, saved)?);
        }
    }

    debug!("Total run time: {:?}", start.elapsed());

    Ok(())
}

/// Expand glob patterns, keeping literal paths that exist. Order follows the
/// inputs; duplicates are dropped.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for input in inputs {
        let mut matched: Vec<PathBuf> = glob(input)?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();

        if matched.is_empty() && Path::new(input).is_file() {
            matched.push(PathBuf::from(input));
        }
        if matched.is_empty() {
            warn!("No files match {}", input);
        }

        for path in matched {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

fn print_text_summary(results: &[DocumentResult], report: &RunReport, currency: &str) {
    println!();
    for result in results {
        match (&result.outcome, &result.error) {
            (Some(outcome), _) if outcome.skipped.is_some() => {
                println!(
                    "{} {}: skipped, {}",
                    style("!").yellow(),
                    result.filename,
                    outcome.skipped.as_deref().unwrap_or_default()
                );
            }
            (Some(outcome), _) => {
                let fallback = if outcome.fallback_used { " (text fallback)" } else { "" };
                println!(
                    "{} {}: {} records, {} new, {} updated{}",
                    style("✓").green(),
                    result.filename,
                    outcome.records,
                    outcome.inserted,
                    outcome.updated,
                    fallback
                );
            }
            (None, error) => {
                println!(
                    "{} {}: {}",
                    style("✗").red(),
                    result.filename,
                    error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    println!();
    println!("Run date: {}", report.started_at.format("%Y-%m-%d %H:%M"));
    println!(
        "Documents processed: {} ({} failed)",
        style(report.documents_processed).green(),
        style(report.documents_failed).red()
    );
    println!("Total commission: {}", format_amount(report.total_fees, currency));
    println!("Updated cases: {}", report.updated_cases.len());
    for case_id in &report.updated_cases {
        println!("  - {}", case_id);
    }
}

fn json_summary(
    results: &[DocumentResult],
    report: &RunReport,
    ledger_path: &Path,
    saved: bool,
) -> anyhow::Result<String> {
    let documents: Vec<serde_json::Value> = results
        .iter()
        .map(|r| match &r.outcome {
            Some(outcome) => {
                let status = if outcome.skipped.is_some() { "skipped" } else { "success" };
                serde_json::json!({
                    "filename": r.filename,
                    "status": status,
                    "outcome": outcome,
                })
            }
            None => serde_json::json!({
                "filename": r.filename,
                "status": "error",
                "error": r.error,
            }),
        })
        .collect();

    let summary = serde_json::json!({
        "run_date": report.started_at.to_rfc3339(),
        "documents": documents,
        "documents_processed": report.documents_processed,
        "documents_failed": report.documents_failed,
        "total_fees": report.total_fees.to_string(),
        "updated_cases": report.updated_cases,
        "ledger": ledger_path.display().to_string(),
        "ledger_cases": report.ledger.len(),
        "saved": saved,
    });

    Ok(serde_json::to_string_pretty(&summary)?)
}
