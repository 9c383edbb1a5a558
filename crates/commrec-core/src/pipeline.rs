//! Document-by-document reconciliation against one ledger.

use std::time::Instant;

use chrono::{DateTime, Local};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ExtractionError, ReconError, Result};
use crate::extract::{ExtractionRecord, LineScanner, RecordExtractor, ReportReader, TableExtractor};
use crate::intake::{DocumentKind, InboundDocument};
use crate::ledger::{ChangeSet, Ledger, MergeEngine, MergeOutcome};
use crate::models::ReconConfig;
use crate::pdf::{PdfExtractor, PdfProcessor, StatementDocument};
use crate::report::Dataset;

/// What processing one document did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentOutcome {
    pub filename: String,
    pub kind: Option<DocumentKind>,
    /// Records extracted from the document.
    pub records: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Records that failed merge validation.
    pub rejected: usize,
    /// Whether records came from the line scanner.
    pub fallback_used: bool,
    /// Set when the document was skipped for lacking a usable schema.
    pub skipped: Option<String>,
    pub processing_time_ms: u64,
}

impl DocumentOutcome {
    fn new(document: &InboundDocument) -> Self {
        Self {
            filename: document.filename.clone(),
            kind: Some(document.kind),
            ..Self::default()
        }
    }

    /// Records that modified the ledger.
    pub fn applied(&self) -> usize {
        self.inserted + self.updated
    }

    fn tally(&mut self, outcome: &MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Updated { .. } => self.updated += 1,
            MergeOutcome::Unchanged => self.unchanged += 1,
            MergeOutcome::Rejected { .. } => self.rejected += 1,
        }
    }
}

/// Records extracted from one document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub records: Vec<ExtractionRecord>,
    /// Whether records came from the line scanner.
    pub fallback_used: bool,
    /// Set when the document was skipped for lacking a usable schema.
    pub skipped: Option<String>,
}

impl Extraction {
    fn new(records: Vec<ExtractionRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }
}

/// End-of-run results.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub documents_processed: usize,
    pub documents_failed: usize,
    /// Sum of all fee-like columns after the run.
    pub total_fees: Decimal,
    /// Distinct changed cases in order of first change.
    pub updated_cases: Vec<String>,
    pub changes: ChangeSet,
    #[serde(skip)]
    pub ledger: Ledger,
}

/// Runs documents through extraction and merges the results into a ledger.
///
/// Documents are applied strictly in the order they are given. When a
/// statement and a report both accumulate into the same field, the later
/// document's amount is simply added on top.
pub struct Reconciler {
    engine: MergeEngine,
    tables: TableExtractor,
    scanner: LineScanner,
    reports: ReportReader,
    fallback_enabled: bool,
    started_at: DateTime<Local>,
    documents_processed: usize,
    documents_failed: usize,
}

impl Reconciler {
    /// Create a reconciler over `ledger` with default settings.
    pub fn new(ledger: Ledger) -> Self {
        Self::from_config(ledger, &ReconConfig::default())
    }

    /// Create a reconciler over `ledger` from configuration.
    pub fn from_config(ledger: Ledger, config: &ReconConfig) -> Self {
        Self {
            engine: MergeEngine::from_config(ledger, &config.ledger),
            tables: TableExtractor::from_config(&config.extraction),
            scanner: LineScanner::from_config(&config.extraction),
            reports: ReportReader::from_config(&config.extraction),
            fallback_enabled: config.extraction.fallback_enabled,
            started_at: Local::now(),
            documents_processed: 0,
            documents_failed: 0,
        }
    }

    /// Enable or disable the line scanner fallback.
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        self.engine.ledger()
    }

    pub fn changes(&self) -> &ChangeSet {
        self.engine.changes()
    }

    /// Decode, extract and merge one document.
    ///
    /// An error means the document could not be decoded. Records merged
    /// before a failure are kept.
    pub fn process(&mut self, document: &InboundDocument) -> Result<DocumentOutcome> {
        let start = Instant::now();
        info!("Processing {} {}", document.kind, document.filename);

        let extraction = match self.extract(document) {
            Ok(extraction) => extraction,
            Err(e) => {
                self.documents_failed += 1;
                error!("Failed to process {}: {}", document.filename, e);
                return Err(e);
            }
        };

        let mut outcome = DocumentOutcome::new(document);
        outcome.fallback_used = extraction.fallback_used;
        outcome.skipped = extraction.skipped;
        self.merge(&extraction.records, &mut outcome);

        self.documents_processed += 1;
        outcome.processing_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            "{}: {} records, {} inserted, {} updated in {}ms",
            outcome.filename,
            outcome.records,
            outcome.inserted,
            outcome.updated,
            outcome.processing_time_ms
        );
        Ok(outcome)
    }

    /// Decode a document and extract its records without touching the ledger.
    pub fn extract(&self, document: &InboundDocument) -> Result<Extraction> {
        match document.kind {
            DocumentKind::Statement => self.extract_statement(document),
            DocumentKind::Report => self.extract_report(document),
        }
    }

    fn extract_statement(&self, document: &InboundDocument) -> Result<Extraction> {
        let mut pdf = PdfExtractor::new();
        pdf.load(&document.data)?;
        let statement = pdf.extract_document()?;
        debug!(
            "{}: {} pages, {} tables",
            document.filename,
            statement.pages.len(),
            statement.table_count()
        );

        match self.extract_structured(&statement, &document.filename) {
            Ok(records) => Ok(Extraction::new(records)),
            Err(ReconError::Extraction(ExtractionError::NoData)) if self.fallback_enabled => {
                warn!("No structured data found in {}, scanning text lines", document.filename);
                let records = self.scanner.extract(&statement, &document.filename)?;
                Ok(Extraction {
                    fallback_used: true,
                    ..Extraction::new(records)
                })
            }
            Err(ReconError::Extraction(ExtractionError::NoData)) => {
                warn!("No structured data found in {}", document.filename);
                Ok(Extraction::default())
            }
            Err(e) => Err(e),
        }
    }

    fn extract_structured(&self, statement: &StatementDocument, source: &str) -> Result<Vec<ExtractionRecord>> {
        let records = self.tables.extract(statement, source)?;
        if records.is_empty() {
            return Err(ExtractionError::NoData.into());
        }
        Ok(records)
    }

    fn extract_report(&self, document: &InboundDocument) -> Result<Extraction> {
        let dataset = Dataset::decode(&document.data, &document.filename)?;

        match self.reports.extract(&dataset, &document.filename) {
            Ok(records) => Ok(Extraction::new(records)),
            Err(e @ ExtractionError::SchemaMismatch { .. }) => {
                error!("Skipping {}: {}", document.filename, e);
                Ok(Extraction {
                    skipped: Some(e.to_string()),
                    ..Extraction::default()
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn merge(&mut self, records: &[ExtractionRecord], outcome: &mut DocumentOutcome) {
        outcome.records = records.len();
        for record in records {
            let result = self.engine.apply(record);
            outcome.tally(&result);
        }
    }

    /// Sum of all fee-like columns in the ledger so far.
    pub fn total_fees(&self) -> Decimal {
        self.engine.total_fees()
    }

    /// End the run, handing back the ledger and run statistics.
    pub fn finish(self) -> RunReport {
        let total_fees = self.engine.total_fees();
        let (ledger, changes) = self.engine.into_parts();
        let updated_cases = changes.unique();

        info!(
            "Run complete: {} documents, {} cases updated, total fees {}",
            self.documents_processed,
            updated_cases.len(),
            total_fees
        );

        RunReport {
            started_at: self.started_at,
            documents_processed: self.documents_processed,
            documents_failed: self.documents_failed,
            total_fees,
            updated_cases,
            changes,
            ledger,
        }
    }
}
