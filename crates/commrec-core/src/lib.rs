//! Core library for commission reconciliation.
//!
//! This crate provides:
//! - PDF statement decoding (page text and text-layout tables)
//! - Introducer report decoding (CSV and Excel workbooks)
//! - Rule-based extraction of case fees from statement tables, with a
//!   line-scanning fallback
//! - A ledger merge engine with fee accumulation and field upserts
//! - Ledger persistence as CSV or Excel

pub mod error;
pub mod extract;
pub mod intake;
pub mod ledger;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod report;

pub use error::{ReconError, Result};
pub use extract::{ExtractionRecord, LineScanner, RecordExtractor, RecordPayload, ReportReader, TableExtractor};
pub use intake::{DocumentKind, InboundDocument, classify_attachment};
pub use ledger::{ChangeSet, Ledger, MergeEngine, MergeOutcome, load_ledger, save_ledger};
pub use models::{ReconConfig, Value};
pub use pdf::{PdfExtractor, PdfProcessor, StatementDocument};
pub use pipeline::{DocumentOutcome, Extraction, Reconciler, RunReport};
pub use report::Dataset;
