//! Error types for the commrec-core library.

use thiserror::Error;

/// Main error type for the commrec library.
///
/// Any variant returned from [`crate::pipeline::Reconciler::process`] means
/// the document was aborted. Row-level problems never surface here; they are
/// skipped where they occur.
#[derive(Error, Debug)]
pub enum ReconError {
    /// PDF decoding error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Spreadsheet decoding error.
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// Record extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Ledger persistence error.
    #[error("ledger store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to spreadsheet decoding.
#[derive(Error, Debug)]
pub enum ReportError {
    /// CSV content could not be read.
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook content could not be opened or read.
    #[error("failed to read workbook: {0}")]
    Workbook(String),

    /// The workbook has no worksheets.
    #[error("workbook has no worksheets")]
    NoSheets,

    /// File extension is not a known spreadsheet format.
    #[error("unsupported report format: {0}")]
    UnsupportedFormat(String),
}

/// Errors related to record extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A table or report lacks a resolvable column for a required role.
    #[error("no {role} column found in {source_name}")]
    SchemaMismatch { role: String, source_name: String },

    /// No records could be extracted.
    #[error("no structured data found")]
    NoData,
}

/// Errors related to loading and saving the ledger.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error while reading or writing the ledger file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encode/decode error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Workbook read error.
    #[error("failed to read workbook: {0}")]
    Workbook(String),

    /// Workbook write error.
    #[error("failed to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Persisted ledger holds the same case twice.
    #[error("duplicate case identifier in ledger: {0}")]
    DuplicateCase(String),

    /// File extension is not a supported ledger format.
    #[error("unsupported ledger format: {0}")]
    UnsupportedFormat(String),
}

/// Result type for the commrec library.
pub type Result<T> = std::result::Result<T, ReconError>;
