//! PDF statement decoding.

mod extractor;
mod layout;
mod tables;

pub use extractor::PdfExtractor;
pub use layout::{LayoutCollector, PageLayout, TextRun};
pub use tables::detect_text_tables;

#[cfg(test)]
pub(crate) use extractor::tests::{make_table_pdf, make_test_pdf};

use serde::Serialize;
use tracing::warn;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A raw table as laid out on a page. Row 0 holds the headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build a table from string slices, mostly for fixtures.
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|c| c.as_ref().to_string()).collect())
                .collect(),
        )
    }

    pub fn headers(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Content from a single statement page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatementPage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Plain text of the page.
    pub text: String,
    /// Tables found on the page.
    pub tables: Vec<RawTable>,
}

impl StatementPage {
    /// Build a page from text, detecting tables in it.
    pub fn from_text(number: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        let tables = detect_text_tables(&text);
        Self { number, text, tables }
    }

    /// Build a page whose tables come from positioned text.
    pub fn from_layout(text: impl Into<String>, layout: &PageLayout) -> Self {
        Self {
            number: layout.number,
            text: text.into(),
            tables: layout.tables(),
        }
    }
}

/// A statement decoded into pages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatementDocument {
    pub pages: Vec<StatementPage>,
}

impl StatementDocument {
    pub fn new(pages: Vec<StatementPage>) -> Self {
        Self { pages }
    }

    pub fn table_count(&self) -> usize {
        self.pages.iter().map(|p| p.tables.len()).sum()
    }
}

/// Trait for PDF decoding implementations.
pub trait PdfProcessor {
    /// Load a PDF from bytes.
    fn load(&mut self, data: &[u8]) -> Result<()>;

    /// Get the number of pages in the PDF.
    fn page_count(&self) -> u32;

    /// Extract plain text, one entry per page.
    fn extract_page_texts(&self) -> Result<Vec<String>>;

    /// Extract positioned text runs, one entry per page.
    fn extract_page_layouts(&self) -> Result<Vec<PageLayout>> {
        Ok(Vec::new())
    }

    /// Decode the loaded PDF into pages with detected tables.
    ///
    /// Tables come from positioned text where it is available. Pages without
    /// a layout fall back to splitting their plain text on wide spacing.
    fn extract_document(&self) -> Result<StatementDocument> {
        let texts = self.extract_page_texts()?;
        let layouts = self.extract_page_layouts().unwrap_or_else(|e| {
            warn!("No positioned text, detecting tables from plain text: {}", e);
            Vec::new()
        });

        let pages = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let number = i as u32 + 1;
                match layouts.iter().find(|layout| layout.number == number) {
                    Some(layout) => StatementPage::from_layout(text, layout),
                    None => StatementPage::from_text(number, text),
                }
            })
            .collect();
        Ok(StatementDocument::new(pages))
    }
}
