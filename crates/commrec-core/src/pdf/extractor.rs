//! PDF text extraction using lopdf and pdf-extract.

use lopdf::Document;
use tracing::{debug, trace};

use super::{LayoutCollector, PageLayout, PdfProcessor, Result};
use crate::error::PdfError;

/// PDF statement extractor using lopdf.
pub struct PdfExtractor {
    document: Option<Document>,
    raw_data: Vec<u8>,
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self {
            document: None,
            raw_data: Vec::new(),
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Statements are sometimes "protected" with an empty owner password
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract needs the decrypted bytes
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_page_texts(&self) -> Result<Vec<String>> {
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }

        let pages = pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        for (i, text) in pages.iter().enumerate() {
            trace!("Page {}: {} chars of text", i + 1, text.len());
        }

        Ok(pages)
    }

    fn extract_page_layouts(&self) -> Result<Vec<PageLayout>> {
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }

        // pdf-extract renders from its own lopdf version, so it parses the bytes itself
        let doc = pdf_extract::Document::load_mem(&self.raw_data)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        let mut collector = LayoutCollector::new();
        pdf_extract::output_doc(&doc, &mut collector)
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        let pages = collector.into_pages();
        for page in &pages {
            trace!("Page {}: {} positioned text runs", page.number, page.runs.len());
        }

        Ok(pages)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{Object, Stream, dictionary};

    fn make_pdf(content: String) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });

        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });

        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    /// Single-page PDF with one text object per cell, columns placed at `columns`.
    pub(crate) fn make_table_pdf(rows: &[&[&str]], columns: &[i32]) -> Vec<u8> {
        let mut content = String::new();
        for (i, row) in rows.iter().enumerate() {
            let y = 720 - 16 * i as i32;
            for (cell, x) in row.iter().zip(columns) {
                content.push_str(&format!("BT /F1 10 Tf 1 0 0 1 {} {} Tm ({}) Tj ET\n", x, y, cell));
            }
        }
        make_pdf(content)
    }

    /// Single-page PDF with one line of text per entry in `lines`.
    pub(crate) fn make_test_pdf(lines: &[&str]) -> Vec<u8> {
        let mut content = String::from("BT /F1 12 Tf 72 720 Td 14 TL ");
        for line in lines {
            content.push_str(&format!("({}) Tj T* ", line));
        }
        content.push_str("ET");
        make_pdf(content)
    }

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::new();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(extractor.extract_page_texts().is_err());
    }

    #[test]
    fn test_invalid_bytes_fail_to_load() {
        let mut extractor = PdfExtractor::new();
        let err = extractor.load(b"not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));
    }

    #[test]
    fn test_extract_document_pages() {
        let data = make_test_pdf(&["Commission Statement", "Case 1002345 proc fee $75.00"]);

        let mut extractor = PdfExtractor::new();
        extractor.load(&data).unwrap();
        assert_eq!(extractor.page_count(), 1);

        let document = extractor.extract_document().unwrap();
        assert_eq!(document.pages.len(), 1);
        assert_eq!(document.pages[0].number, 1);
        assert!(document.pages[0].text.contains("1002345"));
    }

    #[test]
    fn test_positioned_cells_become_table() {
        let data = make_table_pdf(
            &[
                &["Case ID", "Payment Type", "Paid"],
                &["100234", "Proc Fee", "50.00"],
                &["100235", "Commission", "75.00"],
            ],
            &[50, 200, 350],
        );

        let mut extractor = PdfExtractor::new();
        extractor.load(&data).unwrap();
        let document = extractor.extract_document().unwrap();

        assert_eq!(document.table_count(), 1);
        let table = &document.pages[0].tables[0];
        assert_eq!(table.headers(), ["Case ID", "Payment Type", "Paid"]);
        assert_eq!(table.data_rows()[0], ["100234", "Proc Fee", "50.00"]);
        assert_eq!(table.data_rows()[1], ["100235", "Commission", "75.00"]);
    }

    #[test]
    fn test_prose_lines_have_no_tables() {
        let data = make_test_pdf(&["Commission Statement", "Case 1002345 proc fee $75.00"]);

        let mut extractor = PdfExtractor::new();
        extractor.load(&data).unwrap();

        let layouts = extractor.extract_page_layouts().unwrap();
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].runs.len(), 2);
        assert_eq!(extractor.extract_document().unwrap().table_count(), 0);
    }
}
