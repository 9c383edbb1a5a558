//! Inbound documents and attachment classification.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::IntakeConfig;

/// Which extraction path a document takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Lender commission statement (PDF).
    Statement,
    /// Introducer report (spreadsheet).
    Report,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Statement => "statement",
            DocumentKind::Report => "report",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document to reconcile: its name, kind and raw bytes.
#[derive(Debug, Clone)]
pub struct InboundDocument {
    pub filename: String,
    pub kind: DocumentKind,
    pub data: Vec<u8>,
}

impl InboundDocument {
    pub fn new(filename: impl Into<String>, kind: DocumentKind, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            kind,
            data,
        }
    }

    /// Read a file and classify it by name. Returns `Ok(None)` for files the
    /// intake rules do not accept.
    pub fn from_path(path: &Path, config: &IntakeConfig) -> std::io::Result<Option<Self>> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        match classify_attachment(&filename, config) {
            Some(kind) => {
                let data = std::fs::read(path)?;
                Ok(Some(Self::new(filename, kind, data)))
            }
            None => Ok(None),
        }
    }
}

/// Classify an attachment by filename.
///
/// The extension must be an accepted one for the kind and the lowercased name
/// must contain one of the kind's keywords. Statements are checked first.
pub fn classify_attachment(filename: &str, config: &IntakeConfig) -> Option<DocumentKind> {
    let lower = filename.to_lowercase();
    let extension = Path::new(&lower)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let matches = |extensions: &[String], keywords: &[String]| {
        extensions.iter().any(|e| e.eq_ignore_ascii_case(extension))
            && keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
    };

    if matches(&config.statement_extensions, &config.statement_keywords) {
        Some(DocumentKind::Statement)
    } else if matches(&config.report_extensions, &config.report_keywords) {
        Some(DocumentKind::Report)
    } else {
        None
    }
}
