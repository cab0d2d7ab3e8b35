//! Text extraction for reference documents (PDF, plain text, Markdown).

mod md;
mod pdf;
mod txt;

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("PDF extraction failed: {0}")]
    PdfError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Pdf,
    Text,
    Markdown,
}

impl DocumentType {
    /// Type from a file name's extension; None for anything else.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentType::Pdf),
            "txt" | "text" => Some(DocumentType::Text),
            "md" | "markdown" => Some(DocumentType::Markdown),
            _ => None,
        }
    }
}

/// A titled slice of a document: a PDF page or a Markdown section.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub filename: String,
    pub doc_type: DocumentType,
    /// Non-empty sections in document order.
    pub sections: Vec<Section>,
}

impl ExtractedDocument {
    pub fn full_text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Extract text from file bytes based on the file name's extension.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<ExtractedDocument, ExtractionError> {
    let doc_type = DocumentType::from_filename(filename)
        .ok_or_else(|| ExtractionError::UnsupportedType(filename.to_string()))?;

    let sections = match doc_type {
        DocumentType::Pdf => pdf::extract_pdf(bytes)?,
        DocumentType::Text => txt::extract_txt(bytes),
        DocumentType::Markdown => md::extract_md(bytes),
    };

    Ok(ExtractedDocument {
        filename: filename.to_string(),
        doc_type,
        sections: sections.into_iter().filter(|s| !s.text.is_empty()).collect(),
    })
}

pub fn extract_file(path: &Path) -> Result<ExtractedDocument, ExtractionError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = std::fs::read(path)?;
    extract_text(&bytes, &filename)
}

/// Decode as UTF-8, replacing invalid sequences.
pub(crate) fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
