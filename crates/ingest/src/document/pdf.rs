use super::{ExtractionError, Section};

/// One section per page. pdf-extract separates pages with form feeds;
/// a PDF without them is a single section.
pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<Section>, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::PdfError(e.to_string()))?;

    if text.trim().is_empty() {
        tracing::warn!("PDF contains no extractable text (scanned or image-only)");
        return Ok(Vec::new());
    }

    let sections = text
        .split('\x0C')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| Section {
            title: Some(format!("page {}", i + 1)),
            text: page.trim().to_string(),
        })
        .collect();

    Ok(sections)
}
