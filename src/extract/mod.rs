
use std::path::Path;
use tracing::{debug, warn};

use crate::{DocqaError, Result};

/// Extracted text of one PDF page. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Extract the text of every page of a PDF, in page order.
///
/// An unreadable or corrupt file is an extraction error. A page whose text
/// cannot be decoded contributes an empty string instead of failing the
/// document; pages without extractable text are a normal outcome for
/// scanned or image-only PDFs.
pub fn extract_pages(path: &Path) -> Result<Vec<PageText>> {
    let document = lopdf::Document::load(path).map_err(|e| {
        DocqaError::Extraction(format!("Failed to load PDF {}: {}", path.display(), e))
    })?;

    let mut pages = Vec::new();
    for &number in document.get_pages().keys() {
        let text = match document.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not extract text from page {}: {}", number, e);
                String::new()
            }
        };
        pages.push(PageText { number, text });
    }

    debug!("Extracted {} pages from {}", pages.len(), path.display());
    Ok(pages)
}
