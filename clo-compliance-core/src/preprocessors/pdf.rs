//! PDF Preprocessor
//!
//! Extracts text page by page with lopdf so that sections can be traced back
//! to the page they start on.

use super::preprocessor::{has_extension, DocumentPreprocessor};
use crate::error::ExtractionError;
use crate::types::DocumentText;
use lopdf::Document;
use std::path::Path;

#[derive(Debug, Default)]
pub struct PdfPreprocessor;

impl PdfPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentPreprocessor for PdfPreprocessor {
    fn extract_from_bytes(&self, source: &str, bytes: &[u8]) -> Result<DocumentText, ExtractionError> {
        let unreadable = |message: String| ExtractionError::Unreadable {
            path: source.to_string(),
            message,
        };

        let document = Document::load_mem(bytes).map_err(|e| unreadable(e.to_string()))?;
        if document.is_encrypted() {
            return Err(unreadable("document is encrypted".to_string()));
        }

        let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
        tracing::info!("📄 Extracting text from {} PDF pages: {}", page_numbers.len(), source);

        let mut pages = Vec::with_capacity(page_numbers.len());
        for page_number in page_numbers {
            // A single bad page should not sink the whole document
            match document.extract_text(&[page_number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::warn!("⚠️  Failed to extract text from page {page_number}: {e}");
                    pages.push(String::new());
                }
            }
        }

        Ok(DocumentText::new(source, pages))
    }

    fn name(&self) -> &str {
        "PdfPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }
}
