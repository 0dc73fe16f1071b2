//! Plain text preprocessor
//!
//! Useful for indentures that were already converted to text elsewhere.
//! Form feed characters mark page breaks.

use super::preprocessor::{has_extension, DocumentPreprocessor};
use crate::error::ExtractionError;
use crate::types::DocumentText;
use std::path::Path;

const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Default)]
pub struct TextPreprocessor;

impl TextPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentPreprocessor for TextPreprocessor {
    fn extract_from_bytes(&self, source: &str, bytes: &[u8]) -> Result<DocumentText, ExtractionError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ExtractionError::Unreadable {
            path: source.to_string(),
            message: format!("not valid UTF-8: {e}"),
        })?;
        let pages = text.split(PAGE_BREAK).map(str::to_string).collect();
        Ok(DocumentText::new(source, pages))
    }

    fn name(&self) -> &str {
        "TextPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["txt", "text"])
    }
}
