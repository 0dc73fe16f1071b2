// Preprocessor abstraction for document extraction
//
// This module defines the boundary between document extraction (file -> page
// text) and compliance processing (page text -> sections -> verdicts). The
// abstraction allows different extraction backends while the rest of the
// pipeline only ever sees DocumentText.

use crate::error::ExtractionError;
use crate::types::DocumentText;
use std::path::Path;

/// Preprocessor trait - converts documents to page-ordered text
///
/// Implementations only handle format parsing. Blank-document detection is
/// shared by the default `extract` method, so every backend reports an empty
/// document the same way.
pub trait DocumentPreprocessor {
    /// Convert raw document bytes to page-ordered text
    ///
    /// `source` is only used for error messages and provenance.
    fn extract_from_bytes(&self, source: &str, bytes: &[u8]) -> Result<DocumentText, ExtractionError>;

    /// Convenience method: Extract from file path
    ///
    /// Reads the file, extracts it, and rejects documents with no text.
    fn extract(&self, path: &Path) -> Result<DocumentText, ExtractionError> {
        let source = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::Unreadable {
            path: source.clone(),
            message: e.to_string(),
        })?;
        let document = self.extract_from_bytes(&source, &bytes)?;
        if document.is_blank() {
            return Err(ExtractionError::EmptyDocument { path: source });
        }
        Ok(document)
    }

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            extensions.iter().any(|candidate| *candidate == e)
        })
        .unwrap_or(false)
}

/// Dispatches to the first registered preprocessor that supports a file
pub struct AutoPreprocessor {
    preprocessors: Vec<Box<dyn DocumentPreprocessor>>,
}

impl AutoPreprocessor {
    pub fn new(preprocessors: Vec<Box<dyn DocumentPreprocessor>>) -> Self {
        Self { preprocessors }
    }

    fn select(&self, path: &Path) -> Result<&dyn DocumentPreprocessor, ExtractionError> {
        self.preprocessors
            .iter()
            .find(|p| p.supports_file_type(path))
            .map(|p| p.as_ref())
            .ok_or_else(|| ExtractionError::UnsupportedFormat {
                path: path.display().to_string(),
            })
    }
}

impl Default for AutoPreprocessor {
    fn default() -> Self {
        Self::new(vec![
            Box::new(super::PdfPreprocessor::new()),
            Box::new(super::TextPreprocessor::new()),
        ])
    }
}

impl DocumentPreprocessor for AutoPreprocessor {
    /// Without a path there is no extension to dispatch on; the first
    /// registered preprocessor gets the bytes.
    fn extract_from_bytes(&self, source: &str, bytes: &[u8]) -> Result<DocumentText, ExtractionError> {
        match self.preprocessors.first() {
            Some(p) => p.extract_from_bytes(source, bytes),
            None => Err(ExtractionError::UnsupportedFormat {
                path: source.to_string(),
            }),
        }
    }

    fn extract(&self, path: &Path) -> Result<DocumentText, ExtractionError> {
        let preprocessor = self.select(path)?;
        tracing::debug!(preprocessor = preprocessor.name(), path = %path.display(), "selected preprocessor");
        preprocessor.extract(path)
    }

    fn name(&self) -> &str {
        "AutoPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        self.preprocessors.iter().any(|p| p.supports_file_type(path))
    }
}
