//! Document Preprocessors
//!
//! This module provides the extraction layer that turns a source document
//! into page-ordered raw text for the section extractor.
//!
//! ## Architecture
//!
//! ```text
//! Document (PDF, TXT)
//!     ↓
//! [Format-specific Preprocessor]
//!     ↓
//! DocumentText (pages, in order)
//!     ↓
//! [Section Extractor]
//! ```
//!
//! ## Available Preprocessors
//!
//! - `PdfPreprocessor` - PDF documents via lopdf, one entry per page
//! - `TextPreprocessor` - Plain text, pages split on form feed
//! - `AutoPreprocessor` - Picks one of the above by file extension

pub mod preprocessor;
pub mod pdf;
pub mod text;

pub use preprocessor::{AutoPreprocessor, DocumentPreprocessor};
pub use pdf::PdfPreprocessor;
pub use text::TextPreprocessor;
