// CLO Compliance Core Library
//
// Checks a CLO indenture against a list of stipulations: extracts the
// document text, splits it into sections, matches each stipulation to its
// most relevant excerpt and asks a judgement backend for a verdict.

pub mod catalog;
pub mod config;
pub mod error;
pub mod judge;
pub mod loader;
pub mod preprocessors;
pub mod processor;
pub mod report;
pub mod rules;
pub mod types;

// Re-export main types and functions for easy use
pub use catalog::PatternCatalog;
pub use config::ComplianceConfig;
pub use error::{ExtractionError, JudgementParseError, JudgementTransportError, RunError, ValidationError};
pub use judge::{ComplianceJudge, JudgementBackend, JudgementPrompt, OfflineBackend, OpenAiBackend};
pub use loader::{load_stipulations, LoadedStipulations};
pub use preprocessors::{AutoPreprocessor, DocumentPreprocessor, PdfPreprocessor, TextPreprocessor};
pub use processor::{ComplianceOrchestrator, EvaluationRun, RunState, StepProfiler};
pub use report::{ComplianceReport, ReportFormat, ReportRow, ReportSummary};
pub use types::*;
