// Error taxonomy for a compliance run.
//
// Only ValidationError and ExtractionError are fatal. Judgement errors are
// recovered inside the judge and surface as UNCLEAR results.

use thiserror::Error;

/// Malformed or missing stipulations input. Fatal to the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("stipulations file {path} is missing required column '{column}'")]
    MissingColumn { path: String, column: String },

    #[error("stipulations file {path} has no header row")]
    EmptyFile { path: String },

    #[error("stipulations file {path} contains no usable rows ({rejected} rejected)")]
    NoStipulations { path: String, rejected: usize },

    #[error("unsupported stipulations file type '{extension}' for {path}")]
    UnsupportedFormat { path: String, extension: String },

    #[error("failed to read stipulations file {path}: {message}")]
    Unreadable { path: String, message: String },
}

/// Document unreadable or empty. Fatal to the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("document {path} contains no extractable text")]
    EmptyDocument { path: String },

    #[error("failed to read document {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("no preprocessor supports document {path}")]
    UnsupportedFormat { path: String },
}

/// Failure of the external judgement call itself (as opposed to its content).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JudgementTransportError {
    #[error("judgement call timed out: {message}")]
    Timeout { message: String },

    #[error("judgement call was rate limited: {message}")]
    RateLimited { message: String },

    #[error("judgement endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("judgement transport failed: {message}")]
    Transport { message: String },

    #[error("judgement endpoint returned an unusable body: {message}")]
    InvalidResponse { message: String },

    #[error("judgement backend is not configured: {message}")]
    NotConfigured { message: String },
}

impl JudgementTransportError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::RateLimited { .. } | Self::Transport { .. } => true,
            Self::Http { status, .. } => *status == 408 || *status >= 500,
            Self::InvalidResponse { .. } | Self::NotConfigured { .. } => false,
        }
    }
}

/// The judgement response did not carry a usable verdict.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JudgementParseError {
    #[error("response contains no recognised status token")]
    MissingStatus { raw: String },

    #[error("response contains conflicting status tokens: {tokens:?}")]
    ConflictingStatus { raw: String, tokens: Vec<String> },
}

impl JudgementParseError {
    pub fn raw(&self) -> &str {
        match self {
            Self::MissingStatus { raw } | Self::ConflictingStatus { raw, .. } => raw,
        }
    }
}

/// Errors that end a run before a report can be produced.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("failed to write report to {path}: {message}")]
    ReportWrite { path: String, message: String },
}
