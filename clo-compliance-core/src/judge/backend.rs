// Judgement backend abstraction
//
// The judge only needs "prompt in, raw text out". Transport concerns such as
// authentication and timeouts live behind this trait so that the retry
// policy and response parsing can be tested without a network.

use super::prompt::JudgementPrompt;
use crate::error::JudgementTransportError;

/// A source of compliance judgements
pub trait JudgementBackend {
    /// Send one prompt and return the raw response text
    fn judge(&self, prompt: &JudgementPrompt) -> Result<String, JudgementTransportError>;

    /// Get backend name for debugging/logging
    fn name(&self) -> &str;
}

/// Answers UNCLEAR for every stipulation.
///
/// Used when no API key is available or `--offline` is set, so a run still
/// produces a complete report that marks every rule for manual review.
#[derive(Debug, Default)]
pub struct OfflineBackend;

impl OfflineBackend {
    pub fn new() -> Self {
        Self
    }
}

impl JudgementBackend for OfflineBackend {
    fn judge(&self, prompt: &JudgementPrompt) -> Result<String, JudgementTransportError> {
        tracing::debug!("offline judgement for {}", prompt.stipulation_id);
        Ok("Compliance Status: UNCLEAR\n\
Explanation: No judgement backend is configured (offline mode); manual review required."
            .to_string())
    }

    fn name(&self) -> &str {
        "OfflineBackend"
    }
}
