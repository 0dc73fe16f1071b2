//! Compliance judgement
//!
//! [`ComplianceJudge`] turns a stipulation and its excerpt into exactly one
//! [`ComplianceResult`]. Transport failures are retried with exponential
//! backoff; anything that still fails, or a response without a usable
//! verdict, becomes UNCLEAR so the batch always completes.

pub mod backend;
pub mod openai;
pub mod parser;
pub mod prompt;

pub use backend::{JudgementBackend, OfflineBackend};
pub use openai::OpenAiBackend;
pub use parser::{confidence_indicator, parse_judgement, ParsedJudgement};
pub use prompt::JudgementPrompt;

use crate::config::JudgeConfig;
use crate::types::{ComplianceResult, ComplianceStatus, Excerpt, Stipulation};
use std::time::Duration;

pub struct ComplianceJudge {
    backend: Box<dyn JudgementBackend>,
    config: JudgeConfig,
}

impl ComplianceJudge {
    pub fn new(backend: Box<dyn JudgementBackend>, config: JudgeConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Judge one stipulation against its excerpt. Never fails.
    pub fn evaluate(&self, stipulation: &Stipulation, excerpt: &Excerpt) -> ComplianceResult {
        let prompt = JudgementPrompt::new(stipulation, excerpt);
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 0;
        let (status, explanation, quoted_excerpts) = loop {
            attempt += 1;
            match self.backend.judge(&prompt) {
                Ok(raw) => break self.interpret(&stipulation.id, &raw),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "⚠️  {}: attempt {attempt}/{max_attempts} failed ({e}), retrying in {}ms",
                        stipulation.id,
                        delay.as_millis()
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(e) => {
                    tracing::error!("❌ {}: judgement call failed: {e}", stipulation.id);
                    break (
                        ComplianceStatus::Unclear,
                        format!("judgement call failed after {attempt} attempt(s): {e}"),
                        None,
                    );
                }
            }
        };

        ComplianceResult {
            stipulation_id: stipulation.id.clone(),
            status,
            explanation,
            excerpt: excerpt.text.clone(),
            section_identifier: excerpt.section_label(),
            match_confidence: excerpt.confidence,
            quoted_excerpts,
            attempts: attempt,
        }
    }

    fn interpret(&self, stipulation_id: &str, raw: &str) -> (ComplianceStatus, String, Option<String>) {
        tracing::debug!(
            "   {stipulation_id}: response confidence indicator {:.2}",
            confidence_indicator(raw)
        );
        match parse_judgement(raw) {
            Ok(parsed) => (parsed.status, parsed.explanation, parsed.quoted_excerpts),
            Err(e) => {
                tracing::warn!("⚠️  {stipulation_id}: {e}, recording UNCLEAR");
                let explanation = if e.raw().trim().is_empty() {
                    format!("unusable judgement response: {e}")
                } else {
                    e.raw().trim().to_string()
                };
                (ComplianceStatus::Unclear, explanation, None)
            }
        }
    }

    /// Delay after the given failed attempt (1-based)
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.config.initial_backoff_ms as f64 * self.config.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.config.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JudgementTransportError;
    use crate::types::MatchStrategy;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    /// Replays scripted responses in order
    struct ScriptedBackend {
        responses: RefCell<Vec<Result<String, JudgementTransportError>>>,
        calls: std::rc::Rc<RefCell<u32>>,
    }

    impl ScriptedBackend {
        fn new(mut responses: Vec<Result<String, JudgementTransportError>>) -> (Self, std::rc::Rc<RefCell<u32>>) {
            responses.reverse();
            let calls = std::rc::Rc::new(RefCell::new(0));
            (
                Self {
                    responses: RefCell::new(responses),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl JudgementBackend for ScriptedBackend {
        fn judge(&self, _prompt: &JudgementPrompt) -> Result<String, JudgementTransportError> {
            *self.calls.borrow_mut() += 1;
            self.responses
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| Err(JudgementTransportError::Transport { message: "script exhausted".into() }))
        }

        fn name(&self) -> &str {
            "ScriptedBackend"
        }
    }

    fn no_wait() -> JudgeConfig {
        JudgeConfig {
            initial_backoff_ms: 0,
            ..JudgeConfig::default()
        }
    }

    fn stipulation() -> Stipulation {
        Stipulation {
            id: "S1".into(),
            category: "Coverage Test".into(),
            description: "OC ratio must exceed 1.2".into(),
            section_hint: None,
        }
    }

    fn excerpt() -> Excerpt {
        Excerpt {
            text: "SECTION 1. COVERAGE TESTS\nThe OC ratio shall exceed 1.2.".into(),
            section_identifiers: vec!["Section 1".into()],
            confidence: 0.9,
            truncated: false,
            strategy: MatchStrategy::Scored,
        }
    }

    fn timeout() -> Result<String, JudgementTransportError> {
        Err(JudgementTransportError::Timeout { message: "timed out".into() })
    }

    #[test]
    fn test_pass_verdict_carries_excerpt_metadata() {
        let (backend, _) = ScriptedBackend::new(vec![Ok("Status: PASS\nExplanation: Ratio is above 1.2.".into())]);
        let result = ComplianceJudge::new(Box::new(backend), no_wait()).evaluate(&stipulation(), &excerpt());
        assert_eq!(result.status, ComplianceStatus::Pass);
        assert_eq!(result.explanation, "Ratio is above 1.2.");
        assert_eq!(result.section_identifier.as_deref(), Some("Section 1"));
        assert_eq!(result.match_confidence, 0.9);
        assert_eq!(result.quoted_excerpts, None);
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn test_quoted_excerpts_reach_the_result() {
        let (backend, _) = ScriptedBackend::new(vec![Ok(
            "1. Compliance Status: PASS\n2. Explanation: Met.\n3. Relevant Excerpts: \"shall exceed 1.2\"".into(),
        )]);
        let result = ComplianceJudge::new(Box::new(backend), no_wait()).evaluate(&stipulation(), &excerpt());
        assert_eq!(result.status, ComplianceStatus::Pass);
        assert_eq!(result.explanation, "Met.");
        assert_eq!(result.quoted_excerpts.as_deref(), Some("\"shall exceed 1.2\""));
    }

    #[test]
    fn test_transient_failures_are_retried() {
        let (backend, calls) = ScriptedBackend::new(vec![timeout(), timeout(), Ok("FAIL".into())]);
        let result = ComplianceJudge::new(Box::new(backend), no_wait()).evaluate(&stipulation(), &excerpt());
        assert_eq!(result.status, ComplianceStatus::Fail);
        assert_eq!(result.attempts, 3);
        assert_eq!(*calls.borrow(), 3);
    }

    #[test]
    fn test_exhausted_retries_become_unclear() {
        let (backend, calls) = ScriptedBackend::new(vec![timeout(), timeout(), timeout(), Ok("PASS".into())]);
        let result = ComplianceJudge::new(Box::new(backend), no_wait()).evaluate(&stipulation(), &excerpt());
        assert_eq!(result.status, ComplianceStatus::Unclear);
        assert!(result.explanation.starts_with("judgement call failed after 3 attempt(s)"));
        assert_eq!(*calls.borrow(), 3);
    }

    #[test]
    fn test_non_retryable_error_fails_immediately() {
        let (backend, calls) = ScriptedBackend::new(vec![Err(JudgementTransportError::Http {
            status: 401,
            message: "invalid key".into(),
        })]);
        let result = ComplianceJudge::new(Box::new(backend), no_wait()).evaluate(&stipulation(), &excerpt());
        assert_eq!(result.status, ComplianceStatus::Unclear);
        assert_eq!(*calls.borrow(), 1);
        assert!(result.explanation.contains("401"));
    }

    #[test]
    fn test_unparseable_response_keeps_raw_text() {
        let (backend, _) = ScriptedBackend::new(vec![Ok("Hard to say.".into())]);
        let result = ComplianceJudge::new(Box::new(backend), no_wait()).evaluate(&stipulation(), &excerpt());
        assert_eq!(result.status, ComplianceStatus::Unclear);
        assert_eq!(result.explanation, "Hard to say.");
    }

    #[test]
    fn test_empty_response_still_has_explanation() {
        let (backend, _) = ScriptedBackend::new(vec![Ok("   ".into())]);
        let result = ComplianceJudge::new(Box::new(backend), no_wait()).evaluate(&stipulation(), &excerpt());
        assert_eq!(result.status, ComplianceStatus::Unclear);
        assert!(!result.explanation.is_empty());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let (backend, _) = ScriptedBackend::new(vec![]);
        let judge = ComplianceJudge::new(Box::new(backend), JudgeConfig::default());
        assert_eq!(judge.backoff(1), Duration::from_millis(500));
        assert_eq!(judge.backoff(2), Duration::from_millis(1000));
        assert_eq!(judge.backoff(3), Duration::from_millis(2000));
        assert_eq!(judge.backoff(10), Duration::from_millis(8000));
    }
}
