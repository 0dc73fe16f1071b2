// Judgement backend selection from the environment.
//
// A configured API key selects the HTTP backend. Without one, or with
// --offline, the offline backend answers UNCLEAR for every stipulation.

use clo_compliance_core::config::LlmConfig;
use clo_compliance_core::judge::{JudgementBackend, OfflineBackend, OpenAiBackend};

pub fn select_backend(config: &LlmConfig, offline: bool) -> Box<dyn JudgementBackend> {
    if offline {
        tracing::info!("🔌 Offline mode requested, every stipulation will be UNCLEAR");
        return Box::new(OfflineBackend::new());
    }

    match OpenAiBackend::from_env(config.clone()) {
        Ok(backend) => {
            tracing::info!("🚀 Using {} at {}", config.model, config.endpoint);
            Box::new(backend)
        }
        Err(e) => {
            tracing::warn!("⚠️  {e}; falling back to offline judgement");
            Box::new(OfflineBackend::new())
        }
    }
}
