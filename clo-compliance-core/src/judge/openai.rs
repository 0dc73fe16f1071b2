//! OpenAI-compatible chat completions backend
//!
//! Blocking HTTP via ureq. One request per judgement; retries are the
//! judge's job, so every failure is classified and returned as-is.

use super::backend::JudgementBackend;
use super::prompt::JudgementPrompt;
use crate::config::LlmConfig;
use crate::error::JudgementTransportError;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct OpenAiBackend {
    agent: ureq::Agent,
    config: LlmConfig,
    api_key: String,
}

impl OpenAiBackend {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            config,
            api_key: api_key.into(),
        }
    }

    /// Read the API key from the variable named by `llm.api_key_env`
    pub fn from_env(config: LlmConfig) -> Result<Self, JudgementTransportError> {
        match std::env::var(&config.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(config, key.trim())),
            _ => Err(JudgementTransportError::NotConfigured {
                message: format!("environment variable {} is not set", config.api_key_env),
            }),
        }
    }

    fn request_body(&self, prompt: &JudgementPrompt) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": self.config.system_prompt },
                { "role": "user", "content": prompt.render() },
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        })
    }
}

impl JudgementBackend for OpenAiBackend {
    fn judge(&self, prompt: &JudgementPrompt) -> Result<String, JudgementTransportError> {
        tracing::debug!(
            "Querying {} for {} (prompt length {})",
            self.config.model,
            prompt.stipulation_id,
            prompt.excerpt.len()
        );

        let response = self
            .agent
            .post(&self.config.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(self.request_body(prompt))
            .map_err(classify_error)?;

        let body: ChatResponse = response
            .into_json()
            .map_err(|e| JudgementTransportError::InvalidResponse { message: e.to_string() })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| JudgementTransportError::InvalidResponse {
                message: "response has no message content".to_string(),
            })
    }

    fn name(&self) -> &str {
        "OpenAiBackend"
    }
}

fn classify_error(error: ureq::Error) -> JudgementTransportError {
    match error {
        ureq::Error::Status(status, response) => {
            let message = response
                .into_string()
                .unwrap_or_default()
                .chars()
                .take(500)
                .collect::<String>();
            classify_status(status, message)
        }
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            if message.to_lowercase().contains("timed out") {
                JudgementTransportError::Timeout { message }
            } else {
                JudgementTransportError::Transport { message }
            }
        }
    }
}

fn classify_status(status: u16, message: String) -> JudgementTransportError {
    match status {
        429 => JudgementTransportError::RateLimited { message },
        _ => JudgementTransportError::Http { status, message },
    }
}
