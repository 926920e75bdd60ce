
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::OpenAiConfig;
use crate::{DocqaError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Client for an OpenAI-style `/v1/chat/completions` endpoint.
///
/// Answers are generated at low temperature (default 0.2) so the model
/// stays close to the grounding context instead of improvising.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    base_url: Url,
    api_key: String,
    model: String,
    temperature: f32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl CompletionClient {
    /// Build a client using the API key from the environment. A missing key
    /// is a configuration error, fatal before any remote call.
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &OpenAiConfig, api_key: String) -> Result<Self> {
        let base_url = config.url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key,
            model: config.chat_model.clone(),
            temperature: config.temperature,
            agent,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Send `prompt` as a single user message and return the generated text,
    /// whitespace-trimmed.
    pub fn complete(&self, prompt: &str) -> Result<String> {
        debug!("Requesting completion (prompt length: {})", prompt.len());

        let url = self
            .base_url
            .join("/v1/chat/completions")
            .map_err(|e| DocqaError::Config(format!("Failed to build completions URL: {}", e)))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| DocqaError::Service(format!("Failed to serialize request: {}", e)))?;

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| DocqaError::Service(format!("Completion request failed: {}", e)))?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| DocqaError::Service(format!("Malformed completion response: {}", e)))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| DocqaError::Service("Completion response had no choices".to_string()))?;

        debug!("Received completion ({} chars)", answer.len());
        Ok(answer.trim().to_string())
    }
}
