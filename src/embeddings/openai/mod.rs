
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::OpenAiConfig;
use crate::{DocqaError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Client for an OpenAI-style `/v1/embeddings` endpoint.
///
/// One remote call per [`embed`](Self::embed) invocation; callers batch
/// their inputs to respect the service's request-size ceiling. Transient
/// failures surface to the caller unchanged, retry policy lives above this
/// layer.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingClient {
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
            model: config.embedding_model.clone(),
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

    /// Embed a batch of texts. The result has the same length and order as
    /// the input. An empty batch returns an empty result without making a
    /// remote call.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let url = self
            .base_url
            .join("/v1/embeddings")
            .map_err(|e| DocqaError::Config(format!("Failed to build embeddings URL: {}", e)))?;

        let request = EmbeddingsRequest {
            model: &self.model,
            input: texts,
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
            .map_err(|e| DocqaError::Service(format!("Embedding request failed: {}", e)))?;

        let mut response: EmbeddingsResponse = serde_json::from_str(&response_text)
            .map_err(|e| DocqaError::Service(format!("Malformed embeddings response: {}", e)))?;

        if response.data.len() != texts.len() {
            return Err(DocqaError::Service(format!(
                "Embedding count mismatch: requested {}, received {}",
                texts.len(),
                response.data.len()
            )));
        }

        // The service documents positional order; sort by index so the
        // positional contract holds even if it interleaves.
        response.data.sort_by_key(|d| d.index);

        debug!("Received {} embeddings", response.data.len());
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}
