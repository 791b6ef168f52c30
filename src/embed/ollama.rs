//! Ollama HTTP client for embedding generation.
//!
//! Every request carries a hard 2-second timeout; a timeout or error
//! surfaces as "embedding unavailable" for that call, with no retry.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::cell::OnceCell;
use std::time::Duration;

use super::EmbeddingProvider;

/// Upper bound on any call to the embedding endpoint.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
    /// Probe result, cached for the duration of one command invocation.
    probed: OnceCell<bool>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f64>>,
}

impl OllamaProvider {
    pub fn new(endpoint: &str, model: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build http client");
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            probed: OnceCell::new(),
        }
    }

    /// Check that the server answers and the configured model is pulled.
    fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        let resp = match self.client.get(&url).send() {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                tracing::debug!(status = %resp.status(), "embedding probe rejected");
                return false;
            }
            Err(err) => {
                tracing::debug!(error = %err, "embedding endpoint unreachable");
                return false;
            }
        };
        let tags: TagsResponse = match resp.json() {
            Ok(tags) => tags,
            Err(_) => return false,
        };
        let base = self.model.split(':').next().unwrap_or(&self.model);
        tags.models
            .iter()
            .any(|m| m.name.split(':').next().unwrap_or("") == base)
    }

    /// Human-oriented hint for commands that require the provider.
    pub fn unavailable_message(&self) -> String {
        format!(
            "embedding provider not available at {} — install Ollama and run: ollama pull {}",
            self.endpoint, self.model
        )
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn available(&self) -> bool {
        *self.probed.get_or_init(|| self.probe())
    }

    fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let url = format!("{}/api/embed", self.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({"model": self.model, "input": text}))
            .send()
            .context("embedding request failed")?;

        if !resp.status().is_success() {
            bail!("embedding endpoint returned status {}", resp.status());
        }

        let body: EmbedResponse = resp.json().context("malformed embedding response")?;
        let Some(vec) = body.embeddings.into_iter().next() else {
            bail!("empty embedding returned");
        };
        if vec.is_empty() {
            bail!("empty embedding returned");
        }
        Ok(vec)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
