pub mod ollama;
pub mod vector;

use crate::config::EmbeddingConfig;

/// Default vector dimension (nomic-embed-text).
pub const EMBEDDING_DIM: usize = 768;

/// Trait for embedding text into vectors.
///
/// `available` is a cheap probe, re-run once per command invocation; its
/// result is cached inside the provider for the lifetime of that command.
/// `embed` failures are never fatal to a command — callers degrade to
/// token-overlap similarity and report `embedded: false`.
pub trait EmbeddingProvider {
    /// Whether the backing service is reachable and serving the model.
    fn available(&self) -> bool;

    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f64>>;

    /// Model identifier, for status output.
    fn model(&self) -> &str;
}

/// Create the embedding provider from config.
pub fn create_provider(config: &EmbeddingConfig) -> ollama::OllamaProvider {
    ollama::OllamaProvider::new(&config.endpoint, &config.model)
}

/// Embed `text` if the provider is up, swallowing failures.
///
/// This is the degradation point the whole read/write path relies on: any
/// probe failure, timeout, or malformed response yields `None`.
pub fn try_embed(provider: &dyn EmbeddingProvider, text: &str) -> Option<Vec<f64>> {
    if !provider.available() {
        return None;
    }
    match provider.embed(text) {
        Ok(vec) => Some(vec),
        Err(err) => {
            tracing::debug!(error = %err, "embedding failed, falling back to token overlap");
            None
        }
    }
}
