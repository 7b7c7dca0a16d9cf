//! Embedding provider trait and factory.

use crate::embeddings::config::{EmbedderFingerprint, EmbeddingConfig};
use crate::embeddings::providers::{OllamaProvider, TrigramProvider};
use insight_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
///
/// Providers are deterministic for a fixed configuration and return
/// vectors of exactly [`dimensions`](EmbeddingProvider::dimensions) length.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "ollama", "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Provenance record for indexes built with this provider.
    fn fingerprint(&self) -> EmbedderFingerprint {
        EmbedderFingerprint {
            provider: self.provider_name().to_string(),
            model: self.model_name().to_string(),
            dimensions: self.dimensions(),
        }
    }

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "Embedding dimensions must be positive".to_string(),
        ));
    }

    match config.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(config.dimensions))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, trigram",
            config.provider
        ))),
    }
}

/// Reject empty input before it reaches a backend.
pub(crate) fn ensure_not_empty(text: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::Embedding("Cannot embed empty text".to_string()));
    }
    Ok(())
}
