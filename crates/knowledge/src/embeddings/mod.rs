//! Embedding engine for the vector index.
//!
//! Provides provider-agnostic embedding generation plus batched embedding
//! of chunk texts during ingestion.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::{EmbedderFingerprint, EmbeddingConfig};
pub use provider::{create_provider, EmbeddingProvider};

use insight_core::{AppError, AppResult};

/// Embed `texts` in batches of `batch_size`, checking every returned vector.
///
/// `on_batch` is called with the number of texts embedded so far after each
/// batch completes.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
    mut on_batch: impl FnMut(usize),
) -> AppResult<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut embeddings = Vec::with_capacity(texts.len());

    tracing::info!(
        "Embedding {} texts using provider '{}' (model: {}, batch size: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name(),
        batch_size
    );

    for batch in texts.chunks(batch_size) {
        let vectors = provider.embed_batch(batch).await?;

        if vectors.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Provider returned {} embeddings for {} texts",
                vectors.len(),
                batch.len()
            )));
        }

        if let Some(bad) = vectors.iter().find(|v| v.len() != provider.dimensions()) {
            return Err(AppError::Embedding(format!(
                "Provider '{}' returned a {}-dimensional vector, expected {}",
                provider.provider_name(),
                bad.len(),
                provider.dimensions()
            )));
        }

        embeddings.extend(vectors);
        on_batch(embeddings.len());
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}
