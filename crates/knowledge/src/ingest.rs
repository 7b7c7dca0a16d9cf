//! Ingestion pipeline: load, split, embed, build, persist.
//!
//! Any failure aborts the run before anything is written and is tagged
//! with the stage it came from.

use crate::embeddings::{embed_in_batches, EmbeddingProvider};
use crate::loader::load_document;
use crate::progress::ProgressReporter;
use crate::splitter::ChunkSplitter;
use crate::types::{IngestOptions, IngestStats};
use crate::vector_index::{IndexProvenance, VectorIndex};
use insight_core::{AppError, AppResult, IngestStage};
use std::time::Instant;

/// Ingest one document into a fresh index at `options.location`.
pub async fn ingest(
    options: &IngestOptions,
    embedder: &dyn EmbeddingProvider,
    progress: &ProgressReporter,
) -> AppResult<IngestStats> {
    let start = Instant::now();

    tracing::info!(
        "Starting ingestion of {:?} into {:?}",
        options.source,
        options.location
    );

    let splitter = ChunkSplitter::new(options.chunk_size, options.chunk_overlap)
        .map_err(|e| AppError::at_stage(IngestStage::Splitting, e))?;

    // Load
    progress.loading(&options.source.display().to_string());
    let document = load_document(&options.source)
        .map_err(|e| AppError::at_stage(IngestStage::Loading, e))?;

    // Split
    progress.splitting(document.page_count());
    let chunks = splitter.split(document.pages());
    if chunks.is_empty() {
        return Err(AppError::at_stage(
            IngestStage::Splitting,
            AppError::Load {
                path: options.source.clone(),
                message: "document contains no text to index".to_string(),
            },
        ));
    }
    tracing::info!(
        "Split {} page(s) into {} chunks",
        document.page_count(),
        chunks.len()
    );

    // Embed
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let total = texts.len();
    progress.embedding(0, total, embedder.model_name());
    let vectors = embed_in_batches(embedder, &texts, options.batch_size, |done| {
        progress.embedding(done, total, embedder.model_name())
    })
    .await
    .map_err(|e| AppError::at_stage(IngestStage::Embedding, e))?;

    // Build
    progress.building(chunks.len());
    let provenance = IndexProvenance {
        embedder: embedder.fingerprint(),
        chunk_size: splitter.chunk_size(),
        chunk_overlap: splitter.chunk_overlap(),
        source: document.source().to_string(),
        page_count: document.page_count(),
    };
    let index = VectorIndex::build(chunks, vectors, provenance)
        .map_err(|e| AppError::at_stage(IngestStage::Building, e))?;

    // Persist
    progress.persisting(&options.location.display().to_string());
    index
        .persist(&options.location)
        .map_err(|e| AppError::at_stage(IngestStage::Persisting, e))?;

    let stats = IngestStats {
        source: document.source().to_string(),
        location: options.location.clone(),
        pages: document.page_count(),
        chunks: index.len(),
        dimensions: embedder.dimensions(),
        duration_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        "Ingestion completed: {} pages, {} chunks in {:.2}s",
        stats.pages,
        stats.chunks,
        stats.duration_secs
    );

    Ok(stats)
}
