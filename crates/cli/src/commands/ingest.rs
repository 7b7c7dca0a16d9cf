//! Ingest command handler.
//!
//! Builds the vector index from one source document.

use clap::Args;
use insight_core::{config::AppConfig, AppResult};
use insight_knowledge::{
    create_provider, ingest, EmbeddingConfig, IngestOptions, ProgressEvent, ProgressReporter,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Build the vector index from a document
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Source document (.pdf, .txt, .md)
    pub source: PathBuf,

    /// Index directory (default: retrieval.indexDir from config)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Maximum chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared between consecutive chunks
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {:?}", self.source);
        tracing::debug!("Ingest options: {:?}", self);

        let options = IngestOptions {
            source: config.resolve(&self.source),
            location: super::index_location(config, self.index.as_deref()),
            chunk_size: self.chunk_size.unwrap_or(config.retrieval.chunk_size),
            chunk_overlap: self.chunk_overlap.unwrap_or(config.retrieval.chunk_overlap),
            batch_size: config.embedding.batch_size,
        };

        let embedder = create_provider(&EmbeddingConfig::from(&config.embedding))?;

        // JSON mode keeps the terminal quiet apart from the final document
        let reporter = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event.format_simple());
            }))
        };

        let stats = ingest(&options, embedder.as_ref(), &reporter).await?;

        if self.json {
            let output = serde_json::json!({
                "source": stats.source,
                "index": stats.location,
                "pages": stats.pages,
                "chunks": stats.chunks,
                "dimensions": stats.dimensions,
                "embedder": embedder.fingerprint().to_string(),
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} ({} pages, {} chunks, {} dims) into {} in {:.2}s",
                stats.source,
                stats.pages,
                stats.chunks,
                stats.dimensions,
                stats.location.display(),
                stats.duration_secs
            );
        }

        Ok(())
    }
}
