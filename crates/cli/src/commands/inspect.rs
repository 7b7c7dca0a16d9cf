//! Inspect command handler.

use clap::Args;
use insight_core::{config::AppConfig, AppResult};
use insight_knowledge::VectorIndex;
use insight_prompt::list_prompts;
use std::path::PathBuf;

/// Show index provenance and entry counts
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Index directory (default: retrieval.indexDir from config)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing inspect command");

        let location = super::index_location(config, self.index.as_deref());
        let index = VectorIndex::load(&location)?;
        let meta = index.metadata();
        let templates = list_prompts(&config.workspace)?;

        if self.json {
            let output = serde_json::json!({
                "index": location,
                "metadata": meta,
                "templates": templates,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Index:       {}", location.display());
        println!("Source:      {} ({} pages)", meta.source, meta.page_count);
        println!("Entries:     {}", meta.entry_count);
        println!("Embedder:    {}", meta.embedder);
        println!("Metric:      {}", meta.metric);
        println!(
            "Chunking:    size {} / overlap {}",
            meta.chunk_size, meta.chunk_overlap
        );
        println!("Created:     {}", meta.created_at.to_rfc3339());
        println!("Checksum:    {}", meta.checksum);

        if templates.is_empty() {
            println!("Templates:   (built-in only)");
        } else {
            println!("Templates:   {}", templates.join(", "));
        }

        Ok(())
    }
}
