//! Ask command handler.
//!
//! Answers one question from the index and lists the passages the
//! answer was grounded on.

use clap::Args;
use insight_core::{config::AppConfig, AppResult};
use insight_knowledge::Answer;
use std::path::PathBuf;

/// Ask one question against the index
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Index directory (default: retrieval.indexDir from config)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Grounding template file (YAML)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Grounding template ID from .insight/prompts (see `insight inspect`)
    #[arg(long, conflicts_with = "template")]
    pub template_id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let mut engine = super::open_engine(
            config,
            self.index.as_deref(),
            self.top_k,
            super::TemplateChoice {
                path: self.template.as_deref(),
                id: self.template_id.as_deref(),
            },
        )?;

        let answer = engine.ask(&self.question).await?;
        tracing::debug!("Query trail: {:?}", engine.trail());

        if self.json {
            let output = serde_json::json!({
                "question": self.question,
                "answer": answer.text,
                "model": engine.context().settings.model,
                "sources": sources_json(&answer),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_answer(&answer);
        }

        Ok(())
    }
}

/// Print the answer followed by its numbered sources, in retrieval order.
pub(crate) fn print_answer(answer: &Answer) {
    println!("{}", answer.text.trim());
    println!();

    for line in source_lines(answer) {
        println!("{}", line);
    }
}

fn source_lines(answer: &Answer) -> Vec<String> {
    answer
        .sources
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("Source {} (page {}): {}", i + 1, hit.chunk.page, hit.chunk.text))
        .collect()
}

fn sources_json(answer: &Answer) -> Vec<serde_json::Value> {
    answer
        .sources
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            serde_json::json!({
                "rank": i + 1,
                "source": hit.chunk.source,
                "page": hit.chunk.page,
                "distance": hit.distance,
                "text": hit.chunk.text,
            })
        })
        .collect()
}
