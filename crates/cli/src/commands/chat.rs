//! Chat command handler.
//!
//! Reads questions line by line from stdin and answers each against one
//! loaded index. `exit`, `quit`, or end of input ends the session.

use clap::Args;
use insight_core::{config::AppConfig, AppResult};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Answer questions read line by line from stdin
#[derive(Args, Debug)]
pub struct ChatCommand {
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
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let mut engine = super::open_engine(
            config,
            self.index.as_deref(),
            self.top_k,
            super::TemplateChoice {
                path: self.template.as_deref(),
                id: self.template_id.as_deref(),
            },
        )?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut answered = 0usize;

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };

            if is_exit(&line) {
                break;
            }

            // Per-question failures are reported and the session continues
            match engine.ask(&line).await {
                Ok(answer) => {
                    answered += 1;
                    super::ask::print_answer(&answer);
                    println!();
                }
                Err(e) => super::report_error(&e),
            }
        }

        tracing::info!("Chat session ended after {} answer(s)", answered);
        Ok(())
    }
}

fn is_exit(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit")
}
