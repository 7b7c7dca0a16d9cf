//! Legal Insight CLI
//!
//! Main entry point for the insight command-line tool.
//! Ingests a legal document into a local vector index and answers
//! questions grounded in the retrieved passages.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, IngestCommand, InspectCommand};
use insight_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Legal Insight - question answering over statutes with local RAG
#[derive(Parser, Debug)]
#[command(name = "insight")]
#[command(about = "Question answering over legal documents with local RAG", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "INSIGHT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "INSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Completion provider
    #[arg(short, long, global = true, env = "INSIGHT_PROVIDER")]
    provider: Option<String>,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "INSIGHT_MODEL")]
    model: Option<String>,

    /// Embedding provider (ollama, trigram)
    #[arg(long, global = true)]
    embedder: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the vector index from a document
    Ingest(IngestCommand),

    /// Ask one question against the index
    Ask(AskCommand),

    /// Answer questions read line by line from stdin
    Chat(ChatCommand),

    /// Show index provenance and entry counts
    Inspect(InspectCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Workspace and config file select the YAML that gets loaded
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.embedder,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("Legal Insight CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Completion: {}/{}", config.llm.provider, config.llm.model);
    tracing::debug!(
        "Embedder: {}/{}",
        config.embedding.provider,
        config.embedding.model
    );

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Inspect(_) => "inspect",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Inspect(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => {
            tracing::error!("Command failed: {}", e);
            commands::report_error(e);
            std::process::exit(1);
        }
    }

    result
}
