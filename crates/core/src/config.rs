//! Configuration management for the Legal Insight CLI.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (.insight/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. The configuration is workspace-centric: relative paths
//! (index directory, template file) resolve against the workspace root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Completion providers the CLI knows how to construct.
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["ollama"];

/// Embedding providers the CLI knows how to construct.
pub const KNOWN_EMBEDDING_PROVIDERS: &[&str] = &["ollama", "trigram"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .insight/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Completion service settings
    pub llm: LlmSettings,

    /// Embedder settings
    pub embedding: EmbeddingSettings,

    /// Chunking and retrieval settings
    pub retrieval: RetrievalSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Completion service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider name (currently "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Service base URL
    pub endpoint: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Extra attempts after a failed completion (0 disables retry)
    #[serde(default)]
    pub completion_retries: u32,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: "llama3".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            timeout_secs: 120,
            completion_retries: 0,
            temperature: None,
        }
    }
}

/// Embedder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "ollama" or "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Service base URL (ignored by offline providers)
    pub endpoint: String,

    /// Number of texts embedded per batch during ingestion
    pub batch_size: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            endpoint: "http://localhost:11434".to_string(),
            batch_size: 32,
            timeout_secs: 30,
        }
    }
}

/// Chunking and retrieval configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Maximum chunk size in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    pub top_k: usize,

    /// Index directory (relative paths resolve against the workspace)
    pub index_dir: PathBuf,

    /// Optional YAML grounding template overriding the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 2,
            index_dir: PathBuf::from("vectorstore").join("db_index"),
            template_file: None,
        }
    }
}

/// Full configuration file structure. Every section is optional and
/// every field inside a section falls back to its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<PartialLlm>,
    embedding: Option<PartialEmbedding>,
    retrieval: Option<PartialRetrieval>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialLlm {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
    completion_retries: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialEmbedding {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
    batch_size: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialRetrieval {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    top_k: Option<usize>,
    index_dir: Option<PathBuf>,
    template_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `INSIGHT_WORKSPACE`: Override workspace path
    /// - `INSIGHT_CONFIG`: Path to config file
    /// - `INSIGHT_PROVIDER`: Completion provider
    /// - `INSIGHT_MODEL`: Completion model identifier
    /// - `INSIGHT_ENDPOINT`: Completion service base URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use insight_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration for an explicit workspace and config file.
    ///
    /// Both arguments take precedence over `INSIGHT_WORKSPACE` and
    /// `INSIGHT_CONFIG`. The YAML file is read from `config_file`, or from
    /// `<workspace>/.insight/config.yaml` when none is given.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("INSIGHT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("INSIGHT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        if config_file.is_some() {
            config.config_file = config_file;
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.insight_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("INSIGHT_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("INSIGHT_MODEL") {
            config.llm.model = model;
        }

        if let Ok(endpoint) = std::env::var("INSIGHT_ENDPOINT") {
            config.llm.endpoint = endpoint;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> Result<Self, serde_yaml::Error> {
        let file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(ws) = file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = file.llm {
            let target = &mut result.llm;
            if let Some(v) = llm.provider {
                target.provider = v;
            }
            if let Some(v) = llm.model {
                target.model = v;
            }
            if let Some(v) = llm.endpoint {
                target.endpoint = v;
            }
            if let Some(v) = llm.timeout_secs {
                target.timeout_secs = v;
            }
            if let Some(v) = llm.completion_retries {
                target.completion_retries = v;
            }
            if llm.temperature.is_some() {
                target.temperature = llm.temperature;
            }
        }

        if let Some(embedding) = file.embedding {
            let target = &mut result.embedding;
            if let Some(v) = embedding.provider {
                target.provider = v;
            }
            if let Some(v) = embedding.model {
                target.model = v;
            }
            if let Some(v) = embedding.dimensions {
                target.dimensions = v;
            }
            if let Some(v) = embedding.endpoint {
                target.endpoint = v;
            }
            if let Some(v) = embedding.batch_size {
                target.batch_size = v;
            }
            if let Some(v) = embedding.timeout_secs {
                target.timeout_secs = v;
            }
        }

        if let Some(retrieval) = file.retrieval {
            let target = &mut result.retrieval;
            if let Some(v) = retrieval.chunk_size {
                target.chunk_size = v;
            }
            if let Some(v) = retrieval.chunk_overlap {
                target.chunk_overlap = v;
            }
            if let Some(v) = retrieval.top_k {
                target.top_k = v;
            }
            if let Some(v) = retrieval.index_dir {
                target.index_dir = v;
            }
            if retrieval.template_file.is_some() {
                target.template_file = retrieval.template_file;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables
    /// and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        embedder: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(embedder) = embedder {
            self.embedding.provider = embedder;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .insight directory.
    pub fn insight_dir(&self) -> PathBuf {
        self.workspace.join(".insight")
    }

    /// Resolve a possibly relative path against the workspace root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Absolute location of the index directory.
    pub fn index_location(&self) -> PathBuf {
        self.resolve(&self.retrieval.index_dir)
    }

    /// Completion request timeout.
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    /// Embedding request timeout.
    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding.timeout_secs)
    }

    /// Validate the configuration before any pipeline runs.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be positive".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be positive".to_string(),
            ));
        }

        if self.retrieval.chunk_size == 0 {
            return Err(AppError::Config("Chunk size must be positive".to_string()));
        }

        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.retrieval.chunk_overlap, self.retrieval.chunk_size
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        Ok(())
    }
}
