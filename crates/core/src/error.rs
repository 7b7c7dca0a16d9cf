//! Error types for the Legal Insight tool.
//!
//! This module defines a unified error enum covering every failure the
//! ingestion and query pipelines can surface, plus the ambient categories
//! (configuration, I/O, prompt, serialization).

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stage of the ingestion pipeline, used to tag ingestion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Loading,
    Splitting,
    Embedding,
    Building,
    Persisting,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Splitting => "splitting",
            Self::Embedding => "embedding",
            Self::Building => "index build",
            Self::Persisting => "persist",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the Legal Insight tool.
///
/// All fallible functions return `Result<T, AppError>`. Errors are
/// propagated to the caller, never stringified and swallowed.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source document is missing, unreadable, or unsupported
    #[error("Failed to load {path:?}: {message}")]
    Load { path: PathBuf, message: String },

    /// The embedder rejected its input or could not be reached
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vectors (or a vector and an index) disagree on dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The index was built by a different embedder than the one querying it
    #[error("Index was built with embedder '{found}', but the configured embedder is '{expected}'")]
    ProvenanceMismatch { expected: String, found: String },

    /// No index exists at the given location
    #[error("No index found at {0:?}")]
    IndexNotFound(PathBuf),

    /// The persisted index failed integrity checks
    #[error("Index at {path:?} is corrupt: {message}")]
    CorruptIndex { path: PathBuf, message: String },

    /// The index holds zero entries
    #[error("The index is empty")]
    EmptyIndex,

    /// The question (or a search parameter) was rejected before the pipeline ran
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The completion service timed out, failed, or returned nothing usable
    #[error("Completion service error: {0}")]
    Completion(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An ingestion run aborted at the given stage
    #[error("Ingestion failed at {stage} stage: {source}")]
    Ingest {
        stage: IngestStage,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Tag an error with the ingestion stage it came from.
    pub fn at_stage(stage: IngestStage, source: AppError) -> Self {
        AppError::Ingest {
            stage,
            source: Box::new(source),
        }
    }

    /// Whether retrying the same request later may succeed.
    ///
    /// Service-side failures (embedder or completion backend) are
    /// retryable; missing or corrupt indexes and invalid input are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Embedding(_) | AppError::Completion(_) => true,
            AppError::Ingest { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Actionable guidance for the user, if there is any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            AppError::IndexNotFound(_) | AppError::EmptyIndex | AppError::CorruptIndex { .. } => {
                Some("Run 'insight ingest <document>' to build the index first.")
            }
            AppError::DimensionMismatch { .. } | AppError::ProvenanceMismatch { .. } => Some(
                "Re-run 'insight ingest' with the current embedder, or configure the embedder the index was built with.",
            ),
            AppError::Embedding(_) | AppError::Completion(_) => {
                Some("The model service is unavailable or failed; check that Ollama is running and retry later.")
            }
            AppError::InvalidQuery(_) => Some("Enter a non-empty question."),
            AppError::Ingest { source, .. } => source.hint(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
