//! Embedding configuration and provenance fingerprint.

use insight_core::config::EmbeddingSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Embedding configuration used to build a provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "ollama" or "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Base URL for HTTP providers
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Maximum number of texts per embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Per-request timeout for HTTP providers
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingSettings::default())
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            endpoint: settings.endpoint.clone(),
            batch_size: settings.batch_size,
            timeout_secs: settings.timeout_secs,
        }
    }
}

impl EmbeddingConfig {
    /// Offline trigram configuration with the given dimensionality.
    pub fn trigram(dimensions: usize) -> Self {
        Self {
            provider: "trigram".to_string(),
            model: super::providers::trigram::TRIGRAM_MODEL.to_string(),
            dimensions,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Provenance record stored with an index.
    pub fn fingerprint(&self) -> EmbedderFingerprint {
        EmbedderFingerprint {
            provider: self.provider.clone(),
            model: self.model.clone(),
            dimensions: self.dimensions,
        }
    }
}

/// Which embedder produced a set of vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbedderFingerprint {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl fmt::Display for EmbedderFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({} dims)", self.provider, self.model, self.dimensions)
    }
}
