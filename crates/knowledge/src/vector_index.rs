//! Persisted flat vector index with cosine search.
//!
//! An index is a list of (chunk, vector) entries plus provenance metadata,
//! stored as `<location>/index.json`. It is built once per ingestion and
//! read-only afterwards.

use crate::embeddings::EmbedderFingerprint;
use crate::types::{Chunk, SearchHit};
use chrono::{DateTime, Utc};
use insight_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the index inside its location directory.
pub const INDEX_FILE: &str = "index.json";

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Distance metric recorded in the metadata.
pub const METRIC: &str = "cosine";

/// Provenance and integrity metadata stored with an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub format_version: u32,
    pub embedder: EmbedderFingerprint,
    pub metric: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub source: String,
    pub page_count: usize,
    pub entry_count: usize,
    pub created_at: DateTime<Utc>,
    /// Hex SHA-256 of the serialized entries
    pub checksum: String,
}

/// Description of how an index's content was produced.
#[derive(Debug, Clone)]
pub struct IndexProvenance {
    pub embedder: EmbedderFingerprint,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub source: String,
    pub page_count: usize,
}

/// One stored chunk and its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// In-memory vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    metadata: IndexMetadata,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Pair chunks with their vectors.
    ///
    /// Inputs must have equal length and every vector must match the
    /// embedder's dimensionality.
    pub fn build(
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        provenance: IndexProvenance,
    ) -> AppResult<Self> {
        if chunks.len() != vectors.len() {
            return Err(AppError::DimensionMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let dimensions = provenance.embedder.dimensions;
        for vector in &vectors {
            if vector.len() != dimensions {
                return Err(AppError::DimensionMismatch {
                    expected: dimensions,
                    actual: vector.len(),
                });
            }
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(AppError::Embedding(
                    "Embedding contains non-finite values".to_string(),
                ));
            }
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        let metadata = IndexMetadata {
            format_version: FORMAT_VERSION,
            embedder: provenance.embedder,
            metric: METRIC.to_string(),
            chunk_size: provenance.chunk_size,
            chunk_overlap: provenance.chunk_overlap,
            source: provenance.source,
            page_count: provenance.page_count,
            entry_count: entries.len(),
            created_at: Utc::now(),
            checksum: checksum(&entries)?,
        };

        tracing::debug!(
            "Built index with {} entries ({})",
            metadata.entry_count,
            metadata.embedder
        );

        Ok(Self { metadata, entries })
    }

    /// Write the index to `<location>/index.json`, replacing any existing one.
    ///
    /// The file is written to a temporary sibling, synced, then renamed into
    /// place. A crash mid-write leaves any previous index intact.
    pub fn persist(&self, location: &Path) -> AppResult<PathBuf> {
        fs::create_dir_all(location)?;

        let target = location.join(INDEX_FILE);
        let temp = location.join(format!("{}.tmp", INDEX_FILE));
        let bytes = serde_json::to_vec(self)?;

        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &target)?;

        tracing::info!(
            "Persisted {} entries to {:?} ({} bytes)",
            self.entries.len(),
            target,
            bytes.len()
        );

        Ok(target)
    }

    /// Load and verify an index from `location`.
    pub fn load(location: &Path) -> AppResult<Self> {
        let path = location.join(INDEX_FILE);
        if !path.is_file() {
            return Err(AppError::IndexNotFound(location.to_path_buf()));
        }

        let bytes = fs::read(&path)?;
        let corrupt = |message: String| AppError::CorruptIndex {
            path: path.clone(),
            message,
        };

        let index: VectorIndex =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(format!("parse failure: {}", e)))?;
        let metadata = &index.metadata;

        if metadata.format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {} (expected {})",
                metadata.format_version, FORMAT_VERSION
            )));
        }

        if metadata.metric != METRIC {
            return Err(corrupt(format!("unsupported metric '{}'", metadata.metric)));
        }

        if metadata.entry_count != index.entries.len() {
            return Err(corrupt(format!(
                "metadata lists {} entries but {} are stored",
                metadata.entry_count,
                index.entries.len()
            )));
        }

        if let Some(entry) = index
            .entries
            .iter()
            .find(|e| e.vector.len() != metadata.embedder.dimensions)
        {
            return Err(corrupt(format!(
                "entry {} has {} dimensions, expected {}",
                entry.chunk.index,
                entry.vector.len(),
                metadata.embedder.dimensions
            )));
        }

        if checksum(&index.entries)? != metadata.checksum {
            return Err(corrupt("checksum mismatch".to_string()));
        }

        tracing::debug!(
            "Loaded index from {:?}: {} entries ({})",
            path,
            index.entries.len(),
            metadata.embedder
        );

        Ok(index)
    }

    /// Fail unless `embedder` is the embedder that built this index.
    pub fn ensure_compatible(&self, embedder: &EmbedderFingerprint) -> AppResult<()> {
        let built_with = &self.metadata.embedder;

        if built_with.dimensions != embedder.dimensions {
            return Err(AppError::DimensionMismatch {
                expected: built_with.dimensions,
                actual: embedder.dimensions,
            });
        }

        if built_with.provider != embedder.provider || built_with.model != embedder.model {
            return Err(AppError::ProvenanceMismatch {
                expected: embedder.to_string(),
                found: built_with.to_string(),
            });
        }

        Ok(())
    }

    /// The `k` entries nearest to `query` by cosine distance, ascending.
    ///
    /// Ties keep entry order. Returns every entry when fewer than `k` exist.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if k == 0 {
            return Err(AppError::InvalidQuery(
                "top-k must be at least 1".to_string(),
            ));
        }

        if self.entries.is_empty() {
            return Err(AppError::EmptyIndex);
        }

        let dimensions = self.metadata.embedder.dimensions;
        if query.len() != dimensions {
            return Err(AppError::DimensionMismatch {
                expected: dimensions,
                actual: query.len(),
            });
        }

        if query.iter().any(|x| !x.is_finite()) {
            return Err(AppError::Embedding(
                "Query vector contains non-finite values".to_string(),
            ));
        }

        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_distance(query, &entry.vector), entry))
            .collect();

        // Stable sort keeps entry order for equal distances
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, entry)| SearchHit {
                chunk: entry.chunk.clone(),
                distance,
            })
            .collect())
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `1 - cosine similarity`; a zero vector is treated as orthogonal.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

fn checksum(entries: &[IndexEntry]) -> AppResult<String> {
    let bytes = serde_json::to_vec(entries)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
