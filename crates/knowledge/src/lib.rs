//! Retrieval pipeline for Legal Insight.
//!
//! Ingestion turns a source document into a persisted vector index:
//! load pages, split them into overlapping chunks, embed every chunk, and
//! write chunks plus vectors to disk. Querying embeds a question with the
//! same embedder, retrieves the nearest chunks, grounds a prompt on them,
//! and asks the completion service.

pub mod embeddings;
pub mod ingest;
pub mod loader;
pub mod progress;
pub mod query;
pub mod splitter;
pub mod types;
pub mod vector_index;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbedderFingerprint, EmbeddingConfig, EmbeddingProvider};
pub use ingest::ingest;
pub use loader::load_document;
pub use progress::{ProgressEvent, ProgressReporter};
pub use query::{QueryContext, QueryEngine, QuerySettings, QueryState};
pub use splitter::ChunkSplitter;
pub use types::{Answer, Chunk, Document, IngestOptions, IngestStats, Page, SearchHit};
pub use vector_index::{IndexMetadata, IndexProvenance, VectorIndex};
