//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One page of a loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page text as extracted
    pub text: String,

    /// 1-based page number
    pub number: u32,

    /// Identifier of the document this page came from
    pub source: String,
}

/// A loaded source document: ordered pages, immutable after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    source: String,
    pages: Vec<Page>,
}

impl Document {
    /// Assemble a document from raw page texts, numbering them from 1.
    pub fn from_pages<I, S>(source: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let source = source.into();
        let pages = pages
            .into_iter()
            .zip(1u32..)
            .map(|(text, number)| Page {
                text: text.into(),
                number,
                source: source.clone(),
            })
            .collect();

        Self { source, pages }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A contiguous slice of one page's text.
///
/// `char_start..char_end` is the range within the page, counted in Unicode
/// scalar values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub page: u32,
    /// Global sequential position across the whole document
    pub index: usize,
    pub char_start: usize,
    pub char_end: usize,
}

/// A chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: Chunk,

    /// Cosine distance to the query (0 = identical direction)
    pub distance: f32,
}

/// Completion text plus the retrieval result it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text as returned by the completion service
    pub text: String,

    /// Retrieved chunks in ascending distance order
    pub sources: Vec<SearchHit>,
}

/// Options for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Document to ingest
    pub source: PathBuf,

    /// Directory that will hold the index
    pub location: PathBuf,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks of a page
    pub chunk_overlap: usize,

    /// Number of chunks sent to the embedder per call
    pub batch_size: usize,
}

/// Statistics from a completed ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub source: String,
    pub location: PathBuf,
    pub pages: usize,
    pub chunks: usize,
    pub dimensions: usize,
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_numbers_pages_from_one() {
        let doc = Document::from_pages("ipc.txt", ["first", "", "third"]);

        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.pages()[0].number, 1);
        assert_eq!(doc.pages()[2].number, 3);
        assert_eq!(doc.pages()[2].text, "third");
        assert!(doc.pages().iter().all(|p| p.source == "ipc.txt"));
    }

    #[test]
    fn test_search_hit_serialization() {
        let hit = SearchHit {
            chunk: Chunk {
                text: "Section 302".to_string(),
                source: "ipc.txt".to_string(),
                page: 2,
                index: 4,
                char_start: 0,
                char_end: 11,
            },
            distance: 0.25,
        };

        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["chunk"]["page"], 2);
        assert_eq!(json["distance"], 0.25);
    }
}
