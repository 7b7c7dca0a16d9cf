//! Offline embedding provider built from hashed word and character trigram features.

use crate::embeddings::provider::{ensure_not_empty, EmbeddingProvider};
use insight_core::AppResult;
use std::collections::HashMap;

/// Model name reported by the trigram provider.
pub const TRIGRAM_MODEL: &str = "trigram-v1";

/// Words carrying no retrieval signal.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what", "who", "whom", "how", "does", "do", "any",
    "shall", "under",
];

/// Trigram-based embedding provider for local, offline operation.
///
/// Deterministic and content-dependent, but not semantic: texts sharing
/// words (or word fragments) land close together. Suitable for tests and
/// air-gapped use.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let freq = *freq as f32;

            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let idx = self.bucket(window.iter().copied(), 37);
                embedding[idx] += freq.sqrt();
            }

            let idx = self.bucket(word.chars(), 31);
            embedding[idx] += freq;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }

    /// Stable multiplicative hash of a char sequence into a dimension.
    fn bucket(&self, chars: impl Iterator<Item = char>, multiplier: u64) -> usize {
        let hash = chars.fold(0u64, |acc, c| {
            acc.wrapping_mul(multiplier).wrapping_add(c as u64)
        });
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        TRIGRAM_MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|text| {
                ensure_not_empty(text)?;
                Ok(self.embed_text(text))
            })
            .collect()
    }
}
