//! Page-aware chunk splitter with exact character overlap.
//!
//! Each page is cut into chunks of at most `chunk_size` characters. A cut
//! lands on the latest natural break in the window, preferring paragraph
//! breaks, then line breaks, then sentence boundaries, then whitespace, and
//! falls back to a hard cut. The next chunk starts `chunk_overlap`
//! characters before the previous cut, so consecutive chunks of a page share
//! exactly that many characters and the page can be rebuilt from its chunks.
//!
//! Windows holding nothing but whitespace (blank regions of `pdftotext
//! -layout` output, padded columns) are dropped, since there is nothing in
//! them to embed. Only whitespace is ever missing from a rebuilt page.

use crate::types::{Chunk, Page};
use insight_core::{AppError, AppResult};
use unicode_segmentation::UnicodeSegmentation;

/// Kind of break found before a character position, ordered by preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Break {
    None,
    Whitespace,
    Sentence,
    Line,
    Paragraph,
}

/// Splits pages into overlapping chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkSplitter {
    /// Create a splitter; requires `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split pages in order. Chunk indices run across the whole sequence.
    pub fn split(&self, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for page in pages {
            for (start, end, text) in self.split_page(&page.text) {
                chunks.push(Chunk {
                    text,
                    source: page.source.clone(),
                    page: page.number,
                    index: chunks.len(),
                    char_start: start,
                    char_end: end,
                });
            }
        }

        tracing::debug!(
            "Splitter created {} chunks from {} page(s) (size={}, overlap={})",
            chunks.len(),
            pages.len(),
            self.chunk_size,
            self.chunk_overlap
        );

        chunks
    }

    /// Character ranges and texts for one page.
    fn split_page(&self, text: &str) -> Vec<(usize, usize, String)> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the text
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = offsets.len() - 1;
        let slice = |start: usize, end: usize| text[offsets[start]..offsets[end]].to_string();

        if len <= self.chunk_size {
            return vec![(0, len, slice(0, len))];
        }

        let breaks = classify_breaks(text, &offsets);
        let mut ranges = Vec::new();
        let mut start = 0;

        loop {
            if len - start <= self.chunk_size {
                ranges.push((start, len, slice(start, len)));
                break;
            }

            let end = best_break(&breaks, start + self.chunk_overlap + 1, start + self.chunk_size);
            ranges.push((start, end, slice(start, end)));
            start = end - self.chunk_overlap;
        }

        ranges.retain(|(_, _, text)| !text.trim().is_empty());
        ranges
    }
}

/// Latest position in `lo..=hi` carrying the strongest break, or `hi`.
fn best_break(breaks: &[Break], lo: usize, hi: usize) -> usize {
    let mut best = (Break::None, hi);
    for pos in (lo..=hi).rev() {
        if breaks[pos] > best.0 {
            best = (breaks[pos], pos);
        }
    }
    best.1
}

/// For every char position `p`, the kind of break that a cut at `p`
/// (between char `p - 1` and char `p`) would fall on.
fn classify_breaks(text: &str, offsets: &[usize]) -> Vec<Break> {
    let chars: Vec<char> = text.chars().collect();
    let mut breaks = vec![Break::None; offsets.len()];

    for (pos, kind) in breaks.iter_mut().enumerate().skip(1) {
        let prev = chars[pos - 1];
        *kind = if prev == '\n' && pos >= 2 && chars[pos - 2] == '\n' {
            Break::Paragraph
        } else if prev == '\n' {
            Break::Line
        } else if prev.is_whitespace() {
            Break::Whitespace
        } else {
            Break::None
        };
    }

    for (byte_idx, _) in text.split_sentence_bound_indices().skip(1) {
        if let Ok(pos) = offsets.binary_search(&byte_idx) {
            if breaks[pos] < Break::Sentence {
                breaks[pos] = Break::Sentence;
            }
        }
    }

    breaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Document;
    use proptest::prelude::*;

    fn pages(texts: &[&str]) -> Vec<Page> {
        Document::from_pages("test.txt", texts.iter().copied())
            .pages()
            .to_vec()
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(ChunkSplitter::new(0, 0).is_err());
        assert!(ChunkSplitter::new(100, 100).is_err());
        assert!(ChunkSplitter::new(100, 150).is_err());
        assert!(ChunkSplitter::new(100, 0).is_ok());
    }

    #[test]
    fn test_short_page_is_single_chunk() {
        let splitter = ChunkSplitter::new(1000, 200).unwrap();
        let chunks = splitter.split(&pages(&["Section 1. Title and extent."]));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Section 1. Title and extent.");
        assert_eq!(chunks[0].char_start, 0);
        assert_eq!(chunks[0].char_end, 28);
    }

    #[test]
    fn test_blank_pages_yield_nothing() {
        let splitter = ChunkSplitter::new(10, 2).unwrap();
        let chunks = splitter.split(&pages(&["", "   \n\t ", "abc"]));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page, 3);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_indices_are_global_and_pages_kept() {
        let splitter = ChunkSplitter::new(12, 3).unwrap();
        let chunks = splitter.split(&pages(&[
            "alpha beta gamma delta",
            "epsilon zeta eta theta",
        ]));

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
        assert_eq!(chunks.first().unwrap().page, 1);
        assert_eq!(chunks.last().unwrap().page, 2);
        assert!(chunks.iter().all(|c| !c.text.contains("alpha") || c.page == 1));
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let splitter = ChunkSplitter::new(30, 0).unwrap();
        let text = "First para here.\n\nSecond. More words follow";
        let chunks = splitter.split(&pages(&[text]));

        assert_eq!(chunks[0].text, "First para here.\n\n");
        assert!(chunks[1].text.starts_with("Second."));
    }

    #[test]
    fn test_prefers_line_over_sentence() {
        let splitter = ChunkSplitter::new(30, 0).unwrap();
        let text = "Line one\nSentence two. Then three words";
        let chunks = splitter.split(&pages(&[text]));

        assert_eq!(chunks[0].text, "Line one\n");
    }

    #[test]
    fn test_prefers_sentence_over_word() {
        let splitter = ChunkSplitter::new(24, 0).unwrap();
        let text = "Murder is defined. Punishment follows here";
        let chunks = splitter.split(&pages(&[text]));

        assert_eq!(chunks[0].text, "Murder is defined. ");
    }

    #[test]
    fn test_hard_cut_without_breaks() {
        let splitter = ChunkSplitter::new(5, 1).unwrap();
        let chunks = splitter.split(&pages(&["abcdefghijkl"]));
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();

        assert_eq!(texts, vec!["abcde", "efghi", "ijkl"]);
    }

    #[test]
    fn test_multibyte_text_counts_characters() {
        let splitter = ChunkSplitter::new(4, 1).unwrap();
        let chunks = splitter.split(&pages(&["धारा३०२ह"]));

        assert!(chunks.iter().all(|c| c.text.chars().count() <= 4));
        assert_eq!(chunks[0].char_end - chunks[0].char_start, 4);
    }

    #[test]
    fn test_whitespace_run_is_skipped() {
        let splitter = ChunkSplitter::new(20, 5).unwrap();
        let text = format!("Section 1. Title.{}Section 302. Murder.", " ".repeat(100));
        let chunks = splitter.split(&pages(&[text.as_str()]));

        assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
        assert!(chunks.first().unwrap().text.starts_with("Section 1."));
        assert!(chunks.last().unwrap().text.ends_with("Murder."));
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    /// Words separated by runs of spaces, some longer than any chunk.
    fn spaced_text() -> impl Strategy<Value = String> {
        prop::collection::vec(("[a-zA-Z.]{1,8}", 0usize..80), 0..12).prop_map(|parts| {
            parts
                .into_iter()
                .map(|(word, gap)| word + &" ".repeat(gap))
                .collect()
        })
    }

    fn page_text() -> impl Strategy<Value = String> {
        prop_oneof!["[a-zA-Z0-9 .,;:é§\n]{0,300}", spaced_text()]
    }

    fn params() -> impl Strategy<Value = (usize, usize)> {
        (1usize..60).prop_flat_map(|size| (Just(size), 0..size))
    }

    proptest! {
        #[test]
        fn prop_split_is_deterministic(text in page_text(), (size, overlap) in params()) {
            let splitter = ChunkSplitter::new(size, overlap).unwrap();
            let input = pages(&[text.as_str()]);
            prop_assert_eq!(splitter.split(&input), splitter.split(&input));
        }

        #[test]
        fn prop_chunks_rebuild_page(text in page_text(), (size, overlap) in params()) {
            let splitter = ChunkSplitter::new(size, overlap).unwrap();
            let chunks = splitter.split(&pages(&[text.as_str()]));

            if text.trim().is_empty() {
                prop_assert!(chunks.is_empty());
            } else {
                let chars: Vec<char> = text.chars().collect();
                let mut covered = vec![false; chars.len()];
                for chunk in &chunks {
                    let expected: String = chars[chunk.char_start..chunk.char_end].iter().collect();
                    prop_assert_eq!(&chunk.text, &expected);
                    covered[chunk.char_start..chunk.char_end].fill(true);
                }
                for (c, seen) in chars.iter().zip(&covered) {
                    prop_assert!(*seen || c.is_whitespace(), "lost {:?}", c);
                }
            }
        }

        #[test]
        fn prop_consecutive_chunks_overlap_exactly(
            text in page_text(),
            (size, overlap) in params(),
        ) {
            let splitter = ChunkSplitter::new(size, overlap).unwrap();
            let chunks = splitter.split(&pages(&[text.as_str()]));

            let chars: Vec<char> = text.chars().collect();
            for pair in chunks.windows(2) {
                let prev: Vec<char> = pair[0].text.chars().collect();
                let next: Vec<char> = pair[1].text.chars().collect();
                prop_assert!(prev.len() > overlap);
                if pair[1].char_start == pair[0].char_end - overlap {
                    prop_assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
                } else {
                    // Dropped windows in between held only whitespace
                    prop_assert!(pair[1].char_start > pair[0].char_end - overlap);
                    let gap = &chars[pair[0].char_end - overlap..pair[1].char_start + overlap];
                    prop_assert!(gap.iter().all(|c| c.is_whitespace()));
                }
            }
        }

        #[test]
        fn prop_chunks_respect_size(text in page_text(), (size, overlap) in params()) {
            let splitter = ChunkSplitter::new(size, overlap).unwrap();
            for chunk in splitter.split(&pages(&[text.as_str()])) {
                let len = chunk.text.chars().count();
                prop_assert!(len <= size);
                prop_assert_eq!(len, chunk.char_end - chunk.char_start);
            }
        }
    }
}
