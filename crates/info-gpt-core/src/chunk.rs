//! Overlapping character-window chunker.
//!
//! Splits document content into [`Chunk`]s of at most `max_chars`
//! characters. Consecutive chunks of the same document share exactly
//! `overlap_chars` characters so that context survives the split boundary.
//!
//! # Algorithm
//!
//! 1. Measure the content in Unicode scalar values (never splits a UTF-8
//!    sequence).
//! 2. Emit the window `[start, start + max_chars)`, clamped to the end.
//! 3. Advance `start` by `max_chars - overlap_chars` until the last window
//!    reaches the end of the content.
//!
//! Empty content produces no chunks. Source and title are copied verbatim
//! onto every chunk.
//!
//! # Example
//!
//! ```rust
//! use info_gpt_core::chunk::{chunk_document, ChunkConfig};
//! use info_gpt_core::models::Document;
//!
//! let doc = Document::new("a".repeat(1200), "https://wiki.example.com/page");
//! let chunks = chunk_document(&doc, &ChunkConfig::new(1000, 20).unwrap());
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].text.chars().count(), 220);
//! ```

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};

use crate::models::{Chunk, Document};

/// Window size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    max_chars: usize,
    overlap_chars: usize,
}

impl ChunkConfig {
    /// Validate and build a chunking configuration.
    ///
    /// `max_chars` must be non-zero and strictly larger than `overlap_chars`,
    /// otherwise the window would never advance.
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            bail!("chunk size must be > 0");
        }
        if overlap_chars >= max_chars {
            bail!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap_chars,
                max_chars
            );
        }
        Ok(Self {
            max_chars,
            overlap_chars,
        })
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    fn step(&self) -> usize {
        self.max_chars - self.overlap_chars
    }
}

/// Split raw text into overlapping windows.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    if chars.len() <= config.max_chars {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + config.max_chars).min(chars.len());
        pieces.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += config.step();
    }
    pieces
}

/// Chunk a single document, copying its metadata onto every chunk.
pub fn chunk_document(doc: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    split_text(&doc.content, config)
        .into_iter()
        .enumerate()
        .map(|(index, text)| make_chunk(doc, index, text))
        .collect()
}

/// Chunk a batch of documents, preserving document order.
pub fn chunk_documents(docs: &[Document], config: &ChunkConfig) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|doc| chunk_document(doc, config))
        .collect()
}

/// Hex-encoded SHA-256 of a chunk's text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(doc: &Document, index: usize, text: String) -> Chunk {
    Chunk {
        hash: content_hash(&text),
        text,
        source: doc.source.clone(),
        title: doc.title.clone(),
        chunk_index: index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(max: usize, overlap: usize) -> ChunkConfig {
        ChunkConfig::new(max, overlap).unwrap()
    }

    fn numbered_text(len: usize) -> String {
        (0..len)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect()
    }

    #[test]
    fn test_small_text_single_chunk() {
        let doc = Document::new("Hello, world!", "https://example.com");
        let chunks = chunk_document(&doc, &cfg(1000, 20));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "Hello, world!");
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let doc = Document::new("", "https://example.com");
        assert!(chunk_document(&doc, &cfg(1000, 20)).is_empty());
    }

    #[test]
    fn test_exact_size_single_chunk() {
        let text = numbered_text(1000);
        assert_eq!(split_text(&text, &cfg(1000, 20)), vec![text]);
    }

    #[test]
    fn test_1200_chars_two_chunks() {
        let text = numbered_text(1200);
        let pieces = split_text(&text, &cfg(1000, 20));
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].chars().count(), 1000);
        let expected_second: String = text.chars().skip(980).collect();
        assert_eq!(pieces[1], expected_second);
    }

    #[test]
    fn test_bounds_and_overlap_hold() {
        let text = numbered_text(5_321);
        for (max, overlap) in [(1000, 20), (600, 20), (97, 13), (10, 0)] {
            let pieces = split_text(&text, &cfg(max, overlap));
            assert!(pieces.len() > 1);
            for piece in &pieces {
                assert!(piece.chars().count() <= max);
            }
            for pair in pieces.windows(2) {
                let prev: Vec<char> = pair[0].chars().collect();
                let next: Vec<char> = pair[1].chars().collect();
                assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
            }
        }
    }

    #[test]
    fn test_windows_cover_content() {
        let text = numbered_text(2_500);
        let config = cfg(1000, 20);
        let pieces = split_text(&text, &config);
        let mut rebuilt: String = pieces[0].clone();
        for piece in &pieces[1..] {
            rebuilt.extend(piece.chars().skip(config.overlap_chars()));
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Hello wörld      │\n└──────────────────┘";
        let pieces = split_text(text, &cfg(7, 2));
        for piece in &pieces {
            assert!(piece.chars().count() <= 7);
        }
    }

    #[test]
    fn test_metadata_copied_and_indices_contiguous() {
        let doc = Document::new(numbered_text(3_000), "https://wiki/x").with_title("X");
        let chunks = chunk_document(&doc, &cfg(600, 20));
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.source, "https://wiki/x");
            assert_eq!(c.title.as_deref(), Some("X"));
            assert_eq!(c.hash, content_hash(&c.text));
        }
    }

    #[test]
    fn test_chunk_documents_preserves_order() {
        let docs = vec![
            Document::new(numbered_text(1_500), "a"),
            Document::new("short", "b"),
        ];
        let chunks = chunk_documents(&docs, &cfg(1000, 20));
        let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "a", "b"]);
    }

    #[test]
    fn test_deterministic() {
        let doc = Document::new(numbered_text(4_000), "src");
        let c1 = chunk_document(&doc, &cfg(700, 50));
        let c2 = chunk_document(&doc, &cfg(700, 50));
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ChunkConfig::new(0, 0).is_err());
        assert!(ChunkConfig::new(20, 20).is_err());
        assert!(ChunkConfig::new(20, 30).is_err());
    }
}
