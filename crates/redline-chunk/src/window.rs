//! Sliding-window chunker.
//!
//! Windows are measured in characters, not bytes, so multi-byte text never
//! splits inside a code point.

use redline_core::{ChunkConfig, Chunker, RedlineError, Result};
use tracing::debug;

/// Fixed-size sliding-window chunker.
///
/// Chunk `i` starts at character `i * (size - overlap)` and spans at most
/// `size` characters. The last chunk ends at the end of the text and may be
/// shorter.
#[derive(Debug, Clone)]
pub struct SlidingWindowChunker {
    config: ChunkConfig,
}

impl SlidingWindowChunker {
    /// Create a chunker with the default 1000/200 window.
    pub fn new() -> Self {
        Self {
            config: ChunkConfig::default(),
        }
    }

    /// Create a chunker with a custom window.
    pub fn with_config(config: ChunkConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(RedlineError::invalid_argument("chunk size must be positive"));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(RedlineError::invalid_argument(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self { config })
    }

    /// Number of chunks `split` produces for a text of `len` characters.
    pub fn expected_chunks(&self, len: usize) -> usize {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        match len {
            0 => 0,
            l if l <= size => 1,
            l => (l - overlap).div_ceil(size - overlap),
        }
    }
}

impl Default for SlidingWindowChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SlidingWindowChunker {
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every character start, plus the end of the text.
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_len = offsets.len() - 1;

        let size = self.config.chunk_size;
        let stride = self.config.stride();

        let mut chunks = Vec::with_capacity(self.expected_chunks(char_len));
        let mut start = 0;
        loop {
            let end = (start + size).min(char_len);
            chunks.push(text[offsets[start]..offsets[end]].to_string());
            if end == char_len {
                break;
            }
            start += stride;
        }

        debug!(
            "Split {} characters into {} chunks (size={}, overlap={})",
            char_len,
            chunks.len(),
            size,
            self.config.chunk_overlap
        );

        chunks
    }

    fn config(&self) -> ChunkConfig {
        self.config
    }
}
