//! redline-chunk - Chunking strategy
//!
//! Documents are split into fixed-size, overlapping character windows before
//! they are embedded. The default window is 1000 characters with 200
//! characters shared between neighbours.
//!
//! # Example
//!
//! ```rust
//! use redline_chunk::{Chunker, SlidingWindowChunker};
//!
//! let chunker = SlidingWindowChunker::new();
//! let chunks = chunker.split("Hello world");
//! assert_eq!(chunks, vec!["Hello world".to_string()]);
//! ```

mod window;

pub use window::SlidingWindowChunker;

// Re-export types for convenience
pub use redline_core::{ChunkConfig, Chunker};
