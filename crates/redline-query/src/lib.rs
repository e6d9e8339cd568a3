//! redline-query - per-document retrieval
//!
//! [`DocumentStore`] ties a chunker, an embedder and a chunk store together
//! behind `index`/`search`, with every query filtered to one document key.
//! The [`locate`] module maps a quoted clause back to its source page.

mod document;
mod key;
pub mod locate;

pub use document::{DocumentStore, DocumentStoreOptions};
pub use key::document_key_for_url;
pub use locate::{locate, locate_match, PageMatch, SNIPPET_CHARS};
pub use redline_core::normalize_whitespace;
