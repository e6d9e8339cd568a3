//! redline-extract - document extractors
//!
//! - [`PdfExtractor`]: per-page text from PDF bytes via `lopdf`.
//! - [`WebScraper`]: fetches a page with `reqwest`, drops boilerplate
//!   elements and renders the rest to plain text with `html2text`.
//!
//! Both report failure as empty output and log a warning; deciding whether
//! empty output is an error belongs to the caller.

mod pdf;
mod web;

#[cfg(any(test, feature = "test-util"))]
pub mod fixture;

pub use pdf::PdfExtractor;
pub use web::{clean_html, WebScraper};

pub use redline_core::{PageExtractor, WebFetcher};
