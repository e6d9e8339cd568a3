//! Page locator: map a quoted clause back to the page it came from.
//!
//! Matching is a plain substring search on whitespace-normalized text, so a
//! paraphrased quote silently falls back to page 1. [`locate_match`] makes
//! that fallback observable.

use redline_core::{normalize_whitespace, Page};

/// Characters of the quote used as the search key.
pub const SNIPPET_CHARS: usize = 30;

/// Page returned when no page contains the snippet.
const FALLBACK_PAGE: u32 = 1;

/// Result of a page lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMatch {
    /// Resolved page number (1-based).
    pub page: u32,

    /// False when the fallback page was used.
    pub matched: bool,
}

/// Page number of the first page containing the start of `snippet`, or 1.
pub fn locate(pages: &[Page], snippet: &str) -> u32 {
    locate_match(pages, snippet).page
}

/// Like [`locate`], but reports whether a page actually matched.
pub fn locate_match(pages: &[Page], snippet: &str) -> PageMatch {
    let normalized = normalize_whitespace(snippet);
    let key: String = normalized.chars().take(SNIPPET_CHARS).collect();

    if !key.is_empty() {
        if let Some(page) = pages.iter().find(|p| p.text.contains(&key)) {
            return PageMatch {
                page: page.page,
                matched: true,
            };
        }
    }

    PageMatch {
        page: FALLBACK_PAGE,
        matched: false,
    }
}
