//! PDF text extraction.

use lopdf::Document;
use tracing::{debug, warn};

use redline_core::{normalize_whitespace, Page, PageExtractor};

/// Extracts per-page text from PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl PageExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Vec<Page> {
        let doc = match Document::load_mem(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Failed to load PDF: {}", e);
                return Vec::new();
            }
        };

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        debug!("Extracting text from {} PDF pages", page_numbers.len());

        let mut pages = Vec::with_capacity(page_numbers.len());
        for page_num in page_numbers {
            match doc.extract_text(&[page_num]) {
                Ok(raw) => {
                    let text = normalize_whitespace(&raw);
                    if text.is_empty() {
                        debug!("Page {} has no text layer, skipping", page_num);
                        continue;
                    }
                    pages.push(Page::new(page_num, text));
                }
                Err(e) => {
                    warn!("Failed to extract text from page {}, skipping: {}", page_num, e);
                }
            }
        }

        pages
    }
}
