//! Document keys for scraped web pages.

/// Maximum characters kept from the URL before the suffix.
const MAX_KEY_CHARS: usize = 50;

/// Derive the document key for a URL.
///
/// The scheme is stripped, `/` becomes `_`, the result is cut to 50
/// characters and `.web` is appended. Distinct URLs can collide after
/// truncation.
pub fn document_key_for_url(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    let mut key: String = stripped
        .replace('/', "_")
        .chars()
        .take(MAX_KEY_CHARS)
        .collect();
    key.push_str(".web");
    key
}
