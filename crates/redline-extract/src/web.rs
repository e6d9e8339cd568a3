//! Web page scraping.

use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use tracing::{debug, warn};

use redline_core::{RedlineError, Result, ScraperConfig, WebFetcher};

/// Elements whose content is page chrome rather than terms text.
const BOILERPLATE_TAGS: [&str; 6] = ["script", "style", "nav", "footer", "header", "aside"];

/// Render width handed to html2text.
const RENDER_WIDTH: usize = 120;

/// Fetches pages with a desktop-browser User-Agent and extracts their text.
pub struct WebScraper {
    client: reqwest::Client,
}

impl WebScraper {
    /// Create a scraper from the scraper section of the config.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| RedlineError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> std::result::Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl WebFetcher for WebScraper {
    async fn scrape(&self, url: &str) -> String {
        let html = match self.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                return String::new();
            }
        };

        debug!("Fetched {} bytes from {}", html.len(), url);
        clean_html(&html)
    }
}

/// Strip boilerplate elements, render to text and drop blank lines.
///
/// Returns an empty string if the HTML cannot be rendered.
pub fn clean_html(html: &str) -> String {
    let patterns = std::iter::once(r"(?s)<!--.*?-->".to_string()).chain(
        BOILERPLATE_TAGS
            .iter()
            .map(|tag| format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")),
    );

    let mut stripped = html.to_string();
    for pattern in patterns {
        match Regex::new(&pattern) {
            Ok(re) => stripped = re.replace_all(&stripped, "").into_owned(),
            Err(e) => warn!("Invalid pattern {}: {}", pattern, e),
        }
    }

    let rendered = match html2text::config::plain()
        .string_from_read(stripped.as_bytes(), RENDER_WIDTH)
    {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to render HTML: {}", e);
            return String::new();
        }
    };

    rendered
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_boilerplate_elements() {
        let html = r#"
            <html>
              <head><style>body { color: red; }</style></head>
              <body>
                <header>Site Logo</header>
                <nav><a href="/">Home</a></nav>
                <main>
                  <h1>Terms of Service</h1>
                  <p>We may sell your data to third parties.</p>
                </main>
                <aside>Related links</aside>
                <script>trackVisitor();</script>
                <footer>Copyright</footer>
              </body>
            </html>
        "#;

        let text = clean_html(html);
        assert!(text.contains("Terms of Service"));
        assert!(text.contains("We may sell your data to third parties."));
        for junk in ["Site Logo", "Home", "Related links", "trackVisitor", "Copyright", "color"] {
            assert!(!text.contains(junk), "{} should be removed", junk);
        }
    }

    #[test]
    fn test_strips_blank_lines() {
        let html = "<p>First</p>\n\n\n<p>   </p><p>Second</p>";
        let text = clean_html(html);
        assert!(text.lines().all(|line| !line.trim().is_empty()));
        assert!(text.contains("First"));
        assert!(text.contains("Second"));
    }

    #[test]
    fn test_tag_names_are_case_insensitive() {
        let text = clean_html("<SCRIPT type=\"x\">alert(1)</SCRIPT><p>Body text</p>");
        assert!(!text.contains("alert"));
        assert!(text.contains("Body text"));
    }

    #[test]
    fn test_does_not_strip_similar_tag_names() {
        // <headers> is not <header>.
        let text = clean_html("<headers>Keep me</headers>");
        assert!(text.contains("Keep me"));
    }

    #[tokio::test]
    async fn test_unreachable_url_yields_empty_text() {
        let config = ScraperConfig {
            timeout_secs: 2,
            ..ScraperConfig::default()
        };
        let scraper = WebScraper::new(&config).unwrap();
        assert_eq!(scraper.scrape("http://127.0.0.1:9/terms").await, "");
    }
}
