//! Core domain types.

use serde::{Deserialize, Serialize};

/// Summary returned when the LLM call or its output cannot be used.
pub const DEGRADED_SUMMARY: &str = "Error analyzing contract.";

/// One page of extracted PDF text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-based).
    pub page: u32,

    /// Whitespace-normalized page text.
    pub text: String,
}

impl Page {
    /// Create a new page.
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        Self {
            page,
            text: text.into(),
        }
    }
}

/// Collapse every run of whitespace into one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Join page texts in page order, one newline between pages.
pub fn join_pages(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A chunk of a document, as stored in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Chunk identity: `{filename}_chunk_{index}`.
    pub id: String,

    /// Owning document key.
    pub filename: String,

    /// Index within the document (0-based, contiguous).
    pub chunk_index: u32,

    /// Chunk text.
    pub content: String,

    /// Embedding vector for the chunk text.
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    /// Create a chunk record with the canonical id.
    pub fn new(filename: &str, chunk_index: u32, content: &str, embedding: Vec<f32>) -> Self {
        Self {
            id: Self::make_id(filename, chunk_index),
            filename: filename.to_string(),
            chunk_index,
            content: content.to_string(),
            embedding,
        }
    }

    /// Build the chunk id for a document key and index.
    pub fn make_id(filename: &str, chunk_index: u32) -> String {
        format!("{}_chunk_{}", filename, chunk_index)
    }
}

/// Chunk text and embedding waiting for the store to number it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChunk {
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// Chunk index within its document.
    pub chunk_index: u32,

    /// Chunk text.
    pub content: String,

    /// Cosine similarity to the query (higher is better).
    pub score: f32,
}

/// Severity of a red flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
        }
    }
}

/// A risky clause identified by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedFlag {
    /// Quoted clause text.
    pub clause: String,

    /// Plain-language explanation of the risk.
    pub risk: String,

    /// How bad it is.
    pub severity: Severity,

    /// Source page, only set for PDF-sourced analyses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl RedFlag {
    /// Create a red flag with no page annotation.
    pub fn new(clause: impl Into<String>, risk: impl Into<String>, severity: Severity) -> Self {
        Self {
            clause: clause.into(),
            risk: risk.into(),
            severity,
            page: None,
        }
    }
}

/// Structured risk assessment of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0 (predatory) to 100 (safe).
    pub safety_score: u8,

    /// One-sentence summary.
    pub summary: String,

    /// Findings in the order the LLM reported them.
    #[serde(default)]
    pub red_flags: Vec<RedFlag>,
}

impl AnalysisResult {
    /// Zero-confidence result used when the LLM call fails.
    pub fn degraded() -> Self {
        Self {
            safety_score: 0,
            summary: DEGRADED_SUMMARY.to_string(),
            red_flags: Vec::new(),
        }
    }

    /// Whether this is the zero-confidence fallback.
    pub fn is_degraded(&self) -> bool {
        self.safety_score == 0 && self.summary == DEGRADED_SUMMARY && self.red_flags.is_empty()
    }
}

/// A prior conversation turn, passed through to the LLM untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Statistics about the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of distinct document keys.
    pub documents: u64,

    /// Number of stored chunks.
    pub chunks: u64,

    /// Optional filename filter applied.
    pub filter: Option<String>,
}
