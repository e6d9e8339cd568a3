//! Core traits defining the interfaces between components.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ReindexPolicy;
use crate::error::Result;
use crate::types::{ChunkRecord, Page, PendingChunk, ScoredChunk, StoreStats};

/// Storage layer for the chunk collection.
///
/// Implementations must tolerate concurrent inserts and queries.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Create the collection if it does not exist yet.
    async fn ensure_collection(&self) -> Result<()>;

    /// Insert already-numbered chunk records. An existing id is an error.
    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<()>;

    /// Number and store `chunks` as the next chunks of `filename`.
    ///
    /// Indices continue after the document's highest stored index, or start
    /// at 0 once its old chunks are removed under [`ReindexPolicy::Replace`].
    /// Picking the offset and inserting happen in one transaction, so two
    /// writers on the same key never hand out the same index. Returns the
    /// index of the first chunk written.
    async fn append_chunks(
        &self,
        filename: &str,
        chunks: Vec<PendingChunk>,
        policy: ReindexPolicy,
    ) -> Result<u32>;

    /// Number of chunks stored for a document key.
    async fn count_chunks(&self, filename: &str) -> Result<u32>;

    /// Remove every chunk of a document key. Returns the number removed.
    async fn delete_document(&self, filename: &str) -> Result<u64>;

    /// Similarity search restricted to chunks whose filename equals `filename`.
    ///
    /// Results are ordered by decreasing similarity. A missing collection
    /// yields an empty result, not an error.
    async fn vector_search(
        &self,
        embedding: &[f32],
        filename: &str,
        k: u32,
    ) -> Result<Vec<ScoredChunk>>;

    /// Drop every chunk of every document. Safe on an empty store.
    async fn reset(&self) -> Result<()>;

    /// Collection statistics, optionally for one document key.
    async fn stats(&self, filename: Option<&str>) -> Result<StoreStats>;

    /// Flush and release the backend. Later calls fail with `StoreUnavailable`.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Embedding model trait.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of chunk texts.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;
}

/// Turns uploaded document bytes into page text.
///
/// Never fails: unreadable input yields no pages.
pub trait PageExtractor: Send + Sync {
    /// Pages with non-empty, whitespace-normalized text, in page order.
    fn extract(&self, bytes: &[u8]) -> Vec<Page>;
}

/// Fetches a web page and returns its readable text.
///
/// Never fails: network errors and timeouts yield an empty string.
#[async_trait]
pub trait WebFetcher: Send + Sync {
    async fn scrape(&self, url: &str) -> String;
}

/// Chunking configuration, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Window size.
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
}

impl ChunkConfig {
    /// Distance between the starts of consecutive chunks.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Chunking strategy trait.
pub trait Chunker: Send + Sync {
    /// Split text into ordered chunks.
    fn split(&self, text: &str) -> Vec<String>;

    /// The window this chunker applies.
    fn config(&self) -> ChunkConfig;
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Map a free-form history role onto a chat role.
    ///
    /// Anything that is not the user is treated as the assistant.
    pub fn from_history(role: &str) -> Self {
        match role.to_ascii_lowercase().as_str() {
            "user" | "human" => Self::User,
            "system" => Self::System,
            _ => Self::Assistant,
        }
    }
}

/// One message of an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A request to the LLM gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Conversation, system prompt first.
    pub messages: Vec<Message>,

    /// Sampling temperature.
    pub temperature: f32,
}

impl CompletionRequest {
    /// Build a request from a system prompt and a single user message.
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(user)],
            temperature: 0.0,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Text of the last user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// LLM gateway: sends a prompt, returns the completion text.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Run a chat completion.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_config_default() {
        let config = ChunkConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.stride(), 800);
    }

    #[test]
    fn test_role_from_history() {
        assert_eq!(Role::from_history("user"), Role::User);
        assert_eq!(Role::from_history("bot"), Role::Assistant);
        assert_eq!(Role::from_history("System"), Role::System);
    }

    #[test]
    fn test_completion_request_last_user_message() {
        let mut request = CompletionRequest::new("sys", "first");
        request.messages.push(Message::assistant("reply"));
        request.messages.push(Message::user("second"));
        assert_eq!(request.last_user_message(), Some("second"));
        assert_eq!(request.temperature, 0.0);
    }
}
