//! Configuration types for redline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RedlineError, Result};
use crate::traits::ChunkConfig;

/// Environment variables consulted for the LLM API key, in order.
pub const LLM_API_KEY_VARS: [&str; 2] = ["REDLINE_LLM_API_KEY", "GROQ_API_KEY"];

/// Environment variable consulted for the embedding API key.
pub const EMBEDDING_API_KEY_VAR: &str = "REDLINE_EMBEDDING_API_KEY";

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedlineConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Embedding configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Chunking configuration.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval limits.
    #[serde(default)]
    pub search: SearchConfig,

    /// Indexing behavior.
    #[serde(default)]
    pub index: IndexConfig,

    /// Per-endpoint failure policies.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// LLM gateway configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Web scraper configuration.
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Enable WAL mode (recommended).
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            wal_mode: true,
            busy_timeout_ms: 30000,
        }
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local feature-hashing embedder, no network.
    Hash,
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: EmbeddingProvider,

    /// Vector dimension (hash provider; checked against HTTP replies).
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Embeddings endpoint URL (http provider).
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Embedding model name (http provider).
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// API key; usually supplied through the environment.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Texts per embeddings request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            dimension: default_dimension(),
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            api_key: None,
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

/// Chunking configuration, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl ChunkingConfig {
    /// Convert to the chunker's window description.
    pub fn to_chunk_config(&self) -> ChunkConfig {
        ChunkConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}

/// Retrieval limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Chunks retrieved for a risk analysis.
    #[serde(default = "default_analysis_top_k")]
    pub analysis_top_k: u32,

    /// Chunks retrieved for a chat question.
    #[serde(default = "default_chat_top_k")]
    pub chat_top_k: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            analysis_top_k: default_analysis_top_k(),
            chat_top_k: default_chat_top_k(),
        }
    }
}

/// What happens when a filename that already has chunks is indexed again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReindexPolicy {
    /// Keep old chunks and add the new ones after them.
    #[default]
    Append,
    /// Delete the filename's chunks before inserting.
    Replace,
}

/// Indexing behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub reindex: ReindexPolicy,
}

/// How an endpoint reacts to `StoreUnavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFailurePolicy {
    /// Fail the request.
    Reject,
    /// Log a warning and continue with empty context.
    Degrade,
}

/// Per-endpoint failure policies and extraction thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_reject")]
    pub analyze_store_policy: StoreFailurePolicy,

    #[serde(default = "default_degrade")]
    pub analyze_url_store_policy: StoreFailurePolicy,

    #[serde(default = "default_degrade")]
    pub chat_store_policy: StoreFailurePolicy,

    /// Scraped pages with less text than this are rejected.
    #[serde(default = "default_min_web_text_chars")]
    pub min_web_text_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analyze_store_policy: StoreFailurePolicy::Reject,
            analyze_url_store_policy: StoreFailurePolicy::Degrade,
            chat_store_policy: StoreFailurePolicy::Degrade,
            min_web_text_chars: default_min_web_text_chars(),
        }
    }
}

/// LLM gateway configuration (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key; usually supplied through the environment.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: None,
            timeout_secs: default_llm_timeout(),
            max_retries: default_max_retries(),
            temperature: 0.0,
        }
    }
}

/// Web scraper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_scraper_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scraper_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Origins allowed by CORS.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Clear the whole collection once at startup.
    #[serde(default)]
    pub reset_on_start: bool,

    /// Largest accepted request body (PDF uploads), in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            cors_origins: default_cors_origins(),
            reset_on_start: false,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_busy_timeout() -> u32 {
    30000
}

fn default_embedding_provider() -> EmbeddingProvider {
    EmbeddingProvider::Hash
}

fn default_dimension() -> usize {
    384
}

fn default_embedding_endpoint() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_batch_size() -> usize {
    32
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_analysis_top_k() -> u32 {
    5
}

fn default_chat_top_k() -> u32 {
    3
}

fn default_reject() -> StoreFailurePolicy {
    StoreFailurePolicy::Reject
}

fn default_degrade() -> StoreFailurePolicy {
    StoreFailurePolicy::Degrade
}

fn default_min_web_text_chars() -> usize {
    100
}

fn default_llm_endpoint() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_scraper_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("redline")
        .join("redline.db")
}

impl RedlineConfig {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RedlineError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default paths.
    pub fn load_default() -> Result<Self> {
        // Try user config first
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("redline").join("config.toml");
            if user_config.exists() {
                return Self::load(&user_config);
            }
        }

        // Try local config
        let local_config = PathBuf::from("redline.toml");
        if local_config.exists() {
            return Self::load(&local_config);
        }

        Ok(Self::default())
    }

    /// Fill API keys from the environment when the file does not set them.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.llm.api_key.is_none() {
            self.llm.api_key = LLM_API_KEY_VARS
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.is_empty()));
        }
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = lookup(EMBEDDING_API_KEY_VAR).filter(|v| !v.is_empty());
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(RedlineError::config("chunking.chunk_size must be positive"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RedlineError::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embedding.dimension == 0 {
            return Err(RedlineError::config("embedding.dimension must be positive"));
        }
        if self.embedding.batch_size == 0 {
            return Err(RedlineError::config("embedding.batch_size must be positive"));
        }
        Ok(())
    }
}
