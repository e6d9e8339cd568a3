//! OpenAI-compatible embeddings client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use redline_core::{Embedder, EmbeddingConfig, RedlineError, Result};

use crate::l2_normalize;

/// Embedder backed by a remote `/embeddings` endpoint.
///
/// Failures surface as `StoreUnavailable`: to the pipeline an unreachable
/// embedding service is the same as an unreachable store.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create a client from the embedding section of the config.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RedlineError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size.max(1),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RedlineError::store_unavailable(format!("Embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RedlineError::store_unavailable(format!(
                "Embedding endpoint returned HTTP {}: {}",
                status, text
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            RedlineError::store_unavailable(format!("Invalid embedding response: {}", e))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(RedlineError::store_unavailable(format!(
                "Embedding endpoint returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        parsed
            .data
            .into_iter()
            .map(|d| {
                let mut embedding = d.embedding;
                if embedding.len() != self.dimension {
                    return Err(RedlineError::store_unavailable(format!(
                        "Embedding dimension {} does not match configured {}",
                        embedding.len(),
                        self.dimension
                    )));
                }
                l2_normalize(&mut embedding);
                Ok(embedding)
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!("Embedding batch of {} texts with {}", batch.len(), self.model);
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RedlineError::store_unavailable("Empty embedding response"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
