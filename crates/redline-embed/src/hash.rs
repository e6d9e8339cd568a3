//! Feature-hashing embedder.

use async_trait::async_trait;
use redline_core::{Embedder, Result};

use crate::l2_normalize;

/// Deterministic bag-of-words embedder.
///
/// Every lowercase alphanumeric token is hashed with blake3 into one of
/// `dimension` buckets with a sign taken from the hash, then the vector is
/// L2-normalized. Texts sharing vocabulary land close together, which is
/// enough for retrieval inside a single contract.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a hash embedder with the default 384 dimensions.
    pub fn new() -> Self {
        Self { dimension: 384 }
    }

    /// Create a hash embedder with a custom dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];

        for token in tokens(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let mut word = [0u8; 8];
            word.copy_from_slice(&bytes[..8]);
            let value = u64::from_le_bytes(word);

            let bucket = (value % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_dimension_and_normalization() {
        let embedder = HashEmbedder::new();
        assert_eq!(embedder.dimension(), 384);

        let embeddings = embedder
            .embed_documents(&["Hello world", "Rust is great"])
            .await
            .unwrap();
        assert_eq!(embeddings.len(), 2);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 0.01);
        }
    }

    #[tokio::test]
    async fn test_deterministic_embeddings() {
        let embedder = HashEmbedder::new();
        let e1 = embedder.embed_query("consistent input").await.unwrap();
        let e2 = embedder.embed_query("consistent input").await.unwrap();
        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn test_case_and_punctuation_insensitive() {
        let embedder = HashEmbedder::new();
        let e1 = embedder.embed_query("Security Deposit!").await.unwrap();
        let e2 = embedder.embed_query("security deposit").await.unwrap();
        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn test_shared_vocabulary_scores_higher() {
        let embedder = HashEmbedder::new();
        let query = embedder
            .embed_query("security deposit return")
            .await
            .unwrap();
        let related = embedder
            .embed_query("Tenant forfeits security deposit if keys not returned")
            .await
            .unwrap();
        let unrelated = embedder
            .embed_query("The landlord paints the hallway every spring")
            .await
            .unwrap();

        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::with_dimension(16);
        let embedding = embedder.embed_query("").await.unwrap();
        assert_eq!(embedding, vec![0.0; 16]);
    }
}
