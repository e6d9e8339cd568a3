//! redline-embed - text embedders
//!
//! Two backends implement [`Embedder`]:
//!
//! - [`HashEmbedder`]: local feature hashing of word tokens, no network,
//!   deterministic. The default, and what the tests run against.
//! - [`HttpEmbedder`]: any OpenAI-compatible `/embeddings` endpoint.
//!
//! Both return L2-normalized vectors of a fixed dimension.

mod hash;
mod http;

use std::sync::Arc;

use redline_core::{EmbeddingConfig, EmbeddingProvider, Result};

pub use hash::HashEmbedder;
pub use http::HttpEmbedder;

// Re-export the Embedder trait for convenience
pub use redline_core::Embedder;

/// Build the embedder selected by `config.provider`.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::with_dimension(config.dimension))),
        EmbeddingProvider::Http => Ok(Arc::new(HttpEmbedder::new(config)?)),
    }
}

/// L2 normalize a vector in place.
pub(crate) fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_hash_embedder() {
        let config = EmbeddingConfig {
            dimension: 64,
            ..EmbeddingConfig::default()
        };
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 64);
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
