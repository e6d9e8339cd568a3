//! redline-server - contract review service
//!
//! The [`Orchestrator`] runs each request through extraction, indexing,
//! retrieval, LLM analysis and page annotation. [`http`] exposes it as a
//! JSON API under `/api/v1`.

pub mod http;
mod orchestrator;

use std::sync::Arc;

use tracing::info;

use redline_chunk::SlidingWindowChunker;
use redline_core::{RedlineConfig, Result};
use redline_embed::build_embedder;
use redline_extract::{PdfExtractor, WebScraper};
use redline_llm::ChatCompletionsGateway;
use redline_query::{DocumentStore, DocumentStoreOptions};
use redline_store::SqliteStore;

pub use http::{router, serve};
pub use orchestrator::{
    AnalysisResponse, Orchestrator, OrchestratorOptions, RISK_QUERY, WEB_RISK_QUERY,
};

/// Wire up the production orchestrator from configuration.
pub fn build_orchestrator(config: &RedlineConfig) -> Result<Orchestrator> {
    config.validate()?;

    let store = Arc::new(SqliteStore::open_with(&config.database)?);
    let embedder = build_embedder(&config.embedding)?;
    let chunker = Arc::new(SlidingWindowChunker::with_config(
        config.chunking.to_chunk_config(),
    )?);

    let documents = DocumentStore::open(
        store,
        embedder,
        chunker,
        DocumentStoreOptions {
            reindex: config.index.reindex,
        },
    );

    let orchestrator = Orchestrator::new(
        Arc::new(documents),
        Arc::new(PdfExtractor::new()),
        Arc::new(WebScraper::new(&config.scraper)?),
        Arc::new(ChatCompletionsGateway::new(&config.llm)?),
        OrchestratorOptions::from_config(config),
    );

    info!("Orchestrator ready (model={})", config.llm.model);
    Ok(orchestrator)
}
