//! Analysis orchestrator.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use redline_core::{
    join_pages, AnalysisResult, ChatTurn, LlmGateway, PageExtractor, PipelineConfig, RedFlag,
    RedlineConfig, RedlineError, Result, StoreFailurePolicy, StoreStats, WebFetcher,
};
use redline_llm::{parse_analysis, prompt};
use redline_query::{document_key_for_url, locate_match, DocumentStore};

/// Retrieval query for uploaded contracts.
pub const RISK_QUERY: &str =
    "termination fees, penalties, data privacy, non-compete, indemnification, security deposit return";

/// Retrieval query for scraped terms pages; adds data selling.
pub const WEB_RISK_QUERY: &str = "termination fees, penalties, data privacy, data selling, \
                                  non-compete, indemnification, security deposit return";

/// Response of both analysis endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Document key the analysis was indexed under.
    pub filename: String,

    pub analysis: AnalysisResult,
}

/// Retrieval limits, failure policies and sampling settings.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub analysis_top_k: u32,
    pub chat_top_k: u32,
    pub pipeline: PipelineConfig,
    pub temperature: f32,
}

impl OrchestratorOptions {
    pub fn from_config(config: &RedlineConfig) -> Self {
        Self {
            analysis_top_k: config.search.analysis_top_k,
            chat_top_k: config.search.chat_top_k,
            pipeline: config.pipeline.clone(),
            temperature: config.llm.temperature,
        }
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_config(&RedlineConfig::default())
    }
}

/// Handle a store failure according to `policy`.
///
/// Only `StoreUnavailable` is subject to the policy; under `Degrade` it is
/// logged and replaced by `fallback`.
fn apply_policy<T>(
    policy: StoreFailurePolicy,
    stage: &str,
    result: Result<T>,
    fallback: T,
) -> Result<T> {
    match result {
        Err(e) if e.is_store_unavailable() && policy == StoreFailurePolicy::Degrade => {
            warn!("{} failed, continuing without the store: {}", stage, e);
            Ok(fallback)
        }
        other => other,
    }
}

/// Sequences extraction, indexing, retrieval, analysis and annotation.
pub struct Orchestrator {
    documents: Arc<DocumentStore>,
    pdf: Arc<dyn PageExtractor>,
    web: Arc<dyn WebFetcher>,
    llm: Arc<dyn LlmGateway>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(
        documents: Arc<DocumentStore>,
        pdf: Arc<dyn PageExtractor>,
        web: Arc<dyn WebFetcher>,
        llm: Arc<dyn LlmGateway>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            documents,
            pdf,
            web,
            llm,
            options,
        }
    }

    /// Analyze an uploaded PDF.
    ///
    /// Red flags are annotated with the page their clause was found on.
    pub async fn analyze_pdf(&self, filename: &str, bytes: &[u8]) -> Result<AnalysisResponse> {
        let start = Instant::now();

        if !filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(RedlineError::invalid_argument("File must be a PDF"));
        }

        let pages = self.pdf.extract(bytes);
        if pages.is_empty() {
            return Err(RedlineError::extraction_failed(
                filename,
                "no readable text in PDF",
            ));
        }
        debug!("Extracted {} pages from {}", pages.len(), filename);

        let policy = self.options.pipeline.analyze_store_policy;
        let text = join_pages(&pages);
        let chunks = self
            .index_and_retrieve(policy, filename, &text, RISK_QUERY)
            .await?;

        let mut analysis = self.run_analysis(&chunks).await;
        for flag in &mut analysis.red_flags {
            let found = locate_match(&pages, &flag.clause);
            if !found.matched {
                debug!(
                    "Clause not found verbatim in {}, defaulting to page {}",
                    filename, found.page
                );
            }
            flag.page = Some(found.page);
        }

        info!(
            "Analyzed {} in {:?} (score={}, red_flags={})",
            filename,
            start.elapsed(),
            analysis.safety_score,
            analysis.red_flags.len()
        );

        Ok(AnalysisResponse {
            filename: filename.to_string(),
            analysis,
        })
    }

    /// Analyze the terms page at `url`. Red flags carry no page.
    pub async fn analyze_url(&self, url: &str) -> Result<AnalysisResponse> {
        let start = Instant::now();

        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RedlineError::invalid_argument(
                "URL must start with http:// or https://",
            ));
        }

        let text = self.web.scrape(url).await;
        let length = text.chars().count();
        if length < self.options.pipeline.min_web_text_chars {
            return Err(RedlineError::extraction_failed(
                url,
                format!("page has too little readable text ({} characters)", length),
            ));
        }

        let filename = document_key_for_url(url);
        let policy = self.options.pipeline.analyze_url_store_policy;
        let chunks = self
            .index_and_retrieve(policy, &filename, &text, WEB_RISK_QUERY)
            .await?;

        let analysis = self.run_analysis(&chunks).await;

        info!(
            "Analyzed {} in {:?} (score={}, red_flags={})",
            url,
            start.elapsed(),
            analysis.safety_score,
            analysis.red_flags.len()
        );

        Ok(AnalysisResponse { filename, analysis })
    }

    /// Answer a question about an already-analyzed document.
    ///
    /// Nothing is indexed; an unknown document simply yields no context.
    pub async fn chat(&self, filename: &str, question: &str, history: &[ChatTurn]) -> Result<String> {
        if question.trim().is_empty() {
            return Err(RedlineError::invalid_argument("question must not be empty"));
        }

        let context = apply_policy(
            self.options.pipeline.chat_store_policy,
            "Chat retrieval",
            self.documents
                .search(question, filename, self.options.chat_top_k)
                .await,
            Vec::new(),
        )?;
        debug!("Chat on {} with {} context chunks", filename, context.len());

        let request =
            prompt::chat_request(&context, question, history).with_temperature(self.options.temperature);
        self.llm.complete(&request).await
    }

    /// Draft a negotiation email for one clause.
    pub async fn negotiate(&self, clause: &str, risk: &str) -> Result<String> {
        if clause.trim().is_empty() {
            return Err(RedlineError::invalid_argument("clause must not be empty"));
        }

        let request =
            prompt::negotiation_request(clause, risk).with_temperature(self.options.temperature);
        self.llm.complete(&request).await
    }

    /// Draft one negotiation email covering every red flag.
    pub async fn negotiate_all(&self, red_flags: &[RedFlag]) -> Result<String> {
        if red_flags.is_empty() {
            return Err(RedlineError::invalid_argument("red_flags must not be empty"));
        }

        let request =
            prompt::bulk_negotiation_request(red_flags).with_temperature(self.options.temperature);
        self.llm.complete(&request).await
    }

    /// Drop every indexed document.
    pub async fn reset(&self) -> Result<()> {
        self.documents.reset().await
    }

    /// Collection statistics, optionally for one document key.
    pub async fn stats(&self, filename: Option<&str>) -> Result<StoreStats> {
        self.documents.stats(filename).await
    }

    /// Release the document store.
    pub async fn close(&self) -> Result<()> {
        self.documents.close().await
    }

    async fn index_and_retrieve(
        &self,
        policy: StoreFailurePolicy,
        filename: &str,
        text: &str,
        query: &str,
    ) -> Result<Vec<String>> {
        apply_policy(
            policy,
            "Indexing",
            self.documents.index(filename, text).await,
            0,
        )?;

        apply_policy(
            policy,
            "Retrieval",
            self.documents
                .search(query, filename, self.options.analysis_top_k)
                .await,
            Vec::new(),
        )
    }

    /// Ask for the risk analysis; any gateway or parse failure degrades.
    async fn run_analysis(&self, chunks: &[String]) -> AnalysisResult {
        let request = prompt::analysis_request(chunks).with_temperature(self.options.temperature);

        match self
            .llm
            .complete(&request)
            .await
            .and_then(|reply| parse_analysis(&reply))
        {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Analysis degraded ({}): {}", self.llm.model(), e);
                AnalysisResult::degraded()
            }
        }
    }
}
