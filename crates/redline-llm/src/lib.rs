//! redline-llm - LLM gateway for contract review
//!
//! # Gateways
//!
//! - [`ChatCompletionsGateway`]: any OpenAI-compatible chat completions
//!   endpoint (Groq by default), with retry and exponential backoff.
//! - [`MockGateway`]: canned replies for tests, no network.
//!
//! # Prompts and parsing
//!
//! [`prompt`] builds the analysis, chat and negotiation requests;
//! [`parse_analysis`] turns the analysis reply into an
//! [`AnalysisResult`](redline_core::AnalysisResult) or rejects it.
//!
//! ```
//! use redline_llm::{parse_analysis, MockGateway, LlmGateway};
//! use redline_core::CompletionRequest;
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let gateway = MockGateway::new(r#"{"safety_score": 80, "summary": "Fair.", "red_flags": []}"#);
//! let reply = rt.block_on(gateway.complete(&CompletionRequest::new("sys", "user"))).unwrap();
//! assert_eq!(parse_analysis(&reply).unwrap().safety_score, 80);
//! ```

mod gateway;
mod mock;
mod parse;
pub mod prompt;

pub use gateway::ChatCompletionsGateway;
pub use mock::MockGateway;
pub use parse::parse_analysis;

// Re-export the gateway trait for convenience
pub use redline_core::LlmGateway;
