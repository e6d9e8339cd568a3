//! redline-core - Core types and traits for contract risk review
//!
//! This crate provides the foundational types, traits, and error handling
//! shared by the chunker, the document store, the extractors, the LLM gateway
//! and the analysis orchestrator.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{RedlineError, Result};
pub use traits::*;
pub use types::*;
