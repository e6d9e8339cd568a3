//! redline-store - SQLite storage layer
//!
//! This crate stores document chunks and their embeddings in a single SQLite
//! table and answers similarity queries that are always restricted to one
//! document key.

mod schema;
mod similarity;
mod sqlite;

pub use similarity::cosine_similarity;
pub use sqlite::SqliteStore;

// Re-export schema for testing/migrations
pub use schema::SCHEMA;
