//! Database schema definitions.

/// Chunk collection. Created on first use and dropped by a full reset.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_filename ON chunks(filename, chunk_index);
"#;

/// Drops the whole collection.
pub const DROP_SCHEMA: &str = r#"
DROP INDEX IF EXISTS idx_chunks_filename;
DROP TABLE IF EXISTS chunks;
"#;

/// Schema version for migrations.
pub const SCHEMA_VERSION: u32 = 1;
