//! SQLite-based storage implementation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, Transaction};
use tracing::{debug, info, warn};

use redline_core::{
    ChunkRecord, ChunkStore, DatabaseConfig, PendingChunk, RedlineError, ReindexPolicy, Result,
    ScoredChunk, StoreStats,
};

use crate::schema::{DROP_SCHEMA, SCHEMA, SCHEMA_VERSION};
use crate::similarity::{bytes_to_vec, cosine_similarity, vec_to_bytes};

/// SQLite-based chunk store.
///
/// One connection behind a blocking Mutex; every statement is short, so
/// the async methods run them inline.
pub struct SqliteStore {
    /// Connection wrapped in blocking Mutex.
    conn: Arc<Mutex<Connection>>,

    /// Set once `close` has run.
    closed: AtomicBool,
}

fn db_error(e: impl std::fmt::Display) -> RedlineError {
    RedlineError::store_unavailable(e.to_string())
}

impl SqliteStore {
    /// Open or create a database at the given path with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let config = DatabaseConfig {
            path: path.as_ref().to_path_buf(),
            ..DatabaseConfig::default()
        };
        Self::open_with(&config)
    }

    /// Open or create the database described by `config`.
    pub fn open_with(config: &DatabaseConfig) -> Result<Self> {
        let path = config.path.as_path();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| db_error(format!("Failed to open database: {}", e)))?;

        Self::configure_connection(&conn, config.wal_mode, config.busy_timeout_ms)?;
        info!("Database opened at {:?}", path);
        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| db_error(format!("Failed to open in-memory database: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| db_error(format!("Failed to initialize schema: {}", e)))?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(db_error)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            closed: AtomicBool::new(false),
        })
    }

    /// Configure SQLite connection for concurrent readers and one writer.
    fn configure_connection(conn: &Connection, wal_mode: bool, busy_timeout_ms: u32) -> Result<()> {
        let journal = if wal_mode { "WAL" } else { "DELETE" };
        conn.execute_batch(&format!(
            r#"
            PRAGMA journal_mode = {journal};
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA busy_timeout = {busy_timeout_ms};
            PRAGMA temp_store = MEMORY;
            "#,
        ))
        .map_err(|e| db_error(format!("Failed to configure connection: {}", e)))?;

        Ok(())
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R>,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(RedlineError::store_unavailable("store is closed"));
        }
        let conn = self.conn.lock().map_err(db_error)?;
        f(&conn)
    }

    /// Execute a mutable blocking operation on the connection.
    fn with_conn_mut<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R>,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(RedlineError::store_unavailable("store is closed"));
        }
        let mut conn = self.conn.lock().map_err(db_error)?;
        f(&mut conn)
    }

    /// Whether the chunk table currently exists.
    fn collection_exists(conn: &Connection) -> Result<bool> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'chunks'",
                [],
                |row| row.get(0),
            )
            .map_err(db_error)?;
        Ok(count > 0)
    }

    /// Insert numbered records inside an open transaction.
    fn insert_records(tx: &Transaction<'_>, records: &[ChunkRecord], created_at: i64) -> Result<()> {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT INTO chunks (id, filename, chunk_index, content, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .map_err(db_error)?;

        for record in records {
            stmt.execute(params![
                record.id,
                record.filename,
                record.chunk_index,
                record.content,
                vec_to_bytes(&record.embedding),
                created_at,
            ])
            .map_err(|e| db_error(format!("Failed to insert chunk {}: {}", record.id, e)))?;
        }

        Ok(())
    }

    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn ensure_collection(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA)
                .map_err(|e| db_error(format!("Failed to create collection: {}", e)))
        })
    }

    async fn insert_chunks(&self, chunks: &[ChunkRecord]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let created_at = Self::now_millis();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction().map_err(db_error)?;
            Self::insert_records(&tx, chunks, created_at)?;
            tx.commit().map_err(db_error)?;

            debug!("Inserted {} chunks", chunks.len());
            Ok(())
        })
    }

    async fn append_chunks(
        &self,
        filename: &str,
        chunks: Vec<PendingChunk>,
        policy: ReindexPolicy,
    ) -> Result<u32> {
        let created_at = Self::now_millis();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction().map_err(db_error)?;
            tx.execute_batch(SCHEMA)
                .map_err(|e| db_error(format!("Failed to create collection: {}", e)))?;

            let offset: u32 = match policy {
                ReindexPolicy::Append => tx
                    .query_row(
                        "SELECT COALESCE(MAX(chunk_index) + 1, 0) FROM chunks WHERE filename = ?1",
                        params![filename],
                        |row| row.get(0),
                    )
                    .map_err(db_error)?,
                ReindexPolicy::Replace => {
                    let removed = tx
                        .execute("DELETE FROM chunks WHERE filename = ?1", params![filename])
                        .map_err(db_error)?;
                    if removed > 0 {
                        debug!("Replaced {} existing chunks of {}", removed, filename);
                    }
                    0
                }
            };

            let records: Vec<ChunkRecord> = chunks
                .into_iter()
                .enumerate()
                .map(|(i, chunk)| {
                    ChunkRecord::new(filename, offset + i as u32, &chunk.content, chunk.embedding)
                })
                .collect();

            Self::insert_records(&tx, &records, created_at)?;
            tx.commit().map_err(db_error)?;

            debug!(
                "Appended {} chunks to {} starting at {}",
                records.len(),
                filename,
                offset
            );
            Ok(offset)
        })
    }

    async fn count_chunks(&self, filename: &str) -> Result<u32> {
        self.with_conn(|conn| {
            if !Self::collection_exists(conn)? {
                return Ok(0);
            }
            conn.query_row(
                "SELECT COUNT(*) FROM chunks WHERE filename = ?1",
                params![filename],
                |row| row.get(0),
            )
            .map_err(db_error)
        })
    }

    async fn delete_document(&self, filename: &str) -> Result<u64> {
        self.with_conn(|conn| {
            if !Self::collection_exists(conn)? {
                return Ok(0);
            }
            let deleted = conn
                .execute("DELETE FROM chunks WHERE filename = ?1", params![filename])
                .map_err(db_error)?;

            debug!("Deleted {} chunks for {}", deleted, filename);
            Ok(deleted as u64)
        })
    }

    async fn vector_search(
        &self,
        embedding: &[f32],
        filename: &str,
        k: u32,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = self.with_conn(|conn| {
            if !Self::collection_exists(conn)? {
                debug!("Collection does not exist yet; returning no results");
                return Ok(Vec::new());
            }

            let mut stmt = conn
                .prepare(
                    r#"
                    SELECT chunk_index, content, embedding
                    FROM chunks
                    WHERE filename = ?1
                    "#,
                )
                .map_err(db_error)?;

            let rows = stmt
                .query_map(params![filename], |row| {
                    let chunk_index: u32 = row.get(0)?;
                    let content: String = row.get(1)?;
                    let blob: Vec<u8> = row.get(2)?;
                    Ok((chunk_index, content, blob))
                })
                .map_err(db_error)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(db_error)?;

            Ok(rows)
        })?;

        let mut scored = Vec::with_capacity(rows.len());
        for (chunk_index, content, blob) in rows {
            let stored = bytes_to_vec(&blob);
            if stored.len() != embedding.len() {
                warn!(
                    "Skipping chunk {} of {}: embedding dimension {} != query dimension {}",
                    chunk_index,
                    filename,
                    stored.len(),
                    embedding.len()
                );
                continue;
            }
            scored.push(ScoredChunk {
                chunk_index,
                content,
                score: cosine_similarity(embedding, &stored),
            });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k as usize);

        Ok(scored)
    }

    async fn reset(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(DROP_SCHEMA)
                .map_err(|e| db_error(format!("Failed to reset collection: {}", e)))?;
            info!("Collection reset");
            Ok(())
        })
    }

    async fn stats(&self, filename: Option<&str>) -> Result<StoreStats> {
        let filter = filename.map(String::from);
        self.with_conn(move |conn| {
            if !Self::collection_exists(conn)? {
                return Ok(StoreStats {
                    filter,
                    ..StoreStats::default()
                });
            }

            let (documents, chunks): (u64, u64) = match &filter {
                Some(name) => conn.query_row(
                    r#"
                    SELECT COUNT(DISTINCT filename), COUNT(*)
                    FROM chunks WHERE filename = ?1
                    "#,
                    params![name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                ),
                None => conn.query_row(
                    "SELECT COUNT(DISTINCT filename), COUNT(*) FROM chunks",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                ),
            }
            .map_err(db_error)?;

            Ok(StoreStats {
                documents,
                chunks,
                filter,
            })
        })
    }

    async fn close(&self) -> Result<()> {
        self.with_conn(|conn| {
            if let Err(e) = conn.execute_batch("PRAGMA optimize;") {
                warn!("PRAGMA optimize failed on close: {}", e);
            }
            Ok(())
        })?;
        self.closed.store(true, Ordering::Release);
        info!("Store closed");
        Ok(())
    }
}
