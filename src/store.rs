//! Vector store adapter over SQLite with the sqlite-vec extension.
//!
//! Embeddings live in a `vec0` virtual table keyed by the catalog record id
//! (the virtual table's rowid). Vectors cross the SQL boundary as JSON
//! arrays, which vec0 accepts for both inserts and `MATCH` queries. The
//! missing-set queries anti-join the `food` catalog table against the
//! embeddings table, so completed records disappear from the missing set as
//! soon as their commit lands.

use std::path::Path;
use std::sync::Once;

use rusqlite::{params, Connection};
use tracing::debug;

use crate::error::FooddexError;

/// Name of the vec0 virtual table holding one embedding per record.
const COLLECTION: &str = "food_embeddings";

/// Register sqlite-vec as an auto extension so every subsequent connection
/// in this process has the vec0 module available. Idempotent.
fn register_vec_extension() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite_vec::sqlite3_vec_init as *const (),
        )));
    });
}

/// Connection to the backing SQLite database with vector operations.
///
/// Each instance owns one connection. Parallel backfill workers open their
/// own instance instead of sharing a handle, so writes are not serialized
/// through a single connection.
pub struct VectorStore {
    conn: Connection,
}

impl VectorStore {
    /// Open a connection to the database at `path` with sqlite-vec loaded.
    ///
    /// Verifies the extension actually answers before returning, so callers
    /// see [`FooddexError::StoreUnavailable`] here rather than a confusing
    /// failure on first use.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FooddexError> {
        register_vec_extension();
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(FooddexError::store_unavailable)?;
        let version: String = conn
            .query_row("SELECT vec_version()", [], |row| row.get(0))
            .map_err(FooddexError::store_unavailable)?;
        debug!(%version, db = %path.display(), "opened vector store");
        Ok(Self { conn })
    }

    /// Drop and recreate the vector collection with the given vector width,
    /// and ensure the lookup index on `food.fdc_id` used for joins exists.
    ///
    /// Destructive: every stored embedding is discarded. Intended for
    /// one-time setup or an explicit re-init, never during backfill or
    /// search.
    pub fn init_collection(&self, dimension: usize) -> Result<(), FooddexError> {
        if dimension == 0 {
            return Err(FooddexError::InvalidConfig(
                "vector dimension must be at least 1".into(),
            ));
        }
        self.conn
            .execute_batch(&format!(
                "DROP TABLE IF EXISTS {COLLECTION};
                 CREATE VIRTUAL TABLE {COLLECTION} USING vec0(embedding FLOAT[{dimension}]);
                 CREATE INDEX IF NOT EXISTS idx_food_fdc_id ON food(fdc_id);"
            ))
            .map_err(FooddexError::store_unavailable)?;
        debug!(dimension, "recreated vector collection");
        Ok(())
    }

    /// Write all `(id, vector)` pairs in one transaction.
    ///
    /// All-or-nothing: on any failure nothing is committed and the caller
    /// treats the whole batch as failed. Re-submitting an id replaces its
    /// prior vector (`INSERT OR REPLACE` on the rowid), so upserts are
    /// idempotent and never duplicate.
    pub fn upsert_vectors(&mut self, batch: &[(i64, Vec<f32>)]) -> Result<usize, FooddexError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let tx = self
            .conn
            .transaction()
            .map_err(FooddexError::store_write)?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT OR REPLACE INTO {COLLECTION} (rowid, embedding) VALUES (?1, ?2)"
                ))
                .map_err(FooddexError::store_write)?;
            for (id, vector) in batch {
                let vector_json =
                    serde_json::to_string(vector).map_err(FooddexError::store_write)?;
                stmt.execute(params![id, vector_json])
                    .map_err(FooddexError::store_write)?;
            }
        }
        tx.commit().map_err(FooddexError::store_write)?;
        Ok(batch.len())
    }

    /// K-nearest-neighbor lookup: up to `k` `(id, distance)` pairs ordered
    /// by ascending L2 distance. Ties fall back to the store's natural
    /// order, which is stable within one query.
    pub fn query_nearest(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<(i64, f64)>, FooddexError> {
        let vector_json = serde_json::to_string(vector).map_err(FooddexError::store_query)?;
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT rowid, distance FROM {COLLECTION}
                 WHERE embedding MATCH ?1
                 ORDER BY distance
                 LIMIT ?2"
            ))
            .map_err(FooddexError::store_query)?;
        let rows = stmt
            .query_map(params![vector_json, k as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
            })
            .map_err(FooddexError::store_query)?;
        let mut hits = Vec::new();
        for row in rows {
            hits.push(row.map_err(FooddexError::store_query)?);
        }
        Ok(hits)
    }

    /// Count catalog records without a stored vector.
    ///
    /// Full-scan anti-join — potentially expensive, so a backfill run calls
    /// it exactly once to fix its target.
    pub fn count_missing(&self) -> Result<u64, FooddexError> {
        let count: i64 = self
            .conn
            .query_row(
                &format!(
                    "SELECT COUNT(f.fdc_id)
                     FROM food f
                     WHERE NOT EXISTS (
                         SELECT 1 FROM {COLLECTION} fe WHERE fe.rowid = f.fdc_id
                     )"
                ),
                [],
                |row| row.get(0),
            )
            .map_err(FooddexError::store_query)?;
        Ok(count as u64)
    }

    /// Up to `limit` `(id, text)` pairs for records lacking a vector.
    ///
    /// Order is deterministic within one call but not across calls:
    /// completed records drop out of the missing set as their commits land.
    pub fn select_missing(&self, limit: usize) -> Result<Vec<(i64, String)>, FooddexError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT f.fdc_id, f.description
                 FROM food f
                 WHERE NOT EXISTS (
                     SELECT 1 FROM {COLLECTION} fe WHERE fe.rowid = f.fdc_id
                 )
                 LIMIT ?1"
            ))
            .map_err(FooddexError::store_query)?;
        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(FooddexError::store_query)?;
        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row.map_err(FooddexError::store_query)?);
        }
        Ok(pairs)
    }
}
