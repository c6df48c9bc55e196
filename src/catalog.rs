//! Read-only accessor for the food catalog.
//!
//! The catalog (`food` table) is owned by the ingestion side of the system;
//! this crate only ever reads from it, to enrich search hits with their
//! descriptive text. Identifiers returned by the vector index that no
//! longer exist in the catalog are simply absent from lookups — a tolerated
//! inconsistency the search layer handles by dropping them.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::FooddexError;

/// One catalog record: opaque integer id plus the text used as embedding
/// input.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodRecord {
    pub fdc_id: i64,
    pub description: String,
}

/// Read-only handle onto the catalog table.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FooddexError> {
        let conn = Connection::open(path.as_ref()).map_err(FooddexError::catalog)?;
        Ok(Self { conn })
    }

    /// Look up a single record by id.
    pub fn get_by_id(&self, fdc_id: i64) -> Result<Option<FoodRecord>, FooddexError> {
        let mut stmt = self
            .conn
            .prepare("SELECT fdc_id, description FROM food WHERE fdc_id = ?1")
            .map_err(FooddexError::catalog)?;
        let mut rows = stmt
            .query_map(params![fdc_id], decode_record)
            .map_err(FooddexError::catalog)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(FooddexError::catalog)?)),
            None => Ok(None),
        }
    }

    /// Look up all records whose id appears in `ids`. Ids with no matching
    /// row are absent from the result; the caller decides what that means.
    pub fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<FoodRecord>, FooddexError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT fdc_id, description FROM food WHERE fdc_id IN ({placeholders})"
        );
        let mut stmt = self.conn.prepare(&sql).map_err(FooddexError::catalog)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), decode_record)
            .map_err(FooddexError::catalog)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(FooddexError::catalog)?);
        }
        Ok(records)
    }
}

fn decode_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FoodRecord> {
    Ok(FoodRecord {
        fdc_id: row.get(0)?,
        description: row.get(1)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_catalog(records: &[(i64, &str)]) -> (tempfile::TempDir, Catalog) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("catalog.sqlite");
        let conn = Connection::open(&db_path).expect("open");
        conn.execute_batch(
            "CREATE TABLE food (fdc_id INTEGER PRIMARY KEY, description TEXT);",
        )
        .expect("create table");
        for (id, description) in records {
            conn.execute(
                "INSERT INTO food (fdc_id, description) VALUES (?1, ?2)",
                params![id, description],
            )
            .expect("insert");
        }
        drop(conn);
        (dir, Catalog::open(&db_path).expect("open catalog"))
    }

    #[test]
    fn get_by_id_finds_existing_record() {
        let (_dir, catalog) = seeded_catalog(&[(42, "Cheddar cheese")]);
        let record = catalog.get_by_id(42).expect("lookup").expect("present");
        assert_eq!(record.fdc_id, 42);
        assert_eq!(record.description, "Cheddar cheese");
    }

    #[test]
    fn get_by_id_returns_none_for_unknown() {
        let (_dir, catalog) = seeded_catalog(&[(1, "apple")]);
        assert!(catalog.get_by_id(999).expect("lookup").is_none());
    }

    #[test]
    fn get_by_ids_skips_unknown_ids() {
        let (_dir, catalog) = seeded_catalog(&[(1, "apple"), (2, "pear")]);
        let records = catalog.get_by_ids(&[2, 999, 1]).expect("lookup");
        let mut ids: Vec<i64> = records.iter().map(|r| r.fdc_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn get_by_ids_empty_input_short_circuits() {
        let (_dir, catalog) = seeded_catalog(&[(1, "apple")]);
        assert!(catalog.get_by_ids(&[]).expect("lookup").is_empty());
    }
}
