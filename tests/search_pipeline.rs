//! End-to-end search over a seeded vector collection.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fooddex::{Embedder, FooddexError, SearchService, VectorStore};

const DIMENSION: usize = 4;

/// Embedder that returns the same fixed unit vector for every input, so a
/// test can position stored vectors at known distances from the query.
struct FixedEmbedder(Vec<f32>);

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, FooddexError> {
        Ok(vec![self.0.clone(); texts.len()])
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn dimension(&self) -> usize {
        self.0.len()
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

/// Catalog rows plus stored vectors; ids present in `vectors` but not in
/// `catalog` simulate index entries whose record was deleted.
fn seeded_db(
    catalog: &[(i64, &str)],
    vectors: &[(i64, Vec<f32>)],
) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("fooddb.sqlite");

    let conn = rusqlite::Connection::open(&db_path).expect("open");
    conn.execute_batch(
        "CREATE TABLE food (fdc_id INTEGER PRIMARY KEY, description TEXT);",
    )
    .expect("create food table");
    for (id, description) in catalog {
        conn.execute(
            "INSERT INTO food (fdc_id, description) VALUES (?1, ?2)",
            rusqlite::params![id, description],
        )
        .expect("insert food row");
    }
    drop(conn);

    let mut store = VectorStore::open(&db_path).expect("open store");
    store.init_collection(DIMENSION).expect("init collection");
    store.upsert_vectors(vectors).expect("seed vectors");
    (dir, db_path)
}

#[tokio::test]
async fn results_ordered_by_descending_similarity() {
    // Query is the unit x-axis vector. Stored vectors sit at increasing L2
    // distance from it, so similarity (1 - d/2) strictly decreases.
    let (_dir, db_path) = seeded_db(
        &[(1, "apple"), (2, "apple sauce"), (3, "orange juice")],
        &[
            (1, vec![1.0, 0.0, 0.0, 0.0]),
            (2, vec![0.8, 0.6, 0.0, 0.0]),
            (3, vec![0.0, 1.0, 0.0, 0.0]),
        ],
    );

    let service = SearchService::new(
        Arc::new(FixedEmbedder(vec![1.0, 0.0, 0.0, 0.0])),
        &db_path,
    );
    let hits = service.search_by_text("apple", 3).await;

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].fdc_id, 1);
    assert_eq!(hits[1].fdc_id, 2);
    assert_eq!(hits[2].fdc_id, 3);
    assert_eq!(hits[0].description, "apple");

    // Non-increasing similarity, and the identical vector scores 1.0.
    assert!((hits[0].similarity - 1.0).abs() < 1e-6);
    assert!(hits[0].similarity >= hits[1].similarity);
    assert!(hits[1].similarity >= hits[2].similarity);

    // Orthogonal unit vectors sit at distance sqrt(2): similarity ≈ 0.293.
    assert!((hits[2].similarity - 0.2928).abs() < 1e-3);
}

#[tokio::test]
async fn k_bounds_the_result_length() {
    let (_dir, db_path) = seeded_db(
        &[(1, "a"), (2, "b"), (3, "c")],
        &[
            (1, vec![1.0, 0.0, 0.0, 0.0]),
            (2, vec![0.0, 1.0, 0.0, 0.0]),
            (3, vec![0.0, 0.0, 1.0, 0.0]),
        ],
    );

    let service = SearchService::new(
        Arc::new(FixedEmbedder(vec![1.0, 0.0, 0.0, 0.0])),
        &db_path,
    );
    assert_eq!(service.search_by_text("anything", 2).await.len(), 2);
    // Fewer stored vectors than k: the result is just shorter.
    assert_eq!(service.search_by_text("anything", 10).await.len(), 3);
}

#[tokio::test]
async fn index_entries_missing_from_catalog_are_dropped() {
    // Id 99 has a vector but no catalog row — a tolerated inconsistency
    // that silently shrinks the result instead of erroring.
    let (_dir, db_path) = seeded_db(
        &[(1, "apple")],
        &[
            (1, vec![0.8, 0.6, 0.0, 0.0]),
            (99, vec![1.0, 0.0, 0.0, 0.0]),
        ],
    );

    let service = SearchService::new(
        Arc::new(FixedEmbedder(vec![1.0, 0.0, 0.0, 0.0])),
        &db_path,
    );
    let hits = service.search_by_text("apple", 5).await;

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].fdc_id, 1);
}

#[tokio::test]
async fn empty_index_yields_no_results() {
    let (_dir, db_path) = seeded_db(&[(1, "apple")], &[]);

    let service = SearchService::new(
        Arc::new(FixedEmbedder(vec![1.0, 0.0, 0.0, 0.0])),
        &db_path,
    );
    assert!(service.search_by_text("apple", 5).await.is_empty());
}
