//! Embedding backfill scheduler — the core engine.
//!
//! One run discovers which catalog records lack an embedding, drives the
//! provider over them in sub-batches under a wall-clock budget, and commits
//! each sub-batch atomically. A run is best-effort: sub-batch failures are
//! contained and logged, the deadline ends a run with partial completion,
//! and whatever is left simply stays in the missing set for the next run.
//!
//! Nothing guards against two runs executing concurrently. Both could
//! select and embed the same missing record; the idempotent upsert makes
//! the race harmless (last write wins), so it is documented rather than
//! locked away.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::BackfillConfig;
use crate::error::FooddexError;
use crate::provider::Embedder;
use crate::store::VectorStore;

/// Outcome of one backfill run: how many records got a committed embedding
/// versus how many were missing when the run started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub processed: u64,
    pub target: u64,
}

/// Drives embedding backfill runs against one database.
pub struct BackfillScheduler<E> {
    embedder: Arc<E>,
    db_path: PathBuf,
    cfg: BackfillConfig,
}

impl<E: Embedder + 'static> BackfillScheduler<E> {
    pub fn new(embedder: Arc<E>, db_path: impl AsRef<Path>, cfg: BackfillConfig) -> Self {
        Self {
            embedder,
            db_path: db_path.as_ref().to_path_buf(),
            cfg,
        }
    }

    /// Execute one backfill run.
    ///
    /// An unconfigured provider makes this a no-op (`{processed: 0,
    /// target: 0}`), not an error: backfill is an optional enhancement.
    /// The missing count is computed exactly once; the deadline is checked
    /// between fetch-windows and, in sequential mode, before each
    /// sub-batch. A record whose sub-batch failed is not retried within the
    /// same run — it stays missing for the next one.
    pub async fn run(&self) -> Result<BackfillReport, FooddexError> {
        if !self.embedder.is_configured() {
            warn!("embedding provider not configured; skipping backfill");
            return Ok(BackfillReport {
                processed: 0,
                target: 0,
            });
        }

        let store = VectorStore::open(&self.db_path)?;
        let target = store.count_missing()?;
        if target == 0 {
            info!("no records missing embeddings");
            return Ok(BackfillReport {
                processed: 0,
                target: 0,
            });
        }

        let deadline = Instant::now() + self.cfg.timeout();
        info!(
            target,
            workers = self.cfg.workers,
            timeout_secs = self.cfg.timeout_secs,
            model = self.embedder.model(),
            "starting backfill run"
        );

        let mut processed: u64 = 0;
        // Ids dispatched this run. A failed sub-batch keeps its records in
        // the store's missing set, so without this guard the next
        // fetch-window would re-select and retry them within the same run.
        let mut attempted: HashSet<i64> = HashSet::new();

        'run: while processed < target {
            if Instant::now() >= deadline {
                warn!(processed, target, "deadline reached; stopping run");
                break;
            }

            let window: Vec<(i64, String)> = store
                .select_missing(self.cfg.batch_size)?
                .into_iter()
                .filter(|(id, _)| !attempted.contains(id))
                .collect();
            if window.is_empty() {
                break;
            }
            attempted.extend(window.iter().map(|(id, _)| *id));

            let sub_batches: Vec<Vec<(i64, String)>> = window
                .chunks(self.cfg.provider_batch_size.max(1))
                .map(|chunk| chunk.to_vec())
                .collect();
            debug!(
                window = window.len(),
                sub_batches = sub_batches.len(),
                "processing fetch-window"
            );

            if self.cfg.workers <= 1 {
                for sub_batch in sub_batches {
                    if Instant::now() >= deadline {
                        warn!(processed, target, "deadline reached; stopping run");
                        break 'run;
                    }
                    match process_sub_batch(
                        self.embedder.clone(),
                        self.db_path.clone(),
                        sub_batch,
                    )
                    .await
                    {
                        Ok(count) => {
                            processed += count as u64;
                            debug!(processed, target, "sub-batch committed");
                        }
                        Err(err) => warn!(error = %err, "sub-batch abandoned"),
                    }
                }
            } else {
                processed += self.run_window_parallel(sub_batches, deadline).await;
            }
        }

        info!(processed, target, "backfill run complete");
        Ok(BackfillReport { processed, target })
    }

    /// Dispatch one fetch-window's sub-batches onto a bounded worker pool
    /// and collect results as they complete, never waiting past the
    /// deadline. Workers still in flight at the deadline are detached: they
    /// finish (or fail) on their own and any late result is ignored.
    async fn run_window_parallel(
        &self,
        sub_batches: Vec<Vec<(i64, String)>>,
        deadline: Instant,
    ) -> u64 {
        let semaphore = Arc::new(Semaphore::new(self.cfg.workers));
        let mut workers: JoinSet<Result<usize, FooddexError>> = JoinSet::new();

        for sub_batch in sub_batches {
            let semaphore = semaphore.clone();
            let embedder = self.embedder.clone();
            let db_path = self.db_path.clone();
            workers.spawn(async move {
                // Never closed, so acquisition only fails on shutdown.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("worker pool semaphore closed");
                process_sub_batch(embedder, db_path, sub_batch).await
            });
        }

        let mut processed: u64 = 0;
        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                warn!(
                    in_flight = workers.len(),
                    "deadline reached; abandoning in-flight sub-batches"
                );
                workers.detach_all();
                break;
            };
            match tokio::time::timeout(remaining, workers.join_next()).await {
                Ok(Some(Ok(Ok(count)))) => {
                    processed += count as u64;
                    debug!(count, "parallel sub-batch committed");
                }
                Ok(Some(Ok(Err(err)))) => warn!(error = %err, "sub-batch abandoned"),
                Ok(Some(Err(err))) => warn!(error = %err, "sub-batch worker failed"),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        in_flight = workers.len(),
                        "deadline reached; abandoning in-flight sub-batches"
                    );
                    workers.detach_all();
                    break;
                }
            }
        }
        processed
    }
}

/// One provider round-trip plus one atomic store commit.
///
/// Success or failure is independent of every other sub-batch; a failure
/// contributes zero and leaves its records in the missing set. The commit
/// runs on the blocking pool through a connection of its own, so parallel
/// workers never serialize writes through a shared handle.
async fn process_sub_batch<E: Embedder + ?Sized>(
    embedder: Arc<E>,
    db_path: PathBuf,
    sub_batch: Vec<(i64, String)>,
) -> Result<usize, FooddexError> {
    let texts: Vec<String> = sub_batch.iter().map(|(_, text)| text.clone()).collect();
    let vectors = embedder.embed(&texts).await?;
    if vectors.len() != sub_batch.len() {
        return Err(FooddexError::Provider(format!(
            "provider returned {} vectors for {} inputs",
            vectors.len(),
            sub_batch.len()
        )));
    }

    let rows: Vec<(i64, Vec<f32>)> = sub_batch
        .into_iter()
        .map(|(id, _)| id)
        .zip(vectors)
        .collect();
    tokio::task::spawn_blocking(move || {
        let mut store = VectorStore::open(&db_path)?;
        store.upsert_vectors(&rows)
    })
    .await
    .map_err(|e| FooddexError::StoreWrite(format!("commit task failed: {e}")))?
}
