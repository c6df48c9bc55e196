//! Fooddex — a derived semantic index over a relational food catalog.
//!
//! For every catalog record this crate produces a fixed-width embedding
//! vector, stores it in a sqlite-vec collection, and answers
//! nearest-neighbor text queries against it. The two entry points are:
//!
//! - [`BackfillScheduler`]: finds records lacking an embedding, drives the
//!   provider over them in sub-batches (sequentially or on a bounded worker
//!   pool) under a wall-clock budget, and commits each sub-batch
//!   atomically. Idempotent: a committed record never re-enters the missing
//!   set, and re-running is always safe.
//! - [`SearchService`]: embeds a free-text query, runs K-NN against the
//!   collection, and joins hits back to catalog descriptions with a
//!   similarity score.
//!
//! Both depend on the [`Embedder`] seam; [`OpenAiEmbedder`] is the real
//! provider client, [`StubEmbedder`] a deterministic offline stand-in.
//!
//! Catalog ingestion (CSV import, the relational schema) lives outside this
//! crate — the catalog is read-only here.
//!
//! ## Quick example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fooddex::{BackfillConfig, BackfillScheduler, EmbedderConfig, OpenAiEmbedder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fooddex::FooddexError> {
//!     let embedder = Arc::new(OpenAiEmbedder::new(EmbedderConfig::from_env()));
//!     let scheduler =
//!         BackfillScheduler::new(embedder, "fooddb.sqlite", BackfillConfig::default());
//!     let report = scheduler.run().await?;
//!     println!("processed {} of {}", report.processed, report.target);
//!     Ok(())
//! }
//! ```

pub mod backfill;
pub mod catalog;
pub mod config;
pub mod error;
pub mod provider;
pub mod search;
pub mod store;

pub use crate::backfill::{BackfillReport, BackfillScheduler};
pub use crate::catalog::{Catalog, FoodRecord};
pub use crate::config::{BackfillConfig, EmbedderConfig};
pub use crate::error::FooddexError;
pub use crate::provider::{Embedder, OpenAiEmbedder, StubEmbedder};
pub use crate::search::{SearchHit, SearchService};
pub use crate::store::VectorStore;
