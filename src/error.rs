//! `FooddexError` — the spec error taxonomy (SPEC §7).
//!
//! Every fallible seam in the core surfaces one of these variants. Nothing
//! here is fatal to the hosting process: provider and store failures are
//! contained at sub-batch granularity during backfill and at call
//! granularity during search. `ProviderUnconfigured` degrades to a no-op /
//! empty result rather than an error the caller must handle.

use std::fmt::Display;

use thiserror::Error;

/// The error taxonomy for the backfill + search core.
#[derive(Debug, Error)]
pub enum FooddexError {
    /// No provider credentials present; callers degrade to a no-op or an
    /// empty result rather than treating this as fatal.
    #[error("embedding provider is not configured: {0}")]
    ProviderUnconfigured(String),

    /// Transient or permanent provider failure (auth, network, rate limit,
    /// malformed response). The affected sub-batch is abandoned; the run
    /// continues.
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// The vector store connection or its required extension could not be
    /// loaded.
    #[error("vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// A write to the vector store failed; the batch is treated as all-or
    /// -nothing and not partially retried.
    #[error("vector store write failed: {0}")]
    StoreWrite(String),

    /// A read / K-NN query against the vector store failed.
    #[error("vector store query failed: {0}")]
    StoreQuery(String),

    /// A read against the read-only catalog failed.
    #[error("catalog lookup failed: {0}")]
    Catalog(String),

    /// A configuration value was rejected (e.g. a non-positive dimension).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FooddexError {
    /// Build a [`FooddexError::Catalog`] from any displayable source error.
    pub fn catalog(e: impl Display) -> Self {
        FooddexError::Catalog(e.to_string())
    }

    /// Build a [`FooddexError::StoreUnavailable`] from any displayable source.
    pub fn store_unavailable(e: impl Display) -> Self {
        FooddexError::StoreUnavailable(e.to_string())
    }

    /// Build a [`FooddexError::StoreWrite`] from any displayable source.
    pub fn store_write(e: impl Display) -> Self {
        FooddexError::StoreWrite(e.to_string())
    }

    /// Build a [`FooddexError::StoreQuery`] from any displayable source.
    pub fn store_query(e: impl Display) -> Self {
        FooddexError::StoreQuery(e.to_string())
    }
}
