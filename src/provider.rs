//! Embedding provider client.
//!
//! Wraps an OpenAI-compatible `/v1/embeddings` endpoint behind the
//! [`Embedder`] trait. The client is deliberately thin transport: it batches
//! whatever the caller hands it (chunking policy belongs to the backfill
//! scheduler), enforces the ordered one-vector-per-input contract, and
//! reports failure without any internal retry or backoff — the caller
//! decides whether to retry or abandon.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{model_dimension, EmbedderConfig};
use crate::error::FooddexError;

/// Anything that can turn a batch of texts into ordered fixed-width
/// vectors. The scheduler and search service depend on this seam, which
/// keeps them testable with a deterministic in-process embedder.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every text, returning vectors in input order, one per input.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, FooddexError>;

    /// True only when provider credentials are present. When false, every
    /// other operation fails fast with `ProviderUnconfigured`.
    fn is_configured(&self) -> bool;

    /// Declared width of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Model identifier reported to callers.
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// HTTP client for an OpenAI-compatible embeddings endpoint.
///
/// Built from an explicit [`EmbedderConfig`] — no process-wide client or
/// ambient credentials. Vectors returned by these models are
/// unit-normalized, which downstream similarity scoring relies on.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    cfg: EmbedderConfig,
}

impl OpenAiEmbedder {
    pub fn new(cfg: EmbedderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .expect("failed to build HTTP client");
        Self { client, cfg }
    }

    /// The `dimensions` request field is only sent when the caller asks for
    /// a width other than the model's native one.
    fn requested_dimensions(&self) -> Option<usize> {
        if self.cfg.dimension == model_dimension(&self.cfg.model) {
            None
        } else {
            Some(self.cfg.dimension)
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, FooddexError> {
        let api_key = self.cfg.api_key.as_deref().ok_or_else(|| {
            FooddexError::ProviderUnconfigured("no API key; set OPENAI_API_KEY".into())
        })?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.cfg.model,
            input: texts,
            dimensions: self.requested_dimensions(),
        };

        debug!(count = texts.len(), model = %self.cfg.model, "embedding request");
        let response = self
            .client
            .post(&self.cfg.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FooddexError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FooddexError::Provider(format!("HTTP {status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| FooddexError::Provider(format!("malformed response: {e}")))?;

        if parsed.data.len() != texts.len() {
            return Err(FooddexError::Provider(format!(
                "provider returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        let expected = self.cfg.dimension;
        let mut vectors = Vec::with_capacity(parsed.data.len());
        for item in parsed.data {
            if item.embedding.len() != expected {
                return Err(FooddexError::Provider(format!(
                    "provider returned a {}-wide vector, expected {expected}",
                    item.embedding.len()
                )));
            }
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }

    fn is_configured(&self) -> bool {
        self.cfg.api_key.is_some()
    }

    fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    fn model(&self) -> &str {
        &self.cfg.model
    }
}

/// Deterministic offline embedder.
///
/// Produces unit-normalized sinusoid vectors derived from a hash of the
/// input text: same text, same vector, no network. Used by the integration
/// tests and handy for local smoke runs without credentials.
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let h = hasher.finish();

        let mut v = vec![0f32; self.dimension];
        for (idx, value) in v.iter_mut().enumerate() {
            *value = ((h >> (idx % 32)) as f32 * 0.0001).sin();
        }
        l2_normalize_in_place(&mut v);
        v
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, FooddexError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        "stub"
    }
}

fn l2_normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in v.iter_mut() {
            *value /= norm;
        }
    }
}
