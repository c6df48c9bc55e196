use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime configuration for the embedding provider client.
///
/// Built explicitly and passed to constructors — there is no process-wide
/// client singleton. Credentials come from the environment by default
/// (`OPENAI_API_KEY`), everything else has a sensible default.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EmbedderConfig {
    /// Bearer token for the provider. `None` means unconfigured: embedding
    /// calls fail fast and dependent features degrade to no-ops.
    pub api_key: Option<String>,

    /// Embeddings endpoint (OpenAI-compatible).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Embedding model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Vector width the provider declares for [`model`](Self::model). The
    /// vector collection is created with this width.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            dimension: default_dimension(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EmbedderConfig {
    /// Build a config from the environment: `OPENAI_API_KEY` for
    /// credentials, `FOODDEX_API_URL` and `FOODDEX_EMBED_MODEL` for
    /// overrides. Absent credentials are not an error — the resulting
    /// config is simply unconfigured.
    pub fn from_env() -> Self {
        let model = std::env::var("FOODDEX_EMBED_MODEL").unwrap_or_else(|_| default_model());
        let dimension = model_dimension(&model);
        Self {
            api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            api_url: std::env::var("FOODDEX_API_URL").unwrap_or_else(|_| default_api_url()),
            model,
            dimension,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self.dimension = model_dimension(&self.model);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Configuration for one backfill run.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackfillConfig {
    /// Fetch-window size: how many missing records one `select_missing`
    /// call pulls from the store.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Sub-batch size: the granularity of one provider call and one store
    /// commit.
    #[serde(default = "default_provider_batch_size")]
    pub provider_batch_size: usize,

    /// Worker count. 1 means sequential; above 1, the sub-batches of a
    /// fetch-window run on a bounded pool of this many workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Wall-clock budget for the whole run, in seconds. Exceeding it ends
    /// the run with partial completion — a normal outcome, not an error.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            provider_batch_size: default_provider_batch_size(),
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackfillConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Declared vector width for the models we know about. Callers using an
/// unknown model get the small-model width and can override the field.
pub fn model_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-small" => 1536,
        "text-embedding-3-large" => 3072,
        "text-embedding-ada-002" => 1536,
        _ => default_dimension(),
    }
}

fn default_api_url() -> String {
    "https://api.openai.com/v1/embeddings".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    1000
}

fn default_provider_batch_size() -> usize {
    100
}

fn default_workers() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedder_defaults() {
        let cfg = EmbedderConfig::default();
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.api_url, "https://api.openai.com/v1/embeddings");
        assert_eq!(cfg.model, "text-embedding-3-small");
        assert_eq!(cfg.dimension, 1536);
        assert_eq!(cfg.request_timeout_secs, 30);
    }

    #[test]
    fn backfill_defaults_match_run_contract() {
        let cfg = BackfillConfig::default();
        assert_eq!(cfg.batch_size, 1000);
        assert_eq!(cfg.provider_batch_size, 100);
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.timeout_secs, 600);
        assert_eq!(cfg.timeout(), Duration::from_secs(600));
    }

    #[test]
    fn with_model_updates_dimension() {
        let cfg = EmbedderConfig::default().with_model("text-embedding-3-large");
        assert_eq!(cfg.dimension, 3072);

        let cfg = EmbedderConfig::default().with_model("some-unknown-model");
        assert_eq!(cfg.dimension, 1536);
    }

    #[test]
    fn model_dimension_table() {
        assert_eq!(model_dimension("text-embedding-3-small"), 1536);
        assert_eq!(model_dimension("text-embedding-3-large"), 3072);
        assert_eq!(model_dimension("text-embedding-ada-002"), 1536);
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = BackfillConfig {
            batch_size: 500,
            provider_batch_size: 50,
            workers: 4,
            timeout_secs: 120,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: BackfillConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: BackfillConfig = serde_json::from_str(r#"{"workers": 3}"#).unwrap();
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.batch_size, 1000);
        assert_eq!(cfg.provider_batch_size, 100);
    }
}
