//! Configuration for the RAG pipeline and its remote services.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::document::DocumentFormat;
use crate::error::{RagError, Result};
use crate::pipeline::Contextualization;

/// What to do when a batch upsert fails.
///
/// Retrying the whole batch is always safe because point ids are
/// deterministic, but a document whose points are retried one by one may be
/// partially visible if some of them keep failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    /// Stop uploading the document. Batches already acknowledged stay stored.
    Abort,
    /// Upsert each point of the failed batch on its own and continue.
    #[default]
    RetryIndividually,
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum cosine score a hit needs to be returned. `None` keeps every hit.
    pub similarity_threshold: Option<f32>,
    /// Number of points per upsert call.
    pub upload_batch_size: usize,
    /// Chunk each section on its own instead of the whole document.
    pub chunk_by_section: bool,
    /// Document layout; detected from the content when `None`.
    pub format: Option<DocumentFormat>,
    /// Drop and rebuild the collection before ingesting.
    pub recreate_collection: bool,
    /// Behaviour on a failed batch upsert.
    pub batch_failure_policy: BatchFailurePolicy,
    /// Text template applied before embedding chunks and queries.
    pub contextualization: Contextualization,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            similarity_threshold: None,
            upload_batch_size: 10,
            chunk_by_section: true,
            format: None,
            recreate_collection: true,
            batch_failure_policy: BatchFailurePolicy::default(),
            contextualization: Contextualization::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `upload_batch_size == 0`
    /// - `similarity_threshold` outside `[-1, 1]`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.upload_batch_size == 0 {
            return Err(RagError::ConfigError(
                "upload_batch_size must be greater than zero".to_string(),
            ));
        }
        if let Some(threshold) = self.similarity_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(RagError::ConfigError(format!(
                    "similarity_threshold ({threshold}) must be within [-1, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Drop hits scoring below `threshold`.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set the number of points per upsert call.
    pub fn upload_batch_size(mut self, size: usize) -> Self {
        self.config.upload_batch_size = size;
        self
    }

    /// Chunk per section (`true`) or the whole document at once.
    pub fn chunk_by_section(mut self, enabled: bool) -> Self {
        self.config.chunk_by_section = enabled;
        self
    }

    /// Force a document layout instead of detecting it.
    pub fn format(mut self, format: DocumentFormat) -> Self {
        self.config.format = Some(format);
        self
    }

    /// Drop and rebuild the collection before ingesting.
    pub fn recreate_collection(mut self, recreate: bool) -> Self {
        self.config.recreate_collection = recreate;
        self
    }

    /// Set the behaviour on a failed batch upsert.
    pub fn batch_failure_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.config.batch_failure_policy = policy;
        self
    }

    /// Set the embedding contextualization template.
    pub fn contextualization(mut self, contextualization: Contextualization) -> Self {
        self.config.contextualization = contextualization;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Default Qdrant gRPC endpoint.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
/// Default collection holding the first-aid manual.
pub const DEFAULT_COLLECTION: &str = "first_aid_manual";

/// Endpoints and credentials of the embedding service and the vector store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Qdrant URL.
    pub qdrant_url: String,
    /// Qdrant API key, if the cluster requires one.
    #[serde(skip_serializing)]
    pub qdrant_api_key: Option<String>,
    /// Ollama server URL.
    pub ollama_host: String,
    /// Ollama embedding model name.
    pub embedding_model: String,
    /// Collection used when none is given.
    pub collection: String,
    /// Per-request timeout for both services.
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            qdrant_api_key: None,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    ///
    /// Recognised variables: `QDRANT_URL`, `QDRANT_API_KEY`, `OLLAMA_HOST`,
    /// `OLLAMA_MODEL`, `COLLECTION_NAME` and `REQUEST_TIMEOUT_SECS`. Unset or
    /// empty variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `REQUEST_TIMEOUT_SECS` is not a
    /// positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let request_timeout = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(RagError::ConfigError(format!(
                        "REQUEST_TIMEOUT_SECS must be a positive integer, got '{raw}'"
                    )));
                }
            },
            None => defaults.request_timeout,
        };

        Ok(Self {
            qdrant_url: get("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            qdrant_api_key: get("QDRANT_API_KEY"),
            ollama_host: get("OLLAMA_HOST").unwrap_or(defaults.ollama_host),
            embedding_model: get("OLLAMA_MODEL").unwrap_or(defaults.embedding_model),
            collection: get("COLLECTION_NAME").unwrap_or(defaults.collection),
            request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn builder_rejects_overlap_not_smaller_than_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().upload_batch_size(0).build().is_err());
    }

    #[test]
    fn threshold_is_unset_by_default_and_range_checked() {
        assert_eq!(RagConfig::default().similarity_threshold, None);
        assert!(RagConfig::builder().similarity_threshold(-1.0).build().is_ok());
        assert!(RagConfig::builder().similarity_threshold(1.5).build().is_err());
        assert!(RagConfig::builder().similarity_threshold(f32::NAN).build().is_err());
    }

    #[test]
    fn builder_accepts_manual_settings() {
        let config = RagConfig::builder()
            .chunk_size(350)
            .chunk_overlap(80)
            .format(DocumentFormat::RtManual)
            .batch_failure_policy(BatchFailurePolicy::Abort)
            .build()
            .unwrap();
        assert_eq!(config.chunk_size, 350);
        assert_eq!(config.format, Some(DocumentFormat::RtManual));
        assert_eq!(config.batch_failure_policy, BatchFailurePolicy::Abort);
        assert!(config.recreate_collection);
    }

    #[test]
    fn service_config_reads_overrides_and_ignores_blanks() {
        let vars = HashMap::from([
            ("QDRANT_URL", "https://qdrant.example:6334"),
            ("QDRANT_API_KEY", "secret"),
            ("OLLAMA_MODEL", "  "),
            ("REQUEST_TIMEOUT_SECS", "15"),
        ]);
        let config =
            ServiceConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
        assert_eq!(config.qdrant_url, "https://qdrant.example:6334");
        assert_eq!(config.qdrant_api_key.as_deref(), Some("secret"));
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.collection, DEFAULT_COLLECTION);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn service_config_rejects_bad_timeout() {
        let err = ServiceConfig::from_lookup(|k| {
            (k == "REQUEST_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }

    #[test]
    fn api_key_is_not_serialized() {
        let config =
            ServiceConfig { qdrant_api_key: Some("secret".into()), ..ServiceConfig::default() };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
