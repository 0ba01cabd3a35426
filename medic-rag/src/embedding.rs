//! Embedding providers and the dimension-aware [`Embedder`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RagError, Result};

/// Text sent to the model once at startup to learn its output size.
pub const PROBE_TEXT: &str = "test";

/// Texts between two progress log lines in [`Embedder::generate_embeddings`].
const PROGRESS_INTERVAL: usize = 32;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface. Connection failures and timeouts should be reported as
/// [`RagError::Transient`] so that the [`Embedder`] can retry them.
///
/// # Example
///
/// ```rust,ignore
/// use medic_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Short provider name used in logs and errors.
    fn name(&self) -> &str;
}

/// What to do when the startup probe fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionPolicy {
    /// Return the probe error.
    #[default]
    FailFast,
    /// Log the error and assume the given dimensionality.
    FallbackTo(usize),
}

/// Settings for [`Embedder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// Behaviour when the dimension probe fails.
    pub dimension_policy: DimensionPolicy,
    /// Extra attempts for a call that failed with a transient error.
    pub max_retries: u32,
    /// Base delay between attempts; multiplied by the attempt number.
    pub retry_backoff: Duration,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            dimension_policy: DimensionPolicy::FailFast,
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

/// Result of embedding one text in a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome {
    /// The vector, with the embedder's dimensionality.
    Ready(Vec<f32>),
    /// The text could not be embedded.
    Failed {
        /// Why the call failed.
        reason: String,
    },
}

impl EmbeddingOutcome {
    /// The vector, if embedding succeeded.
    pub fn vector(&self) -> Option<&[f32]> {
        match self {
            EmbeddingOutcome::Ready(v) => Some(v),
            EmbeddingOutcome::Failed { .. } => None,
        }
    }

    /// Take the vector out, if embedding succeeded.
    pub fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            EmbeddingOutcome::Ready(v) => Some(v),
            EmbeddingOutcome::Failed { .. } => None,
        }
    }
}

/// Per-text outcomes of [`Embedder::generate_embeddings`], aligned with the input.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingBatch {
    /// One outcome per input text, same order.
    pub outcomes: Vec<EmbeddingOutcome>,
    /// Number of `Failed` outcomes.
    pub failures: usize,
}

/// An [`EmbeddingProvider`] with a fixed, probed output dimensionality.
///
/// Construct one per model with [`Embedder::probe`] and share it by reference
/// (or `Arc`) between ingestion and queries. Every vector it returns has
/// exactly [`dimensions`](Embedder::dimensions) components.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    dimensions: usize,
    config: EmbedderConfig,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider.name())
            .field("dimensions", &self.dimensions)
            .field("config", &self.config)
            .finish()
    }
}

impl Embedder {
    /// Embed [`PROBE_TEXT`] once to learn the model's dimensionality.
    ///
    /// # Errors
    ///
    /// With [`DimensionPolicy::FailFast`], returns the probe error, or
    /// [`RagError::EmbeddingError`] if the model returned an empty vector.
    pub async fn probe(
        provider: Arc<dyn EmbeddingProvider>,
        config: EmbedderConfig,
    ) -> Result<Self> {
        let probed = retry(&config, provider.name(), || provider.embed(PROBE_TEXT)).await.and_then(
            |vector| {
                if vector.is_empty() {
                    Err(RagError::EmbeddingError {
                        provider: provider.name().to_string(),
                        message: "probe returned an empty vector".to_string(),
                    })
                } else {
                    Ok(vector.len())
                }
            },
        );

        let dimensions = match (probed, config.dimension_policy) {
            (Ok(dimensions), _) => dimensions,
            (Err(e), DimensionPolicy::FallbackTo(dimensions)) if dimensions > 0 => {
                warn!(
                    provider = provider.name(),
                    error = %e,
                    dimensions,
                    "dimension probe failed, using fallback dimensionality"
                );
                dimensions
            }
            (Err(e), _) => return Err(e),
        };

        info!(provider = provider.name(), dimensions, "embedding model ready");
        Ok(Self { provider, dimensions, config })
    }

    /// Use a known dimensionality without probing.
    pub fn with_dimensions(
        provider: Arc<dyn EmbeddingProvider>,
        dimensions: usize,
        config: EmbedderConfig,
    ) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::ConfigError("dimensions must be greater than zero".to_string()));
        }
        Ok(Self { provider, dimensions, config })
    }

    /// Output dimensionality of every vector.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Name of the wrapped provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Embed one text, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the provider error once retries are exhausted, or
    /// [`RagError::EmbeddingError`] if the vector has the wrong size.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = retry(&self.config, self.provider.name(), || self.provider.embed(text)).await?;
        if vector.len() != self.dimensions {
            return Err(RagError::EmbeddingError {
                provider: self.provider.name().to_string(),
                message: format!(
                    "expected {} dimensions, model returned {}",
                    self.dimensions,
                    vector.len()
                ),
            });
        }
        Ok(vector)
    }

    /// Embed every text independently.
    ///
    /// Never fails as a whole: each text gets an [`EmbeddingOutcome`] at the
    /// same position, and failures are counted and logged.
    pub async fn generate_embeddings<S: AsRef<str>>(&self, texts: &[S]) -> EmbeddingBatch {
        let mut batch = EmbeddingBatch { outcomes: Vec::with_capacity(texts.len()), failures: 0 };

        for (index, text) in texts.iter().enumerate() {
            if index % PROGRESS_INTERVAL == 0 {
                debug!(
                    provider = self.provider.name(),
                    done = index,
                    total = texts.len(),
                    "generating embeddings"
                );
            }
            match self.embed(text.as_ref()).await {
                Ok(vector) => batch.outcomes.push(EmbeddingOutcome::Ready(vector)),
                Err(e) => {
                    warn!(provider = self.provider.name(), index, error = %e, "embedding failed");
                    batch.failures += 1;
                    batch.outcomes.push(EmbeddingOutcome::Failed { reason: e.to_string() });
                }
            }
        }

        info!(
            provider = self.provider.name(),
            total = texts.len(),
            failures = batch.failures,
            "generated embeddings"
        );
        batch
    }
}

/// Run `call`, retrying while it fails with a retryable error.
async fn retry<F, Fut>(config: &EmbedderConfig, provider: &str, mut call: F) -> Result<Vec<f32>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Vec<f32>>>,
{
    let mut attempt = 0u32;
    loop {
        match call().await {
            Ok(vector) => return Ok(vector),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                warn!(provider, attempt, error = %e, "transient embedding failure, retrying");
                tokio::time::sleep(config.retry_backoff * attempt).await;
            }
            Err(e) => return Err(e),
        }
    }
}
