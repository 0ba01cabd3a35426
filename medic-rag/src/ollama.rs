//! Ollama embedding provider using the `/api/embeddings` endpoint.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::{DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_HOST, ServiceConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "ollama";

/// An [`EmbeddingProvider`] backed by a local or remote Ollama server.
///
/// Texts are embedded one request at a time. Timeouts and connection
/// failures are reported as [`RagError::Transient`].
///
/// # Example
///
/// ```rust,ignore
/// use medic_rag::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new("http://localhost:11434", "nomic-embed-text")?;
/// let embedding = provider.embed("arrêt cardiaque").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaEmbeddingProvider {
    /// Create a provider with a 60 second request timeout.
    pub fn new(host: impl AsRef<str>, model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(host, model, Duration::from_secs(60))
    }

    /// Create a provider with an explicit per-request timeout.
    pub fn with_timeout(
        host: impl AsRef<str>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let model = model.into();
        if model.is_empty() {
            return Err(RagError::ConfigError("embedding model must not be empty".into()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            RagError::ConfigError(format!("failed to build HTTP client: {e}"))
        })?;
        let endpoint = format!("{}/api/embeddings", host.as_ref().trim_end_matches('/'));
        Ok(Self { client, endpoint, model })
    }

    /// Create a provider from the service configuration.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Self::with_timeout(&config.ollama_host, &config.embedding_model, config.request_timeout)
    }

    /// Create a provider for the default host and model.
    pub fn local() -> Result<Self> {
        Self::new(DEFAULT_OLLAMA_HOST, DEFAULT_EMBEDDING_MODEL)
    }

    /// The model name sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_send_error(e: reqwest::Error) -> RagError {
        if e.is_timeout() || e.is_connect() {
            RagError::Transient { service: PROVIDER.into(), message: e.to_string() }
        } else {
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("request failed: {e}"),
            }
        }
    }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding text");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbeddingRequest { model: &self.model, prompt: text })
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                Self::map_send_error(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            // Overloaded or restarting servers are worth another attempt.
            if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(RagError::Transient {
                    service: PROVIDER.into(),
                    message: format!("API returned {status}: {detail}"),
                });
            }
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to parse response: {e}"),
            }
        })?;

        if parsed.embedding.is_empty() {
            return Err(RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("model '{}' returned an empty embedding", self.model),
            });
        }
        Ok(parsed.embedding)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_normalized() {
        let provider = OllamaEmbeddingProvider::new("http://gpu-box:11434/", "mxbai-embed-large")
            .unwrap();
        assert_eq!(provider.endpoint, "http://gpu-box:11434/api/embeddings");
        assert_eq!(provider.model(), "mxbai-embed-large");
    }

    #[test]
    fn empty_model_is_rejected() {
        assert!(OllamaEmbeddingProvider::new(DEFAULT_OLLAMA_HOST, "").is_err());
    }

    #[tokio::test]
    async fn unreachable_server_is_transient() {
        // Port 9 (discard) is closed on test machines; the connect fails immediately.
        let provider = OllamaEmbeddingProvider::with_timeout(
            "http://127.0.0.1:9",
            "nomic-embed-text",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = provider.embed("hello").await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
