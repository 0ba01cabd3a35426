use std::path::PathBuf;

use thiserror::Error;

/// Failures of chunking, embedding and vector store I/O.
///
/// Errors fall into three classes. [`RagError::Transient`] may succeed on a
/// second attempt. "Already exists" is never an error (see
/// [`IndexOutcome`](crate::vectorstore::IndexOutcome) and
/// [`CollectionAction`](crate::index::CollectionAction)). Everything else is fatal for
/// the call that produced it.
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding service answered, but not with a usable vector.
    #[error("embedding failed ({provider}): {message}")]
    EmbeddingError { provider: String, message: String },

    /// Timeout, refused connection or overload on a remote service.
    #[error("{service} unavailable: {message}")]
    Transient { service: String, message: String },

    #[error("vector store failure ({backend}): {message}")]
    VectorStoreError { backend: String, message: String },

    /// Missing or unreadable source document.
    #[error("cannot read {}: {message}", path.display())]
    DocumentError { path: PathBuf, message: String },

    #[error("chunking failed: {0}")]
    ChunkingError(String),

    /// Invalid settings, caught when the value is built.
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// Broken invariant between pipeline stages.
    #[error("pipeline invariant violated: {0}")]
    PipelineError(String),
}

impl RagError {
    /// `true` for [`RagError::Transient`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, RagError::Transient { .. })
    }

    /// The remote service or backend the error came from, if any.
    pub fn service(&self) -> Option<&str> {
        match self {
            RagError::EmbeddingError { provider, .. } => Some(provider),
            RagError::Transient { service, .. } => Some(service),
            RagError::VectorStoreError { backend, .. } => Some(backend),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
