//! Vector store trait for storing and searching vector embeddings.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::fields;
use crate::error::Result;

/// One `(id, vector, payload)` triple persisted in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Deterministic point identifier (a UUID string).
    pub id: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// Chunk text and metadata stored next to the vector.
    pub payload: Map<String, Value>,
}

/// A point returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    /// Point identifier.
    pub id: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
    /// Stored payload.
    pub payload: Map<String, Value>,
}

/// Field type of a payload index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadIndexKind {
    /// Exact-match string filtering.
    Keyword,
    /// Integer range and match filtering.
    Integer,
    /// Full-text matching.
    Text,
}

impl fmt::Display for PayloadIndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keyword => "keyword",
            Self::Integer => "integer",
            Self::Text => "text",
        })
    }
}

/// A filterable payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadIndex {
    /// Payload key.
    pub field: &'static str,
    /// Index type.
    pub kind: PayloadIndexKind,
}

/// Payload indexes created on every chunk collection.
pub const CHUNK_INDEXES: &[PayloadIndex] = &[
    PayloadIndex { field: fields::RT_ID, kind: PayloadIndexKind::Keyword },
    PayloadIndex { field: fields::NUMERO_RT, kind: PayloadIndexKind::Integer },
    PayloadIndex { field: fields::SECTION_TITLE, kind: PayloadIndexKind::Text },
];

/// Result of an idempotent create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    /// The index was created by this call.
    Created,
    /// The index was already present; nothing changed.
    AlreadyExists,
}

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of [`Point`]s under cosine
/// distance. Timeouts and connection failures must be reported as
/// [`RagError::Transient`](crate::RagError::Transient).
///
/// # Example
///
/// ```rust,ignore
/// use medic_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("first_aid_manual", 768).await?;
/// store.upsert("first_aid_manual", &points).await?;
/// let hits = store.search("first_aid_manual", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend name used in logs and errors.
    fn backend(&self) -> &str;

    /// Names of all collections in the store.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Whether a collection exists.
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create a collection with the given vector size and cosine distance.
    ///
    /// Fails if the collection already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a collection and all its points. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Create a payload index on `collection`.
    async fn create_payload_index(
        &self,
        collection: &str,
        index: PayloadIndex,
    ) -> Result<IndexOutcome>;

    /// Insert or overwrite points by id.
    ///
    /// Returns only once the store has acknowledged the whole call; a failed
    /// call leaves none of its points written.
    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()>;

    /// Return up to `limit` points nearest to `vector`, highest score first.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>>;
}
