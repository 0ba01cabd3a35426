//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and running the pipeline without a Qdrant server.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::vectorstore::{
    IndexOutcome, PayloadIndex, PayloadIndexKind, Point, ScoredPoint, VectorStore,
};

const BACKEND: &str = "in-memory";

#[derive(Debug)]
struct Collection {
    dimensions: usize,
    points: HashMap<String, Point>,
    indexes: HashMap<&'static str, PayloadIndexKind>,
}

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → point ID → point.
/// Upserts are validated before anything is written, so a rejected call
/// leaves the collection unchanged.
///
/// # Example
///
/// ```rust,ignore
/// use medic_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("first_aid_manual", 384).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points in a collection, or `None` if it does not exist.
    pub async fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections.read().await.get(collection).map(|c| c.points.len())
    }

    /// Payload indexes of a collection, sorted by field name.
    pub async fn payload_indexes(&self, collection: &str) -> Vec<(String, PayloadIndexKind)> {
        let collections = self.collections.read().await;
        let mut indexes: Vec<_> = collections
            .get(collection)
            .map(|c| c.indexes.iter().map(|(f, k)| ((*f).to_string(), *k)).collect())
            .unwrap_or_default();
        indexes.sort_by(|a, b| a.0.cmp(&b.0));
        indexes
    }

    /// Ids of every point in a collection, sorted.
    pub async fn point_ids(&self, collection: &str) -> Vec<String> {
        let collections = self.collections.read().await;
        let mut ids: Vec<String> = collections
            .get(collection)
            .map(|c| c.points.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend(&self) -> &str {
        BACKEND
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if dimensions == 0 {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: "vector size must be greater than zero".to_string(),
            });
        }
        let mut collections = self.collections.write().await;
        if collections.contains_key(name) {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!("collection '{name}' already exists"),
            });
        }
        collections.insert(
            name.to_string(),
            Collection { dimensions, points: HashMap::new(), indexes: HashMap::new() },
        );
        debug!(collection = name, dimensions, "created in-memory collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        index: PayloadIndex,
    ) -> Result<IndexOutcome> {
        let mut collections = self.collections.write().await;
        let target = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        match target.indexes.get(index.field) {
            Some(_) => Ok(IndexOutcome::AlreadyExists),
            None => {
                target.indexes.insert(index.field, index.kind);
                Ok(IndexOutcome::Created)
            }
        }
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let target = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

        if let Some(bad) = points.iter().find(|p| p.vector.len() != target.dimensions) {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "point '{}' has {} dimensions, collection '{collection}' expects {}",
                    bad.id,
                    bad.vector.len(),
                    target.dimensions
                ),
            });
        }
        for point in points {
            target.points.insert(point.id.clone(), point.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let collections = self.collections.read().await;
        let target = collections.get(collection).ok_or_else(|| missing(collection))?;
        if vector.len() != target.dimensions {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "query has {} dimensions, collection '{collection}' expects {}",
                    vector.len(),
                    target.dimensions
                ),
            });
        }

        let mut scored: Vec<ScoredPoint> = target
            .points
            .values()
            .map(|point| ScoredPoint {
                id: point.id.clone(),
                score: cosine_similarity(&point.vector, vector),
                payload: point.payload.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }
}
