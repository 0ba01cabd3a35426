//! Deterministic stand-ins for the embedding service and a failing store.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use medic_rag::vectorstore::{IndexOutcome, PayloadIndex, Point, ScoredPoint, VectorStore};
use medic_rag::{
    Embedder, EmbedderConfig, EmbeddingProvider, InMemoryVectorStore, RagError, Result,
};

/// Vector size of [`BagOfWords`]. Large enough that the test vocabulary has no collisions.
pub const DIMENSIONS: usize = 512;

/// Embeds text as hashed lowercase word counts.
///
/// Texts sharing words get a positive cosine similarity; identical texts get 1.0.
pub struct BagOfWords {
    dimensions: usize,
    fail_marker: Option<String>,
}

impl BagOfWords {
    pub fn new() -> Self {
        Self { dimensions: DIMENSIONS, fail_marker: None }
    }

    /// Fail every text containing `marker`, the way an unreachable service would.
    pub fn failing_on(marker: &str) -> Self {
        Self { dimensions: DIMENSIONS, fail_marker: Some(marker.to_string()) }
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl EmbeddingProvider for BagOfWords {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(RagError::EmbeddingError {
                    provider: "bag-of-words".into(),
                    message: format!("refusing text containing '{marker}'"),
                });
            }
        }
        let mut vector = vec![0.0; self.dimensions];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let slot = (fnv1a(&token.to_lowercase()) % self.dimensions as u64) as usize;
            vector[slot] += 1.0;
        }
        Ok(vector)
    }

    fn name(&self) -> &str {
        "bag-of-words"
    }
}

/// Two-dimensional embedder: texts containing `marker` point the opposite way.
///
/// Every stored chunk then scores exactly -1.0 against a marked query.
pub struct Polarity {
    marker: String,
}

impl Polarity {
    pub fn new(marker: &str) -> Self {
        Self { marker: marker.to_string() }
    }
}

#[async_trait]
impl EmbeddingProvider for Polarity {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let x = if text.contains(self.marker.as_str()) { -1.0 } else { 1.0 };
        Ok(vec![x, 0.0])
    }

    fn name(&self) -> &str {
        "polarity"
    }
}

pub async fn embedder() -> Arc<Embedder> {
    embedder_with(BagOfWords::new()).await
}

pub async fn embedder_with(provider: impl EmbeddingProvider + 'static) -> Arc<Embedder> {
    Arc::new(Embedder::probe(Arc::new(provider), EmbedderConfig::default()).await.unwrap())
}

/// In-memory store that rejects any upsert containing a point whose text has `marker`.
pub struct RejectingStore {
    pub inner: Arc<InMemoryVectorStore>,
    marker: String,
}

impl RejectingStore {
    pub fn new(marker: &str) -> Self {
        Self { inner: Arc::new(InMemoryVectorStore::new()), marker: marker.to_string() }
    }
}

#[async_trait]
impl VectorStore for RejectingStore {
    fn backend(&self) -> &str {
        "rejecting"
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.inner.list_collections().await
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        self.inner.collection_exists(name).await
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        self.inner.create_collection(name, dimensions).await
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name).await
    }

    async fn create_payload_index(
        &self,
        collection: &str,
        index: PayloadIndex,
    ) -> Result<IndexOutcome> {
        self.inner.create_payload_index(collection, index).await
    }

    async fn upsert(&self, collection: &str, points: &[Point]) -> Result<()> {
        let poisoned = points.iter().any(|p| {
            p.payload
                .get("text")
                .and_then(|t| t.as_str())
                .is_some_and(|t| t.contains(self.marker.as_str()))
        });
        if poisoned {
            return Err(RagError::VectorStoreError {
                backend: "rejecting".into(),
                message: "payload rejected".into(),
            });
        }
        self.inner.upsert(collection, points).await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>> {
        self.inner.search(collection, vector, limit).await
    }
}
