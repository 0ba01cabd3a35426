//! The vector store adapter: collection lifecycle, batched uploads and search.
//!
//! [`VectorIndex`] pairs an [`Embedder`] with a [`VectorStore`] backend. It
//! owns the invariants that tie the two together: collections are created
//! with the embedder's dimensionality, embeddings stay aligned with their
//! chunks, and batches are applied in submission order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::BatchFailurePolicy;
use crate::document::{Chunk, SearchHit};
use crate::embedding::{Embedder, EmbeddingOutcome};
use crate::error::{RagError, Result};
use crate::vectorstore::{CHUNK_INDEXES, IndexOutcome, PayloadIndex, Point, VectorStore};

/// What [`VectorIndex::create_collection`] did with the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionAction {
    /// The collection did not exist and was created.
    Created,
    /// The collection existed and was dropped and rebuilt.
    Recreated,
    /// The collection existed and was left untouched.
    Kept,
}

/// Outcome of [`VectorIndex::create_collection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionReport {
    /// Collection name.
    pub name: String,
    /// Vector size the collection is configured with.
    pub dimensions: usize,
    /// What happened to the collection itself.
    pub action: CollectionAction,
    /// Outcome for every designated payload index, by field name.
    pub indexes: Vec<(String, IndexOutcome)>,
}

/// One chunk ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    /// The chunk; its raw text is stored in the payload and hashed into the id.
    pub chunk: Chunk,
    /// Text actually sent to the embedder.
    pub embedding_input: String,
}

impl IndexRecord {
    /// A record whose embedding input is the chunk text itself.
    pub fn new(chunk: Chunk) -> Self {
        Self { embedding_input: chunk.text.clone(), chunk }
    }

    /// A record embedded from `embedding_input` instead of the chunk text.
    pub fn with_embedding_input(chunk: Chunk, embedding_input: impl Into<String>) -> Self {
        Self { chunk, embedding_input: embedding_input.into() }
    }

    fn into_point(self, vector: Vec<f32>) -> Point {
        Point { id: self.chunk.point_id(), vector, payload: self.chunk.to_payload() }
    }
}

/// A batch upsert that failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// 0-based position of the batch in submission order.
    pub batch_index: usize,
    /// Number of points in the batch.
    pub point_count: usize,
    /// Error reported by the store.
    pub message: String,
}

/// Outcome of [`VectorIndex::upload_vectors`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReport {
    /// Points acknowledged by the store.
    pub uploaded: usize,
    /// Records dropped because their embedding failed.
    pub embedding_failures: usize,
    /// Points that were not stored because of store errors.
    pub failed_points: usize,
    /// Batches submitted.
    pub batches: usize,
    /// Every batch whose upsert failed.
    pub failed_batches: Vec<BatchFailure>,
    /// `true` if the upload stopped early under [`BatchFailurePolicy::Abort`].
    pub aborted: bool,
    /// Ids of the stored points, in submission order.
    pub point_ids: Vec<String>,
}

impl UploadReport {
    /// `true` if every record was embedded and stored.
    pub fn is_complete(&self) -> bool {
        self.embedding_failures == 0 && self.failed_points == 0 && !self.aborted
    }
}

/// Embeds chunks and queries, and performs all point I/O against one store.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use medic_rag::{VectorIndex, InMemoryVectorStore, BatchFailurePolicy};
///
/// let store = Arc::new(InMemoryVectorStore::new());
/// let index = VectorIndex::new(store, embedder, BatchFailurePolicy::Abort);
/// index.create_collection("first_aid_manual", true).await?;
/// let report = index.upload_vectors("first_aid_manual", records, 10).await?;
/// let hits = index.search("first_aid_manual", "Contenu: brûlure", 5).await?;
/// ```
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    embedder: Arc<Embedder>,
    batch_failure_policy: BatchFailurePolicy,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("store", &self.store.backend())
            .field("embedder", &self.embedder)
            .field("batch_failure_policy", &self.batch_failure_policy)
            .finish()
    }
}

impl VectorIndex {
    /// Create an adapter over `store` using `embedder` for every vector.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<Embedder>,
        batch_failure_policy: BatchFailurePolicy,
    ) -> Self {
        Self { store, embedder, batch_failure_policy }
    }

    /// The embedder shared by ingestion and queries.
    pub fn embedder(&self) -> &Arc<Embedder> {
        &self.embedder
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Names of all collections in the store.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.store.list_collections().await
    }

    /// Make sure `name` exists with the embedder's dimensionality.
    ///
    /// With `recreate`, an existing collection is dropped and rebuilt;
    /// otherwise it is kept as is. Payload indexes are ensured in both cases,
    /// and indexes that already exist are reported, not treated as errors.
    /// Safe to call again after a failure.
    ///
    /// # Errors
    ///
    /// Returns the store error if the collection cannot be checked, deleted,
    /// created or indexed.
    pub async fn create_collection(&self, name: &str, recreate: bool) -> Result<CollectionReport> {
        let dimensions = self.embedder.dimensions();
        let exists = self.store.collection_exists(name).await?;

        let action = match (exists, recreate) {
            (true, false) => {
                info!(collection = name, "collection exists, keeping it");
                CollectionAction::Kept
            }
            (true, true) => {
                info!(collection = name, "deleting existing collection");
                self.store.delete_collection(name).await?;
                self.store.create_collection(name, dimensions).await?;
                CollectionAction::Recreated
            }
            (false, _) => {
                self.store.create_collection(name, dimensions).await?;
                CollectionAction::Created
            }
        };
        if action != CollectionAction::Kept {
            info!(
                collection = name,
                dimensions,
                backend = self.store.backend(),
                "created collection"
            );
        }

        let mut indexes = Vec::with_capacity(CHUNK_INDEXES.len());
        for index in CHUNK_INDEXES {
            let outcome = self.ensure_index(name, *index).await?;
            indexes.push((index.field.to_string(), outcome));
        }

        Ok(CollectionReport { name: name.to_string(), dimensions, action, indexes })
    }

    async fn ensure_index(&self, collection: &str, index: PayloadIndex) -> Result<IndexOutcome> {
        let outcome = self.store.create_payload_index(collection, index).await?;
        match outcome {
            IndexOutcome::Created => {
                debug!(
                    collection,
                    field = index.field,
                    kind = %index.kind,
                    "created payload index"
                );
            }
            IndexOutcome::AlreadyExists => {
                debug!(collection, field = index.field, "payload index already exists");
            }
        }
        Ok(outcome)
    }

    /// Embed `records` and upsert them in batches of `batch_size`.
    ///
    /// Embeddings are generated for every record first, then paired with
    /// their record by position; records whose embedding failed are dropped
    /// after pairing. Each batch is upserted and acknowledged before the next
    /// one is sent. A failed batch is handled according to the configured
    /// [`BatchFailurePolicy`] and recorded in the report.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `batch_size` is zero and
    /// [`RagError::PipelineError`] if the embedder breaks positional alignment.
    /// Store failures are reported in the [`UploadReport`], not as errors.
    pub async fn upload_vectors(
        &self,
        collection: &str,
        records: Vec<IndexRecord>,
        batch_size: usize,
    ) -> Result<UploadReport> {
        if batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
        }

        let inputs: Vec<&str> = records.iter().map(|r| r.embedding_input.as_str()).collect();
        let embeddings = self.embedder.generate_embeddings(&inputs).await;
        if embeddings.outcomes.len() != records.len() {
            return Err(RagError::PipelineError(format!(
                "embedder returned {} results for {} records",
                embeddings.outcomes.len(),
                records.len()
            )));
        }

        let mut report =
            UploadReport { embedding_failures: embeddings.failures, ..UploadReport::default() };
        let points: Vec<Point> = records
            .into_iter()
            .zip(embeddings.outcomes)
            .filter_map(|(record, outcome)| match outcome {
                EmbeddingOutcome::Ready(vector) => Some(record.into_point(vector)),
                EmbeddingOutcome::Failed { .. } => None,
            })
            .collect();

        if points.is_empty() {
            warn!(collection, "no points to upload");
            return Ok(report);
        }

        let total_batches = points.len().div_ceil(batch_size);
        for (batch_index, batch) in points.chunks(batch_size).enumerate() {
            report.batches += 1;
            match self.store.upsert(collection, batch).await {
                Ok(()) => {
                    report.uploaded += batch.len();
                    report.point_ids.extend(batch.iter().map(|p| p.id.clone()));
                    debug!(
                        collection,
                        batch_index,
                        total_batches,
                        point_count = batch.len(),
                        "uploaded batch"
                    );
                }
                Err(e) => {
                    error!(
                        collection,
                        batch_index,
                        point_count = batch.len(),
                        error = %e,
                        "batch upload failed"
                    );
                    report.failed_batches.push(BatchFailure {
                        batch_index,
                        point_count: batch.len(),
                        message: e.to_string(),
                    });
                    match self.batch_failure_policy {
                        BatchFailurePolicy::Abort => {
                            let remaining = points.len() - batch_index * batch_size;
                            report.failed_points += remaining;
                            report.aborted = true;
                            warn!(
                                collection,
                                uploaded = report.uploaded,
                                remaining,
                                "aborting upload"
                            );
                            break;
                        }
                        BatchFailurePolicy::RetryIndividually => {
                            self.upsert_one_by_one(collection, batch, &mut report).await;
                        }
                    }
                }
            }
        }

        info!(
            collection,
            uploaded = report.uploaded,
            embedding_failures = report.embedding_failures,
            failed_points = report.failed_points,
            batches = report.batches,
            "upload finished"
        );
        Ok(report)
    }

    async fn upsert_one_by_one(
        &self,
        collection: &str,
        batch: &[Point],
        report: &mut UploadReport,
    ) {
        for point in batch {
            match self.store.upsert(collection, std::slice::from_ref(point)).await {
                Ok(()) => {
                    report.uploaded += 1;
                    report.point_ids.push(point.id.clone());
                }
                Err(e) => {
                    warn!(collection, point_id = %point.id, error = %e, "point upload failed");
                    report.failed_points += 1;
                }
            }
        }
    }

    /// Embed `query_text` and return up to `limit` nearest chunks, best first.
    ///
    /// A query whose embedding fails yields an empty result instead of an error.
    ///
    /// # Errors
    ///
    /// Returns the store error if the search itself fails.
    pub async fn search(
        &self,
        collection: &str,
        query_text: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let vector = match self.embedder.embed(query_text).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!(collection, error = %e, "query embedding failed");
                return Ok(Vec::new());
            }
        };
        self.search_vector(collection, &vector, limit).await
    }

    /// Search with an already computed query vector.
    pub async fn search_vector(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let hits: Vec<SearchHit> = self
            .store
            .search(collection, vector, limit)
            .await?
            .into_iter()
            .map(|p| SearchHit::from_payload(p.id, p.score, p.payload))
            .collect();
        debug!(collection, results = hits.len(), "search completed");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::document::ChunkMetadata;
    use crate::embedding::{EmbedderConfig, EmbeddingProvider};
    use crate::inmemory::InMemoryVectorStore;

    /// Maps a text to a one-hot vector picked by its first byte.
    struct FirstLetter;

    #[async_trait]
    impl EmbeddingProvider for FirstLetter {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.starts_with('!') {
                return Err(RagError::EmbeddingError {
                    provider: "first-letter".into(),
                    message: "rejected".into(),
                });
            }
            let mut v = vec![0.0; 26];
            let slot = text
                .bytes()
                .next()
                .map_or(0, |b| usize::from(b.to_ascii_lowercase().wrapping_sub(b'a')) % 26);
            v[slot] = 1.0;
            Ok(v)
        }

        fn name(&self) -> &str {
            "first-letter"
        }
    }

    fn index_over(store: Arc<InMemoryVectorStore>, policy: BatchFailurePolicy) -> VectorIndex {
        let embedder =
            Embedder::with_dimensions(Arc::new(FirstLetter), 26, EmbedderConfig::default())
                .unwrap();
        VectorIndex::new(store, Arc::new(embedder), policy)
    }

    fn chunk(text: &str, index: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: "manual.md".into(),
                section_title: "Brûlures".into(),
                chunk_index: index,
                total_chunks: 3,
                ..ChunkMetadata::default()
            },
        }
    }

    fn record(text: &str, index: usize) -> IndexRecord {
        IndexRecord::new(chunk(text, index))
    }

    #[tokio::test]
    async fn create_collection_reports_actions() {
        let store = Arc::new(InMemoryVectorStore::new());
        let index = index_over(store.clone(), BatchFailurePolicy::Abort);

        let first = index.create_collection("manual", false).await.unwrap();
        assert_eq!(first.action, CollectionAction::Created);
        assert_eq!(first.dimensions, 26);
        assert!(first.indexes.iter().all(|(_, o)| *o == IndexOutcome::Created));

        let kept = index.create_collection("manual", false).await.unwrap();
        assert_eq!(kept.action, CollectionAction::Kept);
        assert!(kept.indexes.iter().all(|(_, o)| *o == IndexOutcome::AlreadyExists));

        index.upload_vectors("manual", vec![record("apply cool water", 0)], 10).await.unwrap();
        let rebuilt = index.create_collection("manual", true).await.unwrap();
        assert_eq!(rebuilt.action, CollectionAction::Recreated);
        assert_eq!(store.point_count("manual").await, Some(0));
        assert_eq!(store.payload_indexes("manual").await.len(), CHUNK_INDEXES.len());
    }

    #[tokio::test]
    async fn failed_embeddings_are_dropped_after_pairing() {
        let store = Arc::new(InMemoryVectorStore::new());
        let index = index_over(store.clone(), BatchFailurePolicy::Abort);
        index.create_collection("manual", true).await.unwrap();

        let records = vec![record("apply", 0), record("!broken", 1), record("cover", 2)];
        let expected = [records[0].chunk.point_id(), records[2].chunk.point_id()];
        let report = index.upload_vectors("manual", records, 2).await.unwrap();

        assert_eq!(report.uploaded, 2);
        assert_eq!(report.embedding_failures, 1);
        assert_eq!(report.batches, 1);
        assert_eq!(report.point_ids, expected);
        assert!(!report.is_complete());

        let hits = index.search("manual", "cover", 1).await.unwrap();
        assert_eq!(hits[0].text, "cover");
        assert_eq!(hits[0].metadata.chunk_index, 2);
    }

    #[tokio::test]
    async fn payload_carries_text_and_metadata() {
        let store = Arc::new(InMemoryVectorStore::new());
        let index = index_over(store, BatchFailurePolicy::Abort);
        index.create_collection("manual", true).await.unwrap();

        let rec = IndexRecord::with_embedding_input(
            chunk("burns need cool water", 0),
            "Document: Brûlures\nContenu: burns need cool water",
        );
        index.upload_vectors("manual", vec![rec], 10).await.unwrap();

        let hits = index.search("manual", "Document: x", 1).await.unwrap();
        assert_eq!(hits[0].text, "burns need cool water");
        assert_eq!(hits[0].metadata.section_title, "Brûlures");
        assert_eq!(hits[0].metadata.source, "manual.md");
    }

    #[tokio::test]
    async fn failed_query_embedding_returns_no_hits() {
        let store = Arc::new(InMemoryVectorStore::new());
        let index = index_over(store, BatchFailurePolicy::Abort);
        index.create_collection("manual", true).await.unwrap();
        index.upload_vectors("manual", vec![record("apply", 0)], 10).await.unwrap();

        assert!(index.search("manual", "!boom", 5).await.unwrap().is_empty());
        assert!(index.search("missing", "apply", 5).await.is_err());
    }

    #[tokio::test]
    async fn zero_batch_size_is_rejected() {
        let index = index_over(Arc::new(InMemoryVectorStore::new()), BatchFailurePolicy::Abort);
        let err = index.upload_vectors("manual", vec![record("a", 0)], 0).await.unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
    }
}
