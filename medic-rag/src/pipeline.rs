//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] composes a [`DocumentChunker`], an [`Embedder`] and a
//! [`VectorStore`] into two flows: **ingest** (document → populated
//! collection) and **query** (text → ranked chunks).
//!
//! # Example
//!
//! ```rust,ignore
//! use medic_rag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let report = pipeline.ingest("manuel_secourisme.txt", "first_aid_manual").await?;
//! let results = pipeline.query("first_aid_manual", "brûlure chimique", 3).await;
//! println!("{}", results.to_context_string());
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::chunking::DocumentChunker;
use crate::config::RagConfig;
use crate::document::{Chunk, DocumentFormat, SearchHit};
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::index::{CollectionReport, IndexRecord, UploadReport, VectorIndex};
use crate::vectorstore::VectorStore;

/// Template applied to chunk and query text before embedding.
///
/// Ingestion and queries must go through the same variant, otherwise
/// queries land in a different region of the vector space than the chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contextualization {
    /// Embed the raw text.
    None,
    /// Prefix chunks with their section title: `"Document: {title}\nContenu: {text}"`,
    /// and queries with `"Contenu: "`.
    #[default]
    SectionTitle,
}

impl Contextualization {
    /// Text embedded for a chunk at ingestion time.
    pub fn chunk_text(&self, chunk: &Chunk) -> String {
        match self {
            Self::None => chunk.text.clone(),
            Self::SectionTitle => {
                format!("Document: {}\nContenu: {}", chunk.metadata.section_title, chunk.text)
            }
        }
    }

    /// Text embedded for a query.
    pub fn query_text(&self, query: &str) -> String {
        match self {
            Self::None => query.to_string(),
            Self::SectionTitle => format!("Contenu: {query}"),
        }
    }
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Document path.
    pub source: String,
    /// Layout the document was parsed as; `None` when chunked without sections.
    pub format: Option<DocumentFormat>,
    /// Sections parsed.
    pub sections: usize,
    /// Sections that could not be chunked.
    pub failed_sections: usize,
    /// Chunks created.
    pub chunks: usize,
    /// Collection setup, if the collection was touched.
    pub collection: Option<CollectionReport>,
    /// Upload counters.
    pub upload: UploadReport,
}

impl IngestReport {
    /// Vectors acknowledged by the store.
    pub fn uploaded(&self) -> usize {
        self.upload.uploaded
    }

    /// Sections, embeddings and points that were lost along the way.
    pub fn failures(&self) -> usize {
        self.failed_sections + self.upload.embedding_failures + self.upload.failed_points
    }
}

/// Outcome of [`RagPipeline::ingest_batch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchIngestReport {
    /// Reports of the documents that were ingested.
    pub documents: Vec<IngestReport>,
    /// Documents that were skipped, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

impl BatchIngestReport {
    /// Chunks created across all documents.
    pub fn chunks(&self) -> usize {
        self.documents.iter().map(|d| d.chunks).sum()
    }

    /// Vectors stored across all documents.
    pub fn uploaded(&self) -> usize {
        self.documents.iter().map(IngestReport::uploaded).sum()
    }
}

/// Why a query produced what it did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryStatus {
    /// At least one hit passed the similarity threshold.
    Found,
    /// The search ran but nothing passed the threshold.
    NoMatches,
    /// The query could not be embedded.
    EmbeddingFailed {
        /// Embedder error.
        reason: String,
    },
    /// The store rejected the search.
    SearchFailed {
        /// Store error.
        reason: String,
    },
}

/// Ranked hits for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    /// The query as given by the caller.
    pub query: String,
    /// Hits, highest score first.
    pub hits: Vec<SearchHit>,
    /// Outcome of the query.
    pub status: QueryStatus,
}

impl QueryResults {
    fn failed(query: &str, status: QueryStatus) -> Self {
        Self { query: query.to_string(), hits: Vec::new(), status }
    }

    /// `true` if there are no hits, whatever the reason.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Render the hits as plain text for a language model prompt.
    pub fn to_context_string(&self) -> String {
        match &self.status {
            QueryStatus::EmbeddingFailed { reason } | QueryStatus::SearchFailed { reason } => {
                return format!(
                    "Error searching the first aid manual: {reason}\n\
                     Check that the embedding service is running and the collection exists."
                );
            }
            QueryStatus::NoMatches => {
                return format!(
                    "No results found for query: '{}'. \
                     Try rephrasing your question or using different keywords.",
                    self.query
                );
            }
            QueryStatus::Found => {}
        }

        let rule = "-".repeat(80);
        let mut out = format!(
            "Search results for: '{}'\nFound {} relevant sections:\n{}\n",
            self.query,
            self.hits.len(),
            "=".repeat(80)
        );
        for (i, hit) in self.hits.iter().enumerate() {
            let _ = writeln!(out, "\n[Result {}] Relevance: {:.2}%", i + 1, hit.score * 100.0);
            if !hit.metadata.section_title.is_empty() {
                let _ = writeln!(out, "Section: {}", hit.metadata.section_title);
            }
            if let Some(level) = hit.metadata.section_level {
                let _ = writeln!(out, "Level: H{level}");
            }
            let _ = writeln!(out, "\nContent:\n{}\n\n{rule}", hit.text);
        }
        out
    }
}

/// The RAG pipeline orchestrator.
///
/// Coordinates document ingestion (chunk → contextualize → embed → store)
/// and query execution (contextualize → embed → search → filter). Construct
/// one via [`RagPipeline::builder()`].
#[derive(Debug)]
pub struct RagPipeline {
    config: RagConfig,
    chunker: DocumentChunker,
    index: VectorIndex,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the document chunker.
    pub fn chunker(&self) -> &DocumentChunker {
        &self.chunker
    }

    /// Return a reference to the vector store adapter.
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Create (or recreate, per configuration) a collection with its payload indexes.
    ///
    /// # Errors
    ///
    /// Returns the store error if the collection cannot be set up.
    pub async fn create_collection(&self, name: &str) -> Result<CollectionReport> {
        self.index.create_collection(name, self.config.recreate_collection).await.map_err(|e| {
            error!(collection = name, error = %e, "failed to create collection");
            e
        })
    }

    /// Ingest a single document: chunk → embed → store.
    ///
    /// The document is chunked before the collection is touched, so an
    /// unreadable document never drops an existing collection. Upload
    /// failures are counted in the report rather than returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentError`] if the document cannot be read,
    /// or the store error if the collection cannot be set up.
    pub async fn ingest(&self, path: impl AsRef<Path>, collection: &str) -> Result<IngestReport> {
        self.ingest_document(path.as_ref(), collection, self.config.recreate_collection).await
    }

    /// Ingest several documents into one collection.
    ///
    /// The collection is recreated at most once, before the first document
    /// that produced chunks. Documents that cannot be read are skipped.
    ///
    /// # Errors
    ///
    /// Returns the store error if the collection cannot be set up.
    pub async fn ingest_batch<P: AsRef<Path>>(
        &self,
        paths: &[P],
        collection: &str,
    ) -> Result<BatchIngestReport> {
        let mut report = BatchIngestReport::default();
        let mut recreate = self.config.recreate_collection;

        for path in paths {
            let path = path.as_ref();
            match self.ingest_document(path, collection, recreate).await {
                Ok(document) => {
                    if document.collection.is_some() {
                        recreate = false;
                    }
                    report.documents.push(document);
                }
                Err(e @ RagError::DocumentError { .. }) => {
                    warn!(path = %path.display(), error = %e, "skipping document");
                    report.skipped.push((path.to_path_buf(), e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            collection,
            documents = report.documents.len(),
            skipped = report.skipped.len(),
            chunks = report.chunks(),
            uploaded = report.uploaded(),
            "batch ingestion finished"
        );
        Ok(report)
    }

    async fn ingest_document(
        &self,
        path: &Path,
        collection: &str,
        recreate: bool,
    ) -> Result<IngestReport> {
        let processed = self
            .chunker
            .process_document(path, self.config.chunk_by_section, self.config.format)
            .await?;

        let mut report = IngestReport {
            source: path.display().to_string(),
            format: processed.format,
            sections: processed.sections,
            failed_sections: processed.failed_sections,
            chunks: processed.chunks.len(),
            collection: None,
            upload: UploadReport::default(),
        };
        if processed.chunks.is_empty() {
            warn!(path = %path.display(), "document produced no chunks, nothing to upload");
            return Ok(report);
        }

        report.collection = Some(self.index.create_collection(collection, recreate).await?);

        let contextualization = self.config.contextualization;
        let records: Vec<IndexRecord> = processed
            .chunks
            .into_iter()
            .map(|chunk| {
                let input = contextualization.chunk_text(&chunk);
                IndexRecord::with_embedding_input(chunk, input)
            })
            .collect();
        report.upload =
            self.index.upload_vectors(collection, records, self.config.upload_batch_size).await?;

        info!(
            path = %path.display(),
            collection,
            sections = report.sections,
            chunks = report.chunks,
            uploaded = report.uploaded(),
            failures = report.failures(),
            "ingested document"
        );
        Ok(report)
    }

    /// Query the pipeline: contextualize → embed → search → filter by threshold.
    ///
    /// Never fails: embedding and store errors are reported through
    /// [`QueryStatus`] with an empty hit list.
    pub async fn query(&self, collection: &str, query: &str, top_k: usize) -> QueryResults {
        let text = self.config.contextualization.query_text(query);
        let vector = match self.index.embedder().embed(&text).await {
            Ok(vector) => vector,
            Err(e) => {
                error!(collection, error = %e, "embedding failed during query");
                return QueryResults::failed(
                    query,
                    QueryStatus::EmbeddingFailed { reason: e.to_string() },
                );
            }
        };

        let hits = match self.index.search_vector(collection, &vector, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(collection, error = %e, "vector store search failed");
                return QueryResults::failed(
                    query,
                    QueryStatus::SearchFailed { reason: e.to_string() },
                );
            }
        };

        let hits: Vec<SearchHit> = match self.config.similarity_threshold {
            Some(threshold) => hits.into_iter().filter(|h| h.score >= threshold).collect(),
            None => hits,
        };
        let status = if hits.is_empty() { QueryStatus::NoMatches } else { QueryStatus::Found };

        info!(collection, result_count = hits.len(), "query completed");
        QueryResults { query: query.to_string(), hits, status }
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedder` and `vector_store` are required. The chunker
/// defaults to one built from the configuration's size and overlap.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::builder().chunk_size(350).chunk_overlap(80).build()?)
///     .embedder(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedder: Option<Arc<Embedder>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    chunker: Option<DocumentChunker>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedder used for both chunks and queries.
    pub fn embedder(mut self, embedder: Arc<Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: DocumentChunker) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing or
    /// the configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::ConfigError("embedder is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => DocumentChunker::from_config(&config)?,
        };

        let index = VectorIndex::new(vector_store, embedder, config.batch_failure_policy);
        Ok(RagPipeline { config, chunker, index })
    }
}
