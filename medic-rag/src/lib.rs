//! Chunking and semantic retrieval over a first-aid manual.
//!
//! This crate provides:
//! - Section extraction for markdown and structured-manual documents
//! - Size-bounded, overlap-preserving text splitting
//! - A dimension-probing [`Embedder`] over any [`EmbeddingProvider`]
//! - A vector store adapter ([`VectorIndex`]) with in-memory and Qdrant backends
//! - The [`RagPipeline`] that ties ingestion and queries together
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use medic_rag::{Embedder, EmbedderConfig, InMemoryVectorStore, RagConfig, RagPipeline};
//! use medic_rag::ollama::OllamaEmbeddingProvider;
//!
//! let provider = Arc::new(OllamaEmbeddingProvider::local()?);
//! let embedder = Embedder::probe(provider, EmbedderConfig::default()).await?;
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedder(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//! pipeline.ingest("manuel.txt", "first_aid_manual").await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod inmemory;
pub mod pipeline;
pub mod sections;
pub mod vectorstore;

#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{DEFAULT_SEPARATORS, DocumentChunker, ProcessedDocument, TextSplitter};
pub use config::{BatchFailurePolicy, RagConfig, RagConfigBuilder, ServiceConfig};
pub use document::{
    Chunk, ChunkMetadata, DocumentFormat, SearchHit, Section, SectionKind, fields, point_id,
};
pub use embedding::{
    DimensionPolicy, Embedder, EmbedderConfig, EmbeddingBatch, EmbeddingOutcome, EmbeddingProvider,
};
pub use error::{RagError, Result};
pub use index::{
    BatchFailure, CollectionAction, CollectionReport, IndexRecord, UploadReport, VectorIndex,
};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{
    BatchIngestReport, Contextualization, IngestReport, QueryResults, QueryStatus, RagPipeline,
    RagPipelineBuilder,
};
pub use sections::{detect_format, extract_sections, normalize_whitespace};
pub use vectorstore::{
    CHUNK_INDEXES, IndexOutcome, PayloadIndex, PayloadIndexKind, Point, ScoredPoint, VectorStore,
};
