use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use medic_rag::ollama::OllamaEmbeddingProvider;
use medic_rag::qdrant::QdrantVectorStore;
use medic_rag::{
    Embedder, EmbedderConfig, IngestReport, QueryStatus, RagConfig, RagPipeline, ServiceConfig,
    VectorStore,
};
use tracing::info;

async fn pipeline(services: &ServiceConfig, config: RagConfig) -> anyhow::Result<RagPipeline> {
    let provider = OllamaEmbeddingProvider::from_config(services)?;
    let embedder = Embedder::probe(Arc::new(provider), EmbedderConfig::default())
        .await
        .with_context(|| format!("embedding service at {} is not usable", services.ollama_host))?;
    info!(
        model = %services.embedding_model,
        dimensions = embedder.dimensions(),
        "embedding service ready"
    );

    let store = QdrantVectorStore::from_config(services)?;
    Ok(RagPipeline::builder()
        .config(config)
        .embedder(Arc::new(embedder))
        .vector_store(Arc::new(store))
        .build()?)
}

fn print_report(report: &IngestReport) {
    println!(
        "{}: {} sections, {} chunks, {} uploaded, {} lost",
        report.source,
        report.sections,
        report.chunks,
        report.uploaded(),
        report.failures()
    );
    for failure in &report.upload.failed_batches {
        println!(
            "  batch {} ({} points) failed: {}",
            failure.batch_index, failure.point_count, failure.message
        );
    }
    if report.upload.aborted {
        println!("  upload aborted");
    }
}

pub async fn ingest(
    services: &ServiceConfig,
    config: RagConfig,
    paths: &[PathBuf],
    collection: &str,
) -> anyhow::Result<()> {
    let pipeline = pipeline(services, config).await?;

    if let [path] = paths {
        let report = pipeline
            .ingest(path, collection)
            .await
            .with_context(|| format!("failed to ingest {}", path.display()))?;
        print_report(&report);
        return Ok(());
    }

    let report = pipeline.ingest_batch(paths, collection).await?;
    for document in &report.documents {
        print_report(document);
    }
    for (path, reason) in &report.skipped {
        println!("{}: skipped ({reason})", path.display());
    }
    println!(
        "{} documents, {} chunks, {} uploaded to '{collection}'",
        report.documents.len(),
        report.chunks(),
        report.uploaded()
    );
    if report.documents.is_empty() {
        bail!("no document could be ingested");
    }
    Ok(())
}

pub async fn query(
    services: &ServiceConfig,
    config: RagConfig,
    collection: &str,
    text: &str,
    json: bool,
) -> anyhow::Result<()> {
    let top_k = config.top_k;
    let pipeline = pipeline(services, config).await?;
    let results = pipeline.query(collection, text, top_k).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("{}", results.to_context_string());
    }

    match results.status {
        QueryStatus::EmbeddingFailed { reason } | QueryStatus::SearchFailed { reason } => {
            bail!("query failed: {reason}")
        }
        QueryStatus::Found | QueryStatus::NoMatches => Ok(()),
    }
}

pub async fn collections(services: &ServiceConfig) -> anyhow::Result<()> {
    let store = QdrantVectorStore::from_config(services)?;
    let mut names = store
        .list_collections()
        .await
        .with_context(|| format!("cannot reach Qdrant at {}", services.qdrant_url))?;
    names.sort();
    for name in names {
        println!("{name}");
    }
    Ok(())
}
