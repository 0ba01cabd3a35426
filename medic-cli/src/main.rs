mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use medic_rag::{BatchFailurePolicy, Contextualization, DocumentFormat};
use medic_telemetry::{LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(name = "medic-rag")]
#[command(about = "Index and search the first-aid manual", long_about = None)]
#[command(version)]
struct Cli {
    /// Collection to read from or write to (defaults to COLLECTION_NAME)
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, env = "MEDIC_LOG_FORMAT", default_value = "compact")]
    log_format: LogFormat,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_filter: String,

    /// Embed raw text without the section title; use it for ingest and query alike
    #[arg(long, global = true)]
    no_context: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and upload one or more documents
    Ingest {
        /// Documents to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Maximum chunk size in characters
        #[arg(long, default_value = "1000")]
        chunk_size: usize,

        /// Characters shared by consecutive chunks
        #[arg(long, default_value = "200")]
        chunk_overlap: usize,

        /// Document layout (markdown, rt_manual); detected when omitted
        #[arg(long)]
        format: Option<DocumentFormat>,

        /// Points per upsert call
        #[arg(long, default_value = "10")]
        batch_size: usize,

        /// What to do when a batch upsert fails
        #[arg(long, value_enum, default_value_t = Policy::Retry)]
        on_batch_failure: Policy,

        /// Add to the existing collection instead of rebuilding it
        #[arg(long)]
        keep_collection: bool,

        /// Chunk the whole document instead of section by section
        #[arg(long)]
        whole_document: bool,
    },

    /// Search the collection
    Query {
        /// Question to search for
        text: String,

        /// Maximum number of results
        #[arg(long, default_value = "5")]
        top_k: usize,

        /// Minimum similarity score; every hit is kept when omitted
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f32>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List collections in the vector store
    Collections,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    /// Stop the document at the first failed batch
    Abort,
    /// Retry the points of a failed batch one by one
    Retry,
}

impl From<Policy> for BatchFailurePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Abort => BatchFailurePolicy::Abort,
            Policy::Retry => BatchFailurePolicy::RetryIndividually,
        }
    }
}

fn contextualization(no_context: bool) -> Contextualization {
    if no_context {
        Contextualization::None
    } else {
        Contextualization::SectionTitle
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let logging = LoggingConfig::new(cli.log_format).with_filter(cli.log_filter);
    medic_telemetry::try_init(&logging)?;

    let services = medic_rag::ServiceConfig::from_env()?;
    let collection = cli.collection.unwrap_or_else(|| services.collection.clone());
    let context = contextualization(cli.no_context);

    match cli.command {
        Commands::Ingest {
            paths,
            chunk_size,
            chunk_overlap,
            format,
            batch_size,
            on_batch_failure,
            keep_collection,
            whole_document,
        } => {
            let mut builder = medic_rag::RagConfig::builder()
                .chunk_size(chunk_size)
                .chunk_overlap(chunk_overlap)
                .upload_batch_size(batch_size)
                .batch_failure_policy(on_batch_failure.into())
                .recreate_collection(!keep_collection)
                .chunk_by_section(!whole_document)
                .contextualization(context);
            if let Some(format) = format {
                builder = builder.format(format);
            }
            commands::ingest(&services, builder.build()?, &paths, &collection).await?;
        }
        Commands::Query { text, top_k, threshold, json } => {
            let mut builder =
                medic_rag::RagConfig::builder().top_k(top_k).contextualization(context);
            if let Some(threshold) = threshold {
                builder = builder.similarity_threshold(threshold);
            }
            let config = builder.build()?;
            commands::query(&services, config, &collection, &text, json).await?;
        }
        Commands::Collections => {
            commands::collections(&services).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn ingest_defaults_match_pipeline_defaults() {
        let cli = Cli::try_parse_from(["medic-rag", "ingest", "manuel.txt"]).unwrap();
        let Commands::Ingest { paths, chunk_size, chunk_overlap, batch_size, format, .. } =
            cli.command
        else {
            panic!("expected ingest");
        };
        let defaults = medic_rag::RagConfig::default();
        assert_eq!(paths, vec![PathBuf::from("manuel.txt")]);
        assert_eq!(chunk_size, defaults.chunk_size);
        assert_eq!(chunk_overlap, defaults.chunk_overlap);
        assert_eq!(batch_size, defaults.upload_batch_size);
        assert_eq!(format, None);
    }

    #[test]
    fn parses_format_and_policy() {
        let cli = Cli::try_parse_from([
            "medic-rag",
            "--collection",
            "manuel",
            "ingest",
            "a.txt",
            "b.md",
            "--format",
            "rt_manual",
            "--on-batch-failure",
            "abort",
        ])
        .unwrap();
        assert_eq!(cli.collection.as_deref(), Some("manuel"));
        let Commands::Ingest { paths, format, on_batch_failure, .. } = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(paths.len(), 2);
        assert_eq!(format, Some(DocumentFormat::RtManual));
        assert_eq!(BatchFailurePolicy::from(on_batch_failure), BatchFailurePolicy::Abort);
    }

    #[test]
    fn no_context_applies_to_query_as_well_as_ingest() {
        let cli = Cli::try_parse_from(["medic-rag", "query", "brûlure", "--no-context"]).unwrap();
        assert!(cli.no_context);
        assert_eq!(contextualization(cli.no_context), Contextualization::None);
        let Commands::Query { threshold, .. } = cli.command else {
            panic!("expected query");
        };
        assert_eq!(threshold, None);

        let cli = Cli::try_parse_from(["medic-rag", "--no-context", "ingest", "a.txt"]).unwrap();
        assert_eq!(contextualization(cli.no_context), Contextualization::None);

        let cli = Cli::try_parse_from(["medic-rag", "query", "brûlure"]).unwrap();
        assert_eq!(contextualization(cli.no_context), Contextualization::SectionTitle);
    }

    #[test]
    fn query_accepts_negative_threshold() {
        let cli =
            Cli::try_parse_from(["medic-rag", "query", "brûlure", "--threshold", "-0.5"]).unwrap();
        let Commands::Query { threshold, .. } = cli.command else {
            panic!("expected query");
        };
        assert_eq!(threshold, Some(-0.5));
    }

    #[test]
    fn ingest_requires_a_path() {
        assert!(Cli::try_parse_from(["medic-rag", "ingest"]).is_err());
    }

    #[test]
    fn rejects_unknown_format() {
        let parsed = Cli::try_parse_from(["medic-rag", "ingest", "a.txt", "--format", "pdf"]);
        assert!(parsed.is_err());
    }
}
