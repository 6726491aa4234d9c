use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use erag_core::Error;
use erag_embed::{EmbeddingConfig, EmbeddingOrchestrator};
use erag_rag::{IndexConfig, NOT_ENOUGH_INFORMATION, RetrievalService, VectorIndex};

#[derive(Parser)]
#[command(name = "erag")]
#[command(about = "Embed documents into a vector index and retrieve context for questions", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index plain-text files
    Index {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the retrieved context for a question
    Query {
        text: String,
        /// Index these files first
        #[arg(short, long = "document")]
        documents: Vec<PathBuf>,
    },
    /// Print the generation prompt for a question
    Prompt {
        text: String,
        /// Index these files first
        #[arg(short, long = "document")]
        documents: Vec<PathBuf>,
    },
    /// Show index statistics
    Stats,
}

type Service = RetrievalService<EmbeddingOrchestrator>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let embedding_config = EmbeddingConfig::from_env()?;
    let index_config = IndexConfig::from_env()?;

    let embedder = EmbeddingOrchestrator::from_config(&embedding_config)?;
    let index = VectorIndex::open(&index_config)?;
    index.initialize().await?;
    info!(
        "Using collection '{}' with providers {:?}",
        index.collection(),
        embedder.provider_names()
    );

    let service = RetrievalService::new(Arc::new(embedder), Arc::new(index));

    match cli.command {
        Command::Index { files } => index_files(&service, &files).await?,
        Command::Query { text, documents } => {
            index_files(&service, &documents).await?;
            let context = service.answer_query(&text).await?;
            if context.is_empty() {
                println!("{}", "No matching documents.".yellow());
            } else {
                println!("{}", context);
            }
        }
        Command::Prompt { text, documents } => {
            index_files(&service, &documents).await?;
            match service.prompt_for(&text).await? {
                Some(prompt) => println!("{}", prompt),
                None => println!("{}", NOT_ENOUGH_INFORMATION.yellow()),
            }
        }
        Command::Stats => {
            let stats = service.stats().await;
            println!("{}", serde_json_pretty(&stats));
        }
    }

    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn serde_json_pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

async fn index_files(service: &Service, files: &[PathBuf]) -> Result<()> {
    for path in files {
        let text = read_document(path).await?;
        let outcome = service.index_document(&text).await?;

        if outcome.indexed {
            println!("{} {} {}", "✅".green(), path.display(), outcome.id.dimmed());
        } else {
            println!("{} {} was not indexed", "⚠️".yellow(), path.display());
        }
    }
    Ok(())
}

/// Read a document; only plain-text files are accepted.
async fn read_document(path: &Path) -> erag_core::Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if extension != "txt" {
        return Err(Error::UnsupportedFileType(path.display().to_string()));
    }

    Ok(tokio::fs::read_to_string(path).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_read_text_document() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "The sky is blue.").unwrap();

        assert_eq!(read_document(file.path()).await.unwrap(), "The sky is blue.");
    }

    #[tokio::test]
    async fn test_reject_other_file_types() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();

        assert!(matches!(
            read_document(file.path()).await,
            Err(Error::UnsupportedFileType(_))
        ));
    }

    #[tokio::test]
    async fn test_index_files_with_memory_backend() {
        let mut file = tempfile::Builder::new().suffix(".TXT").tempfile().unwrap();
        write!(file, "The sky is blue.").unwrap();

        let config = IndexConfig {
            backend: erag_rag::BackendKind::Memory,
            dimension: 384,
            ..IndexConfig::default()
        };
        let index = VectorIndex::open(&config).unwrap();
        index.initialize().await.unwrap();
        let embedder = EmbeddingOrchestrator::from_config(&EmbeddingConfig::offline()).unwrap();
        let service = RetrievalService::new(Arc::new(embedder), Arc::new(index));

        index_files(&service, &[file.path().to_path_buf()]).await.unwrap();
        let context = service.answer_query("What color is the sky?").await.unwrap();
        assert_eq!(context, "The sky is blue.");
    }

    #[test]
    fn test_cli_parses_documents() {
        let cli = Cli::parse_from(["erag", "query", "What color is the sky?", "-d", "sky.txt"]);
        match cli.command {
            Command::Query { text, documents } => {
                assert_eq!(text, "What color is the sky?");
                assert_eq!(documents, vec![PathBuf::from("sky.txt")]);
            }
            _ => panic!("expected query command"),
        }
    }
}
