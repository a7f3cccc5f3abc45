//! # Ollama Manual Q&A
//!
//! Answers questions about a text export of a technical manual using a local
//! Ollama server for both embeddings and generation.
//!
//! Pages are separated by form feeds (`\x0c`), as produced by `pdftotext`.
//!
//! Requires: a running Ollama server with `all-minilm` and `llama3` pulled.
//!
//! Run: `cargo run --example ollama_manual --features ollama -- manual.txt "How much oil?"`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use docqa_rag::{
    AnsweringPipeline, OllamaEmbeddingProvider, OllamaGenerationProvider, RagConfig,
    RecursiveChunker, Segment,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Ask questions about a technical manual")]
struct Args {
    /// Text export of the manual, pages separated by form feeds.
    manual: PathBuf,

    /// Questions to ask.
    #[arg(required = true)]
    questions: Vec<String>,

    /// JSON file with pipeline settings; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ollama server address.
    #[arg(long, default_value = docqa_rag::ollama::DEFAULT_BASE_URL)]
    base_url: String,

    /// Generation model.
    #[arg(long, default_value = "llama3")]
    model: String,
}

fn read_pages(path: &PathBuf) -> anyhow::Result<Vec<Segment>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(text
        .split('\x0c')
        .enumerate()
        .map(|(i, page)| {
            Segment::new(page.trim(), i as u32 + 1)
                .with_metadata("source", path.display().to_string())
                .with_metadata("page", (i + 1).to_string())
        })
        .collect())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            RagConfig::from_json_str(&json)?
        }
        None => RagConfig::default(),
    };

    let pages = read_pages(&args.manual)?;
    info!(pages = pages.len(), "loaded manual");

    let pipeline = AnsweringPipeline::builder()
        .chunker(Arc::new(RecursiveChunker::from_config(&config)?))
        .config(config)
        .embedding_provider(Arc::new(OllamaEmbeddingProvider::new().with_base_url(&args.base_url)))
        .generation_provider(Arc::new(
            OllamaGenerationProvider::new().with_base_url(&args.base_url).with_model(&args.model),
        ))
        .build()?;

    let index = pipeline.build_index(&pages).await?;

    for question in &args.questions {
        let answer = pipeline.answer(&index, question).await?;
        println!("Q: {question}\nA: {answer}\n");
    }

    Ok(())
}
