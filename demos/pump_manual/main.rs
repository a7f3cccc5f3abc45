//! # Pump Manual Example
//!
//! Builds an index over a few pages of a slurry pump manual and answers
//! questions about it.
//!
//! Uses a keyword `MockEmbeddingProvider` and an extractive
//! `MockGenerationProvider` so it runs with **zero API keys** and no model
//! server.
//!
//! Run: `RUST_LOG=docqa_rag=debug cargo run --example pump_manual`

use std::sync::Arc;

use docqa_rag::{
    AnsweringPipeline, DocumentQa, EmbeddingProvider, GenerationProvider, RagConfig, Segment,
};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// MockEmbeddingProvider — one dimension per vocabulary term
// ---------------------------------------------------------------------------

const VOCABULARY: [&str; 8] =
    ["lubricant", "grease", "viscosity", "belt", "seal", "lifting", "service", "nlgi"];

struct MockEmbeddingProvider;

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        let text = text.to_lowercase();
        Ok(VOCABULARY.iter().map(|term| text.matches(term).count() as f32).collect())
    }

    fn dimensions(&self) -> usize {
        VOCABULARY.len()
    }

    fn name(&self) -> &str {
        "mock-keywords"
    }
}

// ---------------------------------------------------------------------------
// MockGenerationProvider — answers with the first line of context
// ---------------------------------------------------------------------------

struct MockGenerationProvider;

#[async_trait::async_trait]
impl GenerationProvider for MockGenerationProvider {
    async fn generate(&self, prompt: &str) -> docqa_rag::Result<String> {
        let context = prompt.split_once("Context:\n").map_or("", |(_, context)| context);
        let first_line = context.lines().find(|line| !line.trim().is_empty());
        Ok(first_line.unwrap_or("I don't know.").to_string())
    }

    fn name(&self) -> &str {
        "mock-extractive"
    }
}

fn manual_pages() -> Vec<Segment> {
    let pages = [
        "Bearing assembly. The DY bearing frame requires 5 liters of lubricant. \
         Use mineral oil with a viscosity of 100 cSt at 40°C, viscosity index 95 (DIN-ISO 2909).",
        "Seal chamber. The centrifugal seal chamber is factory filled with lithium grease, \
         NLGI class 2. Regrease the seal every 500 operating hours.",
        "Drive. For pulleys of 170-224 mm with an SPB belt profile, use a belt width of 16 mm.",
        "Lifting. Only lift the pump by the lifting lugs. Never stand under a suspended load. \
         Use slings rated for the full pump weight.",
        "Service. The service line in Finland is available around the clock.",
    ];
    pages
        .iter()
        .enumerate()
        .map(|(i, text)| {
            Segment::new(*text, i as u32 + 1).with_metadata("page", (i + 1).to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // -- 1. Configure the pipeline ----------------------------------------
    // Small chunks keep each page in two or three pieces for this demo.
    let config = RagConfig::builder()
        .chunk_size(120)
        .chunk_overlap(30)
        .top_k(3)
        .min_score(0.1)
        .max_context_length(600)
        .build()?;

    // -- 2. Build the pipeline and load the document ----------------------
    let pipeline = AnsweringPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(MockEmbeddingProvider))
        .generation_provider(Arc::new(MockGenerationProvider))
        .build()?;
    let qa = DocumentQa::new(pipeline);

    let chunk_count = qa.load(&manual_pages()).await?;
    println!("Indexed {chunk_count} chunks.");

    // -- 3. Ask questions --------------------------------------------------
    let questions = [
        "How many liters of lubricant does the DY bearing frame need?",
        "What is the kinematic viscosity of the oil at 40°C?",
        "Which grease is used in the seal chamber and what NLGI class?",
        "What belt width is used for SPB pulleys?",
        "What safety rules apply when lifting the pump?",
        "What is the warranty period?",
    ];

    for question in &questions {
        let answer = qa.ask(question).await?;
        println!("\nQ: {question}");
        println!("A: {}", answer.text);
        for result in &answer.context {
            println!(
                "   [score={:.3}] page(s) {:?}",
                result.score, result.chunk.origin_segment_ids
            );
        }
    }

    Ok(())
}
