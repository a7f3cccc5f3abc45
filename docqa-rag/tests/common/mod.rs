//! Deterministic providers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use docqa_rag::{
    AnsweringPipeline, EmbeddingProvider, GenerationProvider, RagConfig, RagError, Result, Segment,
};

/// Embeds text as a one-hot style vector: component `i` is 1.0 when the
/// lowercased text contains `keywords[i]`.
pub struct KeywordEmbedder {
    keywords: Vec<String>,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        let keywords = keywords.iter().map(|k| k.to_lowercase()).collect();
        Self { keywords, calls: AtomicUsize::new(0) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = text.to_lowercase();
        let hit = |k: &String| if text.contains(k.as_str()) { 1.0 } else { 0.0 };
        Ok(self.keywords.iter().map(hit).collect())
    }

    fn dimensions(&self) -> usize {
        self.keywords.len()
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Fails for any text containing `trigger`, otherwise embeds like [`KeywordEmbedder`].
pub struct FailingEmbedder {
    inner: KeywordEmbedder,
    trigger: String,
}

impl FailingEmbedder {
    pub fn new(keywords: &[&str], trigger: &str) -> Self {
        Self { inner: KeywordEmbedder::new(keywords), trigger: trigger.to_string() }
    }
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(&self.trigger) {
            return Err(RagError::embedding("failing", "model unavailable"));
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}

/// Returns the prompt it was given, so tests can inspect what the model saw.
#[derive(Default)]
pub struct EchoGenerator {
    pub calls: AtomicUsize,
}

impl EchoGenerator {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(prompt.to_string())
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Always fails.
pub struct FailingGenerator;

#[async_trait]
impl GenerationProvider for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::generation("failing", "model overloaded"))
    }
}

/// Answers after a fixed delay.
pub struct SlowGenerator {
    pub delay: Duration,
}

#[async_trait]
impl GenerationProvider for SlowGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok("late answer".to_string())
    }
}

pub const PUMP_KEYWORDS: [&str; 2] = ["lubricant", "viscosity"];

/// The two-segment pump manual excerpt.
pub fn pump_segments() -> Vec<Segment> {
    vec![
        Segment::new("The pump requires 5 liters of lubricant.", 1).with_metadata("page", "1"),
        Segment::new("Viscosity at 40°C is 100 cSt.", 2).with_metadata("page", "2"),
    ]
}

pub fn pump_config() -> RagConfig {
    RagConfig::builder()
        .chunk_size(40)
        .chunk_overlap(10)
        .top_k(2)
        .max_context_length(1000)
        .build()
        .unwrap()
}

pub fn pump_pipeline(
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
) -> AnsweringPipeline {
    AnsweringPipeline::builder()
        .config(pump_config())
        .embedding_provider(embedder)
        .generation_provider(generator)
        .build()
        .unwrap()
}
