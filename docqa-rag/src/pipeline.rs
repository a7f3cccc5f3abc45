//! Question-answering pipeline orchestrator.
//!
//! The [`AnsweringPipeline`] coordinates the two phases of a document's life:
//!
//! - **build**: segments → [`Chunker`] → [`IndexBuilder`] → [`SemanticIndex`]
//! - **serve**: query → [`Retriever`] → [`PromptComposer`] → [`GenerationProvider`]
//!
//! The pipeline keeps no state between queries. [`DocumentQa`] pairs a
//! pipeline with the index of the currently loaded document.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{AnsweringPipeline, RagConfig};
//!
//! let pipeline = AnsweringPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .generation_provider(Arc::new(my_model))
//!     .build()?;
//!
//! let index = pipeline.build_index(&segments).await?;
//! let answer = pipeline.answer(&index, "How much lubricant does the bearing frame need?").await?;
//! ```

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{SearchResult, Segment};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::index::{IndexBuilder, SemanticIndex};
use crate::prompt::{ContextOverflow, PromptComposer};
use crate::retriever::{RetrievalPolicy, Retriever};
use crate::vectorstore::VectorIndex;

/// A generated answer together with the context it was generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// The generated text, verbatim.
    pub text: String,
    /// The retrieved chunks with their scores, most relevant first.
    pub context: Vec<SearchResult>,
    /// Set when the top chunk had to be truncated to fit the context budget.
    pub overflow: Option<ContextOverflow>,
}

/// The question-answering pipeline.
///
/// Construct one via [`AnsweringPipeline::builder()`]. All query methods take
/// `&self` and share nothing but the read-only index, so one pipeline can
/// answer many questions concurrently.
pub struct AnsweringPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    generation_provider: Arc<dyn GenerationProvider>,
    chunker: Arc<dyn Chunker>,
    retriever: Retriever,
    composer: PromptComposer,
}

impl std::fmt::Debug for AnsweringPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnsweringPipeline")
            .field("config", &self.config)
            .field("embedding_provider", &self.embedding_provider.name())
            .field("generation_provider", &self.generation_provider.name())
            .field("retriever", &self.retriever)
            .field("composer", &self.composer)
            .finish_non_exhaustive()
    }
}

impl AnsweringPipeline {
    /// Create a new [`AnsweringPipelineBuilder`].
    pub fn builder() -> AnsweringPipelineBuilder {
        AnsweringPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Chunk and embed a document, producing its index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingFailure`] or [`RagError::DimensionMismatch`]
    /// from the index build; no partial index is ever returned.
    pub async fn build_index(&self, segments: &[Segment]) -> Result<SemanticIndex> {
        let chunks = self.chunker.split(segments)?;
        info!(segment_count = segments.len(), chunk_count = chunks.len(), "chunked document");

        IndexBuilder::new(Arc::clone(&self.embedding_provider))
            .concurrency(self.config.embedding_concurrency)
            .batch_size(self.config.embedding_batch_size)
            .build(chunks)
            .await
    }

    /// Answer `query` from `index`, returning the generated text verbatim.
    ///
    /// # Errors
    ///
    /// See [`answer_detailed`](Self::answer_detailed).
    pub async fn answer(&self, index: &dyn VectorIndex, query: &str) -> Result<String> {
        self.answer_detailed(index, query).await.map(|answer| answer.text)
    }

    /// Answer `query` from `index`: retrieve → compose → generate.
    ///
    /// When nothing is retrieved the prompt carries the no-context marker so
    /// the model can decline instead of guessing.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingFailure`] if the query cannot be embedded
    /// (generation is not attempted) and [`RagError::GenerationFailure`] if
    /// the model fails. Neither is retried.
    pub async fn answer_detailed(&self, index: &dyn VectorIndex, query: &str) -> Result<Answer> {
        let context = self.retriever.retrieve_scored(index, query).await?;

        let chunks: Vec<_> = context.iter().map(|r| r.chunk.clone()).collect();
        let composition = self.composer.compose(
            &self.config.system_instructions,
            query,
            &chunks,
            self.config.max_context_length,
        );

        let generator = &self.generation_provider;
        let text = generator.generate(&composition.prompt.render()).await.map_err(|e| {
            error!(error = %e, "generation failed");
            match e {
                RagError::GenerationFailure { .. } => e,
                other => RagError::generation(generator.name(), other.to_string()),
            }
        })?;

        info!(
            retrieved = context.len(),
            included_chunks = composition.included_chunks,
            overflow = composition.overflow.is_some(),
            "answered query"
        );

        Ok(Answer { text, context, overflow: composition.overflow })
    }
}

/// Builder for constructing an [`AnsweringPipeline`].
///
/// `config`, `embedding_provider` and `generation_provider` are required.
/// Without an explicit chunker, a [`FixedSizeChunker`] is built from the
/// config's `chunk_size` and `chunk_overlap`.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = AnsweringPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .generation_provider(Arc::new(model))
///     .chunker(Arc::new(RecursiveChunker::new(1000, 200)?))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct AnsweringPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl AnsweringPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider used for both chunks and queries.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the generation provider.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`AnsweringPipeline`], validating the config and required fields.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if a required field is
    /// missing or the config fails validation.
    pub fn build(self) -> Result<AnsweringPipeline> {
        let config = self
            .config
            .ok_or_else(|| RagError::InvalidConfiguration("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::InvalidConfiguration("embedding_provider is required".to_string())
        })?;
        let generation_provider = self.generation_provider.ok_or_else(|| {
            RagError::InvalidConfiguration("generation_provider is required".to_string())
        })?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::from_config(&config)?),
        };

        let retriever =
            Retriever::new(Arc::clone(&embedding_provider), RetrievalPolicy::from_config(&config));
        let composer = PromptComposer::from_config(&config);

        Ok(AnsweringPipeline {
            config,
            embedding_provider,
            generation_provider,
            chunker,
            retriever,
            composer,
        })
    }
}

/// A pipeline bound to the index of the currently loaded document.
///
/// [`load`](Self::load) builds a new index and swaps it in under an exclusive
/// lock; [`ask`](Self::ask) takes a snapshot of the current index under a
/// shared lock, so queries never observe a half-built index and may run
/// concurrently with each other. Loads are serialized: they complete in the
/// order they were issued, so the last one issued is the one left in service.
#[derive(Debug)]
pub struct DocumentQa {
    pipeline: AnsweringPipeline,
    index: RwLock<Arc<SemanticIndex>>,
    rebuild: Mutex<()>,
}

impl DocumentQa {
    /// Wrap a pipeline with an empty index.
    pub fn new(pipeline: AnsweringPipeline) -> Self {
        Self {
            pipeline,
            index: RwLock::new(Arc::new(SemanticIndex::empty())),
            rebuild: Mutex::new(()),
        }
    }

    /// Return the underlying pipeline.
    pub fn pipeline(&self) -> &AnsweringPipeline {
        &self.pipeline
    }

    /// Return the current index.
    pub async fn index(&self) -> Arc<SemanticIndex> {
        Arc::clone(&*self.index.read().await)
    }

    /// Replace the current document with `segments`.
    ///
    /// The old index stays in service until the new one is fully built; on
    /// failure it is kept unchanged. A load issued while another is running
    /// waits for it to finish. Returns the number of indexed chunks.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`AnsweringPipeline::build_index`].
    pub async fn load(&self, segments: &[Segment]) -> Result<usize> {
        let _rebuild = self.rebuild.lock().await;
        let index = self.pipeline.build_index(segments).await?;
        let chunk_count = index.len();
        *self.index.write().await = Arc::new(index);
        Ok(chunk_count)
    }

    /// Answer a question about the loaded document.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`AnsweringPipeline::answer_detailed`].
    pub async fn ask(&self, query: &str) -> Result<Answer> {
        let index = self.index().await;
        self.pipeline.answer_detailed(&*index, query).await
    }
}
