//! # docqa-rag
//!
//! Retrieval-augmented question answering over one long technical document.
//!
//! ## Overview
//!
//! A document arrives as ordered [`Segment`]s (pages, sections). It is split
//! into overlapping [`Chunk`]s, every chunk is embedded once into a
//! [`SemanticIndex`], and each question is answered by retrieving the most
//! similar chunks, composing them into a bounded prompt and handing that
//! prompt to a generation model.
//!
//! Embedding and generation are external capabilities behind the
//! [`EmbeddingProvider`] and [`GenerationProvider`] traits. An Ollama
//! implementation of both is available with the `ollama` feature.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{AnsweringPipeline, RagConfig, Segment};
//!
//! let pipeline = AnsweringPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .generation_provider(Arc::new(my_model))
//!     .build()?;
//!
//! let segments = [Segment::new("The pump requires 5 liters of lubricant.", 1)];
//! let index = pipeline.build_index(&segments).await?;
//! let answer = pipeline.answer(&index, "How much lubricant?").await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, split};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, IndexEntry, SearchResult, Segment};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::GenerationProvider;
pub use index::{IndexBuilder, SemanticIndex, cosine_similarity};
pub use pipeline::{Answer, AnsweringPipeline, AnsweringPipelineBuilder, DocumentQa};
pub use prompt::{Composition, ContextOverflow, Prompt, PromptComposer};
pub use retriever::{RetrievalPolicy, Retriever};
pub use vectorstore::VectorIndex;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaEmbeddingProvider, OllamaGenerationProvider};
