//! Data types for segments, chunks, index entries and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A unit of text produced by document ingestion, such as one page of a PDF.
///
/// Segments are consumed in the order they are given, which is taken to be
/// document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    /// The text content of the segment.
    pub text: String,
    /// Position of the segment in its source, e.g. a page number.
    pub source_position: u32,
    /// Key-value metadata supplied by ingestion.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Segment {
    /// Create a segment without metadata.
    pub fn new(text: impl Into<String>, source_position: u32) -> Self {
        Self { text: text.into(), source_position, metadata: HashMap::new() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A bounded slice of document text, the unit of retrieval.
///
/// Offsets and lengths count characters of the concatenated document text,
/// not bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Ordinal of the chunk within its document.
    pub index: usize,
    /// The text content of the chunk.
    pub text: String,
    /// `source_position` of every segment the chunk draws text from, in order.
    pub origin_segment_ids: Vec<u32>,
    /// Character offset of the chunk start in the concatenated document text.
    pub start_offset: usize,
    /// Number of characters in the chunk.
    pub length: usize,
    /// Metadata of the first origin segment plus a `chunk_index` field.
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Character offset one past the end of the chunk.
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.length
    }
}

/// A [`Chunk`] with its vector embedding, as stored by the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// The indexed chunk.
    pub chunk: Chunk,
    /// The embedding of the chunk text.
    pub vector: Vec<f32>,
}

/// A retrieved [`Chunk`] paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity in `[-1, 1]` (higher is more relevant).
    pub score: f32,
}
