//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] — fixed character windows with an exact overlap
//! - [`RecursiveChunker`] — separator-aware splitting (paragraphs, lines, words)
//!
//! Both work on the concatenation of all segment texts, joined with
//! [`SEGMENT_SEPARATOR`], so a chunk may span several segments. Sizes and
//! offsets are counted in characters.

use std::collections::VecDeque;

use crate::config::{RagConfig, validate_chunking};
use crate::document::{Chunk, Segment};
use crate::error::Result;

/// Character inserted between consecutive non-empty segments.
pub const SEGMENT_SEPARATOR: char = '\n';

/// Separators tried by [`RecursiveChunker`], coarsest first.
const RECURSIVE_SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// A strategy for splitting ordered segments into chunks.
///
/// Implementations are pure: the same segments always produce the same chunks.
pub trait Chunker: Send + Sync {
    /// Split the segments into chunks in document order.
    ///
    /// Returns an empty `Vec` if the segments carry no text.
    fn split(&self, segments: &[Segment]) -> Result<Vec<Chunk>>;
}

/// Split segments into fixed-size chunks with an exact overlap.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`](crate::RagError::InvalidConfiguration)
/// unless `0 <= overlap < chunk_size`.
pub fn split(segments: &[Segment], chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    FixedSizeChunker::new(chunk_size, overlap)?.split(segments)
}

/// Splits text into fixed-size chunks by character count.
///
/// Each chunk after the first starts `chunk_size - chunk_overlap` characters
/// after its predecessor, so consecutive chunks share exactly `chunk_overlap`
/// characters. The last chunk may be shorter than `chunk_size`.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(1000, 200)?;
/// let chunks = chunker.split(&segments)?;
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`](crate::RagError::InvalidConfiguration)
    /// if `chunk_size` is zero or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the `chunk_size` and `chunk_overlap` of a config.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, segments: &[Segment]) -> Result<Vec<Chunk>> {
        let text = DocumentText::from_segments(segments);
        let total = text.len();
        let step = self.chunk_size - self.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let end = (start + self.chunk_size).min(total);
            chunks.push(text.chunk(chunks.len(), start, end));
            if end == total {
                break;
            }
            start += step;
        }

        Ok(chunks)
    }
}

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// Text is first cut at the coarsest separator that yields pieces no longer
/// than `chunk_size`, falling back to finer separators for oversized pieces.
/// Pieces are then merged greedily into chunks; each new chunk begins with
/// the trailing pieces of the previous one that fit within `chunk_overlap`.
/// Separators stay attached to the piece they end, so every chunk is an exact
/// span of the source text.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.split(&segments)?;
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`](crate::RagError::InvalidConfiguration)
    /// if `chunk_size` is zero or `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the `chunk_size` and `chunk_overlap` of a config.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, segments: &[Segment]) -> Result<Vec<Chunk>> {
        let text = DocumentText::from_segments(segments);
        if text.chars.is_empty() {
            return Ok(Vec::new());
        }

        let mut pieces = Vec::new();
        atomize(&text.chars, 0, text.len(), self.chunk_size, &RECURSIVE_SEPARATORS, &mut pieces);

        let mut chunks = Vec::new();
        let mut window: VecDeque<(usize, usize)> = VecDeque::new();

        for piece in pieces {
            if let Some(&(front, _)) = window.front() {
                if piece.1 - front > self.chunk_size {
                    let back = window.back().map_or(front, |p| p.1);
                    chunks.push(text.chunk(chunks.len(), front, back));

                    // Keep a tail of the emitted chunk as overlap, as long as
                    // it stays within the overlap and leaves room for `piece`.
                    while let Some(&(start, _)) = window.front() {
                        if back - start > self.chunk_overlap || piece.1 - start > self.chunk_size {
                            window.pop_front();
                        } else {
                            break;
                        }
                    }
                }
            }
            window.push_back(piece);
        }

        if let (Some(&(start, _)), Some(&(_, end))) = (window.front(), window.back()) {
            chunks.push(text.chunk(chunks.len(), start, end));
        }

        Ok(chunks)
    }
}

/// Cut `chars[start..end]` into contiguous pieces of at most `chunk_size`.
fn atomize(
    chars: &[char],
    start: usize,
    end: usize,
    chunk_size: usize,
    separators: &[&str],
    pieces: &mut Vec<(usize, usize)>,
) {
    if end - start <= chunk_size {
        pieces.push((start, end));
        return;
    }

    let Some((separator, finer)) = separators.split_first() else {
        let mut from = start;
        while from < end {
            let to = (from + chunk_size).min(end);
            pieces.push((from, to));
            from = to;
        }
        return;
    };

    let separator: Vec<char> = separator.chars().collect();
    let mut parts = Vec::new();
    let mut part_start = start;
    let mut i = start;
    while i + separator.len() <= end {
        if chars[i..i + separator.len()] == separator[..] {
            i += separator.len();
            parts.push((part_start, i));
            part_start = i;
        } else {
            i += 1;
        }
    }
    if part_start < end {
        parts.push((part_start, end));
    }

    if parts.len() <= 1 {
        atomize(chars, start, end, chunk_size, finer, pieces);
        return;
    }

    for (from, to) in parts {
        atomize(chars, from, to, chunk_size, finer, pieces);
    }
}

/// The concatenated text of a document with a map back to its segments.
struct DocumentText<'a> {
    chars: Vec<char>,
    spans: Vec<SegmentSpan<'a>>,
}

/// The character range a segment occupies, including its trailing separator.
struct SegmentSpan<'a> {
    start: usize,
    end: usize,
    segment: &'a Segment,
}

impl<'a> DocumentText<'a> {
    fn from_segments(segments: &'a [Segment]) -> Self {
        let mut chars = Vec::new();
        let mut spans: Vec<SegmentSpan<'a>> = Vec::new();

        for segment in segments.iter().filter(|s| !s.text.is_empty()) {
            if let Some(previous) = spans.last_mut() {
                chars.push(SEGMENT_SEPARATOR);
                previous.end += 1;
            }
            let start = chars.len();
            chars.extend(segment.text.chars());
            spans.push(SegmentSpan { start, end: chars.len(), segment });
        }

        Self { chars, spans }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn chunk(&self, index: usize, start: usize, end: usize) -> Chunk {
        let mut origin_segment_ids: Vec<u32> = Vec::new();
        let mut metadata = None;
        for span in self.spans.iter().filter(|s| s.start < end && start < s.end) {
            if metadata.is_none() {
                metadata = Some(span.segment.metadata.clone());
            }
            if !origin_segment_ids.contains(&span.segment.source_position) {
                origin_segment_ids.push(span.segment.source_position);
            }
        }

        let mut metadata = metadata.unwrap_or_default();
        metadata.insert("chunk_index".to_string(), index.to_string());

        Chunk {
            index,
            text: self.chars[start..end].iter().collect(),
            origin_segment_ids,
            start_offset: start,
            length: end - start,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_joined_with_separator() {
        let segments = [Segment::new("ab", 1), Segment::new("", 2), Segment::new("cd", 3)];
        let text = DocumentText::from_segments(&segments);
        assert_eq!(text.chars.iter().collect::<String>(), "ab\ncd");
        assert_eq!(text.spans.len(), 2);
        assert_eq!((text.spans[0].start, text.spans[0].end), (0, 3));
        assert_eq!((text.spans[1].start, text.spans[1].end), (3, 5));
    }

    #[test]
    fn atomize_prefers_coarse_separators() {
        let chars: Vec<char> = "aaaa bbbb\n\ncccc".chars().collect();
        let mut pieces = Vec::new();
        atomize(&chars, 0, chars.len(), 11, &RECURSIVE_SEPARATORS, &mut pieces);
        assert_eq!(pieces, vec![(0, 11), (11, 15)]);
    }

    #[test]
    fn atomize_falls_back_to_fixed_windows() {
        let chars: Vec<char> = "abcdefghij".chars().collect();
        let mut pieces = Vec::new();
        atomize(&chars, 0, chars.len(), 4, &RECURSIVE_SEPARATORS, &mut pieces);
        assert_eq!(pieces, vec![(0, 4), (4, 8), (8, 10)]);
    }
}
