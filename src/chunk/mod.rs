//! Text chunking
//!
//! This module splits document text into ordered chunks that:
//! - Never exceed the configured character budget
//! - Prefer paragraph, line, sentence and word boundaries near the budget
//! - Are deterministic for a given text and configuration
//!
//! Lengths are counted in characters, not bytes.

mod boundaries;

pub use boundaries::*;

use blake3::Hasher;

/// A text chunk with its position in the source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk text, untrimmed
    pub text: String,

    /// Chunk index (0-based, consecutive)
    pub index: usize,

    /// Character start position in original document
    pub char_start: usize,

    /// Character end position in original document (exclusive)
    pub char_end: usize,
}

/// Blake3 hex digest of a document's full text
pub fn compute_content_hash(text: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// With `overlap_chars == 0` consecutive chunks are contiguous, so joining
/// them reproduces the text minus any whitespace-only stretches. Chunks that
/// are entirely whitespace are skipped without consuming an index.
pub fn split_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<TextChunk> {
    let max = max_chars.max(1);
    let overlap = overlap_chars.min(max - 1);

    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let break_points = find_break_points(&chars);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < n {
        let hard_end = (start + max).min(n);
        let end = if hard_end == n {
            n
        } else {
            let window_start = start + (max * 4 / 5).max(1);
            best_break(&break_points, window_start, hard_end).unwrap_or(hard_end)
        };

        let slice = &text[offsets[start]..offsets[end]];
        if !slice.trim().is_empty() {
            chunks.push(TextChunk {
                text: slice.to_string(),
                index: chunks.len(),
                char_start: start,
                char_end: end,
            });
        }

        if end >= n {
            break;
        }

        start = if overlap > 0 {
            (end - overlap).max(start + 1)
        } else {
            end
        };
    }

    chunks
}
