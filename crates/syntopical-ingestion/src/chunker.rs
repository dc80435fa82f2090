//! Fixed-window text chunker.
//!
//! Windows are measured in characters (Unicode scalar values), so a window
//! boundary never falls inside a code point.

use serde::{Deserialize, Serialize};

/// Configuration for the chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkerConfig {
    /// Distance between the starts of consecutive windows. Never zero.
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

/// Split `text` into overlapping windows.
///
/// Blank text yields no chunks. Text of at most `chunk_size` characters is a
/// single chunk. Longer text yields `ceil((n - chunk_size) / step) + 1`
/// chunks, the last one ending exactly at the end of the text.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let size = config.chunk_size.max(1);
    let step = config.step();
    let chars: Vec<char> = text.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Number of chunks [`chunk_text`] produces for `n` characters of non-blank text.
pub fn expected_chunk_count(n: usize, config: &ChunkerConfig) -> usize {
    let size = config.chunk_size.max(1);
    match n {
        0 => 0,
        n if n <= size => 1,
        n => (n - size).div_ceil(config.step()) + 1,
    }
}
