//! Recursive separator-based chunking.
//!
//! Text is first cut into atomic pieces: a span that fits `chunk_size` is kept
//! whole, a longer one is split on the coarsest separator it contains (the
//! separator stays attached to the end of the left piece) and each oversized
//! part is retried with the finer separators. The empty separator means a
//! hard per-character split. Pieces are then merged greedily into chunks, and
//! every new chunk starts with the trailing pieces of the previous one that fit
//! in `chunk_overlap`.
//!
//! Lengths are counted in characters. No character is dropped: consecutive
//! segments are contiguous spans of the input whose only shared text is the
//! overlap window.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Tried in order, coarsest first.
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 150,
            separators: ["\n\n", "\n", ". ", " ", ""].iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.separators.is_empty() {
            return Err(Error::InvalidConfig("separators must not be empty".into()));
        }
        Ok(())
    }
}

/// A contiguous span of the source text. `start`/`end` are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl TextSegment {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    /// Fails fast on an invalid configuration (e.g. overlap >= size).
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split `text` into ordered, overlapping segments.
    pub fn split(&self, text: &str) -> Vec<TextSegment> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut pieces = Vec::new();
        self.collect_pieces(text, 0, text.len(), &self.config.separators, &mut pieces);
        self.merge(text, &pieces)
    }

    fn collect_pieces(&self, text: &str, start: usize, end: usize, separators: &[String], out: &mut Vec<Piece>) {
        let slice = &text[start..end];
        let chars = slice.chars().count();
        if chars <= self.config.chunk_size {
            out.push(Piece { start, end, chars });
            return;
        }
        let Some(level) = separators.iter().position(|s| s.is_empty() || slice.contains(s.as_str())) else {
            // No finer separator applies: emit the oversized unit whole.
            out.push(Piece { start, end, chars });
            return;
        };
        let separator = separators[level].as_str();
        let finer = &separators[level + 1..];

        if separator.is_empty() {
            for (offset, ch) in slice.char_indices() {
                let s = start + offset;
                out.push(Piece { start: s, end: s + ch.len_utf8(), chars: 1 });
            }
            return;
        }

        let mut cursor = start;
        for (idx, matched) in slice.match_indices(separator) {
            let split_end = start + idx + matched.len();
            if split_end > cursor {
                self.collect_pieces(text, cursor, split_end, finer, out);
                cursor = split_end;
            }
        }
        if cursor < end {
            self.collect_pieces(text, cursor, end, finer, out);
        }
    }

    fn merge(&self, text: &str, pieces: &[Piece]) -> Vec<TextSegment> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let mut segments = Vec::new();
        let mut window: VecDeque<Piece> = VecDeque::new();
        let mut window_chars = 0usize;

        for piece in pieces {
            if !window.is_empty() && window_chars + piece.chars > size {
                segments.push(Self::segment(text, &window));
                while window_chars > overlap || (window_chars > 0 && window_chars + piece.chars > size) {
                    match window.pop_front() {
                        Some(front) => window_chars -= front.chars,
                        None => break,
                    }
                }
            }
            window_chars += piece.chars;
            window.push_back(*piece);
        }
        if !window.is_empty() {
            segments.push(Self::segment(text, &window));
        }
        segments
    }

    fn segment(text: &str, window: &VecDeque<Piece>) -> TextSegment {
        let start = window.front().map_or(0, |p| p.start);
        let end = window.back().map_or(start, |p| p.end);
        TextSegment { text: text[start..end].to_string(), start, end }
    }
}

/// Rebuild the source text from ordered segments by dropping each segment's
/// overlap with its predecessor.
pub fn reassemble(segments: &[TextSegment]) -> String {
    let mut out = String::new();
    let mut covered = 0usize;
    for (i, seg) in segments.iter().enumerate() {
        if i == 0 {
            out.push_str(&seg.text);
        } else {
            let skip = covered.saturating_sub(seg.start).min(seg.text.len());
            out.push_str(&seg.text[skip..]);
        }
        covered = seg.end;
    }
    out
}
