//! Domain types shared by the chunker, the store and the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar metadata value. Opaque to the core beyond pass-through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for MetaValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<usize> for MetaValue {
    fn from(i: usize) -> Self {
        Self::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetaValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

/// Ordered so that persisted records serialize deterministically.
pub type Metadata = BTreeMap<String, MetaValue>;

/// The atomic retrievable unit.
///
/// - `content`: normalized, non-empty text span
/// - `metadata`: source path, chunk index/length and loader fields
/// - `embedding`: present once indexed; every chunk in a store shares one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), metadata: Metadata::new(), embedding: None }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Content-prefix identity used to match a chunk across result lists.
    pub fn fingerprint(&self, len: usize) -> &str {
        match self.content.char_indices().nth(len) {
            Some((byte, _)) => &self.content[..byte],
            None => &self.content,
        }
    }
}

/// A chunk with its semantic similarity to a query, plus its position in the
/// store it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub position: usize,
}

/// The caller-facing result record.
///
/// `score` is always the cosine similarity to the query. `combined_score` is
/// the fused ranking value, present only when keyword fusion ran; it has no
/// fixed bound and only orders results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    pub metadata: Metadata,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_rank: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_rank: Option<usize>,
}

impl From<ScoredChunk> for SearchResult {
    fn from(s: ScoredChunk) -> Self {
        Self {
            content: s.chunk.content,
            metadata: s.chunk.metadata,
            score: s.score,
            combined_score: None,
            semantic_rank: None,
            keyword_rank: None,
        }
    }
}

/// Output of a document loader before chunking.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub text: String,
    pub metadata: Metadata,
}
