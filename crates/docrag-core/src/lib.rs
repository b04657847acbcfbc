//! docrag-core
//!
//! Data model, error type, configuration, the embedding seam, chunking and
//! document loading shared by the other `docrag-*` crates.

pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::{ChunkingConfig, TextChunker, TextSegment};
pub use data_processor::DocumentProcessor;
pub use error::{Error, Result};
pub use loader::DocumentFormat;
pub use traits::Embedder;
pub use types::{Chunk, MetaValue, Metadata, ParsedDocument, ScoredChunk, SearchResult};
