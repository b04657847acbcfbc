//! docrag-hybrid
//!
//! Semantic + keyword retrieval over a [`docrag_vector::VectorStore`]: query
//! preprocessing, rank-and-score fusion, relevance filtering, and the
//! [`RagEngine`] facade that ties ingestion and search together.
pub mod engine;
pub mod fusion;
pub mod pipeline;
pub mod quality;
pub mod query;

pub use engine::RagEngine;
pub use fusion::{fuse, FusedChunk};
pub use pipeline::{format_context, RetrievalOutcome, RetrievalQuery, Retriever};
pub use quality::{evaluate_response, QualityReport};
pub use query::QueryExpander;
