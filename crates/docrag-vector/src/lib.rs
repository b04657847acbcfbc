//! docrag-vector
//!
//! In-memory vector store with exhaustive cosine ranking and atomic JSON
//! persistence. Sized for a single local collection of a few thousand chunks.
pub mod persist;
pub mod similarity;
pub mod store;

pub use similarity::cosine_similarity;
pub use store::VectorStore;
