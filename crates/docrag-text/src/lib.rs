//! docrag-text
//!
//! Lexical keyword scoring: the coarse recall signal fused with the semantic
//! ranking to catch exact terms (names, codes, identifiers) an embedding can miss.
pub mod search;

pub use search::{keyword_search, query_terms, KeywordMatch};
