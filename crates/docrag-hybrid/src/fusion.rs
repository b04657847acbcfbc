//! Rank-and-score fusion of a semantic and a keyword result list.
//!
//! Items are matched across lists by their content fingerprint. Each fused
//! item scores `alpha * semantic + (1 - alpha) * keyword`, where a list the
//! item is missing from contributes nothing and leaves its rank `None`.

use std::collections::HashMap;
use tracing::debug;

use docrag_core::config::validate_alpha;
use docrag_core::error::Result;
use docrag_core::types::{Chunk, ScoredChunk, SearchResult};

#[derive(Debug, Clone, PartialEq)]
pub struct FusedChunk {
    pub chunk: Chunk,
    /// Zero-based position in the semantic list; `None` when absent from it.
    pub semantic_rank: Option<usize>,
    pub keyword_rank: Option<usize>,
    pub semantic_score: Option<f32>,
    pub keyword_score: Option<f32>,
    pub combined_score: f32,
}

impl FusedChunk {
    /// Caller-facing record. `similarity` is reported as the score: the
    /// semantic score when the chunk came from semantic search, otherwise its
    /// cosine similarity computed by the caller.
    pub fn into_result(self, similarity: f32) -> SearchResult {
        SearchResult {
            content: self.chunk.content,
            metadata: self.chunk.metadata,
            score: similarity,
            combined_score: Some(self.combined_score),
            semantic_rank: self.semantic_rank,
            keyword_rank: self.keyword_rank,
        }
    }
}

/// Fuse two ranked lists, best combined score first.
///
/// Equal combined scores keep union order: semantic entries in their order,
/// then keyword-only entries in theirs. A fingerprint repeated inside one
/// list keeps its first occurrence. Fails on `alpha` outside `[0, 1]`.
pub fn fuse(semantic: Vec<ScoredChunk>, keyword: Vec<ScoredChunk>, alpha: f32, fingerprint_len: usize) -> Result<Vec<FusedChunk>> {
    validate_alpha(alpha)?;
    let (semantic_len, keyword_len) = (semantic.len(), keyword.len());
    let mut fused: Vec<FusedChunk> = Vec::with_capacity(semantic_len + keyword_len);
    let mut by_fingerprint: HashMap<String, usize> = HashMap::new();

    for (rank, hit) in semantic.into_iter().enumerate() {
        let fingerprint = hit.chunk.fingerprint(fingerprint_len).to_string();
        if by_fingerprint.contains_key(&fingerprint) {
            continue;
        }
        by_fingerprint.insert(fingerprint, fused.len());
        fused.push(FusedChunk {
            combined_score: alpha * hit.score,
            chunk: hit.chunk,
            semantic_rank: Some(rank),
            keyword_rank: None,
            semantic_score: Some(hit.score),
            keyword_score: None,
        });
    }

    for (rank, hit) in keyword.into_iter().enumerate() {
        let fingerprint = hit.chunk.fingerprint(fingerprint_len).to_string();
        let contribution = (1.0 - alpha) * hit.score;
        match by_fingerprint.get(&fingerprint).copied() {
            Some(slot) => {
                let entry = &mut fused[slot];
                if entry.keyword_rank.is_none() {
                    entry.keyword_rank = Some(rank);
                    entry.keyword_score = Some(hit.score);
                    entry.combined_score += contribution;
                }
            }
            None => {
                by_fingerprint.insert(fingerprint, fused.len());
                fused.push(FusedChunk {
                    chunk: hit.chunk,
                    semantic_rank: None,
                    keyword_rank: Some(rank),
                    semantic_score: None,
                    keyword_score: Some(hit.score),
                    combined_score: contribution,
                });
            }
        }
    }

    fused.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    debug!(semantic = semantic_len, keyword = keyword_len, fused = fused.len(), alpha, "fused result lists");
    Ok(fused)
}
