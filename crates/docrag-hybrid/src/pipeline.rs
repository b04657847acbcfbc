use tracing::{debug, info, instrument};

use docrag_core::config::{KeywordScope, RetrievalSettings};
use docrag_core::error::{Error, Result};
use docrag_core::types::{ScoredChunk, SearchResult};
use docrag_text::keyword_search;
use docrag_vector::{cosine_similarity, VectorStore};

use crate::fusion::fuse;
use crate::query::QueryExpander;

pub const NO_DOCUMENTS_MESSAGE: &str = "No documents indexed. Run `docrag ingest <path>` first.";
pub const NO_RELEVANT_MESSAGE: &str = "I couldn't find relevant information in the documents to answer your question. \
Please try rephrasing or ask about topics covered in the indexed documents.";

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalQuery {
    pub text: String,
    pub k: usize,
    /// Semantic hits whose similarity falls below this are dropped.
    /// [`Retriever::query`] fills in the configured value.
    pub threshold: Option<f32>,
}

impl RetrievalQuery {
    pub fn new(text: impl Into<String>, k: usize) -> Self {
        Self { text: text.into(), k, threshold: None }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// What a search produced. The two empty outcomes are kept apart so callers
/// can tell "nothing matched" from "nothing to search".
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Found(Vec<SearchResult>),
    NoRelevantResults,
    NoDocumentsIndexed,
}

impl RetrievalOutcome {
    pub fn results(&self) -> &[SearchResult] {
        match self {
            Self::Found(results) => results,
            _ => &[],
        }
    }

    /// User-facing explanation for the empty outcomes.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Found(_) => None,
            Self::NoRelevantResults => Some(NO_RELEVANT_MESSAGE),
            Self::NoDocumentsIndexed => Some(NO_DOCUMENTS_MESSAGE),
        }
    }
}

/// Embed → semantic search → keyword search → fuse → threshold → top-k.
#[derive(Debug, Clone)]
pub struct Retriever {
    settings: RetrievalSettings,
    expander: Option<QueryExpander>,
}

impl Retriever {
    pub fn new(settings: RetrievalSettings) -> Result<Self> {
        settings.validate()?;
        let expander = if settings.expand_abbreviations { Some(QueryExpander::new(&settings.abbreviations)?) } else { None };
        Ok(Self { settings, expander })
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    /// A query with the configured `k` and threshold.
    pub fn query(&self, text: impl Into<String>) -> RetrievalQuery {
        RetrievalQuery { text: text.into(), k: self.settings.k, threshold: self.settings.threshold }
    }

    #[instrument(skip_all, fields(k = query.k, keyword = self.settings.keyword.enabled))]
    pub async fn search(&self, store: &VectorStore, query: &RetrievalQuery) -> Result<RetrievalOutcome> {
        if query.k == 0 {
            return Err(Error::InvalidConfig("k must be > 0".into()));
        }
        if !store.has_documents() {
            return Ok(RetrievalOutcome::NoDocumentsIndexed);
        }

        let semantic_text = match &self.expander {
            Some(expander) => expander.expand(&query.text),
            None => query.text.clone(),
        };
        if semantic_text != query.text {
            debug!(expanded = %semantic_text, "expanded query");
        }
        let query_vector = store.embed_query(&semantic_text).await?;
        let semantic = store.search_by_vector(&query_vector, query.k);

        let mut results: Vec<SearchResult> = if self.settings.keyword.enabled {
            let keyword = self.keyword_candidates(store, &semantic, &query.text, query.k);
            fuse(semantic, keyword, self.settings.alpha, self.settings.fingerprint_len)?
                .into_iter()
                .map(|fused| {
                    let similarity = fused.semantic_score.unwrap_or_else(|| {
                        cosine_similarity(&query_vector, fused.chunk.embedding.as_deref().unwrap_or_default())
                    });
                    fused.into_result(similarity)
                })
                .collect()
        } else {
            semantic
                .into_iter()
                .enumerate()
                .map(|(rank, hit)| SearchResult { semantic_rank: Some(rank), ..SearchResult::from(hit) })
                .collect()
        };

        // The threshold filters semantic hits only; keyword-only hits stay.
        let candidates = results.len();
        if let Some(threshold) = query.threshold {
            results.retain(|r| r.semantic_rank.is_none() || r.score >= threshold);
        }
        results.truncate(query.k);
        info!(candidates, returned = results.len(), "retrieval finished");

        if results.is_empty() {
            Ok(RetrievalOutcome::NoRelevantResults)
        } else {
            Ok(RetrievalOutcome::Found(results))
        }
    }

    /// Keyword hits over the configured scope, as scored chunks.
    fn keyword_candidates(&self, store: &VectorStore, semantic: &[ScoredChunk], query: &str, k: usize) -> Vec<ScoredChunk> {
        match self.settings.keyword.scope {
            KeywordScope::Store => {
                let chunks = store.chunks();
                let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
                keyword_search(query, &texts, k)
                    .into_iter()
                    .map(|m| ScoredChunk { chunk: chunks[m.index].clone(), score: m.score, position: m.index })
                    .collect()
            }
            KeywordScope::Candidates => {
                let texts: Vec<&str> = semantic.iter().map(|s| s.chunk.content.as_str()).collect();
                keyword_search(query, &texts, k)
                    .into_iter()
                    .map(|m| ScoredChunk { score: m.score, ..semantic[m.index].clone() })
                    .collect()
            }
        }
    }
}

/// `[Relevance: NN.N%] content` blocks separated by a blank line.
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("[Relevance: {:.1}%] {}", r.score * 100.0, r.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
