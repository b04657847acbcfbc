//! Cheap heuristics for judging an answer against the context it was given.
//! All scores lie in `[0, 1]`; empty inputs score 0.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityReport {
    pub context_relevance: f32,
    pub response_completeness: f32,
    pub factual_support: f32,
}

pub fn evaluate_response(query: &str, context: &str, response: &str) -> QualityReport {
    QualityReport {
        context_relevance: context_relevance(query, context),
        response_completeness: response_completeness(query, response),
        factual_support: factual_support(context, response),
    }
}

/// Share of query terms that contain, or are contained in, some context term.
pub fn context_relevance(query: &str, context: &str) -> f32 {
    let query = query.to_lowercase();
    let context = context.to_lowercase();
    let query_terms: Vec<&str> = query.split_whitespace().collect();
    let context_terms: Vec<&str> = context.split_whitespace().collect();
    if query_terms.is_empty() {
        return 0.0;
    }
    let overlap = query_terms
        .iter()
        .filter(|q| context_terms.iter().any(|c| c.contains(*q) || q.contains(c)))
        .count();
    overlap as f32 / query_terms.len() as f32
}

/// Response length against `min(3 * query length, 500)` characters, capped at 1.
pub fn response_completeness(query: &str, response: &str) -> f32 {
    let expected = (query.chars().count() * 3).min(500);
    if expected == 0 {
        return 0.0;
    }
    (response.chars().count() as f32 / expected as f32).min(1.0)
}

/// Share of response words that occur in the context; words under four
/// characters always count as supported.
pub fn factual_support(context: &str, response: &str) -> f32 {
    let context = context.to_lowercase();
    let response = response.to_lowercase();
    let context_words: std::collections::HashSet<&str> = context.split_whitespace().collect();
    let response_words: Vec<&str> = response.split_whitespace().collect();
    if response_words.is_empty() {
        return 0.0;
    }
    let supported = response_words
        .iter()
        .filter(|w| w.chars().count() < 4 || context_words.contains(*w))
        .count();
    supported as f32 / response_words.len() as f32
}
