use tracing::debug;

/// A scored candidate. `index` points into the slice passed to [`keyword_search`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordMatch {
    pub index: usize,
    pub score: f32,
}

/// Distinct lower-cased whitespace terms of `query`, in first-seen order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in query.to_lowercase().split_whitespace() {
        if !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    }
    terms
}

/// Score each text as distinct query terms found (as substrings) over the
/// query's total term count, repeats included. Zero scores are dropped and
/// the best `k` kept; ties keep input order.
pub fn keyword_search<S: AsRef<str>>(query: &str, texts: &[S], k: usize) -> Vec<KeywordMatch> {
    let terms = query_terms(query);
    if terms.is_empty() || k == 0 {
        return Vec::new();
    }
    let total = query.split_whitespace().count() as f32;
    let mut matches: Vec<KeywordMatch> = texts
        .iter()
        .enumerate()
        .filter_map(|(index, text)| {
            let haystack = text.as_ref().to_lowercase();
            let found = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
            (found > 0).then(|| KeywordMatch { index, score: found as f32 / total })
        })
        .collect();
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(k);
    debug!(terms = terms.len(), candidates = texts.len(), hits = matches.len(), "keyword search");
    matches
}
