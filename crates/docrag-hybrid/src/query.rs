use regex::{NoExpand, Regex};
use std::collections::BTreeMap;

use docrag_core::error::{Error, Result};

const BUILTIN: [(&str, &str); 5] = [
    ("AI", "artificial intelligence"),
    ("ML", "machine learning"),
    ("API", "application programming interface"),
    ("CEO", "chief executive officer"),
    ("CTO", "chief technology officer"),
];

/// Appends the spelled-out form after each whole-word, case-insensitive
/// abbreviation: `"what is ai"` becomes `"what is AI artificial intelligence"`.
#[derive(Debug, Clone)]
pub struct QueryExpander {
    rules: Vec<(Regex, String)>,
}

impl QueryExpander {
    /// Built-in table with `extra` merged over it; an extra entry for a
    /// built-in abbreviation replaces its expansion.
    pub fn new(extra: &BTreeMap<String, String>) -> Result<Self> {
        let mut table: Vec<(String, String)> = BUILTIN.iter().map(|(a, f)| ((*a).to_string(), (*f).to_string())).collect();
        for (abbr, full) in extra {
            match table.iter_mut().find(|(a, _)| a.eq_ignore_ascii_case(abbr)) {
                Some(entry) => entry.1 = full.clone(),
                None => table.push((abbr.clone(), full.clone())),
            }
        }
        let rules = table
            .into_iter()
            .filter(|(abbr, _)| !abbr.trim().is_empty())
            .map(|(abbr, full)| {
                let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&abbr)))
                    .map_err(|e| Error::InvalidConfig(format!("abbreviation {abbr:?}: {e}")))?;
                Ok((pattern, format!("{abbr} {full}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn expand(&self, query: &str) -> String {
        let mut out = query.to_string();
        for (pattern, replacement) in &self.rules {
            out = pattern.replace_all(&out, NoExpand(replacement)).into_owned();
        }
        out
    }
}
