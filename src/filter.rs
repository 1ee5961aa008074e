//! Relevance filter: keyword/hashtag matching over inbound post text.
//!
//! Pure functions, no IO. The batch runner feeds the result into the post
//! lifecycle (`filtered_in` / `filtered_out`).

use std::collections::BTreeSet;

/// Outcome of scoring one post against the term catalogs.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    /// True when at least one term matched.
    pub matched: bool,
    /// Fraction of distinct catalog terms found in the text, in [0, 1].
    pub relevance_score: f64,
    /// Distinct matched terms, sorted for deterministic output.
    pub matches: Vec<String>,
}

impl FilterResult {
    fn no_match() -> Self {
        Self {
            matched: false,
            relevance_score: 0.0,
            matches: Vec::new(),
        }
    }
}

/// Score `text` against the union of `keywords` and `hashtags`.
///
/// Matching is case-insensitive substring containment. Terms are
/// deduplicated after lower-casing, so the score denominator counts each
/// distinct term once.
pub fn evaluate_relevance(text: &str, keywords: &[String], hashtags: &[String]) -> FilterResult {
    let lowered = text.to_lowercase();

    let terms: BTreeSet<String> = keywords
        .iter()
        .chain(hashtags.iter())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if terms.is_empty() {
        return FilterResult::no_match();
    }

    let matches: Vec<String> = terms
        .iter()
        .filter(|term| lowered.contains(term.as_str()))
        .cloned()
        .collect();

    let score = matches.len() as f64 / terms.len().max(1) as f64;

    FilterResult {
        matched: !matches.is_empty(),
        relevance_score: score.min(1.0),
        matches,
    }
}
