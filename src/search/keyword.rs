//! Token-based keyword search and content similarity.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::model::Insight;

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has",
        "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
        "shall", "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as",
        "into", "about", "that", "this", "it", "its", "or", "and", "but", "if", "not", "no",
        "so", "up", "out", "than", "then", "too", "very", "just", "also", "more", "some",
        "any", "all", "each", "i", "me", "my", "we", "you", "your", "he", "she", "they",
        "them", "his", "her", "our", "their", "what", "which", "who", "how", "when", "where",
    ]
    .into_iter()
    .collect()
});

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9]+").expect("valid regex"));

/// Split text into lowercase tokens with stopword filtering.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .filter(|w| !STOPWORDS.contains(w.as_str()))
        .collect()
}

/// Combined token set from content, tags, and entities.
pub fn insight_tokens(ins: &Insight) -> HashSet<String> {
    let mut tokens = tokenize(&ins.content);
    for tag in &ins.tags {
        tokens.extend(tokenize(tag));
    }
    for entity in &ins.entities {
        tokens.extend(tokenize(entity));
    }
    tokens
}

/// Score insights by token overlap with the query: `|q ∩ c| / |q|`.
///
/// Returns `(insight, score)` pairs sorted by score descending with
/// importance as tie-break, truncated to `limit` (0 = unlimited).
pub fn keyword_search<'a>(
    insights: &'a [Insight],
    query: &str,
    limit: usize,
) -> Vec<(&'a Insight, f64)> {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&Insight, f64)> = insights
        .iter()
        .filter_map(|ins| {
            let content_tokens = insight_tokens(ins);
            let intersection = query_tokens
                .iter()
                .filter(|t| content_tokens.contains(*t))
                .count();
            if intersection == 0 {
                return None;
            }
            Some((ins, intersection as f64 / query_tokens.len() as f64))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.0.importance.cmp(&a.0.importance))
            .then(a.0.id.cmp(&b.0.id))
    });
    if limit > 0 && scored.len() > limit {
        scored.truncate(limit);
    }
    scored
}

/// Jaccard similarity over token sets: `|a ∩ b| / |a ∪ b|`.
pub fn content_similarity(a: &str, b: &str) -> f64 {
    let tok_a = tokenize(a);
    let tok_b = tokenize(b);
    token_jaccard(&tok_a, &tok_b)
}

/// Jaccard similarity over pre-computed token sets.
pub fn token_jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.iter().filter(|t| b.contains(*t)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Overlap relative to the smaller set: `|a ∩ b| / min(|a|, |b|)`.
///
/// Used by the causal builder, where a short insight referencing a longer
/// one should still clear the bar.
pub fn token_overlap_of_smaller(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.iter().filter(|t| b.contains(*t)).count();
    intersection as f64 / a.len().min(b.len()) as f64
}
