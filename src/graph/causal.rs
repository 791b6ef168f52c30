//! Causal edge creation and causal candidate discovery.

use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::LazyLock;

use crate::error::Result;
use crate::graph::bfs::{bfs, BfsOptions};
use crate::model::{CausalKind, Edge, EdgeMetadata, EdgeType, Insight};
use crate::search::keyword::{token_overlap_of_smaller, tokenize};
use crate::store::edge;
use crate::store::insight as insight_store;

/// Minimum token overlap (relative to the smaller set) for a causal link.
pub const MIN_CAUSAL_OVERLAP: f64 = 0.15;
/// How many recent insights the builder scans.
pub const CAUSAL_LOOKBACK: usize = 10;
/// Cap on surfaced causal candidates.
pub const MAX_CAUSAL_CANDIDATES: usize = 10;

static CAUSAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(because|therefore|due to|caused by|as a result|decided to|chosen because|so that|in order to|leads to|results in|enables|prevents|consequently|hence|thus)\b|\bthis (ensures|means)\b",
    )
    .expect("valid regex")
});
static ENABLES_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(so that|in order to|enables|leads to)\b").expect("valid regex")
});
static PREVENTS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(despite|prevented|prevents|blocked)\b").expect("valid regex")
});

/// Whether the text carries any causal keyword.
pub fn has_causal_signal(text: &str) -> bool {
    CAUSAL_PATTERN.is_match(text)
}

/// The first matching causal keyword, if any.
pub fn find_causal_signal(text: &str) -> Option<String> {
    CAUSAL_PATTERN
        .find(text)
        .map(|m| m.as_str().to_lowercase())
}

/// Guess the causal sub-type from content text.
pub fn suggest_sub_type(text: &str) -> CausalKind {
    if PREVENTS_PATTERN.is_match(text) {
        CausalKind::Prevents
    } else if ENABLES_PATTERN.is_match(text) {
        CausalKind::Enables
    } else {
        CausalKind::Causes
    }
}

/// Create causal edges between the new insight and recent insights that
/// share token overlap and carry a causal signal.
///
/// Direction: a keyword in the new insight stores `new → candidate` (the
/// candidate is the cause); a keyword only in the candidate stores
/// `candidate → new`. Weight is the overlap ratio.
pub fn create_causal_edges(conn: &Connection, insight: &Insight) -> Result<usize> {
    let recent = insight_store::get_recent_active(conn, &insight.id, CAUSAL_LOOKBACK)?;
    if recent.is_empty() {
        return Ok(0);
    }

    let new_tokens = tokenize(&insight.content);
    if new_tokens.is_empty() {
        return Ok(0);
    }
    let new_signal = find_causal_signal(&insight.content);

    let mut count = 0;
    for prev in recent {
        let prev_signal = find_causal_signal(&prev.content);
        if new_signal.is_none() && prev_signal.is_none() {
            continue;
        }

        let prev_tokens = tokenize(&prev.content);
        let overlap = token_overlap_of_smaller(&new_tokens, &prev_tokens);
        if overlap < MIN_CAUSAL_OVERLAP {
            continue;
        }

        let (source_id, target_id) = if new_signal.is_some() {
            (insight.id.clone(), prev.id.clone())
        } else {
            (prev.id.clone(), insight.id.clone())
        };

        let reason = new_signal
            .clone()
            .or(prev_signal)
            .unwrap_or_default();
        let combined = format!("{} {}", insight.content, prev.content);
        let metadata = EdgeMetadata::Causal {
            sub_type: suggest_sub_type(&combined),
            reason,
        };

        edge::insert_edge(
            conn,
            &Edge::new(source_id, target_id, EdgeType::Causal, overlap, metadata),
        )?;
        count += 1;
    }

    Ok(count)
}

/// A surfaced causal candidate from the 2-hop neighborhood.
#[derive(Debug, Serialize)]
pub struct CausalCandidate {
    pub id: String,
    pub content: String,
    pub category: String,
    pub hop: usize,
    pub via_edge: String,
    pub causal_signal: String,
    pub suggested_sub_type: String,
}

/// Surface insights with potential causal relationships: BFS up to 2 hops
/// over any edge type, retaining nodes that pass the same overlap and
/// keyword test as the edge builder, capped at [`MAX_CAUSAL_CANDIDATES`].
pub fn find_causal_candidates(conn: &Connection, insight: &Insight) -> Result<Vec<CausalCandidate>> {
    let nodes = bfs(
        conn,
        &insight.id,
        &BfsOptions {
            max_depth: 2,
            max_nodes: 0,
            edge_filter: None,
        },
    )?;
    if nodes.is_empty() {
        return Ok(Vec::new());
    }

    let new_tokens = tokenize(&insight.content);
    let new_signal = find_causal_signal(&insight.content);

    let mut candidates = Vec::new();
    for node in nodes {
        if candidates.len() >= MAX_CAUSAL_CANDIDATES {
            break;
        }
        let node_signal = find_causal_signal(&node.insight.content);
        if new_signal.is_none() && node_signal.is_none() {
            continue;
        }
        let overlap = token_overlap_of_smaller(&new_tokens, &tokenize(&node.insight.content));
        if overlap < MIN_CAUSAL_OVERLAP {
            continue;
        }

        let signal = node_signal.or_else(|| new_signal.clone()).unwrap_or_default();
        let combined = format!("{} {}", insight.content, node.insight.content);
        candidates.push(CausalCandidate {
            id: node.insight.id.clone(),
            content: node.insight.content.clone(),
            category: node.insight.category.as_str().to_string(),
            hop: node.hop,
            via_edge: node.via_edge.as_str().to_string(),
            causal_signal: signal,
            suggested_sub_type: suggest_sub_type(&combined).as_str().to_string(),
        });
    }

    Ok(candidates)
}
