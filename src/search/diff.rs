//! Deduplication / conflict detection for new content.
//!
//! Runs read-only against all active insights before the write
//! transaction. The decision bands on the maximum similarity are pinned:
//! `> 0.90` SKIP, `0.65 ..= 0.90` REPLACE, `< 0.65` ADD.

use std::collections::HashMap;

use crate::embed::vector::cosine_similarity;
use crate::model::Insight;
use crate::search::keyword::{insight_tokens, token_jaccard, tokenize};

/// Similarity above which the new content is a duplicate and is skipped.
pub const SKIP_THRESHOLD: f64 = 0.90;
/// Similarity at or above which the prior insight is replaced.
pub const REPLACE_THRESHOLD: f64 = 0.65;
/// Cosine becomes authoritative over token overlap at this level.
pub const COSINE_AUTHORITY_THRESHOLD: f64 = 0.70;

/// What the write pipeline should do with the new content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffAction {
    Add,
    Replace,
    Skip,
}

impl DiffAction {
    /// The `action` string reported to the caller.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "added",
            Self::Replace => "replaced",
            Self::Skip => "skipped",
        }
    }
}

/// The highest-similarity prior insight backing a non-ADD decision.
#[derive(Debug, Clone)]
pub struct DiffMatch {
    pub id: String,
    pub similarity: f64,
    pub token_similarity: f64,
    pub cosine_similarity: f64,
}

/// Diff outcome: the decision plus the match that produced it.
#[derive(Debug)]
pub struct DiffOutcome {
    pub action: DiffAction,
    pub matched: Option<DiffMatch>,
}

/// Compare new content against every active insight.
///
/// Per-candidate similarity is token Jaccard, overridden by embedding
/// cosine when cosine is available, at least
/// [`COSINE_AUTHORITY_THRESHOLD`], and higher than the token score.
pub fn diff(
    insights: &[Insight],
    new_content: &str,
    new_embedding: Option<&[f64]>,
    embeddings: &HashMap<String, Vec<f64>>,
) -> DiffOutcome {
    let new_tokens = tokenize(new_content);

    let mut best: Option<DiffMatch> = None;
    for ins in insights {
        let token_sim = token_jaccard(&new_tokens, &insight_tokens(ins));

        let cosine_sim = match (new_embedding, embeddings.get(&ins.id)) {
            (Some(new_vec), Some(existing)) => cosine_similarity(new_vec, existing),
            _ => 0.0,
        };

        let mut similarity = token_sim;
        if cosine_sim >= COSINE_AUTHORITY_THRESHOLD && cosine_sim > similarity {
            similarity = cosine_sim;
        }

        let better = best
            .as_ref()
            .map(|b| similarity > b.similarity)
            .unwrap_or(true);
        if better {
            best = Some(DiffMatch {
                id: ins.id.clone(),
                similarity,
                token_similarity: token_sim,
                cosine_similarity: cosine_sim,
            });
        }
    }

    let action = match &best {
        Some(m) if m.similarity > SKIP_THRESHOLD => DiffAction::Skip,
        Some(m) if m.similarity >= REPLACE_THRESHOLD => DiffAction::Replace,
        _ => DiffAction::Add,
    };

    DiffOutcome {
        action,
        matched: if action == DiffAction::Add { None } else { best },
    }
}
