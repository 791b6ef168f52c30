//! The write pipeline — dedup diff, atomic insert with edge synthesis and
//! retention bookkeeping, then post-commit candidate surfacing.
//!
//! [`remember`] is the single entry point. Everything between the
//! soft-delete of a replaced insight and the oplog append runs in one
//! transaction; the observable post-commit state is all of it or none.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::embed::vector::serialize_vector;
use crate::embed::{try_embed, EmbeddingProvider};
use crate::error::Result;
use crate::graph::causal::{find_causal_candidates, CausalCandidate};
use crate::graph::semantic::{build_embed_cache, find_semantic_candidates, SemanticCandidate};
use crate::graph::{entity, synthesize_edges, EdgeStats};
use crate::model::{format_timestamp, Category, Insight, InsightSource};
use crate::search::diff::{diff, DiffAction};
use crate::search::quality::check_content_quality;
use crate::store::insight::{
    auto_prune, get_all_active_insights, insert_insight, refresh_all_effective_importance,
    soft_delete_insight, MAX_INSIGHTS,
};
use crate::store::oplog::log_op;

/// Inputs for one remember call.
pub struct RememberRequest {
    pub content: String,
    pub category: Category,
    pub importance: i32,
    pub tags: Vec<String>,
    pub entities: Vec<String>,
    pub source: InsightSource,
    /// Bypass the dedup/conflict phase entirely.
    pub no_diff: bool,
}

/// The single JSON object a successful remember emits.
#[derive(Debug, Serialize)]
pub struct RememberOutput {
    pub id: String,
    pub content: String,
    pub category: Category,
    pub importance: i32,
    pub tags: Vec<String>,
    pub entities: Vec<String>,
    pub action: &'static str,
    pub created_at: String,
    pub edges_created: EdgeStats,
    pub semantic_candidates: Vec<SemanticCandidate>,
    pub causal_candidates: Vec<CausalCandidate>,
    pub quality_warnings: Vec<String>,
    pub embedded: bool,
    pub effective_importance: f64,
    pub auto_pruned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaced_id: Option<String>,
}

/// Store a new insight.
///
/// Pipeline order: validate → embed (best effort) → diff → transaction
/// (soft-delete on REPLACE, insert, edge synthesis, EI refresh over all
/// active insights, bounded auto-prune, oplog) → candidate surfacing.
pub fn remember(
    conn: &mut Connection,
    provider: &dyn EmbeddingProvider,
    req: RememberRequest,
) -> Result<RememberOutput> {
    let mut insight = Insight::new(
        req.content,
        req.category,
        req.importance,
        req.tags,
        req.entities,
        req.source,
    );
    insight.validate()?;

    // Merge caller-provided entities with extracted ones (cap applies)
    let extracted = entity::extract_entities(&insight.content);
    insight.entities = entity::merge_entities(&insight.entities, &extracted);

    let quality_warnings = check_content_quality(&insight.content);

    // 1. Best-effort embedding; failure degrades to token similarity
    let embedding_vec = try_embed(provider, &insight.content);
    let mut embed_cache = if embedding_vec.is_some() {
        build_embed_cache(conn)?
    } else {
        None
    };

    // 2. Dedup/conflict diff, read-only, outside the transaction
    let (action, replaced_id) = if req.no_diff {
        (DiffAction::Add, None)
    } else {
        let all_active = get_all_active_insights(conn)?;
        let outcome = diff(
            &all_active,
            &insight.content,
            embedding_vec.as_deref(),
            embed_cache.as_ref().unwrap_or(&HashMap::new()),
        );
        (outcome.action, outcome.matched.map(|m| m.id))
    };

    if action == DiffAction::Skip {
        let duplicate_id = replaced_id.unwrap_or_default();
        log_op(
            conn,
            "diff-skip",
            Some(&insight.id),
            &format!("duplicate of {duplicate_id}"),
        )?;
        return Ok(RememberOutput {
            id: duplicate_id,
            content: insight.content,
            category: insight.category,
            importance: insight.importance,
            tags: insight.tags,
            entities: insight.entities,
            action: action.as_str(),
            created_at: format_timestamp(insight.created_at),
            edges_created: EdgeStats::default(),
            semantic_candidates: Vec::new(),
            causal_candidates: Vec::new(),
            quality_warnings,
            embedded: false,
            effective_importance: 0.0,
            auto_pruned: 0,
            replaced_id: None,
        });
    }

    // 3. The atomic write
    let embedded = embedding_vec.is_some();
    let tx = conn.transaction()?;
    let (edges_created, effective_importance, auto_pruned) = {
        if action == DiffAction::Replace {
            if let Some(old_id) = &replaced_id {
                soft_delete_insight(&tx, old_id)?;
                log_op(
                    &tx,
                    "diff-replace",
                    Some(old_id),
                    &format!("replaced by {}", insight.id),
                )?;
                if let Some(cache) = embed_cache.as_mut() {
                    cache.remove(old_id);
                }
            }
        }

        insert_insight(&tx, &insight)?;

        if let Some(vec) = &embedding_vec {
            crate::store::insight::update_embedding(&tx, &insight.id, &serialize_vector(vec))?;
            embed_cache
                .get_or_insert_with(Default::default)
                .insert(insight.id.clone(), vec.clone());
        }

        let edges_created = synthesize_edges(&tx, &insight, embed_cache.as_ref())?;

        refresh_all_effective_importance(&tx)?;
        let effective_importance: f64 = tx.query_row(
            "SELECT effective_importance FROM insights WHERE id = ?1",
            [&insight.id],
            |row| row.get(0),
        )?;

        let auto_pruned = auto_prune(&tx, MAX_INSIGHTS, Some(&insight.id))?;

        log_op(&tx, "remember", Some(&insight.id), &insight.content)?;
        (edges_created, effective_importance, auto_pruned)
    };
    tx.commit()?;

    // 4. Post-commit, read-only candidate surfacing
    let semantic_candidates = find_semantic_candidates(conn, &insight, embed_cache.as_ref())?;
    let causal_candidates = find_causal_candidates(conn, &insight)?;

    Ok(RememberOutput {
        id: insight.id.clone(),
        content: insight.content,
        category: insight.category,
        importance: insight.importance,
        tags: insight.tags,
        entities: insight.entities,
        action: action.as_str(),
        created_at: format_timestamp(insight.created_at),
        edges_created,
        semantic_candidates,
        causal_candidates,
        quality_warnings,
        embedded,
        effective_importance,
        auto_pruned,
        replaced_id,
    })
}
