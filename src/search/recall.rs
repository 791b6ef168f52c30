//! Intent-aware recall: RRF anchor fusion, beam-search graph traversal,
//! multi-factor re-ranking, and causal topological ordering.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::embed::vector::{cosine_similarity, deserialize_vector};
use crate::error::Result;
use crate::model::{EdgeType, Insight};
use crate::search::intent::{
    detect_intent, edge_weight, rerank_weights, rerank_weights_no_embedding, traversal_params,
    Intent,
};
use crate::search::keyword::{insight_tokens, keyword_search, tokenize};
use crate::store::{edge, insight as insight_store};

/// Top-K per anchor signal before RRF fusion.
pub const ANCHOR_TOP_K: usize = 20;
/// RRF constant.
pub const RRF_K: usize = 60;
/// Structural term weight during traversal.
pub const LAMBDA1: f64 = 1.0;
/// Semantic term weight during traversal.
pub const LAMBDA2: f64 = 0.4;
/// Gate for the vector anchor signal.
pub const VECTOR_SEARCH_MIN_SIM: f64 = 0.10;

/// Parameters for one recall invocation.
pub struct RecallParams {
    pub query: String,
    pub query_vec: Option<Vec<f64>>,
    pub query_entities: Vec<String>,
    pub limit: usize,
    pub intent_override: Option<Intent>,
    pub category: Option<crate::model::Category>,
    pub source: Option<crate::model::InsightSource>,
}

/// The four rerank signals, exposed verbatim on every result.
#[derive(Debug, Clone, Serialize)]
pub struct Signals {
    pub keyword: f64,
    pub entity: f64,
    pub similarity: f64,
    pub graph: f64,
}

/// One ranked result.
#[derive(Debug, Serialize)]
pub struct RecallResult {
    pub insight: Insight,
    pub score: f64,
    pub intent: Intent,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub via: String,
    pub signals: Signals,
}

#[derive(Debug, Serialize)]
pub struct RecallMeta {
    pub intent: Intent,
    pub intent_source: &'static str,
    pub anchor_count: usize,
    pub traversed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct RecallResponse {
    pub results: Vec<RecallResult>,
    pub meta: RecallMeta,
}

/// Run the full read pipeline. Updates access counters on every returned
/// result (recall's only side effect; edges are never mutated).
pub fn intent_aware_recall(conn: &Connection, params: &RecallParams) -> Result<RecallResponse> {
    let (intent, intent_source) = match params.intent_override {
        Some(intent) => (intent, "override"),
        None => (detect_intent(&params.query), "auto"),
    };
    let tparams = traversal_params(intent);

    let all_insights = insight_store::get_all_active_insights(conn)?;

    // Embeddings are only loaded when the query itself embedded.
    let embed_cache: Option<HashMap<String, Vec<f64>>> = match &params.query_vec {
        Some(_) => {
            let mut cache = HashMap::new();
            for (id, blob) in insight_store::get_all_embeddings(conn)? {
                if let Some(vec) = deserialize_vector(&blob) {
                    cache.insert(id, vec);
                }
            }
            if cache.is_empty() {
                None
            } else {
                Some(cache)
            }
        }
        None => None,
    };
    let has_embeddings = embed_cache.is_some();

    // 1. Anchor selection: four signals fused by reciprocal rank
    let anchors = select_anchors(
        &all_insights,
        &params.query,
        params.query_vec.as_deref(),
        &params.query_entities,
        embed_cache.as_ref(),
    );
    let anchor_count = anchors.len();

    let insight_map: HashMap<&str, &Insight> = all_insights
        .iter()
        .map(|ins| (ins.id.as_str(), ins))
        .collect();

    // 2. Beam search from every anchor over a prefetched adjacency map
    let adjacency = build_adjacency(conn)?;
    let mut score_map: HashMap<String, f64> = HashMap::new();
    let mut via_map: HashMap<String, String> = HashMap::new();
    for anchor in &anchors {
        score_map.insert(anchor.id.clone(), anchor.score);
        via_map.insert(anchor.id.clone(), anchor.via.to_string());
    }
    for anchor in &anchors {
        beam_search_from_anchor(
            anchor,
            &adjacency,
            params.query_vec.as_deref(),
            embed_cache.as_ref(),
            intent,
            tparams.beam_width,
            tparams.max_depth,
            tparams.max_visited,
            &mut score_map,
            &mut via_map,
        );
    }
    let traversed = score_map.len();

    // 3. Multi-factor rerank over the candidate pool
    let query_tokens = tokenize(&params.query);
    let query_entity_set: HashSet<String> = params
        .query_entities
        .iter()
        .map(|e| e.to_lowercase())
        .collect();

    struct Candidate<'a> {
        insight: &'a Insight,
        via: String,
        graph_raw: f64,
        signals: Signals,
    }

    let mut pool: Vec<Candidate> = Vec::new();
    let mut graph_min = f64::INFINITY;
    let mut graph_max = f64::NEG_INFINITY;
    for (id, graph_raw) in &score_map {
        let Some(&ins) = insight_map.get(id.as_str()) else {
            continue;
        };
        if let Some(category) = params.category {
            if ins.category != category {
                continue;
            }
        }
        if let Some(source) = params.source {
            if ins.source != source {
                continue;
            }
        }
        graph_min = graph_min.min(*graph_raw);
        graph_max = graph_max.max(*graph_raw);
        pool.push(Candidate {
            insight: ins,
            via: via_map.get(id).cloned().unwrap_or_default(),
            graph_raw: *graph_raw,
            signals: Signals {
                keyword: 0.0,
                entity: 0.0,
                similarity: 0.0,
                graph: 0.0,
            },
        });
    }
    let graph_range = if graph_max > graph_min {
        graph_max - graph_min
    } else {
        1.0
    };

    for c in &mut pool {
        if !query_tokens.is_empty() {
            let content_tokens = insight_tokens(c.insight);
            let intersection = query_tokens
                .iter()
                .filter(|t| content_tokens.contains(*t))
                .count();
            c.signals.keyword = intersection as f64 / query_tokens.len() as f64;
        }
        if !query_entity_set.is_empty() {
            let matched = c
                .insight
                .entities
                .iter()
                .filter(|e| query_entity_set.contains(&e.to_lowercase()))
                .count();
            c.signals.entity = matched as f64 / query_entity_set.len().max(1) as f64;
        }
        if let (Some(query_vec), Some(cache)) = (&params.query_vec, embed_cache.as_ref()) {
            if let Some(vec) = cache.get(&c.insight.id) {
                c.signals.similarity = cosine_similarity(query_vec, vec).max(0.0);
            }
        }
        c.signals.graph = if graph_min.is_finite() {
            (c.graph_raw - graph_min) / graph_range
        } else {
            0.0
        };
    }

    let weights = if has_embeddings {
        rerank_weights(intent)
    } else {
        rerank_weights_no_embedding(intent)
    };

    let mut results: Vec<RecallResult> = pool
        .into_iter()
        .map(|c| {
            let score = weights.keyword * c.signals.keyword
                + weights.entity * c.signals.entity
                + weights.similarity * c.signals.similarity
                + weights.graph * c.signals.graph;
            RecallResult {
                insight: c.insight.clone(),
                score,
                intent,
                via: c.via,
                signals: c.signals,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.insight.importance.cmp(&a.insight.importance))
            .then(a.insight.id.cmp(&b.insight.id))
    });
    if params.limit > 0 && results.len() > params.limit {
        results.truncate(params.limit);
    }

    // 4. WHY queries: causes before effects
    if intent == Intent::Why {
        results = causal_topological_sort(conn, results)?;
    }

    // 5. Access side effects
    for r in &results {
        insight_store::increment_access_count(conn, &r.insight.id)?;
    }

    let hint = if results.is_empty() || (params.limit > 0 && results.len() < params.limit / 2) {
        Some("sparse_results")
    } else {
        None
    };

    Ok(RecallResponse {
        results,
        meta: RecallMeta {
            intent,
            intent_source,
            anchor_count,
            traversed,
            hint,
        },
    })
}

// ── Anchor selection ──────────────────────────────────────────────────────────

struct Anchor {
    id: String,
    score: f64,
    via: &'static str,
}

fn rrf(rank: usize) -> f64 {
    1.0 / (RRF_K as f64 + rank as f64 + 1.0)
}

fn select_anchors(
    all_insights: &[Insight],
    query: &str,
    query_vec: Option<&[f64]>,
    query_entities: &[String],
    embed_cache: Option<&HashMap<String, Vec<f64>>>,
) -> Vec<Anchor> {
    // id → (fused score, via label)
    let mut fused: HashMap<String, (f64, &'static str)> = HashMap::new();
    let mut add_signal = |id: &str, rank: usize, via: &'static str| {
        let entry = fused.entry(id.to_string()).or_insert((0.0, via));
        entry.0 += rrf(rank);
        if entry.1 != via {
            entry.1 = "hybrid";
        }
    };

    // Keyword signal
    for (rank, (ins, _score)) in keyword_search(all_insights, query, ANCHOR_TOP_K)
        .iter()
        .enumerate()
    {
        add_signal(&ins.id, rank, "keyword");
    }

    // Vector signal, gated on minimum similarity
    if let (Some(query_vec), Some(cache)) = (query_vec, embed_cache) {
        let mut hits: Vec<(&String, f64)> = cache
            .iter()
            .map(|(id, vec)| (id, cosine_similarity(query_vec, vec)))
            .filter(|(_, sim)| *sim >= VECTOR_SEARCH_MIN_SIM)
            .collect();
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(b.0))
        });
        hits.truncate(ANCHOR_TOP_K);
        for (rank, (id, _sim)) in hits.iter().enumerate() {
            add_signal(id, rank, "vector");
        }
    }

    // Recency signal: all_insights is already newest-first
    for (rank, ins) in all_insights.iter().take(ANCHOR_TOP_K).enumerate() {
        add_signal(&ins.id, rank, "time");
    }

    // Entity signal: share at least one entity with the query
    if !query_entities.is_empty() {
        let query_set: HashSet<String> =
            query_entities.iter().map(|e| e.to_lowercase()).collect();
        let mut sharers: Vec<(&Insight, usize)> = all_insights
            .iter()
            .filter_map(|ins| {
                let shared = ins
                    .entities
                    .iter()
                    .filter(|e| query_set.contains(&e.to_lowercase()))
                    .count();
                (shared > 0).then_some((ins, shared))
            })
            .collect();
        // Most shared entities first; recency (input order) breaks ties
        sharers.sort_by(|a, b| b.1.cmp(&a.1));
        sharers.truncate(ANCHOR_TOP_K);
        for (rank, (ins, _)) in sharers.iter().enumerate() {
            add_signal(&ins.id, rank, "entity");
        }
    }

    // Normalize by the max so traversal seeds start at <= 1.0
    let max_score = fused
        .values()
        .map(|(s, _)| *s)
        .fold(0.0_f64, f64::max);
    let mut anchors: Vec<Anchor> = fused
        .into_iter()
        .map(|(id, (score, via))| Anchor {
            id,
            score: if max_score > 0.0 { score / max_score } else { score },
            via,
        })
        .collect();
    anchors.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    anchors
}

// ── Beam search ───────────────────────────────────────────────────────────────

type Adjacency = HashMap<String, Vec<(String, EdgeType, f64)>>;

fn build_adjacency(conn: &Connection) -> Result<Adjacency> {
    let mut adjacency: Adjacency = HashMap::new();
    for e in edge::get_all_edges(conn)? {
        adjacency
            .entry(e.source_id.clone())
            .or_default()
            .push((e.target_id.clone(), e.edge_type, e.weight));
        adjacency
            .entry(e.target_id)
            .or_default()
            .push((e.source_id, e.edge_type, e.weight));
    }
    Ok(adjacency)
}

/// Best-first expansion from one anchor.
///
/// The frontier keeps only the top `beam_width` nodes per depth; a
/// per-anchor visit budget bounds total expansion. Scores in `score_map`
/// are global across anchors and only ever improve.
#[allow(clippy::too_many_arguments)]
fn beam_search_from_anchor(
    anchor: &Anchor,
    adjacency: &Adjacency,
    query_vec: Option<&[f64]>,
    embed_cache: Option<&HashMap<String, Vec<f64>>>,
    intent: Intent,
    beam_width: usize,
    max_depth: usize,
    max_visited: usize,
    score_map: &mut HashMap<String, f64>,
    via_map: &mut HashMap<String, String>,
) {
    let mut visited: HashSet<String> = HashSet::from([anchor.id.clone()]);
    let mut total_visited = 1usize;
    let mut frontier: Vec<(String, f64)> = vec![(anchor.id.clone(), anchor.score)];

    for _depth in 0..max_depth {
        if frontier.is_empty() || total_visited >= max_visited {
            break;
        }

        let mut next: Vec<(String, f64)> = Vec::new();
        for (node_id, node_score) in &frontier {
            let Some(neighbors) = adjacency.get(node_id) else {
                continue;
            };
            for (neighbor_id, edge_type, weight) in neighbors {
                if total_visited >= max_visited {
                    break;
                }

                let structural = edge_weight(intent, *edge_type) * weight;
                let semantic = match (query_vec, embed_cache) {
                    (Some(qv), Some(cache)) => cache
                        .get(neighbor_id)
                        .map(|v| cosine_similarity(qv, v).max(0.0))
                        .unwrap_or(0.0),
                    _ => 0.0,
                };
                let neighbor_score = node_score + LAMBDA1 * structural + LAMBDA2 * semantic;

                let improved = score_map
                    .get(neighbor_id)
                    .map(|existing| neighbor_score > *existing)
                    .unwrap_or(true);
                if improved {
                    score_map.insert(neighbor_id.clone(), neighbor_score);
                    via_map.insert(neighbor_id.clone(), edge_type.as_str().to_string());
                }

                if !visited.contains(neighbor_id) {
                    visited.insert(neighbor_id.clone());
                    total_visited += 1;
                    next.push((neighbor_id.clone(), neighbor_score));
                }
            }
        }

        next.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        next.truncate(beam_width);
        frontier = next;
    }
}

// ── Causal topological sort ───────────────────────────────────────────────────

/// Kahn's algorithm over the causal subgraph restricted to the result set.
///
/// Causes (edge sources) come before effects; ties break by descending
/// final score. Nodes stuck on a cycle are appended in their original
/// rank order, which deterministically breaks the cycle.
fn causal_topological_sort(
    conn: &Connection,
    results: Vec<RecallResult>,
) -> Result<Vec<RecallResult>> {
    if results.len() <= 1 {
        return Ok(results);
    }

    let id_set: HashSet<&str> = results.iter().map(|r| r.insight.id.as_str()).collect();
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = results
        .iter()
        .map(|r| (r.insight.id.as_str(), 0))
        .collect();

    for r in &results {
        for e in edge::get_edges_by_source_and_type(conn, &r.insight.id, EdgeType::Causal)? {
            if id_set.contains(e.target_id.as_str()) {
                adjacency
                    .entry(e.source_id.clone())
                    .or_default()
                    .push(e.target_id.clone());
                if let Some(d) = in_degree.get_mut(e.target_id.as_str()) {
                    *d += 1;
                }
            }
        }
    }

    let score_of: HashMap<&str, f64> = results
        .iter()
        .map(|r| (r.insight.id.as_str(), r.score))
        .collect();

    let mut ready: Vec<String> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| id.to_string())
        .collect();
    let mut ordered_ids: Vec<String> = Vec::new();

    while !ready.is_empty() {
        ready.sort_by(|a, b| {
            let sa = score_of.get(a.as_str()).copied().unwrap_or(0.0);
            let sb = score_of.get(b.as_str()).copied().unwrap_or(0.0);
            sb.partial_cmp(&sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        });
        let id = ready.remove(0);
        for target in adjacency.get(&id).cloned().unwrap_or_default() {
            if let Some(d) = in_degree.get_mut(target.as_str()) {
                *d -= 1;
                if *d == 0 {
                    ready.push(target);
                }
            }
        }
        ordered_ids.push(id);
    }

    // Cycle leftovers keep their original rank order
    let mut by_id: HashMap<String, RecallResult> = results
        .into_iter()
        .map(|r| (r.insight.id.clone(), r))
        .collect();

    let mut ordered: Vec<RecallResult> = ordered_ids
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect();
    let mut leftovers: Vec<RecallResult> = by_id.into_values().collect();
    leftovers.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ordered.extend(leftovers);
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::{Category, Edge, EdgeMetadata, InsightSource};
    use crate::store::insight::insert_insight;

    fn stored(conn: &Connection, content: &str, entities: Vec<String>) -> Insight {
        let ins = Insight::new(
            content.to_string(),
            Category::General,
            3,
            vec![],
            entities,
            InsightSource::User,
        );
        insert_insight(conn, &ins).unwrap();
        ins
    }

    fn causal_link(conn: &Connection, cause: &str, effect: &str) {
        edge::insert_edge(
            conn,
            &Edge::new(
                cause,
                effect,
                EdgeType::Causal,
                0.8,
                EdgeMetadata::Causal {
                    sub_type: crate::model::CausalKind::Causes,
                    reason: "because".to_string(),
                },
            ),
        )
        .unwrap();
    }

    fn basic_params(query: &str) -> RecallParams {
        RecallParams {
            query: query.to_string(),
            query_vec: None,
            query_entities: vec![],
            limit: 10,
            intent_override: None,
            category: None,
            source: None,
        }
    }

    #[test]
    fn empty_store_returns_empty() {
        let conn = db::open_memory_database().unwrap();
        let resp = intent_aware_recall(&conn, &basic_params("anything")).unwrap();
        assert!(resp.results.is_empty());
        assert_eq!(resp.meta.anchor_count, 0);
        assert_eq!(resp.meta.hint, Some("sparse_results"));
    }

    #[test]
    fn keyword_match_ranks_first() {
        let conn = db::open_memory_database().unwrap();
        let hit = stored(&conn, "postgres connection pool tuning settings", vec![]);
        stored(&conn, "unrelated gardening notes tomatoes", vec![]);

        let resp = intent_aware_recall(&conn, &basic_params("postgres tuning")).unwrap();
        assert!(!resp.results.is_empty());
        assert_eq!(resp.results[0].insight.id, hit.id);
        assert!(resp.results[0].signals.keyword > 0.0);
        assert_eq!(resp.results[0].intent, Intent::General);
    }

    #[test]
    fn no_keyword_no_embedding_still_returns_recency_anchors() {
        let conn = db::open_memory_database().unwrap();
        stored(&conn, "alpha note", vec![]);
        stored(&conn, "beta note", vec![]);

        // Query shares no tokens with anything
        let resp = intent_aware_recall(&conn, &basic_params("zzz qqq")).unwrap();
        assert_eq!(resp.results.len(), 2);
        assert!(resp.meta.anchor_count >= 2);
    }

    #[test]
    fn entity_anchor_signal_fuses() {
        let conn = db::open_memory_database().unwrap();
        let carrier = stored(
            &conn,
            "service catalog entry",
            vec!["HttpServer".to_string()],
        );
        stored(&conn, "unrelated note", vec![]);

        let mut params = basic_params("zzz");
        params.query_entities = vec!["HttpServer".to_string()];
        let resp = intent_aware_recall(&conn, &params).unwrap();
        assert_eq!(resp.results[0].insight.id, carrier.id);
        assert!(resp.results[0].signals.entity > 0.0);
    }

    #[test]
    fn intent_override_is_reported() {
        let conn = db::open_memory_database().unwrap();
        stored(&conn, "some note", vec![]);
        let mut params = basic_params("plain query");
        params.intent_override = Some(Intent::When);
        let resp = intent_aware_recall(&conn, &params).unwrap();
        assert_eq!(resp.meta.intent, Intent::When);
        assert_eq!(resp.meta.intent_source, "override");
    }

    #[test]
    fn traversal_reaches_linked_neighbors() {
        let conn = db::open_memory_database().unwrap();
        let anchor = stored(&conn, "postgres pool tuning", vec![]);
        let neighbor = stored(&conn, "unrelated but linked detail", vec![]);
        edge::insert_edge(
            &conn,
            &Edge::new(
                &anchor.id,
                &neighbor.id,
                EdgeType::Semantic,
                0.9,
                EdgeMetadata::Semantic { cosine: 0.9 },
            ),
        )
        .unwrap();

        let resp = intent_aware_recall(&conn, &basic_params("postgres tuning")).unwrap();
        let ids: Vec<&str> = resp.results.iter().map(|r| r.insight.id.as_str()).collect();
        assert!(ids.contains(&neighbor.id.as_str()));
        let n = resp
            .results
            .iter()
            .find(|r| r.insight.id == neighbor.id)
            .unwrap();
        // Reached through an edge, not an anchor signal
        assert_eq!(n.via, "semantic");
    }

    #[test]
    fn why_orders_causes_before_effects() {
        let conn = db::open_memory_database().unwrap();
        let cause = stored(&conn, "disk filled because logs grew unbounded", vec![]);
        let middle = stored(&conn, "database crashed when disk filled", vec![]);
        let effect = stored(&conn, "api requests failed while database down", vec![]);
        causal_link(&conn, &cause.id, &middle.id);
        causal_link(&conn, &middle.id, &effect.id);

        let mut params = basic_params("why did api requests fail database disk");
        params.limit = 3;
        let resp = intent_aware_recall(&conn, &params).unwrap();
        assert_eq!(resp.meta.intent, Intent::Why);
        assert_eq!(resp.results.len(), 3);

        let ids: Vec<&str> = resp.results.iter().map(|r| r.insight.id.as_str()).collect();
        let pos = |id: &str| ids.iter().position(|x| *x == id).unwrap();
        assert!(pos(&cause.id) < pos(&middle.id));
        assert!(pos(&middle.id) < pos(&effect.id));
        for r in &resp.results {
            assert_eq!(r.intent, Intent::Why);
        }
    }

    #[test]
    fn topo_sort_tolerates_cycles() {
        let conn = db::open_memory_database().unwrap();
        let a = stored(&conn, "alpha caused beta because reasons", vec![]);
        let b = stored(&conn, "beta caused alpha because reasons", vec![]);
        causal_link(&conn, &a.id, &b.id);
        causal_link(&conn, &b.id, &a.id);

        let mut params = basic_params("why did alpha beta happen");
        params.limit = 2;
        let resp = intent_aware_recall(&conn, &params).unwrap();
        // No hang, both results present
        assert_eq!(resp.results.len(), 2);
    }

    #[test]
    fn recall_updates_access_counters() {
        let conn = db::open_memory_database().unwrap();
        let hit = stored(&conn, "postgres tuning notes", vec![]);

        intent_aware_recall(&conn, &basic_params("postgres tuning")).unwrap();

        let loaded = insight_store::get_insight(&conn, &hit.id).unwrap().unwrap();
        assert_eq!(loaded.access_count, 1);
        assert!(loaded.last_accessed_at.is_some());
    }

    #[test]
    fn category_filter_restricts_results() {
        let conn = db::open_memory_database().unwrap();
        let mut decision = Insight::new(
            "postgres chosen for storage".to_string(),
            Category::Decision,
            3,
            vec![],
            vec![],
            InsightSource::User,
        );
        insert_insight(&conn, &decision).unwrap();
        let decision_id = decision.id.clone();
        decision = Insight::new(
            "postgres runs on port 5432".to_string(),
            Category::Fact,
            3,
            vec![],
            vec![],
            InsightSource::User,
        );
        insert_insight(&conn, &decision).unwrap();

        let mut params = basic_params("postgres");
        params.category = Some(Category::Decision);
        let resp = intent_aware_recall(&conn, &params).unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].insight.id, decision_id);
    }

    #[test]
    fn limit_truncates_and_signals_are_bounded() {
        let conn = db::open_memory_database().unwrap();
        for i in 0..8 {
            stored(&conn, &format!("postgres note number {i}"), vec![]);
        }
        let mut params = basic_params("postgres note");
        params.limit = 3;
        let resp = intent_aware_recall(&conn, &params).unwrap();
        assert_eq!(resp.results.len(), 3);
        for r in &resp.results {
            assert!(r.signals.keyword >= 0.0 && r.signals.keyword <= 1.0);
            assert!(r.signals.graph >= 0.0 && r.signals.graph <= 1.0);
        }
    }
}
