//! Semantic edge creation and candidate discovery.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::embed::vector::{cosine_similarity, deserialize_vector};
use crate::error::Result;
use crate::model::{Edge, EdgeMetadata, EdgeType, Insight};
use crate::search::keyword::content_similarity;
use crate::store::{edge, insight as insight_store};

/// Floor for the token-overlap candidate fallback.
pub const MIN_SEMANTIC_SIMILARITY: f64 = 0.10;
/// Candidates are surfaced from this cosine upward.
pub const CANDIDATE_COSINE: f64 = 0.40;
/// Edges are auto-created from this cosine upward.
pub const AUTO_LINK_COSINE: f64 = 0.80;
/// Cap on surfaced semantic candidates.
pub const MAX_SEMANTIC_CANDIDATES: usize = 5;
/// Cap on auto-created semantic links per insert.
pub const MAX_AUTO_SEMANTIC_EDGES: usize = 3;

/// Load all active embeddings into an id → vector map.
pub fn build_embed_cache(conn: &Connection) -> Result<Option<HashMap<String, Vec<f64>>>> {
    let blobs = insight_store::get_all_embeddings(conn)?;
    if blobs.is_empty() {
        return Ok(None);
    }
    let mut cache = HashMap::new();
    for (id, blob) in blobs {
        if let Some(vec) = deserialize_vector(&blob) {
            cache.insert(id, vec);
        }
    }
    Ok(if cache.is_empty() { None } else { Some(cache) })
}

/// Auto-create bidirectional semantic edges for high-cosine pairs.
///
/// Requires the new insight's own vector in the cache; without embeddings
/// no automatic semantic edges are created (candidates still surface via
/// the token-overlap fallback).
pub fn create_semantic_edges(
    conn: &Connection,
    insight: &Insight,
    embed_cache: Option<&HashMap<String, Vec<f64>>>,
) -> Result<usize> {
    let Some(cache) = embed_cache else {
        return Ok(0);
    };
    let Some(insight_vec) = cache.get(&insight.id) else {
        return Ok(0);
    };

    let mut scored: Vec<(&String, f64)> = cache
        .iter()
        .filter(|(id, _)| *id != &insight.id)
        .map(|(id, vec)| (id, cosine_similarity(insight_vec, vec)))
        .filter(|(_, sim)| *sim >= AUTO_LINK_COSINE)
        .collect();

    if scored.is_empty() {
        return Ok(0);
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(MAX_AUTO_SEMANTIC_EDGES);

    let mut count = 0;
    for (other_id, sim) in scored {
        let metadata = EdgeMetadata::Semantic { cosine: sim };
        edge::insert_edge(
            conn,
            &Edge::new(&insight.id, other_id, EdgeType::Semantic, sim, metadata.clone()),
        )?;
        count += 1;
        edge::insert_edge(
            conn,
            &Edge::new(other_id, &insight.id, EdgeType::Semantic, sim, metadata),
        )?;
        count += 1;
    }

    Ok(count)
}

/// A surfaced semantic candidate.
#[derive(Debug, Serialize)]
pub struct SemanticCandidate {
    pub id: String,
    pub content: String,
    pub category: String,
    /// Cosine similarity; token-overlap score in fallback mode.
    pub cosine: f64,
    pub auto_linked: bool,
}

/// Surface near-matches that were NOT auto-linked: cosine in
/// `[CANDIDATE_COSINE, AUTO_LINK_COSINE)`, descending, capped. Falls back
/// to token overlap (≥ [`MIN_SEMANTIC_SIMILARITY`]) when embeddings are
/// unavailable for the new insight.
pub fn find_semantic_candidates(
    conn: &Connection,
    insight: &Insight,
    embed_cache: Option<&HashMap<String, Vec<f64>>>,
) -> Result<Vec<SemanticCandidate>> {
    if let Some(cache) = embed_cache {
        if let Some(insight_vec) = cache.get(&insight.id) {
            let mut scored: Vec<(&String, f64)> = cache
                .iter()
                .filter(|(id, _)| *id != &insight.id)
                .map(|(id, vec)| (id, cosine_similarity(insight_vec, vec)))
                .filter(|(_, sim)| *sim >= CANDIDATE_COSINE && *sim < AUTO_LINK_COSINE)
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(MAX_SEMANTIC_CANDIDATES);

            let mut result = Vec::new();
            for (id, sim) in scored {
                if let Some(ins) = insight_store::get_insight(conn, id)? {
                    result.push(SemanticCandidate {
                        id: ins.id,
                        content: ins.content,
                        category: ins.category.as_str().to_string(),
                        cosine: sim,
                        auto_linked: false,
                    });
                }
            }
            return Ok(result);
        }
    }

    // Fallback: token overlap over all active insights
    let all = insight_store::get_all_active_insights(conn)?;
    let mut scored: Vec<(Insight, f64)> = all
        .into_iter()
        .filter(|other| other.id != insight.id)
        .map(|other| {
            let sim = content_similarity(&insight.content, &other.content);
            (other, sim)
        })
        .filter(|(_, sim)| *sim >= MIN_SEMANTIC_SIMILARITY)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(MAX_SEMANTIC_CANDIDATES);

    Ok(scored
        .into_iter()
        .map(|(ins, sim)| SemanticCandidate {
            id: ins.id,
            content: ins.content,
            category: ins.category.as_str().to_string(),
            cosine: sim,
            auto_linked: false,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::embed::vector::serialize_vector;
    use crate::model::{Category, InsightSource};
    use crate::store::insight::{insert_insight, update_embedding};

    fn stored(conn: &Connection, content: &str, vec: Option<&[f64]>) -> Insight {
        let ins = Insight::new(
            content.to_string(),
            Category::General,
            3,
            vec![],
            vec![],
            InsightSource::User,
        );
        insert_insight(conn, &ins).unwrap();
        if let Some(v) = vec {
            update_embedding(conn, &ins.id, &serialize_vector(v)).unwrap();
        }
        ins
    }

    /// Unit vector rotated by the given cosine against [1, 0, 0].
    fn vec_with_cosine(cos: f64) -> Vec<f64> {
        vec![cos, (1.0 - cos * cos).max(0.0).sqrt(), 0.0]
    }

    #[test]
    fn high_cosine_pairs_auto_link() {
        let conn = db::open_memory_database().unwrap();
        let a = stored(&conn, "existing close neighbor", Some(&vec_with_cosine(0.95)));
        let new = stored(&conn, "fresh insight", Some(&[1.0, 0.0, 0.0]));

        let cache = build_embed_cache(&conn).unwrap().unwrap();
        let count = create_semantic_edges(&conn, &new, Some(&cache)).unwrap();
        assert_eq!(count, 2);

        let edges = edge::get_edges_by_source_and_type(&conn, &new.id, EdgeType::Semantic).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target_id, a.id);
        assert!((edges[0].weight - 0.95).abs() < 1e-9);
    }

    #[test]
    fn below_threshold_no_auto_link() {
        let conn = db::open_memory_database().unwrap();
        stored(&conn, "existing mid neighbor", Some(&vec_with_cosine(0.79)));
        let new = stored(&conn, "fresh insight", Some(&[1.0, 0.0, 0.0]));

        let cache = build_embed_cache(&conn).unwrap().unwrap();
        assert_eq!(create_semantic_edges(&conn, &new, Some(&cache)).unwrap(), 0);
    }

    #[test]
    fn auto_link_cap_is_three() {
        let conn = db::open_memory_database().unwrap();
        for i in 0..5 {
            stored(
                &conn,
                &format!("neighbor {i}"),
                Some(&vec_with_cosine(0.90 + i as f64 * 0.01)),
            );
        }
        let new = stored(&conn, "fresh insight", Some(&[1.0, 0.0, 0.0]));

        let cache = build_embed_cache(&conn).unwrap().unwrap();
        let count = create_semantic_edges(&conn, &new, Some(&cache)).unwrap();
        assert_eq!(count, MAX_AUTO_SEMANTIC_EDGES * 2);
    }

    #[test]
    fn candidates_cover_review_band_only() {
        let conn = db::open_memory_database().unwrap();
        let mid = stored(&conn, "review band neighbor", Some(&vec_with_cosine(0.60)));
        stored(&conn, "auto linked neighbor", Some(&vec_with_cosine(0.90)));
        stored(&conn, "far neighbor", Some(&vec_with_cosine(0.20)));
        let new = stored(&conn, "fresh insight", Some(&[1.0, 0.0, 0.0]));

        let cache = build_embed_cache(&conn).unwrap().unwrap();
        let candidates = find_semantic_candidates(&conn, &new, Some(&cache)).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, mid.id);
        assert!(!candidates[0].auto_linked);
        assert!((candidates[0].cosine - 0.60).abs() < 1e-9);
    }

    #[test]
    fn fallback_uses_token_overlap() {
        let conn = db::open_memory_database().unwrap();
        let close = stored(&conn, "postgres connection pool sizing guide", None);
        stored(&conn, "weekend gardening from tomatoes", None);
        let new = stored(&conn, "postgres connection pool tuning", None);

        let candidates = find_semantic_candidates(&conn, &new, None).unwrap();
        assert!(!candidates.is_empty());
        assert_eq!(candidates[0].id, close.id);
        assert!(!candidates[0].auto_linked);
        assert!(candidates[0].cosine >= MIN_SEMANTIC_SIMILARITY);
    }

    #[test]
    fn no_embeddings_no_auto_edges() {
        let conn = db::open_memory_database().unwrap();
        stored(&conn, "anything", None);
        let new = stored(&conn, "anything else", None);
        assert_eq!(create_semantic_edges(&conn, &new, None).unwrap(), 0);
        assert!(build_embed_cache(&conn).unwrap().is_none());
    }
}
