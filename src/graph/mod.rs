//! Automatic edge synthesis for newly stored insights.
//!
//! The four builders run inside the write transaction, after the insight
//! row is inserted, in a fixed order: temporal, entity, causal, semantic.

pub mod bfs;
pub mod causal;
pub mod entity;
pub mod semantic;
pub mod temporal;

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;
use crate::model::Insight;

/// Number of edges created per type for one insert.
#[derive(Debug, Default, Serialize)]
pub struct EdgeStats {
    pub temporal: usize,
    pub entity: usize,
    pub causal: usize,
    pub semantic: usize,
}

/// Run all edge builders for a newly inserted insight.
pub fn synthesize_edges(
    conn: &Connection,
    insight: &Insight,
    embed_cache: Option<&HashMap<String, Vec<f64>>>,
) -> Result<EdgeStats> {
    Ok(EdgeStats {
        temporal: temporal::create_temporal_edges(conn, insight)?,
        entity: entity::create_entity_edges(conn, insight)?,
        causal: causal::create_causal_edges(conn, insight)?,
        semantic: semantic::create_semantic_edges(conn, insight, embed_cache)?,
    })
}
