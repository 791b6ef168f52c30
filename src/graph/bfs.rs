//! Bounded breadth-first traversal over the full graph.
//!
//! Edges are walked in both directions; cycles are handled with an
//! explicit visited set keyed by insight id.

use rusqlite::Connection;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::Result;
use crate::model::{EdgeType, Insight};
use crate::store::{edge, insight as insight_store};

/// Controls BFS traversal behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct BfsOptions {
    pub max_depth: usize,
    /// 0 = unbounded.
    pub max_nodes: usize,
    /// Restrict traversal to one edge type.
    pub edge_filter: Option<EdgeType>,
}

/// A node reached during traversal.
#[derive(Debug)]
pub struct BfsNode {
    pub insight: Insight,
    pub hop: usize,
    pub via_edge: EdgeType,
}

/// Breadth-first traversal from `start_id`. The start node itself is not
/// included in the result.
pub fn bfs(conn: &Connection, start_id: &str, opts: &BfsOptions) -> Result<Vec<BfsNode>> {
    let all_insights = insight_store::get_all_active_insights(conn)?;
    if all_insights.is_empty() {
        return Ok(Vec::new());
    }
    let mut insight_map: HashMap<String, Insight> = all_insights
        .into_iter()
        .map(|ins| (ins.id.clone(), ins))
        .collect();

    let all_edges = edge::get_all_edges(conn)?;
    let mut adjacency: HashMap<&str, Vec<(&str, EdgeType)>> = HashMap::new();
    for e in &all_edges {
        if let Some(filter) = opts.edge_filter {
            if e.edge_type != filter {
                continue;
            }
        }
        adjacency
            .entry(e.source_id.as_str())
            .or_default()
            .push((e.target_id.as_str(), e.edge_type));
        adjacency
            .entry(e.target_id.as_str())
            .or_default()
            .push((e.source_id.as_str(), e.edge_type));
    }

    let mut visited: HashSet<String> = HashSet::from([start_id.to_string()]);
    let mut queue: VecDeque<(String, usize)> = VecDeque::from([(start_id.to_string(), 0)]);
    let mut reached: Vec<(String, usize, EdgeType)> = Vec::new();

    'outer: while let Some((current, hop)) = queue.pop_front() {
        if hop >= opts.max_depth {
            continue;
        }
        let Some(neighbors) = adjacency.get(current.as_str()) else {
            continue;
        };
        for (neighbor, via) in neighbors {
            if visited.contains(*neighbor) {
                continue;
            }
            visited.insert(neighbor.to_string());
            if !insight_map.contains_key(*neighbor) {
                continue; // dangling reference; skip but keep scanning
            }
            reached.push((neighbor.to_string(), hop + 1, *via));
            if opts.max_nodes > 0 && reached.len() >= opts.max_nodes {
                break 'outer;
            }
            queue.push_back((neighbor.to_string(), hop + 1));
        }
    }

    Ok(reached
        .into_iter()
        .filter_map(|(id, hop, via_edge)| {
            insight_map.remove(&id).map(|insight| BfsNode {
                insight,
                hop,
                via_edge,
            })
        })
        .collect())
}
