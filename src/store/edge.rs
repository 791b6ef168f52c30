//! Edge upsert, traversal queries, and cascade deletion.

use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashMap};

use crate::error::{MnemonError, Result};
use crate::model::{format_timestamp, parse_timestamp, Edge, EdgeMetadata, EdgeType};

const EDGE_COLUMNS: &str = "source_id, target_id, edge_type, weight, metadata, created_at";

/// Upsert a directed edge.
///
/// The `(source_id, target_id, edge_type)` key is replaced on conflict, so
/// repeating a link is idempotent (last weight/metadata wins). Rejects
/// self-loops, out-of-range weights, and endpoints that are missing or
/// soft-deleted.
pub fn insert_edge(conn: &Connection, e: &Edge) -> Result<()> {
    if e.source_id == e.target_id {
        return Err(MnemonError::InvalidInput(format!(
            "self-loop edge rejected for insight {}",
            e.source_id
        )));
    }
    if !(0.0..=1.0).contains(&e.weight) {
        return Err(MnemonError::InvalidInput(format!(
            "weight must be between 0.0 and 1.0, got {}",
            e.weight
        )));
    }
    for id in [&e.source_id, &e.target_id] {
        if !insight_is_active(conn, id)? {
            return Err(MnemonError::NotFound(format!("insight {id} not found")));
        }
    }

    conn.execute(
        "INSERT OR REPLACE INTO edges \
         (source_id, target_id, edge_type, weight, metadata, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            e.source_id,
            e.target_id,
            e.edge_type.as_str(),
            e.weight,
            e.metadata.to_json(),
            format_timestamp(e.created_at),
        ],
    )?;
    Ok(())
}

fn insight_is_active(conn: &Connection, id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM insights WHERE id = ?1 AND deleted_at IS NULL",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// All edges where the given node is source or target.
pub fn get_edges_by_node(conn: &Connection, node_id: &str) -> Result<Vec<Edge>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EDGE_COLUMNS} FROM edges WHERE source_id = ?1 \
         UNION ALL \
         SELECT {EDGE_COLUMNS} FROM edges WHERE target_id = ?1 AND source_id != ?1"
    ))?;
    let rows = stmt
        .query_map(params![node_id], scan_edge)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Edges incident on a node, filtered by type.
pub fn get_edges_by_node_and_type(
    conn: &Connection,
    node_id: &str,
    edge_type: EdgeType,
) -> Result<Vec<Edge>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EDGE_COLUMNS} FROM edges WHERE source_id = ?1 AND edge_type = ?2 \
         UNION ALL \
         SELECT {EDGE_COLUMNS} FROM edges \
         WHERE target_id = ?1 AND edge_type = ?2 AND source_id != ?1"
    ))?;
    let rows = stmt
        .query_map(params![node_id, edge_type.as_str()], scan_edge)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Outgoing edges from a node, filtered by type.
pub fn get_edges_by_source_and_type(
    conn: &Connection,
    source_id: &str,
    edge_type: EdgeType,
) -> Result<Vec<Edge>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EDGE_COLUMNS} FROM edges WHERE source_id = ?1 AND edge_type = ?2"
    ))?;
    let rows = stmt
        .query_map(params![source_id, edge_type.as_str()], scan_edge)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every edge in the graph.
pub fn get_all_edges(conn: &Connection) -> Result<Vec<Edge>> {
    let mut stmt = conn.prepare(&format!("SELECT {EDGE_COLUMNS} FROM edges"))?;
    let rows = stmt
        .query_map([], scan_edge)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Remove all edges referencing a node (soft-delete cascade).
pub fn delete_edges_by_node(conn: &Connection, node_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM edges WHERE source_id = ?1 OR target_id = ?1",
        params![node_id],
    )?;
    Ok(())
}

/// Active insight ids carrying the given entity, newest first.
pub fn find_insights_with_entity(
    conn: &Connection,
    entity: &str,
    exclude_id: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT i.id FROM insights i, json_each(i.entities) je \
         WHERE i.deleted_at IS NULL AND i.id != ?1 AND je.value = ?2 \
         ORDER BY i.created_at DESC LIMIT ?3",
    )?;
    let rows = stmt
        .query_map(params![exclude_id, entity, limit as i64], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Edge counts grouped by type, zero-filled for the status command.
pub fn count_edges_by_type(conn: &Connection) -> Result<HashMap<String, usize>> {
    let mut map = HashMap::new();
    for t in EdgeType::ALL {
        map.insert(t.as_str().to_string(), 0);
    }
    let mut stmt = conn.prepare("SELECT edge_type, COUNT(*) FROM edges GROUP BY edge_type")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (t, count) in rows {
        map.insert(t, count);
    }
    Ok(map)
}

/// Parse a database row into an [`Edge`].
fn scan_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
    let edge_type_str: String = row.get(2)?;
    let metadata_str: String = row.get(4)?;
    let created_str: String = row.get(5)?;

    let edge_type = edge_type_str.parse::<EdgeType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let metadata_map: BTreeMap<String, String> =
        serde_json::from_str(&metadata_str).unwrap_or_default();

    Ok(Edge {
        source_id: row.get(0)?,
        target_id: row.get(1)?,
        edge_type,
        weight: row.get(3)?,
        metadata: EdgeMetadata::from_map(edge_type, metadata_map),
        created_at: parse_timestamp(&created_str).unwrap_or_else(chrono::Utc::now),
    })
}
