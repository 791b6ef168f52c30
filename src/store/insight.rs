//! Insight CRUD, lifecycle bookkeeping, and aggregate statistics.
//!
//! Owns the effective-importance (EI) model: [`compute_effective_importance`]
//! is the pure formula, [`refresh_all_effective_importance`] runs it over
//! every active insight inside the write transaction, and [`auto_prune`]
//! soft-deletes the lowest-EI non-immune rows once the store exceeds its
//! capacity.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{MnemonError, Result};
use crate::model::{
    base_weight, format_timestamp, is_immune, parse_timestamp, Category, Insight, InsightSource,
};

/// Half-life for the access-recency decay factor, in days.
pub const HALF_LIFE_DAYS: f64 = 30.0;
/// Active-insight capacity; exceeding it triggers auto-pruning.
pub const MAX_INSIGHTS: usize = 1000;
/// Upper bound on soft-deletes per prune invocation.
pub const PRUNE_BATCH_SIZE: usize = 10;

const SELECT_COLUMNS: &str = "id, content, category, importance, tags, entities, source, \
     access_count, created_at, updated_at, deleted_at, last_accessed_at, effective_importance";

/// Insert a new insight row.
pub fn insert_insight(conn: &Connection, i: &Insight) -> Result<()> {
    conn.execute(
        "INSERT INTO insights \
         (id, content, category, importance, tags, entities, source, access_count, \
          created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            i.id,
            i.content,
            i.category.as_str(),
            i.importance,
            serde_json::to_string(&i.tags).unwrap_or_else(|_| "[]".into()),
            serde_json::to_string(&i.entities).unwrap_or_else(|_| "[]".into()),
            i.source.as_str(),
            i.access_count,
            format_timestamp(i.created_at),
            format_timestamp(i.updated_at),
        ],
    )?;
    Ok(())
}

/// Fetch a single active insight.
pub fn get_insight(conn: &Connection, id: &str) -> Result<Option<Insight>> {
    let row = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM insights WHERE id = ?1 AND deleted_at IS NULL"),
            params![id],
            scan_insight,
        )
        .optional()?;
    Ok(row)
}

/// Fetch a single insight even if soft-deleted.
pub fn get_insight_include_deleted(conn: &Connection, id: &str) -> Result<Option<Insight>> {
    let row = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM insights WHERE id = ?1"),
            params![id],
            scan_insight,
        )
        .optional()?;
    Ok(row)
}

/// Filters for the basic LIKE query path.
#[derive(Debug, Default)]
pub struct QueryFilter<'a> {
    pub keyword: Option<&'a str>,
    pub category: Option<Category>,
    pub min_importance: i32,
    pub source: Option<InsightSource>,
    pub limit: usize,
}

/// Basic query: LIKE keyword + enum filters, ordered by importance then
/// recency.
pub fn query_insights(conn: &Connection, filter: &QueryFilter) -> Result<Vec<Insight>> {
    let mut conditions = vec!["deleted_at IS NULL".to_string()];
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(keyword) = filter.keyword {
        if !keyword.is_empty() {
            conditions.push(format!("content LIKE ?{}", args.len() + 1));
            args.push(Box::new(format!("%{keyword}%")));
        }
    }
    if let Some(category) = filter.category {
        conditions.push(format!("category = ?{}", args.len() + 1));
        args.push(Box::new(category.as_str().to_string()));
    }
    if filter.min_importance > 0 {
        conditions.push(format!("importance >= ?{}", args.len() + 1));
        args.push(Box::new(filter.min_importance));
    }
    if let Some(source) = filter.source {
        conditions.push(format!("source = ?{}", args.len() + 1));
        args.push(Box::new(source.as_str().to_string()));
    }

    let limit = if filter.limit == 0 { 20 } else { filter.limit };
    args.push(Box::new(limit as i64));

    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM insights WHERE {} \
         ORDER BY importance DESC, created_at DESC LIMIT ?{}",
        conditions.join(" AND "),
        args.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt
        .query_map(params.as_slice(), scan_insight)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Soft-delete an insight and cascade-remove all incident edges.
pub fn soft_delete_insight(conn: &Connection, id: &str) -> Result<()> {
    let now = format_timestamp(Utc::now());
    let affected = conn.execute(
        "UPDATE insights SET deleted_at = ?1, updated_at = ?1 \
         WHERE id = ?2 AND deleted_at IS NULL",
        params![now, id],
    )?;
    if affected == 0 {
        return Err(MnemonError::NotFound(format!(
            "insight {id} not found or already deleted"
        )));
    }
    super::edge::delete_edges_by_node(conn, id)?;
    Ok(())
}

/// Replace the entities field for an insight (post-extraction merge).
pub fn update_entities(conn: &Connection, id: &str, entities: &[String]) -> Result<()> {
    let now = format_timestamp(Utc::now());
    conn.execute(
        "UPDATE insights SET entities = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            serde_json::to_string(entities).unwrap_or_else(|_| "[]".into()),
            now,
            id
        ],
    )?;
    Ok(())
}

/// Bump the access count and refresh last_accessed_at (recall hit).
pub fn increment_access_count(conn: &Connection, id: &str) -> Result<()> {
    let now = format_timestamp(Utc::now());
    conn.execute(
        "UPDATE insights SET access_count = access_count + 1, last_accessed_at = ?1 \
         WHERE id = ?2",
        params![now, id],
    )?;
    Ok(())
}

/// Boost retention: `access_count += 3`, which unconditionally crosses the
/// immunity threshold.
pub fn boost_retention(conn: &Connection, id: &str) -> Result<()> {
    let now = format_timestamp(Utc::now());
    let affected = conn.execute(
        "UPDATE insights SET access_count = access_count + 3, \
         last_accessed_at = ?1, updated_at = ?1 \
         WHERE id = ?2 AND deleted_at IS NULL",
        params![now, id],
    )?;
    if affected == 0 {
        return Err(MnemonError::NotFound(format!(
            "insight {id} not found or already deleted"
        )));
    }
    Ok(())
}

/// The effective-importance formula. Deterministic given its inputs.
pub fn compute_effective_importance(
    importance: i32,
    access_count: u32,
    days_since_access: f64,
    edge_count: usize,
) -> f64 {
    let base = base_weight(importance);
    let access_factor = (1.0 + f64::from(access_count)).ln().max(1.0);
    let decay_factor = 0.5_f64.powf(days_since_access / HALF_LIFE_DAYS);
    let edge_factor = 1.0 + 0.1 * edge_count.min(5) as f64;
    base * access_factor * decay_factor * edge_factor
}

/// Recompute and store effective_importance for one active insight.
pub fn refresh_effective_importance(conn: &Connection, id: &str) -> Result<f64> {
    let row: Option<(i32, u32, String, Option<String>)> = conn
        .query_row(
            "SELECT importance, access_count, created_at, last_accessed_at \
             FROM insights WHERE id = ?1 AND deleted_at IS NULL",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    let Some((importance, access_count, created_at, last_accessed_at)) = row else {
        return Err(MnemonError::NotFound(format!("insight {id} not found")));
    };

    let last_access = last_accessed_at
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| parse_timestamp(&created_at))
        .unwrap_or_else(Utc::now);
    let days_since = (Utc::now() - last_access).num_seconds() as f64 / 86_400.0;

    let edge_count: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM edges WHERE source_id = ?1) + \
                (SELECT COUNT(*) FROM edges WHERE target_id = ?1)",
        params![id],
        |row| row.get(0),
    )?;

    let ei = compute_effective_importance(
        importance,
        access_count,
        days_since.max(0.0),
        edge_count as usize,
    );

    conn.execute(
        "UPDATE insights SET effective_importance = ?1 WHERE id = ?2",
        params![ei, id],
    )?;
    Ok(ei)
}

/// Recompute effective_importance for every active insight. Returns the
/// number of rows refreshed. Runs inside the write transaction.
pub fn refresh_all_effective_importance(conn: &Connection) -> Result<usize> {
    let rows: Vec<(String, i32, u32, String, Option<String>)> = {
        let mut stmt = conn.prepare(
            "SELECT id, importance, access_count, created_at, last_accessed_at \
             FROM insights WHERE deleted_at IS NULL",
        )?;
        let mapped = stmt.query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
        mapped
    };

    let edge_counts = edge_counts_by_node(conn)?;
    let now = Utc::now();

    let mut stmt =
        conn.prepare("UPDATE insights SET effective_importance = ?1 WHERE id = ?2")?;
    let mut refreshed = 0;
    for (id, importance, access_count, created_at, last_accessed_at) in rows {
        let last_access = last_accessed_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| parse_timestamp(&created_at))
            .unwrap_or(now);
        let days_since = ((now - last_access).num_seconds() as f64 / 86_400.0).max(0.0);
        let edges = edge_counts.get(&id).copied().unwrap_or(0);
        let ei = compute_effective_importance(importance, access_count, days_since, edges);
        stmt.execute(params![ei, id])?;
        refreshed += 1;
    }
    Ok(refreshed)
}

/// Incident-edge counts for every node (both directions).
fn edge_counts_by_node(conn: &Connection) -> Result<HashMap<String, usize>> {
    let mut stmt = conn.prepare(
        "SELECT id, SUM(cnt) FROM ( \
           SELECT source_id AS id, COUNT(*) AS cnt FROM edges GROUP BY source_id \
           UNION ALL \
           SELECT target_id AS id, COUNT(*) AS cnt FROM edges GROUP BY target_id \
         ) GROUP BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().collect())
}

/// A prune candidate from a retention review.
#[derive(Debug, Serialize)]
pub struct RetentionCandidate {
    #[serde(flatten)]
    pub insight: Insight,
    pub effective_importance: f64,
    pub days_since_access: f64,
    pub edge_count: usize,
    pub immune: bool,
}

/// Read-only retention review: non-immune insights with EI below the
/// threshold, ascending. Returns `(candidates, total_active)`.
pub fn retention_candidates(
    conn: &Connection,
    threshold: f64,
    limit: usize,
) -> Result<(Vec<RetentionCandidate>, usize)> {
    let insights = get_all_active_insights(conn)?;
    let edge_counts = edge_counts_by_node(conn)?;
    let now = Utc::now();
    let total = insights.len();

    let mut candidates = Vec::new();
    for ins in insights {
        let last_access = ins.last_accessed_at.unwrap_or(ins.created_at);
        let days_since = ((now - last_access).num_seconds() as f64 / 86_400.0).max(0.0);
        let edge_count = edge_counts.get(&ins.id).copied().unwrap_or(0);
        let ei = compute_effective_importance(
            ins.importance,
            ins.access_count,
            days_since,
            edge_count,
        );
        let immune = is_immune(ins.importance, ins.access_count);
        if ei < threshold && !immune {
            candidates.push(RetentionCandidate {
                insight: ins,
                effective_importance: ei,
                days_since_access: days_since,
                edge_count,
                immune,
            });
        }
    }

    candidates.sort_by(|a, b| {
        a.effective_importance
            .partial_cmp(&b.effective_importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if limit > 0 && candidates.len() > limit {
        candidates.truncate(limit);
    }
    Ok((candidates, total))
}

/// Count non-deleted insights.
pub fn count_active_insights(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL",
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Soft-delete the lowest-EI non-immune insights when over capacity.
///
/// Never touches `exclude_id` (the insight that triggered the prune) and
/// removes at most [`PRUNE_BATCH_SIZE`] rows per invocation.
pub fn auto_prune(
    conn: &Connection,
    max_insights: usize,
    exclude_id: Option<&str>,
) -> Result<usize> {
    let total = count_active_insights(conn)?;
    if total <= max_insights {
        return Ok(0);
    }
    let excess = (total - max_insights).min(PRUNE_BATCH_SIZE);

    let exclude = exclude_id.unwrap_or("");
    let ids: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT id FROM insights \
             WHERE deleted_at IS NULL AND importance < 4 AND access_count < 3 \
               AND id != ?1 \
             ORDER BY effective_importance ASC LIMIT ?2",
        )?;
        let mapped = stmt.query_map(params![exclude, excess as i64], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        mapped
    };

    let mut pruned = 0;
    for id in ids {
        soft_delete_insight(conn, &id)?;
        super::oplog::log_op(conn, "auto-prune", Some(&id), "over capacity")?;
        pruned += 1;
    }
    Ok(pruned)
}

/// Active insights created within the given time window, newest first.
pub fn get_recent_in_window(
    conn: &Connection,
    exclude_id: &str,
    window_hours: f64,
    limit: usize,
) -> Result<Vec<Insight>> {
    let cutoff = Utc::now() - chrono::Duration::seconds((window_hours * 3600.0) as i64);
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM insights \
         WHERE id != ?1 AND deleted_at IS NULL AND created_at >= ?2 \
         ORDER BY created_at DESC LIMIT ?3"
    ))?;
    let rows = stmt
        .query_map(
            params![exclude_id, format_timestamp(cutoff), limit as i64],
            scan_insight,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The most recent active insight from the given source, if any.
pub fn get_latest_by_source(
    conn: &Connection,
    source: InsightSource,
    exclude_id: &str,
) -> Result<Option<Insight>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM insights \
                 WHERE source = ?1 AND id != ?2 AND deleted_at IS NULL \
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ),
            params![source.as_str(), exclude_id],
            scan_insight,
        )
        .optional()?;
    Ok(row)
}

/// The N most recent active insights regardless of source.
pub fn get_recent_active(conn: &Connection, exclude_id: &str, limit: usize) -> Result<Vec<Insight>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM insights \
         WHERE id != ?1 AND deleted_at IS NULL \
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(params![exclude_id, limit as i64], scan_insight)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All active insights, newest first.
pub fn get_all_active_insights(conn: &Connection) -> Result<Vec<Insight>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM insights WHERE deleted_at IS NULL \
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map([], scan_insight)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Store a serialized embedding vector for an insight.
pub fn update_embedding(conn: &Connection, id: &str, blob: &[u8]) -> Result<()> {
    let now = format_timestamp(Utc::now());
    conn.execute(
        "UPDATE insights SET embedding = ?1, updated_at = ?2 WHERE id = ?3",
        params![blob, now, id],
    )?;
    Ok(())
}

/// All active insights carrying embeddings, as `(id, blob)` pairs.
pub fn get_all_embeddings(conn: &Connection) -> Result<Vec<(String, Vec<u8>)>> {
    let mut stmt = conn.prepare(
        "SELECT id, embedding FROM insights \
         WHERE deleted_at IS NULL AND embedding IS NOT NULL",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<(String, Vec<u8>)>, _>>()?;
    Ok(rows.into_iter().filter(|(_, b)| !b.is_empty()).collect())
}

/// `(total_active, embedded_count)` for coverage reporting.
pub fn embedding_stats(conn: &Connection) -> Result<(usize, usize)> {
    let total = count_active_insights(conn)?;
    let embedded: i64 = conn.query_row(
        "SELECT COUNT(*) FROM insights WHERE deleted_at IS NULL AND embedding IS NOT NULL",
        [],
        |row| row.get(0),
    )?;
    Ok((total, embedded as usize))
}

/// Active insights lacking embeddings, highest importance first.
pub fn insights_without_embedding(conn: &Connection, limit: usize) -> Result<Vec<Insight>> {
    let limit = if limit == 0 { 100 } else { limit };
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM insights \
         WHERE deleted_at IS NULL AND embedding IS NULL \
         ORDER BY importance DESC, created_at DESC LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map(params![limit as i64], scan_insight)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Aggregate store statistics for the `status` command.
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total_insights: usize,
    pub deleted_insights: usize,
    pub by_category: HashMap<String, usize>,
    pub edges_by_type: HashMap<String, usize>,
    pub oplog_count: usize,
    pub top_entities: Vec<EntityCount>,
}

#[derive(Debug, Serialize)]
pub struct EntityCount {
    pub entity: String,
    pub count: usize,
}

/// Compute aggregate statistics.
pub fn get_stats(conn: &Connection) -> Result<StoreStats> {
    let total_insights = count_active_insights(conn)?;

    let deleted_insights: i64 = conn.query_row(
        "SELECT COUNT(*) FROM insights WHERE deleted_at IS NOT NULL",
        [],
        |row| row.get(0),
    )?;

    let mut by_category = HashMap::new();
    for cat in Category::ALL {
        by_category.insert(cat.as_str().to_string(), 0);
    }
    {
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) FROM insights \
             WHERE deleted_at IS NULL GROUP BY category",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (cat, count) in rows {
            by_category.insert(cat, count);
        }
    }

    let edges_by_type = super::edge::count_edges_by_type(conn)?;
    let oplog_count = super::oplog::count_oplog(conn)?;

    let top_entities = {
        let mut stmt = conn.prepare(
            "SELECT je.value, COUNT(DISTINCT i.id) AS cnt \
             FROM insights i, json_each(i.entities) je \
             WHERE i.deleted_at IS NULL \
             GROUP BY je.value ORDER BY cnt DESC LIMIT 20",
        )?;
        let mapped = stmt.query_map([], |row| {
            Ok(EntityCount {
                entity: row.get(0)?,
                count: row.get::<_, i64>(1)? as usize,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
        mapped
    };

    Ok(StoreStats {
        total_insights,
        deleted_insights: deleted_insights as usize,
        by_category,
        edges_by_type,
        oplog_count,
        top_entities,
    })
}

/// Parse a database row into an [`Insight`].
pub(crate) fn scan_insight(row: &rusqlite::Row) -> rusqlite::Result<Insight> {
    let category_str: String = row.get(2)?;
    let source_str: String = row.get(6)?;
    let tags_str: String = row.get(4)?;
    let entities_str: String = row.get(5)?;
    let created_str: String = row.get(8)?;
    let updated_str: String = row.get(9)?;
    let deleted_str: Option<String> = row.get(10)?;
    let accessed_str: Option<String> = row.get(11)?;

    let category = category_str
        .parse::<Category>()
        .map_err(|e| conversion_err(2, e))?;
    let source = source_str
        .parse::<InsightSource>()
        .map_err(|e| conversion_err(6, e))?;
    let created_at =
        parse_timestamp(&created_str).ok_or_else(|| bad_timestamp(8, &created_str))?;
    let updated_at =
        parse_timestamp(&updated_str).ok_or_else(|| bad_timestamp(9, &updated_str))?;

    Ok(Insight {
        id: row.get(0)?,
        content: row.get(1)?,
        category,
        importance: row.get(3)?,
        tags: serde_json::from_str(&tags_str).unwrap_or_default(),
        entities: serde_json::from_str(&entities_str).unwrap_or_default(),
        source,
        access_count: row.get(7)?,
        created_at,
        updated_at,
        deleted_at: deleted_str.as_deref().and_then(parse_timestamp),
        last_accessed_at: accessed_str.as_deref().and_then(parse_timestamp),
        effective_importance: row.get(12)?,
    })
}

fn conversion_err(idx: usize, err: MnemonError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn bad_timestamp(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(MnemonError::InvalidInput(format!(
            "unparseable timestamp {value:?}"
        ))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::Insight;

    fn test_db() -> Connection {
        db::open_memory_database().unwrap()
    }

    fn make_insight(content: &str, importance: i32) -> Insight {
        Insight::new(
            content.to_string(),
            Category::General,
            importance,
            vec![],
            vec![],
            InsightSource::User,
        )
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = test_db();
        let mut ins = make_insight("Round trip content", 4);
        ins.tags = vec!["alpha".into(), "beta".into()];
        ins.entities = vec!["Qdrant".into()];
        insert_insight(&conn, &ins).unwrap();

        let loaded = get_insight(&conn, &ins.id).unwrap().unwrap();
        assert_eq!(loaded.content, "Round trip content");
        assert_eq!(loaded.category, Category::General);
        assert_eq!(loaded.importance, 4);
        assert_eq!(loaded.tags, vec!["alpha", "beta"]);
        assert_eq!(loaded.entities, vec!["Qdrant"]);
        assert_eq!(loaded.source, InsightSource::User);
        assert!(loaded.deleted_at.is_none());
    }

    #[test]
    fn soft_delete_hides_from_active_reads() {
        let conn = test_db();
        let ins = make_insight("Ephemeral", 2);
        insert_insight(&conn, &ins).unwrap();

        soft_delete_insight(&conn, &ins.id).unwrap();
        assert!(get_insight(&conn, &ins.id).unwrap().is_none());
        assert!(get_insight_include_deleted(&conn, &ins.id)
            .unwrap()
            .unwrap()
            .deleted_at
            .is_some());

        // Second delete reports NotFound
        assert!(matches!(
            soft_delete_insight(&conn, &ins.id),
            Err(MnemonError::NotFound(_))
        ));
    }

    #[test]
    fn effective_importance_formula() {
        // Fresh insight, no access, no edges: base weight only
        let ei = compute_effective_importance(3, 0, 0.0, 0);
        assert!((ei - 0.5).abs() < 1e-9);

        // access_factor floors at 1.0 for low counts
        let ei = compute_effective_importance(5, 1, 0.0, 0);
        assert!((ei - 1.0).abs() < 1e-9);

        // ln(1+7) > 1 engages the access factor
        let ei = compute_effective_importance(5, 7, 0.0, 0);
        assert!((ei - (8.0_f64).ln()).abs() < 1e-9);

        // One half-life halves the score
        let ei = compute_effective_importance(5, 0, HALF_LIFE_DAYS, 0);
        assert!((ei - 0.5).abs() < 1e-9);

        // Edge factor saturates at 5 edges
        let ei5 = compute_effective_importance(5, 0, 0.0, 5);
        let ei9 = compute_effective_importance(5, 0, 0.0, 9);
        assert!((ei5 - 1.5).abs() < 1e-9);
        assert_eq!(ei5, ei9);
    }

    #[test]
    fn ei_is_deterministic() {
        let a = compute_effective_importance(4, 2, 12.5, 3);
        let b = compute_effective_importance(4, 2, 12.5, 3);
        assert_eq!(a, b);
        assert!(a >= 0.0);
    }

    #[test]
    fn refresh_persists_positive_ei() {
        let conn = test_db();
        let ins = make_insight("EI target", 5);
        insert_insight(&conn, &ins).unwrap();

        let ei = refresh_effective_importance(&conn, &ins.id).unwrap();
        assert!(ei > 0.0);

        let stored: f64 = conn
            .query_row(
                "SELECT effective_importance FROM insights WHERE id = ?1",
                params![ins.id],
                |row| row.get(0),
            )
            .unwrap();
        assert!((stored - ei).abs() < 1e-12);

        assert!(matches!(
            refresh_effective_importance(&conn, "missing"),
            Err(MnemonError::NotFound(_))
        ));
    }

    #[test]
    fn refresh_all_covers_active_rows() {
        let conn = test_db();
        for i in 0..4 {
            insert_insight(&conn, &make_insight(&format!("row {i}"), 3)).unwrap();
        }
        let refreshed = refresh_all_effective_importance(&conn).unwrap();
        assert_eq!(refreshed, 4);

        let zero: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM insights WHERE effective_importance <= 0.0",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(zero, 0);
    }

    #[test]
    fn boost_crosses_immunity() {
        let conn = test_db();
        let ins = make_insight("Keep me", 2);
        insert_insight(&conn, &ins).unwrap();

        boost_retention(&conn, &ins.id).unwrap();
        let loaded = get_insight(&conn, &ins.id).unwrap().unwrap();
        assert_eq!(loaded.access_count, 3);
        assert!(is_immune(loaded.importance, loaded.access_count));

        // Boosting twice accumulates
        boost_retention(&conn, &ins.id).unwrap();
        let loaded = get_insight(&conn, &ins.id).unwrap().unwrap();
        assert_eq!(loaded.access_count, 6);

        assert!(matches!(
            boost_retention(&conn, "missing"),
            Err(MnemonError::NotFound(_))
        ));
    }

    #[test]
    fn auto_prune_respects_capacity_and_immunity() {
        let conn = test_db();
        // 12 low-importance rows over a capacity of 5, one immune
        for i in 0..12 {
            let mut ins = make_insight(&format!("filler {i}"), 1);
            if i == 0 {
                ins.importance = 5;
            }
            insert_insight(&conn, &ins).unwrap();
        }
        refresh_all_effective_importance(&conn).unwrap();

        let pruned = auto_prune(&conn, 5, None).unwrap();
        assert_eq!(pruned, 7); // excess, below the batch cap of 10
        assert_eq!(count_active_insights(&conn).unwrap(), 5);

        // The immune row survived
        let immune_left: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM insights WHERE importance = 5 AND deleted_at IS NULL",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(immune_left, 1);

        // Under capacity: nothing to do
        assert_eq!(auto_prune(&conn, 5, None).unwrap(), 0);
    }

    #[test]
    fn query_insights_filters() {
        let conn = test_db();
        let mut a = make_insight("PostgreSQL tuning notes", 4);
        a.category = Category::Fact;
        insert_insight(&conn, &a).unwrap();
        let mut b = make_insight("Weekend plans", 2);
        b.category = Category::Context;
        insert_insight(&conn, &b).unwrap();

        let hits = query_insights(
            &conn,
            &QueryFilter {
                keyword: Some("PostgreSQL"),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a.id);

        let hits = query_insights(
            &conn,
            &QueryFilter {
                category: Some(Category::Context),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, b.id);

        let hits = query_insights(
            &conn,
            &QueryFilter {
                min_importance: 3,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a.id);
    }

    #[test]
    fn stats_counts_categories_and_deleted() {
        let conn = test_db();
        let mut a = make_insight("A fact", 3);
        a.category = Category::Fact;
        insert_insight(&conn, &a).unwrap();
        let b = make_insight("General note", 3);
        insert_insight(&conn, &b).unwrap();
        soft_delete_insight(&conn, &b.id).unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.total_insights, 1);
        assert_eq!(stats.deleted_insights, 1);
        assert_eq!(stats.by_category["fact"], 1);
        assert_eq!(stats.by_category["general"], 0);
    }
}
