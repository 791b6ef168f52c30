//! Temporal edge creation: backbone chain plus proximity links.

use rusqlite::Connection;

use crate::error::Result;
use crate::model::{Edge, EdgeMetadata, EdgeType, Insight, TemporalKind};
use crate::store::{edge, insight as insight_store};

/// Window for proximity edges, in hours.
pub const TEMPORAL_WINDOW_HOURS: f64 = 24.0;
/// Cap on proximity neighbors per insert.
pub const MAX_PROXIMITY_EDGES: usize = 10;

/// Create backbone and proximity temporal edges for a new insight.
///
/// The backbone links the insight bidirectionally to the most recent
/// active insight from the same source. Proximity links cover every
/// active insight created within the window, weighted `1 / (1 + hours)`.
/// Returns the number of edge rows inserted.
pub fn create_temporal_edges(conn: &Connection, insight: &Insight) -> Result<usize> {
    let mut count = 0;

    let backbone = insight_store::get_latest_by_source(conn, insight.source, &insight.id)?;
    if let Some(prev) = &backbone {
        let hours_diff = hours_between(insight, prev);
        let metadata = EdgeMetadata::Temporal {
            sub_type: TemporalKind::Backbone,
            hours_diff,
        };
        edge::insert_edge(
            conn,
            &Edge::new(&prev.id, &insight.id, EdgeType::Temporal, 1.0, metadata.clone()),
        )?;
        count += 1;
        edge::insert_edge(
            conn,
            &Edge::new(&insight.id, &prev.id, EdgeType::Temporal, 1.0, metadata),
        )?;
        count += 1;
    }

    let recent = insight_store::get_recent_in_window(
        conn,
        &insight.id,
        TEMPORAL_WINDOW_HOURS,
        MAX_PROXIMITY_EDGES,
    )?;
    let backbone_id = backbone.map(|p| p.id).unwrap_or_default();

    for near in recent {
        if near.id == backbone_id {
            continue;
        }
        let hours_diff = hours_between(insight, &near);
        let weight = 1.0 / (1.0 + hours_diff);
        let metadata = EdgeMetadata::Temporal {
            sub_type: TemporalKind::Proximity,
            hours_diff,
        };
        edge::insert_edge(
            conn,
            &Edge::new(&insight.id, &near.id, EdgeType::Temporal, weight, metadata.clone()),
        )?;
        count += 1;
        edge::insert_edge(
            conn,
            &Edge::new(&near.id, &insight.id, EdgeType::Temporal, weight, metadata),
        )?;
        count += 1;
    }

    Ok(count)
}

fn hours_between(a: &Insight, b: &Insight) -> f64 {
    ((a.created_at - b.created_at).num_seconds() as f64 / 3600.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::{format_timestamp, Category, InsightSource};
    use crate::store::insight::insert_insight;
    use chrono::{Duration, Utc};
    use rusqlite::params;

    fn make_insight(content: &str, source: InsightSource) -> Insight {
        Insight::new(
            content.to_string(),
            Category::General,
            3,
            vec![],
            vec![],
            source,
        )
    }

    fn backdate(conn: &Connection, id: &str, hours: f64) {
        let ts = format_timestamp(Utc::now() - Duration::seconds((hours * 3600.0) as i64));
        conn.execute(
            "UPDATE insights SET created_at = ?1 WHERE id = ?2",
            params![ts, id],
        )
        .unwrap();
    }

    #[test]
    fn backbone_links_latest_same_source() {
        let conn = db::open_memory_database().unwrap();
        let first = make_insight("first user insight", InsightSource::User);
        insert_insight(&conn, &first).unwrap();
        backdate(&conn, &first.id, 30.0); // outside the proximity window

        let second = make_insight("second user insight", InsightSource::User);
        insert_insight(&conn, &second).unwrap();

        let count = create_temporal_edges(&conn, &second).unwrap();
        assert_eq!(count, 2); // backbone only, both directions

        let edges = edge::get_edges_by_source_and_type(&conn, &second.id, EdgeType::Temporal)
            .unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target_id, first.id);
        match &edges[0].metadata {
            EdgeMetadata::Temporal { sub_type, .. } => {
                assert_eq!(*sub_type, TemporalKind::Backbone)
            }
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn no_backbone_across_sources() {
        let conn = db::open_memory_database().unwrap();
        let agent = make_insight("agent observation", InsightSource::Agent);
        insert_insight(&conn, &agent).unwrap();
        backdate(&conn, &agent.id, 30.0);

        let user = make_insight("user note", InsightSource::User);
        insert_insight(&conn, &user).unwrap();

        let count = create_temporal_edges(&conn, &user).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn proximity_weight_follows_hours() {
        let conn = db::open_memory_database().unwrap();
        let near = make_insight("agent half hour ago", InsightSource::Agent);
        insert_insight(&conn, &near).unwrap();
        backdate(&conn, &near.id, 0.5);

        let new = make_insight("user new insight", InsightSource::User);
        insert_insight(&conn, &new).unwrap();

        // Different source: no backbone, proximity only
        let count = create_temporal_edges(&conn, &new).unwrap();
        assert_eq!(count, 2);

        let edges =
            edge::get_edges_by_source_and_type(&conn, &new.id, EdgeType::Temporal).unwrap();
        assert_eq!(edges.len(), 1);
        // 1 / (1 + 0.5)
        assert!((edges[0].weight - 2.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn proximity_capped_at_ten_neighbors() {
        let conn = db::open_memory_database().unwrap();
        for i in 0..15 {
            let ins = make_insight(&format!("agent note {i}"), InsightSource::Agent);
            insert_insight(&conn, &ins).unwrap();
            backdate(&conn, &ins.id, 1.0 + i as f64 * 0.1);
        }

        let new = make_insight("user new insight", InsightSource::User);
        insert_insight(&conn, &new).unwrap();

        create_temporal_edges(&conn, &new).unwrap();
        let outgoing =
            edge::get_edges_by_source_and_type(&conn, &new.id, EdgeType::Temporal).unwrap();
        // At most 10 proximity neighbors
        assert!(outgoing.len() <= MAX_PROXIMITY_EDGES);
        assert!(!outgoing.is_empty());
    }

    #[test]
    fn window_excludes_old_insights() {
        let conn = db::open_memory_database().unwrap();
        let old = make_insight("agent stale note", InsightSource::Agent);
        insert_insight(&conn, &old).unwrap();
        backdate(&conn, &old.id, 48.0);

        let new = make_insight("user fresh note", InsightSource::User);
        insert_insight(&conn, &new).unwrap();

        assert_eq!(create_temporal_edges(&conn, &new).unwrap(), 0);
    }
}
