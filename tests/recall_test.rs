mod helpers;

use helpers::{remember_simple, test_db};
use mnemon::model::{CausalKind, Edge, EdgeMetadata, EdgeType};
use mnemon::search::intent::Intent;
use mnemon::search::recall::{intent_aware_recall, RecallParams};
use mnemon::store::{edge, insight as insight_store};
use std::str::FromStr;

fn query(q: &str) -> RecallParams {
    RecallParams {
        query: q.to_string(),
        query_vec: None,
        query_entities: vec![],
        limit: 10,
        intent_override: None,
        category: None,
        source: None,
    }
}

fn causal_link(conn: &rusqlite::Connection, cause: &str, effect: &str) {
    edge::insert_edge(
        conn,
        &Edge::new(
            cause,
            effect,
            EdgeType::Causal,
            0.8,
            EdgeMetadata::Causal {
                sub_type: CausalKind::Causes,
                reason: "because".to_string(),
            },
        ),
    )
    .unwrap();
}

#[test]
fn why_recall_orders_causal_chain() {
    let mut conn = test_db();
    let cause = remember_simple(&mut conn, "logs grew unbounded on the shared volume");
    let middle = remember_simple(&mut conn, "database volume filled up completely");
    let effect = remember_simple(&mut conn, "api returned five hundred errors all night");
    causal_link(&conn, &cause.id, &middle.id);
    causal_link(&conn, &middle.id, &effect.id);

    let mut params = query("why did the api return errors database volume logs");
    params.limit = 3;
    let resp = intent_aware_recall(&conn, &params).unwrap();

    assert_eq!(resp.meta.intent, Intent::Why);
    assert_eq!(resp.meta.intent_source, "auto");
    assert_eq!(resp.results.len(), 3);

    let ids: Vec<&str> = resp.results.iter().map(|r| r.insight.id.as_str()).collect();
    let pos = |id: &str| ids.iter().position(|x| *x == id).unwrap();
    assert!(pos(&cause.id) < pos(&middle.id));
    assert!(pos(&middle.id) < pos(&effect.id));

    for r in &resp.results {
        assert_eq!(r.intent, Intent::Why);
        assert!(r.signals.graph >= 0.0);
    }
}

#[test]
fn unknown_intent_override_is_an_input_error() {
    assert!(Intent::from_str("HOW").is_err());
    assert!(Intent::from_str("").is_err());
    assert_eq!(Intent::from_str("entity").unwrap(), Intent::Entity);
}

#[test]
fn rrf_survives_no_keyword_and_no_embedding() {
    let mut conn = test_db();
    remember_simple(&mut conn, "first plain note");
    remember_simple(&mut conn, "second plain note here");

    // Query shares no tokens and there is no embedding: anchors come from
    // recency (and entity, which is empty) only
    let resp = intent_aware_recall(&conn, &query("zzzz wwww")).unwrap();
    assert_eq!(resp.results.len(), 2);
    assert!(resp.meta.anchor_count >= 2);
}

#[test]
fn recall_side_effects_update_counters() {
    let mut conn = test_db();
    let hit = remember_simple(&mut conn, "redis eviction policy is volatile lru");

    let edges_before = edge::get_all_edges(&conn).unwrap().len();
    let resp = intent_aware_recall(&conn, &query("redis eviction policy")).unwrap();
    assert!(!resp.results.is_empty());

    let loaded = insight_store::get_insight(&conn, &hit.id).unwrap().unwrap();
    assert_eq!(loaded.access_count, 1);
    assert!(loaded.last_accessed_at.is_some());

    // Recall must not create or remove edges
    assert_eq!(edge::get_all_edges(&conn).unwrap().len(), edges_before);
}

#[test]
fn signals_are_exposed_verbatim() {
    let mut conn = test_db();
    remember_simple(&mut conn, "kafka partitions rebalance on broker restart");

    let resp = intent_aware_recall(&conn, &query("kafka partitions")).unwrap();
    let top = &resp.results[0];
    assert!(top.signals.keyword > 0.0);
    assert_eq!(top.signals.similarity, 0.0); // no embeddings anywhere
    assert!(top.score > 0.0);
    assert!(!top.via.is_empty());
}

#[test]
fn via_reflects_traversal_edge_type() {
    let mut conn = test_db();
    let anchor = remember_simple(&mut conn, "terraform state lives in the s3 bucket");
    let neighbor = remember_simple(&mut conn, "unrelated delivery checklist item");
    edge::insert_edge(
        &conn,
        &Edge::new(
            &anchor.id,
            &neighbor.id,
            EdgeType::Entity,
            1.0,
            EdgeMetadata::Entity {
                entity: "terraform".to_string(),
            },
        ),
    )
    .unwrap();

    let resp = intent_aware_recall(&conn, &query("terraform state bucket")).unwrap();
    let reached = resp
        .results
        .iter()
        .find(|r| r.insight.id == neighbor.id)
        .expect("neighbor reached through the graph");
    // Anchor signals never claim it; the entity edge did
    assert_eq!(reached.via, "entity");
}

#[test]
fn limit_and_intent_override_apply() {
    let mut conn = test_db();
    for i in 0..6 {
        remember_simple(&mut conn, &format!("deployment note number {i}"));
    }

    let mut params = query("deployment note");
    params.limit = 2;
    params.intent_override = Some(Intent::Entity);
    let resp = intent_aware_recall(&conn, &params).unwrap();

    assert_eq!(resp.results.len(), 2);
    assert_eq!(resp.meta.intent, Intent::Entity);
    assert_eq!(resp.meta.intent_source, "override");
}
