//! Command handlers — store resolution, core invocation, JSON emission.
//!
//! Every mutating command emits a single JSON object on success; query
//! commands emit an array or a `{meta, results}` object. Errors bubble to
//! `main`, which renders a JSON error object and a non-zero exit code.

pub mod viz;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::MnemonConfig;
use crate::db;
use crate::embed::ollama::OllamaProvider;
use crate::embed::{create_provider, try_embed, EmbeddingProvider};
use crate::error::MnemonError;
use crate::graph::bfs::{bfs, BfsOptions};
use crate::graph::entity::extract_entities;
use crate::model::{
    format_float, is_immune, Category, Edge, EdgeMetadata, EdgeType, InsightSource,
};
use crate::pipeline::{remember as run_remember, RememberRequest};
use crate::search::intent::Intent;
use crate::search::keyword::keyword_search;
use crate::search::recall::{intent_aware_recall, RecallParams};
use crate::store::insight::{
    boost_retention, embedding_stats, get_insight, get_stats, insights_without_embedding,
    query_insights, refresh_effective_importance, retention_candidates, soft_delete_insight,
    update_embedding, QueryFilter, MAX_INSIGHTS,
};
use crate::store::{edge, insight as insight_store, oplog};

/// Resolved command context: data dir and store selection.
pub struct Ctx {
    pub data_dir: PathBuf,
    pub store_flag: Option<String>,
    pub config: MnemonConfig,
}

impl Ctx {
    pub fn new(config: MnemonConfig, data_dir_flag: Option<String>, store_flag: Option<String>) -> Self {
        let data_dir = match data_dir_flag {
            Some(dir) => crate::config::expand_tilde(&dir),
            None => config.resolved_data_dir(),
        };
        Self {
            data_dir,
            store_flag,
            config,
        }
    }

    /// Store resolution priority: `--store` flag, `MNEMON_STORE`, the
    /// active file, then the literal default.
    pub fn resolve_store_name(&self) -> String {
        if let Some(name) = &self.store_flag {
            return name.clone();
        }
        if let Ok(name) = std::env::var("MNEMON_STORE") {
            if !name.is_empty() {
                return name;
            }
        }
        db::read_active(&self.data_dir)
    }

    fn open(&self) -> Result<Connection> {
        let name = self.resolve_store_name();
        if !db::valid_store_name(&name) {
            return Err(MnemonError::InvalidInput(format!("invalid store name {name:?}")).into());
        }
        db::open_store(&self.data_dir, &name)
    }

    fn provider(&self) -> OllamaProvider {
        create_provider(&self.config.embedding)
    }

    fn db_path(&self) -> PathBuf {
        db::store_dir(&self.data_dir, &self.resolve_store_name()).join(db::DB_FILE_NAME)
    }
}

/// Write pretty-printed JSON to stdout.
fn json_out<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Split a comma-separated flag value into trimmed non-empty items.
fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// ── remember ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn remember(
    ctx: &Ctx,
    content: &str,
    cat: &str,
    imp: i32,
    tags: &str,
    entities: &str,
    source: &str,
    no_diff: bool,
) -> Result<()> {
    let category = Category::from_str(cat)?;
    let source = InsightSource::from_str(source)?;

    let mut conn = ctx.open()?;
    let provider = ctx.provider();
    let output = run_remember(
        &mut conn,
        &provider,
        RememberRequest {
            content: content.to_string(),
            category,
            importance: imp,
            tags: parse_csv(tags),
            entities: parse_csv(entities),
            source,
            no_diff,
        },
    )?;
    json_out(&output)
}

// ── recall / search ───────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn recall(
    ctx: &Ctx,
    query: &str,
    cat: Option<&str>,
    limit: usize,
    source: Option<&str>,
    basic: bool,
    intent: Option<&str>,
) -> Result<()> {
    let category = cat.map(Category::from_str).transpose()?;
    let source = source.map(InsightSource::from_str).transpose()?;
    let conn = ctx.open()?;

    if basic {
        let results = query_insights(
            &conn,
            &QueryFilter {
                keyword: Some(query),
                category,
                min_importance: 0,
                source,
                limit,
            },
        )?;
        for r in &results {
            insight_store::increment_access_count(&conn, &r.id)?;
        }
        oplog::log_op(
            &conn,
            "recall:basic",
            None,
            &format!("q={query} hits={}", results.len()),
        )?;
        return json_out(&results);
    }

    let intent_override = intent.map(Intent::from_str).transpose()?;
    let provider = ctx.provider();
    let query_vec = try_embed(&provider, query);
    let query_entities = extract_entities(query);

    let response = intent_aware_recall(
        &conn,
        &RecallParams {
            query: query.to_string(),
            query_vec,
            query_entities,
            limit,
            intent_override,
            category,
            source,
        },
    )?;

    oplog::log_op(
        &conn,
        "recall",
        None,
        &format!("q={query} hits={}", response.results.len()),
    )?;
    json_out(&response)
}

pub fn search(ctx: &Ctx, query: &str, limit: usize) -> Result<()> {
    let conn = ctx.open()?;
    let all = insight_store::get_all_active_insights(&conn)?;
    let results = keyword_search(&all, query, limit);

    for (ins, _) in &results {
        insight_store::increment_access_count(&conn, &ins.id)?;
    }
    oplog::log_op(&conn, "search", None, &format!("q={query} hits={}", results.len()))?;

    #[derive(Serialize)]
    struct SearchHit<'a> {
        id: &'a str,
        content: &'a str,
        category: &'a str,
        importance: i32,
        tags: &'a [String],
        score: f64,
    }

    let out: Vec<SearchHit> = results
        .iter()
        .map(|(ins, score)| SearchHit {
            id: &ins.id,
            content: &ins.content,
            category: ins.category.as_str(),
            importance: ins.importance,
            tags: &ins.tags,
            score: *score,
        })
        .collect();
    json_out(&out)
}

// ── forget / link / related ───────────────────────────────────────────────────

pub fn forget(ctx: &Ctx, id: &str) -> Result<()> {
    let conn = ctx.open()?;
    soft_delete_insight(&conn, id)?;
    oplog::log_op(&conn, "forget", Some(id), "")?;
    json_out(&serde_json::json!({
        "id": id,
        "status": "deleted",
        "message": "insight soft-deleted successfully",
    }))
}

pub fn link(
    ctx: &Ctx,
    source_id: &str,
    target_id: &str,
    edge_type: &str,
    weight: f64,
    meta: Option<&str>,
) -> Result<()> {
    let edge_type = EdgeType::from_str(edge_type)?;

    let mut metadata = match meta {
        Some(raw) => serde_json::from_str::<std::collections::BTreeMap<String, String>>(raw)
            .map_err(|e| MnemonError::InvalidInput(format!("invalid JSON metadata: {e}")))?,
        None => Default::default(),
    };
    metadata.insert("created_by".to_string(), "manual".to_string());

    let conn = ctx.open()?;
    edge::insert_edge(
        &conn,
        &Edge::new(
            source_id,
            target_id,
            edge_type,
            weight,
            EdgeMetadata::Manual(metadata.clone()),
        ),
    )?;
    oplog::log_op(
        &conn,
        "link",
        Some(source_id),
        &format!("{source_id} -> {target_id} ({edge_type})"),
    )?;
    json_out(&serde_json::json!({
        "status": "linked",
        "source_id": source_id,
        "target_id": target_id,
        "edge_type": edge_type.as_str(),
        "weight": weight,
        "metadata": metadata,
    }))
}

pub fn related(ctx: &Ctx, id: &str, edge_filter: Option<&str>, depth: usize) -> Result<()> {
    let edge_filter = edge_filter.map(EdgeType::from_str).transpose()?;
    let conn = ctx.open()?;

    if get_insight(&conn, id)?.is_none() {
        return Err(MnemonError::NotFound(format!("insight {id} not found")).into());
    }

    let nodes = bfs(
        &conn,
        id,
        &BfsOptions {
            max_depth: depth,
            max_nodes: 0,
            edge_filter,
        },
    )?;

    #[derive(Serialize)]
    struct RelatedHit<'a> {
        id: &'a str,
        content: &'a str,
        category: &'a str,
        importance: i32,
        depth: usize,
        via_edge_type: &'a str,
    }

    let out: Vec<RelatedHit> = nodes
        .iter()
        .map(|n| RelatedHit {
            id: &n.insight.id,
            content: &n.insight.content,
            category: n.insight.category.as_str(),
            importance: n.insight.importance,
            depth: n.hop,
            via_edge_type: n.via_edge.as_str(),
        })
        .collect();
    json_out(&out)
}

// ── store management ──────────────────────────────────────────────────────────

pub fn store_list(ctx: &Ctx) -> Result<()> {
    let stores = db::list_stores(&ctx.data_dir);
    if stores.is_empty() {
        println!(
            "  (no stores yet — run 'mnemon store create <name>' or any command to create default)"
        );
        return Ok(());
    }
    let active = db::read_active(&ctx.data_dir);
    for name in stores {
        let prefix = if name == active { "* " } else { "  " };
        println!("{prefix}{name}");
    }
    Ok(())
}

pub fn store_create(ctx: &Ctx, name: &str) -> Result<()> {
    if !db::valid_store_name(name) {
        return Err(MnemonError::InvalidInput(format!("invalid store name {name:?}")).into());
    }
    if db::store_exists(&ctx.data_dir, name) {
        return Err(MnemonError::InvalidInput(format!("store \"{name}\" already exists")).into());
    }
    let conn = db::open_store(&ctx.data_dir, name)?;
    drop(conn);
    println!("Created store \"{name}\"");
    Ok(())
}

pub fn store_set(ctx: &Ctx, name: &str) -> Result<()> {
    if !db::store_exists(&ctx.data_dir, name) {
        return Err(MnemonError::NotFound(format!(
            "store \"{name}\" does not exist (use 'mnemon store create {name}' first)"
        ))
        .into());
    }
    db::write_active(&ctx.data_dir, name)?;
    println!("Active store set to \"{name}\"");
    Ok(())
}

pub fn store_remove(ctx: &Ctx, name: &str) -> Result<()> {
    if !db::store_exists(&ctx.data_dir, name) {
        return Err(MnemonError::NotFound(format!(
            "store \"{name}\" does not exist (use 'mnemon store create {name}' first)"
        ))
        .into());
    }
    let active = db::read_active(&ctx.data_dir);
    if name == active {
        return Err(MnemonError::InvalidInput(format!(
            "cannot remove the active store \"{name}\" (switch first with 'mnemon store set <other>')"
        ))
        .into());
    }
    std::fs::remove_dir_all(db::store_dir(&ctx.data_dir, name))
        .with_context(|| format!("failed to remove store {name}"))?;
    println!("Removed store \"{name}\"");
    Ok(())
}

// ── gc / status / log ─────────────────────────────────────────────────────────

pub fn gc(ctx: &Ctx, threshold: f64, limit: usize, keep: Option<&str>) -> Result<()> {
    let conn = ctx.open()?;

    if let Some(id) = keep {
        let Some(ins) = get_insight(&conn, id)? else {
            return Err(
                MnemonError::NotFound(format!("insight {id} not found or already deleted")).into(),
            );
        };
        boost_retention(&conn, id)?;
        let ei = refresh_effective_importance(&conn, id)?;
        let new_access = ins.access_count + 3;
        oplog::log_op(
            &conn,
            "gc-keep",
            Some(id),
            &format!("access+3, ei={}", format_float(ei)),
        )?;
        return json_out(&serde_json::json!({
            "status": "retained",
            "id": id,
            "content": ins.content,
            "new_access": new_access,
            "effective_importance": ei,
            "immune": is_immune(ins.importance, new_access),
        }));
    }

    let (candidates, total) = retention_candidates(&conn, threshold, limit)?;
    json_out(&serde_json::json!({
        "total_insights": total,
        "threshold": threshold,
        "candidates_found": candidates.len(),
        "candidates": candidates,
        "max_insights": MAX_INSIGHTS,
        "actions": {
            "purge": "mnemon forget <id>",
            "keep": "mnemon gc --keep <id>",
        },
    }))
}

pub fn status(ctx: &Ctx) -> Result<()> {
    let conn = ctx.open()?;
    let stats = get_stats(&conn)?;
    let (total, embedded) = embedding_stats(&conn)?;
    let provider = ctx.provider();

    let db_path = ctx.db_path();
    let db_size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let coverage = if total > 0 {
        format!("{}%", embedded * 100 / total)
    } else {
        "0%".to_string()
    };

    json_out(&serde_json::json!({
        "store": ctx.resolve_store_name(),
        "db_path": db_path,
        "db_size_bytes": db_size_bytes,
        "total_insights": stats.total_insights,
        "deleted_insights": stats.deleted_insights,
        "by_category": stats.by_category,
        "edges_by_type": stats.edges_by_type,
        "oplog_count": stats.oplog_count,
        "top_entities": stats.top_entities,
        "embedded": embedded,
        "embedding_coverage": coverage,
        "ollama_available": provider.available(),
        "embedding_model": crate::db::migrations::get_embedding_model(&conn)?,
    }))
}

pub fn log(ctx: &Ctx, limit: usize) -> Result<()> {
    let conn = ctx.open()?;
    let entries = oplog::get_oplog(&conn, limit)?;
    json_out(&entries)
}

// ── embed ─────────────────────────────────────────────────────────────────────

pub fn embed(ctx: &Ctx, id: Option<&str>, backfill: bool, show_status: bool) -> Result<()> {
    let conn = ctx.open()?;
    let provider = ctx.provider();

    if show_status {
        let (total, embedded) = embedding_stats(&conn)?;
        let coverage = if total > 0 {
            format!("{}%", embedded * 100 / total)
        } else {
            "0%".to_string()
        };
        return json_out(&serde_json::json!({
            "total_insights": total,
            "embedded": embedded,
            "coverage": coverage,
            "ollama_available": provider.available(),
            "model": provider.model(),
        }));
    }

    if backfill {
        if !provider.available() {
            return Err(MnemonError::InvalidInput(provider.unavailable_message()).into());
        }
        let missing = insights_without_embedding(&conn, 1000)?;
        if missing.is_empty() {
            return json_out(&serde_json::json!({
                "status": "complete",
                "message": "all insights already have embeddings",
            }));
        }
        let mut succeeded = 0;
        let mut failed = 0;
        for ins in &missing {
            match provider.embed(&ins.content) {
                Ok(vec) => {
                    update_embedding(
                        &conn,
                        &ins.id,
                        &crate::embed::vector::serialize_vector(&vec),
                    )?;
                    succeeded += 1;
                }
                Err(err) => {
                    tracing::warn!(id = %ins.id, error = %err, "backfill embedding failed");
                    failed += 1;
                }
            }
        }
        return json_out(&serde_json::json!({
            "status": "backfill_complete",
            "succeeded": succeeded,
            "failed": failed,
            "model": provider.model(),
        }));
    }

    if let Some(id) = id {
        if !provider.available() {
            return Err(MnemonError::InvalidInput(provider.unavailable_message()).into());
        }
        let Some(ins) = get_insight(&conn, id)? else {
            return Err(MnemonError::NotFound(format!("insight {id} not found")).into());
        };
        let vec = provider
            .embed(&ins.content)
            .map_err(|e| MnemonError::InvalidInput(format!("embedding failed: {e}")))?;
        update_embedding(&conn, id, &crate::embed::vector::serialize_vector(&vec))?;
        return json_out(&serde_json::json!({
            "status": "embedded",
            "id": id,
            "dimension": vec.len(),
            "model": provider.model(),
        }));
    }

    Err(MnemonError::InvalidInput(
        "specify --all to backfill, --status to check coverage, or provide an insight ID"
            .to_string(),
    )
    .into())
}

// ── viz ───────────────────────────────────────────────────────────────────────

pub fn viz_export(ctx: &Ctx, format: &str, output: &str) -> Result<()> {
    let conn = ctx.open()?;
    let insights = insight_store::get_all_active_insights(&conn)?;
    let edges = edge::get_all_edges(&conn)?;

    let rendered = match format {
        "dot" => viz::render_dot(&insights, &edges),
        "html" => viz::render_html(&insights, &edges),
        other => {
            return Err(MnemonError::InvalidInput(format!(
                "unsupported format: {other} (use dot or html)"
            ))
            .into())
        }
    };

    if output.is_empty() || output == "-" {
        print!("{rendered}");
    } else {
        std::fs::write(output, rendered)
            .with_context(|| format!("failed to write {output}"))?;
        eprintln!("written to {output}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ctx(dir: &std::path::Path) -> Ctx {
        Ctx {
            data_dir: dir.to_path_buf(),
            store_flag: None,
            config: MnemonConfig::default(),
        }
    }

    #[test]
    fn store_resolution_prefers_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_ctx(dir.path());
        assert_eq!(ctx.resolve_store_name(), db::DEFAULT_STORE_NAME);

        db::write_active(dir.path(), "from-file").unwrap();
        assert_eq!(ctx.resolve_store_name(), "from-file");

        ctx.store_flag = Some("from-flag".to_string());
        assert_eq!(ctx.resolve_store_name(), "from-flag");
    }

    #[test]
    fn parse_csv_trims_and_drops_empty() {
        assert_eq!(parse_csv("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(parse_csv("").is_empty());
        assert!(parse_csv(" , ").is_empty());
    }

    #[test]
    fn store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());

        store_create(&ctx, "alpha").unwrap();
        assert!(db::store_exists(dir.path(), "alpha"));

        // Duplicate create rejected
        assert!(store_create(&ctx, "alpha").is_err());
        // Invalid name rejected
        assert!(store_create(&ctx, "bad name").is_err());

        store_set(&ctx, "alpha").unwrap();
        assert_eq!(db::read_active(dir.path()), "alpha");

        // Cannot remove the active store
        assert!(store_remove(&ctx, "alpha").is_err());

        store_create(&ctx, "beta").unwrap();
        store_set(&ctx, "beta").unwrap();
        store_remove(&ctx, "alpha").unwrap();
        assert!(!db::store_exists(dir.path(), "alpha"));
    }
}
