#![allow(dead_code)]

use mnemon::db;
use mnemon::embed::EmbeddingProvider;
use mnemon::model::{Category, InsightSource};
use mnemon::pipeline::{remember, RememberOutput, RememberRequest};
use rusqlite::Connection;
use std::collections::HashMap;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Deterministic embedding provider: fixed vectors keyed by exact text.
/// With an empty map it reports unavailable, exercising the token-overlap
/// fallback everywhere.
pub struct StubProvider {
    vectors: HashMap<String, Vec<f64>>,
}

impl StubProvider {
    pub fn down() -> Self {
        Self {
            vectors: HashMap::new(),
        }
    }

    pub fn with(vectors: &[(&str, Vec<f64>)]) -> Self {
        Self {
            vectors: vectors
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }
}

impl EmbeddingProvider for StubProvider {
    fn available(&self) -> bool {
        !self.vectors.is_empty()
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f64>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no stub vector for {text:?}"))
    }

    fn model(&self) -> &str {
        "stub"
    }
}

/// Unit vector whose cosine against `[1, 0, 0]` equals `cos`.
pub fn vec_with_cosine(cos: f64) -> Vec<f64> {
    vec![cos, (1.0 - cos * cos).max(0.0).sqrt(), 0.0]
}

/// Run the full write pipeline with defaults.
pub fn remember_simple(conn: &mut Connection, content: &str) -> RememberOutput {
    remember(
        conn,
        &StubProvider::down(),
        RememberRequest {
            content: content.to_string(),
            category: Category::General,
            importance: 3,
            tags: vec![],
            entities: vec![],
            source: InsightSource::User,
            no_diff: false,
        },
    )
    .unwrap()
}

/// Run the write pipeline with full control over the request.
pub fn remember_with(
    conn: &mut Connection,
    provider: &dyn EmbeddingProvider,
    content: &str,
    category: Category,
    importance: i32,
    entities: Vec<String>,
    source: InsightSource,
    no_diff: bool,
) -> RememberOutput {
    remember(
        conn,
        provider,
        RememberRequest {
            content: content.to_string(),
            category,
            importance,
            tags: vec![],
            entities,
            source,
            no_diff,
        },
    )
    .unwrap()
}
