//! Query intent detection and the per-intent weight tables.
//!
//! Trigger families are bilingual (English + Chinese); detection is
//! first-match-wins in the order WHY, WHEN, ENTITY.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::error::MnemonError;
use crate::model::EdgeType;

/// Coarse query class steering traversal and rerank weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    Why,
    When,
    Entity,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Why => "WHY",
            Self::When => "WHEN",
            Self::Entity => "ENTITY",
            Self::General => "GENERAL",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Intent {
    type Err = MnemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WHY" => Ok(Self::Why),
            "WHEN" => Ok(Self::When),
            "ENTITY" => Ok(Self::Entity),
            "GENERAL" => Ok(Self::General),
            _ => Err(MnemonError::InvalidInput(format!(
                "unknown intent {s:?}; valid: WHY, WHEN, ENTITY, GENERAL"
            ))),
        }
    }
}

static WHY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(why|reason|because|cause|motivation|rationale)\b|为什么|原因|理由")
        .expect("valid regex")
});
static WHEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(when|time|date|before|after|during|timeline|history|sequence)\b|什么时候|何时|时间",
    )
    .expect("valid regex")
});
static ENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(what is|who is|tell me about|describe|about)\b|是什么|谁是|关于")
        .expect("valid regex")
});

/// Detect the intent of a query. First match wins: WHY, then WHEN, then
/// ENTITY; anything else is GENERAL.
pub fn detect_intent(query: &str) -> Intent {
    if WHY_PATTERN.is_match(query) {
        Intent::Why
    } else if WHEN_PATTERN.is_match(query) {
        Intent::When
    } else if ENTITY_PATTERN.is_match(query) {
        Intent::Entity
    } else {
        Intent::General
    }
}

/// Edge-type weights scaling structural contribution during traversal.
pub fn edge_weights(intent: Intent) -> [(EdgeType, f64); 4] {
    match intent {
        Intent::Why => [
            (EdgeType::Causal, 0.70),
            (EdgeType::Temporal, 0.20),
            (EdgeType::Entity, 0.05),
            (EdgeType::Semantic, 0.05),
        ],
        Intent::When => [
            (EdgeType::Causal, 0.15),
            (EdgeType::Temporal, 0.65),
            (EdgeType::Entity, 0.10),
            (EdgeType::Semantic, 0.10),
        ],
        Intent::Entity => [
            (EdgeType::Causal, 0.10),
            (EdgeType::Temporal, 0.05),
            (EdgeType::Entity, 0.55),
            (EdgeType::Semantic, 0.30),
        ],
        Intent::General => [
            (EdgeType::Causal, 0.25),
            (EdgeType::Temporal, 0.25),
            (EdgeType::Entity, 0.25),
            (EdgeType::Semantic, 0.25),
        ],
    }
}

/// Weight for one edge type under the given intent.
pub fn edge_weight(intent: Intent, edge_type: EdgeType) -> f64 {
    edge_weights(intent)
        .iter()
        .find(|(t, _)| *t == edge_type)
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

/// Beam-search traversal parameters.
#[derive(Debug, Clone, Copy)]
pub struct TraversalParams {
    pub beam_width: usize,
    pub max_depth: usize,
    pub max_visited: usize,
}

/// `(beam_width, max_depth, max_visited)` by intent.
pub fn traversal_params(intent: Intent) -> TraversalParams {
    let (beam_width, max_depth, max_visited) = match intent {
        Intent::Why => (15, 5, 500),
        Intent::When => (10, 5, 400),
        Intent::Entity => (10, 4, 400),
        Intent::General => (10, 4, 500),
    };
    TraversalParams {
        beam_width,
        max_depth,
        max_visited,
    }
}

/// Rerank weights `(keyword, entity, similarity, graph)`.
#[derive(Debug, Clone, Copy)]
pub struct RerankWeights {
    pub keyword: f64,
    pub entity: f64,
    pub similarity: f64,
    pub graph: f64,
}

/// Rerank weights when a query embedding is available.
pub fn rerank_weights(intent: Intent) -> RerankWeights {
    let (keyword, entity, similarity, graph) = match intent {
        Intent::Why => (0.10, 0.10, 0.30, 0.50),
        Intent::When => (0.15, 0.15, 0.30, 0.40),
        Intent::Entity => (0.20, 0.40, 0.20, 0.20),
        Intent::General => (0.25, 0.25, 0.25, 0.25),
    };
    RerankWeights {
        keyword,
        entity,
        similarity,
        graph,
    }
}

/// Rerank weights without a query embedding: the similarity share is
/// redistributed onto keyword and graph.
pub fn rerank_weights_no_embedding(intent: Intent) -> RerankWeights {
    let (keyword, entity, similarity, graph) = match intent {
        Intent::Why => (0.20, 0.10, 0.0, 0.70),
        Intent::When => (0.25, 0.15, 0.0, 0.60),
        Intent::Entity => (0.30, 0.40, 0.0, 0.30),
        Intent::General => (0.375, 0.25, 0.0, 0.375),
    };
    RerankWeights {
        keyword,
        entity,
        similarity,
        graph,
    }
}
