//! Core data model — insights, typed edges, and the closed enumerations
//! that drive the four-graph memory engine.
//!
//! Defines [`Insight`] (a memory node), [`Edge`] (a typed directed weighted
//! link), the [`Category`]/[`Source`]/[`EdgeType`] enums, and
//! [`EdgeMetadata`] (tagged per-type metadata serialized to a flat map at
//! the storage boundary).

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::MnemonError;

/// Maximum content length in characters.
pub const MAX_CONTENT_CHARS: usize = 8000;
/// Maximum number of tags per insight.
pub const MAX_TAGS: usize = 20;
/// Maximum number of entities per insight.
pub const MAX_ENTITIES: usize = 50;
/// Maximum length of a single tag.
pub const MAX_TAG_CHARS: usize = 100;
/// Maximum length of a single entity name.
pub const MAX_ENTITY_CHARS: usize = 200;

/// Insight category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Preference,
    Decision,
    Fact,
    Insight,
    Context,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preference => "preference",
            Self::Decision => "decision",
            Self::Fact => "fact",
            Self::Insight => "insight",
            Self::Context => "context",
            Self::General => "general",
        }
    }

    /// All valid categories, for status counters and error messages.
    pub const ALL: [Category; 6] = [
        Self::Preference,
        Self::Decision,
        Self::Fact,
        Self::Insight,
        Self::Context,
        Self::General,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = MnemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preference" => Ok(Self::Preference),
            "decision" => Ok(Self::Decision),
            "fact" => Ok(Self::Fact),
            "insight" => Ok(Self::Insight),
            "context" => Ok(Self::Context),
            "general" => Ok(Self::General),
            _ => Err(MnemonError::InvalidInput(format!(
                "invalid category {s:?}; valid: preference, decision, fact, insight, context, general"
            ))),
        }
    }
}

/// Where an insight came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSource {
    User,
    Agent,
    External,
}

impl InsightSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::External => "external",
        }
    }
}

impl std::fmt::Display for InsightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InsightSource {
    type Err = MnemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            "external" => Ok(Self::External),
            _ => Err(MnemonError::InvalidInput(format!(
                "invalid source {s:?}; valid: user, agent, external"
            ))),
        }
    }
}

/// The four edge types of the memory graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Temporal,
    Entity,
    Causal,
    Semantic,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::Entity => "entity",
            Self::Causal => "causal",
            Self::Semantic => "semantic",
        }
    }

    pub const ALL: [EdgeType; 4] = [Self::Temporal, Self::Entity, Self::Causal, Self::Semantic];
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EdgeType {
    type Err = MnemonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temporal" => Ok(Self::Temporal),
            "entity" => Ok(Self::Entity),
            "causal" => Ok(Self::Causal),
            "semantic" => Ok(Self::Semantic),
            _ => Err(MnemonError::InvalidInput(format!(
                "invalid edge type {s:?}; valid: temporal, entity, causal, semantic"
            ))),
        }
    }
}

/// Sub-type of a temporal edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    /// Link to the most recent insight from the same source.
    Backbone,
    /// Link to any insight created within the proximity window.
    Proximity,
}

impl TemporalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backbone => "backbone",
            Self::Proximity => "proximity",
        }
    }
}

/// Sub-type of a causal edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalKind {
    Causes,
    Enables,
    Prevents,
}

impl CausalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Causes => "causes",
            Self::Enables => "enables",
            Self::Prevents => "prevents",
        }
    }
}

/// Per-type edge metadata.
///
/// Builders construct the typed variant; [`EdgeMetadata::to_map`] flattens
/// it to the generic string map stored in the `metadata` column. Manually
/// linked edges carry whatever map the caller supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeMetadata {
    Temporal { sub_type: TemporalKind, hours_diff: f64 },
    Entity { entity: String },
    Causal { sub_type: CausalKind, reason: String },
    Semantic { cosine: f64 },
    Manual(BTreeMap<String, String>),
}

impl EdgeMetadata {
    /// Flatten to the storage map. Keys sort deterministically (BTreeMap).
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        match self {
            Self::Temporal { sub_type, hours_diff } => {
                m.insert("sub_type".into(), sub_type.as_str().into());
                m.insert("hours_diff".into(), format!("{hours_diff:.2}"));
            }
            Self::Entity { entity } => {
                m.insert("entity".into(), entity.clone());
            }
            Self::Causal { sub_type, reason } => {
                m.insert("sub_type".into(), sub_type.as_str().into());
                m.insert("reason".into(), reason.clone());
            }
            Self::Semantic { cosine } => {
                m.insert("cosine".into(), format_float(*cosine));
            }
            Self::Manual(map) => m.extend(map.clone()),
        }
        m
    }

    /// Serialize the flattened map as JSON for the storage column.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_map()).unwrap_or_else(|_| "{}".into())
    }

    /// Parse a stored metadata map back into the typed variant for the
    /// given edge type. Unrecognized shapes fall back to [`Self::Manual`].
    pub fn from_map(edge_type: EdgeType, map: BTreeMap<String, String>) -> Self {
        match edge_type {
            EdgeType::Temporal => {
                let sub_type = match map.get("sub_type").map(String::as_str) {
                    Some("backbone") => Some(TemporalKind::Backbone),
                    Some("proximity") => Some(TemporalKind::Proximity),
                    _ => None,
                };
                if let (Some(sub_type), Some(hours)) = (sub_type, map.get("hours_diff")) {
                    if let Ok(hours_diff) = hours.parse::<f64>() {
                        return Self::Temporal { sub_type, hours_diff };
                    }
                }
            }
            EdgeType::Entity => {
                if let Some(entity) = map.get("entity") {
                    return Self::Entity { entity: entity.clone() };
                }
            }
            EdgeType::Causal => {
                let sub_type = match map.get("sub_type").map(String::as_str) {
                    Some("causes") => Some(CausalKind::Causes),
                    Some("enables") => Some(CausalKind::Enables),
                    Some("prevents") => Some(CausalKind::Prevents),
                    _ => None,
                };
                if let (Some(sub_type), Some(reason)) = (sub_type, map.get("reason")) {
                    return Self::Causal { sub_type, reason: reason.clone() };
                }
            }
            EdgeType::Semantic => {
                if let Some(cos) = map.get("cosine").and_then(|c| c.parse::<f64>().ok()) {
                    return Self::Semantic { cosine: cos };
                }
            }
        }
        Self::Manual(map)
    }
}

/// A memory node.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// Raw text content, at most [`MAX_CONTENT_CHARS`] characters.
    pub content: String,
    pub category: Category,
    /// Declared importance in `1..=5`.
    pub importance: i32,
    pub tags: Vec<String>,
    /// Caller-provided entities merged with extracted ones, capped at [`MAX_ENTITIES`].
    pub entities: Vec<String>,
    pub source: InsightSource,
    /// Number of times this insight was returned or boosted.
    pub access_count: u32,
    #[serde(serialize_with = "ser_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "ser_timestamp")]
    pub updated_at: DateTime<Utc>,
    /// Presence means soft-deleted; all retrieval filters on this.
    #[serde(serialize_with = "ser_opt_timestamp", skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "ser_opt_timestamp", skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// Derived retention score; see [`base_weight`] and the store layer.
    pub effective_importance: f64,
}

impl Insight {
    /// Build a fresh insight with a new id and current timestamps.
    pub fn new(
        content: String,
        category: Category,
        importance: i32,
        tags: Vec<String>,
        entities: Vec<String>,
        source: InsightSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            content,
            category,
            importance,
            tags,
            entities,
            source,
            access_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            last_accessed_at: None,
            effective_importance: 0.0,
        }
    }

    /// Check the declared limits. Rejects oversized content, out-of-range
    /// importance, and too many (or too long) tags or entities.
    pub fn validate(&self) -> crate::error::Result<()> {
        let chars = self.content.chars().count();
        if chars > MAX_CONTENT_CHARS {
            return Err(MnemonError::InvalidInput(format!(
                "content too long ({chars} chars, max {MAX_CONTENT_CHARS}); \
                 consider chunking into multiple remember calls"
            )));
        }
        if !(1..=5).contains(&self.importance) {
            return Err(MnemonError::InvalidInput(format!(
                "importance must be 1-5, got {}",
                self.importance
            )));
        }
        if self.tags.len() > MAX_TAGS {
            return Err(MnemonError::InvalidInput(format!(
                "too many tags ({}, max {MAX_TAGS})",
                self.tags.len()
            )));
        }
        if self.entities.len() > MAX_ENTITIES {
            return Err(MnemonError::InvalidInput(format!(
                "too many entities ({}, max {MAX_ENTITIES})",
                self.entities.len()
            )));
        }
        for tag in &self.tags {
            if tag.chars().count() > MAX_TAG_CHARS {
                return Err(MnemonError::InvalidInput(format!(
                    "tag too long ({} chars, max {MAX_TAG_CHARS})",
                    tag.chars().count()
                )));
            }
        }
        for entity in &self.entities {
            if entity.chars().count() > MAX_ENTITY_CHARS {
                return Err(MnemonError::InvalidInput(format!(
                    "entity too long ({} chars, max {MAX_ENTITY_CHARS})",
                    entity.chars().count()
                )));
            }
        }
        Ok(())
    }
}

/// A directed, typed, weighted link between two insights.
///
/// The primary key is `(source_id, target_id, edge_type)`; bidirectional
/// relations are stored as two rows.
#[derive(Debug, Clone)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
    /// Weight in `[0.0, 1.0]`.
    pub weight: f64,
    pub metadata: EdgeMetadata,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        edge_type: EdgeType,
        weight: f64,
        metadata: EdgeMetadata,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
            weight,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Map declared importance (1-5) to its retention base weight.
pub fn base_weight(importance: i32) -> f64 {
    match importance {
        5 => 1.0,
        4 => 0.8,
        3 => 0.5,
        2 => 0.3,
        _ => 0.15,
    }
}

/// Insights with high importance or repeated access never auto-prune.
pub fn is_immune(importance: i32, access_count: u32) -> bool {
    importance >= 4 || access_count >= 3
}

/// Render a UTC timestamp as RFC 3339 with a literal `Z` suffix.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse an RFC 3339 timestamp (accepts both `Z` and `+00:00`).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a float to 4 decimal places for metadata and log output.
pub fn format_float(value: f64) -> String {
    format!("{value:.4}")
}

fn ser_timestamp<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(*dt))
}

fn ser_opt_timestamp<S: Serializer>(
    dt: &Option<DateTime<Utc>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match dt {
        Some(dt) => s.serialize_str(&format_timestamp(*dt)),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn category_round_trip() {
        for cat in Category::ALL {
            assert_eq!(Category::from_str(cat.as_str()).unwrap(), cat);
        }
        assert!(Category::from_str("narrative").is_err());
    }

    #[test]
    fn edge_type_round_trip() {
        for t in EdgeType::ALL {
            assert_eq!(EdgeType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(EdgeType::from_str("narrative").is_err());
    }

    #[test]
    fn base_weight_mapping() {
        assert_eq!(base_weight(5), 1.0);
        assert_eq!(base_weight(4), 0.8);
        assert_eq!(base_weight(3), 0.5);
        assert_eq!(base_weight(2), 0.3);
        assert_eq!(base_weight(1), 0.15);
    }

    #[test]
    fn immunity_rules() {
        assert!(is_immune(4, 0));
        assert!(is_immune(1, 3));
        assert!(!is_immune(3, 2));
    }

    #[test]
    fn timestamp_round_trip() {
        let now = Utc::now();
        let s = format_timestamp(now);
        let parsed = parse_timestamp(&s).unwrap();
        assert_eq!(format_timestamp(parsed), s);
        // +00:00 suffix also accepted
        assert!(parse_timestamp("2026-03-01T12:00:00+00:00").is_some());
        assert!(parse_timestamp("not a timestamp").is_none());
    }

    #[test]
    fn metadata_map_round_trip() {
        let meta = EdgeMetadata::Temporal {
            sub_type: TemporalKind::Proximity,
            hours_diff: 0.5,
        };
        let map = meta.to_map();
        assert_eq!(map["sub_type"], "proximity");
        assert_eq!(map["hours_diff"], "0.50");
        assert_eq!(EdgeMetadata::from_map(EdgeType::Temporal, map), meta);

        let causal = EdgeMetadata::Causal {
            sub_type: CausalKind::Causes,
            reason: "because".into(),
        };
        let map = causal.to_map();
        assert_eq!(EdgeMetadata::from_map(EdgeType::Causal, map), causal);

        // Unknown shape falls back to Manual
        let mut raw = BTreeMap::new();
        raw.insert("created_by".to_string(), "agent".to_string());
        let parsed = EdgeMetadata::from_map(EdgeType::Semantic, raw.clone());
        assert_eq!(parsed, EdgeMetadata::Manual(raw));
    }

    #[test]
    fn validation_boundaries() {
        let mut ins = Insight::new(
            "a".repeat(MAX_CONTENT_CHARS),
            Category::General,
            3,
            vec![],
            vec![],
            InsightSource::User,
        );
        assert!(ins.validate().is_ok());

        ins.content.push('b');
        assert!(matches!(
            ins.validate(),
            Err(MnemonError::InvalidInput(_))
        ));

        ins.content = "fine".into();
        ins.importance = 6;
        assert!(ins.validate().is_err());

        ins.importance = 3;
        ins.tags = (0..MAX_TAGS + 1).map(|i| format!("t{i}")).collect();
        assert!(ins.validate().is_err());
    }
}
