//! Entity extraction and entity co-occurrence edges.
//!
//! Extraction is a pure function over content: regex patterns (CamelCase,
//! ALL-CAPS acronyms, file paths, URLs, @mentions, 《…》 book titles)
//! unioned with a case-sensitive technical dictionary, stopword-filtered,
//! deduplicated case-preserving.

use regex::Regex;
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::Result;
use crate::model::{Edge, EdgeMetadata, EdgeType, Insight, MAX_ENTITIES};
use crate::store::edge;

/// Max linked insights per entity.
pub const MAX_ENTITY_LINKS: usize = 5;
/// Hard cap on entity edge rows per insert.
pub const MAX_TOTAL_ENTITY_EDGES: usize = 50;

static ENTITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // CamelCase identifiers with two or more humps
        r"\b([A-Z][a-z]+(?:[A-Z][a-z]+)+)\b",
        // ALL-CAPS acronyms
        r"\b([A-Z]{2,})\b",
        // File-like tokens with an extension
        r#"(?:^|[\s"'(])([.\w/-]+\.\w{1,10})(?:[\s"'),.]|$)"#,
        // Slash paths (./relative or nested/dir/name)
        r#"(?:^|[\s"'(])((?:\./)?[\w.-]+(?:/[\w.-]+)+)"#,
        // URLs
        r#"(https?://[^\s"'<>)]+)"#,
        // @mentions
        r"@([a-zA-Z_]\w+)",
        // Chinese book-title marks
        r"《([^》]+)》",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static ACRONYM_STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "IN", "ON", "AT", "TO", "BY", "OR", "AN", "IF", "IS", "IT", "OF", "AS", "DO", "NO",
        "SO", "UP", "WE", "HE", "MY", "BE", "GO", "THE", "AND", "FOR", "ARE", "BUT", "NOT",
        "YOU", "ALL", "CAN", "HER", "WAS", "ONE", "OUR", "OUT", "HAS", "HAD", "HOW", "MAN",
        "NEW", "NOW", "OLD", "SEE", "WAY", "MAY", "SAY", "SHE", "TWO", "USE", "BOY", "DID",
        "GET", "HIM", "HIS", "LET", "PUT", "TOP", "TOO", "ANY", "WHEN",
    ]
    .into_iter()
    .collect()
});

static TECH_DICTIONARY: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // Languages
        "Go", "Rust", "Python", "Java", "Kotlin", "Swift", "Ruby", "Elixir", "Zig", "Lua",
        "Dart", "Scala", "Perl", "Haskell", "OCaml", "Julia", "Clojure", "Erlang", "Nim",
        "Crystal", "JavaScript", "TypeScript",
        // Frontend / JS ecosystem
        "React", "Vue", "Angular", "Svelte", "Next", "Nuxt", "Node", "Deno", "Bun", "Vite",
        "Webpack", "Rollup", "Electron", "Tauri", "Flutter", "Expo",
        // Databases and vector stores
        "SQLite", "PostgreSQL", "Postgres", "MySQL", "MariaDB", "Redis", "MongoDB",
        "DynamoDB", "Cassandra", "CockroachDB", "Qdrant", "Milvus", "Chroma", "Pinecone",
        "Neo4j", "Weaviate", "Elasticsearch", "OpenSearch", "ClickHouse", "DuckDB",
        "Snowflake", "BigQuery", "Redshift",
        // Infra
        "Docker", "Podman", "Kubernetes", "Terraform", "Pulumi", "Ansible", "Nginx",
        "Caddy", "Traefik", "Kafka", "RabbitMQ", "NATS", "Istio", "Envoy", "Linkerd",
        "Helm", "Vault", "Consul", "Etcd", "Zookeeper",
        // Cloud and hosting
        "AWS", "GCP", "Azure", "Vercel", "Netlify", "Cloudflare", "Supabase", "Firebase",
        "Heroku", "Railway", "Fly",
        // ML / AI
        "Ollama", "OpenAI", "Claude", "Anthropic", "Gemini", "Mistral", "Llama", "PyTorch",
        "TensorFlow", "LangChain", "LlamaIndex", "FAISS", "Hugging", "Transformers",
        "Jupyter", "Numpy", "Pandas", "Airflow", "Spark", "Hadoop", "Flink", "Databricks",
        // Tooling
        "Git", "GitHub", "GitLab", "Bitbucket", "Jenkins", "CircleCI", "Buildkite",
        "Cobra", "Cargo", "Poetry", "Gradle", "Maven", "Bazel", "CMake", "Make",
        // Frameworks
        "FastAPI", "Flask", "Django", "Rails", "Spring", "Express", "Gin", "Echo", "Fiber",
        "Axum", "Actix", "Tokio", "Rocket", "Phoenix", "Laravel",
        // Testing
        "Pytest", "Jest", "Vitest", "Cypress", "Playwright", "Selenium",
        // Protocols and formats
        "gRPC", "GraphQL", "WebSocket", "WebAssembly", "Wasm", "OAuth", "JWT", "YAML",
        "TOML", "JSON", "Protobuf", "MAGMA", "MCP", "RLM",
        // Observability
        "Grafana", "Prometheus", "Loki", "Jaeger", "Sentry", "Datadog", "OpenTelemetry",
        // Editors / OS
        "Vim", "Neovim", "Emacs", "VSCode", "IntelliJ", "Xcode", "Linux", "Ubuntu",
        "Debian", "Fedora", "Alpine", "Windows", "Android",
        // Collaboration
        "Slack", "Discord", "Notion", "Figma", "Jira", "Confluence", "Stripe", "Twilio",
        "Auth0", "Okta", "Keycloak",
    ]
    .into_iter()
    .collect()
});

static WORD_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9]+").expect("valid regex"));

/// Extract named entities from text. Deterministic, insertion-ordered,
/// case-preserving.
pub fn extract_entities(text: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entities: Vec<String> = Vec::new();

    for pattern in ENTITY_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let entity = caps
                .get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str())
                .unwrap_or("");
            if entity.is_empty() || seen.contains(entity) {
                continue;
            }
            if ACRONYM_STOPWORDS.contains(entity) {
                continue;
            }
            seen.insert(entity.to_string());
            entities.push(entity.to_string());
        }
    }

    for m in WORD_SPLIT_RE.find_iter(text) {
        let word = m.as_str();
        if TECH_DICTIONARY.contains(word) && !seen.contains(word) {
            seen.insert(word.to_string());
            entities.push(word.to_string());
        }
    }

    entities
}

/// Merge caller-provided entities with extracted ones, deduplicated in
/// insertion order, silently truncated at [`MAX_ENTITIES`].
pub fn merge_entities(provided: &[String], extracted: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged: Vec<String> = Vec::new();
    for e in provided.iter().chain(extracted) {
        if e.is_empty() || seen.contains(e.as_str()) {
            continue;
        }
        seen.insert(e);
        merged.push(e.clone());
        if merged.len() >= MAX_ENTITIES {
            break;
        }
    }
    merged
}

/// Create entity co-occurrence edges between the insight and up to
/// [`MAX_ENTITY_LINKS`] other active insights per shared entity, weight
/// 1.0, capped at [`MAX_TOTAL_ENTITY_EDGES`] rows per insert.
pub fn create_entity_edges(conn: &Connection, insight: &Insight) -> Result<usize> {
    let mut count = 0;

    for entity in &insight.entities {
        if count >= MAX_TOTAL_ENTITY_EDGES {
            break;
        }
        let ids = edge::find_insights_with_entity(conn, entity, &insight.id, MAX_ENTITY_LINKS)?;
        for target_id in ids {
            if count >= MAX_TOTAL_ENTITY_EDGES {
                break;
            }
            let metadata = EdgeMetadata::Entity {
                entity: entity.clone(),
            };
            edge::insert_edge(
                conn,
                &Edge::new(&insight.id, &target_id, EdgeType::Entity, 1.0, metadata.clone()),
            )?;
            count += 1;
            if count >= MAX_TOTAL_ENTITY_EDGES {
                break;
            }
            edge::insert_edge(
                conn,
                &Edge::new(&target_id, &insight.id, EdgeType::Entity, 1.0, metadata),
            )?;
            count += 1;
        }
    }

    Ok(count)
}
