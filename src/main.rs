mod cli;
mod config;
mod db;
mod embed;
mod error;
mod graph;
mod model;
mod pipeline;
mod search;
mod store;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use error::MnemonError;

#[derive(Parser)]
#[command(name = "mnemon", version, about = "Graph-indexed persistent memory for LLM-driven agents")]
struct Cli {
    /// Base data directory (default ~/.mnemon, or MNEMON_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Memory store to operate on (default: active store)
    #[arg(long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new insight
    Remember {
        /// Insight text (words are joined with spaces)
        #[arg(required = true)]
        content: Vec<String>,
        /// Category: preference, decision, fact, insight, context, general
        #[arg(long = "cat", default_value = "general")]
        cat: String,
        /// Importance (1-5)
        #[arg(long = "imp", default_value_t = 3)]
        imp: i32,
        /// Comma-separated tags
        #[arg(long, default_value = "")]
        tags: String,
        /// Comma-separated entities
        #[arg(long, default_value = "")]
        entities: String,
        /// Source: user, agent, external
        #[arg(long, default_value = "user")]
        source: String,
        /// Skip duplicate detection
        #[arg(long)]
        no_diff: bool,
    },
    /// Retrieve insights with intent-aware ranking
    Recall {
        #[arg(required = true)]
        query: Vec<String>,
        /// Filter by category
        #[arg(long = "cat")]
        cat: Option<String>,
        /// Max results
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Filter by source
        #[arg(long)]
        source: Option<String>,
        /// Simple SQL LIKE matching
        #[arg(long)]
        basic: bool,
        /// Override intent: WHY, WHEN, ENTITY, GENERAL
        #[arg(long)]
        intent: Option<String>,
    },
    /// Token-based keyword search
    Search {
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Soft-delete an insight
    Forget { id: String },
    /// Create a manual edge between two insights
    Link {
        source_id: String,
        target_id: String,
        /// Edge type: temporal, entity, causal, semantic
        #[arg(long = "type", default_value = "semantic")]
        edge_type: String,
        /// Edge weight in [0, 1]
        #[arg(long, default_value_t = 0.5)]
        weight: f64,
        /// JSON metadata object
        #[arg(long)]
        meta: Option<String>,
    },
    /// Find connected insights via graph traversal
    Related {
        id: String,
        /// Filter by edge type
        #[arg(long)]
        edge: Option<String>,
        /// Max traversal depth
        #[arg(long, default_value_t = 2)]
        depth: usize,
    },
    /// Manage named memory stores
    Store {
        #[command(subcommand)]
        action: Option<StoreAction>,
    },
    /// Retention review and boost
    Gc {
        /// Effective-importance threshold for review
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,
        /// Max candidates
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Boost retention for one insight
        #[arg(long)]
        keep: Option<String>,
        /// List prune candidates (default when --keep is absent)
        #[arg(long)]
        review: bool,
    },
    /// Show store statistics
    Status,
    /// Show the operation log
    Log {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Manage embeddings
    Embed {
        /// Insight ID to embed
        id: Option<String>,
        /// Backfill all insights lacking embeddings
        #[arg(long = "all")]
        all: bool,
        /// Show coverage statistics
        #[arg(long = "status")]
        status: bool,
    },
    /// Export the graph for visualization
    Viz {
        /// Output format: dot or html
        #[arg(long, default_value = "dot")]
        format: String,
        /// Output file (- for stdout)
        #[arg(short, long, default_value = "-")]
        output: String,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// List all stores
    List,
    /// Create a new store
    Create { name: String },
    /// Set the active store
    Set { name: String },
    /// Remove a store
    Remove { name: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config::MnemonConfig::load() {
        Ok(config) => config,
        Err(err) => return fail(&err),
    };

    // Log to stderr so stdout stays clean for JSON output
    let filter = EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = cli::Ctx::new(config, cli.data_dir, cli.store);

    let result = match cli.command {
        Command::Remember {
            content,
            cat,
            imp,
            tags,
            entities,
            source,
            no_diff,
        } => cli::remember(
            &ctx,
            &content.join(" "),
            &cat,
            imp,
            &tags,
            &entities,
            &source,
            no_diff,
        ),
        Command::Recall {
            query,
            cat,
            limit,
            source,
            basic,
            intent,
        } => cli::recall(
            &ctx,
            &query.join(" "),
            cat.as_deref(),
            limit,
            source.as_deref(),
            basic,
            intent.as_deref(),
        ),
        Command::Search { query, limit } => cli::search(&ctx, &query.join(" "), limit),
        Command::Forget { id } => cli::forget(&ctx, &id),
        Command::Link {
            source_id,
            target_id,
            edge_type,
            weight,
            meta,
        } => cli::link(&ctx, &source_id, &target_id, &edge_type, weight, meta.as_deref()),
        Command::Related { id, edge, depth } => cli::related(&ctx, &id, edge.as_deref(), depth),
        Command::Store { action } => match action.unwrap_or(StoreAction::List) {
            StoreAction::List => cli::store_list(&ctx),
            StoreAction::Create { name } => cli::store_create(&ctx, &name),
            StoreAction::Set { name } => cli::store_set(&ctx, &name),
            StoreAction::Remove { name } => cli::store_remove(&ctx, &name),
        },
        Command::Gc {
            threshold,
            limit,
            keep,
            review: _,
        } => cli::gc(&ctx, threshold, limit, keep.as_deref()),
        Command::Status => cli::status(&ctx),
        Command::Log { limit } => cli::log(&ctx, limit),
        Command::Embed { id, all, status } => cli::embed(&ctx, id.as_deref(), all, status),
        Command::Viz { format, output } => cli::viz_export(&ctx, &format, &output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&err),
    }
}

/// Render a JSON error object and pick the exit code from the error kind.
fn fail(err: &anyhow::Error) -> ExitCode {
    let (kind, code) = match err.downcast_ref::<MnemonError>() {
        Some(e) => (e.kind(), e.exit_code()),
        None => ("storage", 1),
    };
    println!(
        "{}",
        serde_json::json!({ "error": err.to_string(), "kind": kind })
    );
    ExitCode::from(code)
}
