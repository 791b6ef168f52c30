pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Store used when nothing else is configured.
pub const DEFAULT_STORE_NAME: &str = "default";

/// Database file name inside a store directory.
pub const DB_FILE_NAME: &str = "mnemon.db";

static STORE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$").expect("valid regex"));

/// Returns true if `name` is a usable store name.
pub fn valid_store_name(name: &str) -> bool {
    STORE_NAME_RE.is_match(name)
}

/// Returns `<base_dir>/data/<name>`.
pub fn store_dir(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join("data").join(name)
}

/// Returns `<base_dir>/active`.
pub fn active_file(base_dir: &Path) -> PathBuf {
    base_dir.join("active")
}

/// Read the active store name, falling back to [`DEFAULT_STORE_NAME`].
pub fn read_active(base_dir: &Path) -> String {
    match std::fs::read_to_string(active_file(base_dir)) {
        Ok(data) => {
            let name = data.trim();
            if name.is_empty() {
                DEFAULT_STORE_NAME.to_string()
            } else {
                name.to_string()
            }
        }
        Err(_) => DEFAULT_STORE_NAME.to_string(),
    }
}

/// Persist the active store name to `<base_dir>/active`.
pub fn write_active(base_dir: &Path, name: &str) -> Result<()> {
    std::fs::create_dir_all(base_dir)
        .with_context(|| format!("failed to create {}", base_dir.display()))?;
    std::fs::write(active_file(base_dir), format!("{name}\n"))
        .context("failed to write active store file")?;
    Ok(())
}

/// Sorted names of all stores under `<base_dir>/data/`.
pub fn list_stores(base_dir: &Path) -> Vec<String> {
    let data_dir = base_dir.join("data");
    let Ok(entries) = std::fs::read_dir(&data_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Check whether the named store directory exists.
pub fn store_exists(base_dir: &Path, name: &str) -> bool {
    store_dir(base_dir, name).is_dir()
}

/// One-time layout migration: an old `<base_dir>/mnemon.db` is moved to
/// `<base_dir>/data/default/mnemon.db` if the new location is still empty.
pub fn migrate_legacy_layout(base_dir: &Path) -> Result<()> {
    let legacy = base_dir.join(DB_FILE_NAME);
    let target_dir = store_dir(base_dir, DEFAULT_STORE_NAME);
    let target = target_dir.join(DB_FILE_NAME);

    if legacy.is_file() && !target.exists() {
        std::fs::create_dir_all(&target_dir)
            .with_context(|| format!("failed to create {}", target_dir.display()))?;
        std::fs::rename(&legacy, &target).with_context(|| {
            format!(
                "failed to move legacy database {} to {}",
                legacy.display(),
                target.display()
            )
        })?;
        tracing::info!(
            from = %legacy.display(),
            to = %target.display(),
            "migrated legacy database layout"
        );
    }
    Ok(())
}

/// Open (or create) the named store under `base_dir`, running the legacy
/// layout migration first.
pub fn open_store(base_dir: &Path, name: &str) -> Result<Connection> {
    migrate_legacy_layout(base_dir)?;
    let dir = store_dir(base_dir, name);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create store directory {}", dir.display()))?;
    open_database(dir.join(DB_FILE_NAME))
}

/// Open (or create) the database at the given path, with pragmas applied
/// and schema initialized.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    let conn = Connection::open(path).with_context(|| {
        format!(
            "failed to open database at {}. If the file is corrupt, \
             restore from a backup or remove the store directory to start fresh.",
            path.display()
        )
    })?;

    // WAL keeps concurrent readers unblocked while the single writer runs.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // Wait up to 5 seconds for locks instead of failing immediately
    conn.pragma_update(None, "busy_timeout", "5000")?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    // Quick integrity check after schema init
    let integrity: String = conn.pragma_query_value(None, "quick_check", |row| row.get(0))?;
    if integrity != "ok" {
        anyhow::bail!("database integrity check failed: {integrity}");
    }

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
///
/// Used by the test suites; never touches the filesystem.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}
