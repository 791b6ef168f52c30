use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MnemonConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory holding `active`, `data/<store>/mnemon.db`, and
    /// `config.toml` itself.
    pub data_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama-compatible endpoint.
    pub endpoint: String,
    /// Embedding model name.
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for MnemonConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = default_mnemon_dir().to_string_lossy().into_owned();
        Self { data_dir }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "warn".into() }
    }
}

/// Returns `~/.mnemon/`
pub fn default_mnemon_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mnemon")
}

impl MnemonConfig {
    /// Load config from `<data_dir>/config.toml` (if present) and apply
    /// env var overrides. The data dir itself honors `MNEMON_DATA_DIR`
    /// before the config file is read, since the file lives inside it.
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var("MNEMON_DATA_DIR") {
            Ok(dir) if !dir.is_empty() => expand_tilde(&dir),
            _ => default_mnemon_dir(),
        };
        Self::load_from(data_dir.join("config.toml"))
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MnemonConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (MNEMON_DATA_DIR,
    /// MNEMON_EMBED_ENDPOINT, MNEMON_EMBED_MODEL, MNEMON_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MNEMON_DATA_DIR") {
            if !val.is_empty() {
                self.storage.data_dir = val;
            }
        }
        if let Ok(val) = std::env::var("MNEMON_EMBED_ENDPOINT") {
            if !val.is_empty() {
                self.embedding.endpoint = val;
            }
        }
        if let Ok(val) = std::env::var("MNEMON_EMBED_MODEL") {
            if !val.is_empty() {
                self.embedding.model = val;
            }
        }
        if let Ok(val) = std::env::var("MNEMON_LOG_LEVEL") {
            if !val.is_empty() {
                self.log.level = val;
            }
        }
    }

    /// Resolve the base data directory, expanding `~` if needed.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
