//! Error types for the memory core.

use thiserror::Error;

/// Core error taxonomy.
///
/// `InvalidInput` and `NotFound` reject the command before any state
/// changes; `Storage` aborts the enclosing transaction. Embedding failures
/// are deliberately absent — the adapter degrades to "unavailable" and is
/// never fatal to a command.
#[derive(Error, Debug)]
pub enum MnemonError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MnemonError {
    /// Stable machine-readable kind for JSON error objects.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
            Self::Io(_) => "storage",
        }
    }

    /// Process exit code for the CLI boundary.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidInput(_) => 2,
            _ => 1,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, MnemonError>;
