//! Error types for coursegraph

use thiserror::Error;

/// Result type alias using coursegraph's Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid input: {0}")]
    Validation(String),

    /// Prerequisite edges among the listed knowledge points form a cycle.
    #[error("Prerequisite cycle among knowledge points {0:?}; no valid learning order exists")]
    UnsatisfiableOrdering(Vec<i64>),

    #[error("Cannot move learning path from '{from}' to '{to}'")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "E001",
            Self::Validation(_) => "E100",
            Self::UnsatisfiableOrdering(_) => "E200",
            Self::InvalidTransition { .. } => "E201",
            Self::Database(_) => "E400",
            Self::Config(_) => "E600",
            Self::Serialization(_) => "E800",
            Self::Io(_) => "E900",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
