//! Error types for Vita.

use thiserror::Error;

/// Engine-level errors surfaced to callers.
///
/// A rejected interview answer is deliberately NOT represented here: the
/// orchestrator treats it as a normal transition that re-asks the same
/// field. This enum covers the unrecoverable or collaborator-side failures.
#[derive(Error, Debug)]
pub enum VitaError {
    #[error("Session {0} not found.")]
    SessionNotFound(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Catalog search error: {0}")]
    Catalog(String),

    #[error("LLM completion error: {0}")]
    Llm(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VitaError {
    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            VitaError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            VitaError::Store(_) => "STORE_ERROR",
            VitaError::Catalog(_) => "CATALOG_ERROR",
            VitaError::Llm(_) => "LLM_ERROR",
            VitaError::InvalidInput(_) => "VALIDATION_ERROR",
            VitaError::Json(_) => "JSON_ERROR",
            VitaError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, VitaError>;
