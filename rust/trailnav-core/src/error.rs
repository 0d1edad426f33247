use thiserror::Error;

use crate::models::NodeId;

#[derive(Debug, Error)]
pub enum NavError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no path from node {from} to node {to}")]
    NoPath { from: NodeId, to: NodeId },
    #[error("graph unavailable: no snapshot has been loaded")]
    GraphUnavailable,
    #[error("graph integrity check failed: {0}")]
    Integrity(String),
    #[error("search cancelled")]
    Cancelled,
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl NavError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        NavError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        NavError::NotFound(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        NavError::Integrity(msg.into())
    }

    /// Negative lookups (unknown feature, unreachable destination) are reported to
    /// callers as a regular "not found" result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NavError::NotFound(_) | NavError::NoPath { .. })
    }
}

pub type NavResult<T> = Result<T, NavError>;
