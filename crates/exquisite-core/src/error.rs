//! Error types for entity storage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Message reported for every connectivity failure, whatever the cause.
pub const CONNECTIVITY_MESSAGE: &str = "can't connect to database";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested identifier is absent. Carries the identifier.
    #[error("entity not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// Backend unreachable. Kept apart from `NotFound` and `Persistence`
    /// so callers never mistake an outage for a missing row.
    #[error("can't connect to database")]
    Connectivity(String),

    #[error("{0}")]
    Persistence(String),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn connectivity(cause: impl Into<String>) -> Self {
        Self::Connectivity(cause.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn duplicate(id: &str) -> Self {
        Self::Persistence(format!("entity {} already exists", id))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}
