//! Storage error type shared by every backend.

use csa_core::AdditionalMeasureId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLx query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations failed to apply.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// No catalog relations are defined for the requested scope.
    #[error("catalog not found for {0}")]
    CatalogNotFound(String),

    #[error("additional measure {0} not found")]
    MeasureNotFound(AdditionalMeasureId),

    /// A stored row could not be mapped back to a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("catalog file error: {0}")]
    CatalogFile(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend is temporarily unable to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_yaml::Error> for StoreError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::CatalogFile(e.to_string())
    }
}
