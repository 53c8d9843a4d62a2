//! Engine and export error types.

use csa_matrix::MatrixError;
use csa_store::StoreError;
use thiserror::Error;

/// Errors surfaced by engine operations that the caller initiated
/// interactively. Background flush failures are logged, never returned.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The caller addressed a cell, relation or measure that does not exist.
    #[error(transparent)]
    Matrix(#[from] MatrixError),

    /// A store interaction failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors from the export collaborator.
#[derive(Error, Debug)]
pub enum ExportError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    /// Export service returned a non-2xx status.
    #[error("export service {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("configuration error: {0}")]
    Config(String),
}
