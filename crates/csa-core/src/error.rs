//! # Error Types
//!
//! Parse and validation failures for the core vocabulary. Derivation itself
//! never fails; only the strict `FromStr` entry points return [`CsaError`].

use thiserror::Error;

/// Error raised when a code or identifier cannot be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsaError {
    /// A code string did not match any variant of the named enumeration.
    #[error("unknown {kind} code: {value:?}")]
    UnknownCode {
        /// Which enumeration was being parsed (`maturity`, `plan`, ...).
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// An identifier or field failed validation.
    #[error("validation error: {0}")]
    Validation(String),
}

impl CsaError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownCode {
            kind,
            value: value.to_string(),
        }
    }
}
