//! # Identifier Newtypes
//!
//! Applications and additional measures are UUID-keyed; catalog measures and
//! sub-clauses are catalog-assigned strings (`MG_01`, `S1`). Keeping them
//! distinct types stops a sub-clause id from being passed where a measure
//! code is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CsaError;

/// Unique identifier for an application (one assessment instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub Uuid);

/// Unique identifier for a user-declared additional measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdditionalMeasureId(pub Uuid);

/// Code of a guide measure from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasureCode(String);

/// Identifier of a numbered fragment of a requirement's source article.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubclauseId(String);

impl ApplicationId {
    /// Generate a new random application identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl AdditionalMeasureId {
    /// Generate a new random additional-measure identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AdditionalMeasureId {
    fn default() -> Self {
        Self::new()
    }
}

fn non_blank(kind: &str, value: String) -> Result<String, CsaError> {
    if value.trim().is_empty() {
        Err(CsaError::Validation(format!("{kind} must not be empty")))
    } else {
        Ok(value)
    }
}

impl MeasureCode {
    pub fn new(code: impl Into<String>) -> Result<Self, CsaError> {
        non_blank("measure code", code.into()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SubclauseId {
    pub fn new(id: impl Into<String>) -> Result<Self, CsaError> {
        non_blank("subclause id", id.into()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "application:{}", self.0)
    }
}

impl std::fmt::Display for AdditionalMeasureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "measure:{}", self.0)
    }
}

impl std::fmt::Display for MeasureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for SubclauseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
