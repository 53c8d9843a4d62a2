//! Catalog relations: the static many-to-many map from guide measures to
//! sub-clauses for one `(requirement, version)` pair.

use serde::{Deserialize, Serialize};

use crate::identity::{MeasureCode, SubclauseId};
use crate::requirement::{RequirementCode, RequirementVersion};

/// The `(requirement, version)` pair a catalog relation set belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogScope {
    pub requirement: RequirementCode,
    pub version: RequirementVersion,
}

impl CatalogScope {
    pub fn new(requirement: RequirementCode, version: RequirementVersion) -> Self {
        Self {
            requirement,
            version,
        }
    }
}

impl std::fmt::Display for CatalogScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.requirement, self.version)
    }
}

/// Immutable catalog fact: `measure_code` applies to `subclause_id`.
///
/// Defined by the catalog and never mutated by the application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogRelation {
    pub measure_code: MeasureCode,
    pub subclause_id: SubclauseId,
    /// Primary relations are the measure's main sub-clause; secondary ones
    /// are cross-references.
    #[serde(default)]
    pub is_primary: bool,
}

impl CatalogRelation {
    pub fn new(measure_code: MeasureCode, subclause_id: SubclauseId, is_primary: bool) -> Self {
        Self {
            measure_code,
            subclause_id,
            is_primary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_display() {
        let scope = CatalogScope::new(RequirementCode::QualityMgmt, RequirementVersion::default());
        assert_eq!(scope.to_string(), "QUALITY_MGMT@1.0");
    }

    #[test]
    fn test_relation_defaults_to_secondary() {
        let rel: CatalogRelation =
            serde_json::from_str(r#"{"measure_code":"MG_01","subclause_id":"S1"}"#).unwrap();
        assert!(!rel.is_primary);
        assert_eq!(rel.measure_code.as_str(), "MG_01");
    }
}
