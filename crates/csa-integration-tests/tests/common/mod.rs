//! Shared fixtures for the scenario tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use csa_core::{
    ApplicationId, CatalogRelation, CatalogScope, MeasureCode, RequirementCode,
    RequirementVersion, SubclauseId,
};
use csa_engine::{EngineConfig, PersistenceReconciler};
use csa_matrix::{CellKey, MatrixScope};
use csa_store::{FlakyStore, InMemoryStore};

pub const DEBOUNCE: Duration = Duration::from_millis(1000);

pub fn key(m: &str, s: &str) -> CellKey {
    CellKey::new(MeasureCode::new(m).unwrap(), SubclauseId::new(s).unwrap())
}

pub fn rel(m: &str, s: &str, primary: bool) -> CatalogRelation {
    CatalogRelation::new(MeasureCode::new(m).unwrap(), SubclauseId::new(s).unwrap(), primary)
}

/// QUALITY_MGMT 1.0 with `(MG_01,S1)`, `(MG_01,S2)`, `(MG_02,S1)`.
pub fn quality_catalog() -> Vec<CatalogRelation> {
    vec![
        rel("MG_01", "S1", true),
        rel("MG_01", "S2", false),
        rel("MG_02", "S1", true),
    ]
}

pub fn store_with(relations: Vec<CatalogRelation>) -> FlakyStore {
    FlakyStore::new(InMemoryStore::new().with_catalog(
        CatalogScope::new(RequirementCode::QualityMgmt, RequirementVersion::default()),
        relations,
    ))
}

pub fn reconciler(store: &FlakyStore) -> PersistenceReconciler {
    PersistenceReconciler::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        EngineConfig::default().with_debounce(DEBOUNCE),
    )
}

pub fn quality_scope() -> MatrixScope {
    MatrixScope::new(ApplicationId::new(), RequirementCode::QualityMgmt)
}
