//! # In-Memory Store
//!
//! `DashMap`-backed implementation of all three store traits. Each resource
//! kind gets its own map; clones share the same data through an `Arc`.
//!
//! Operations that touch several maps at once (relation toggle, cascading
//! delete) hold `measure_lock` exclusively, and readers of measure state take
//! it shared, so a half-applied cascade is never observable.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use csa_core::{AdditionalMeasureId, CatalogRelation, CatalogScope, Evaluation};
use csa_matrix::{
    AdditionalMeasure, AssessmentCell, MaAssessment, MaCellKey, MatrixScope, ToggleOutcome,
};

use crate::error::StoreError;
use crate::traits::{AdditionalMeasureStore, AssessmentStore, CatalogStore};

struct Inner {
    catalog: DashMap<CatalogScope, Vec<CatalogRelation>>,
    cells: DashMap<MatrixScope, Vec<AssessmentCell>>,
    measures: DashMap<AdditionalMeasureId, AdditionalMeasure>,
    relations: DashMap<MatrixScope, BTreeSet<MaCellKey>>,
    ma_assessments: DashMap<MatrixScope, BTreeMap<MaCellKey, Evaluation>>,
    measure_lock: RwLock<()>,
}

/// Shared in-memory store. Cheaply cloneable.
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                catalog: DashMap::new(),
                cells: DashMap::new(),
                measures: DashMap::new(),
                relations: DashMap::new(),
                ma_assessments: DashMap::new(),
                measure_lock: RwLock::new(()),
            }),
        }
    }

    /// Register (or replace) the relation list of one catalog scope.
    pub fn insert_catalog(&self, scope: CatalogScope, relations: Vec<CatalogRelation>) {
        self.inner.catalog.insert(scope, relations);
    }

    pub fn with_catalog(self, scope: CatalogScope, relations: Vec<CatalogRelation>) -> Self {
        self.insert_catalog(scope, relations);
        self
    }

    /// Number of persisted cells for a scope.
    pub fn cell_count(&self, scope: &MatrixScope) -> usize {
        self.inner.cells.get(scope).map(|c| c.len()).unwrap_or(0)
    }

    fn measure_in_scope(
        &self,
        scope: &MatrixScope,
        id: AdditionalMeasureId,
    ) -> Result<(), StoreError> {
        match self.inner.measures.get(&id) {
            Some(m)
                if m.application_id == scope.application_id
                    && m.requirement == scope.requirement =>
            {
                Ok(())
            }
            _ => Err(StoreError::MeasureNotFound(id)),
        }
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_catalog_relations(
        &self,
        scope: &CatalogScope,
    ) -> Result<Vec<CatalogRelation>, StoreError> {
        self.inner
            .catalog
            .get(scope)
            .map(|r| r.clone())
            .ok_or_else(|| StoreError::CatalogNotFound(scope.to_string()))
    }
}

#[async_trait]
impl AssessmentStore for InMemoryStore {
    async fn get_cells(&self, scope: &MatrixScope) -> Result<Vec<AssessmentCell>, StoreError> {
        Ok(self
            .inner
            .cells
            .get(scope)
            .map(|c| c.clone())
            .unwrap_or_default())
    }

    async fn upsert_cells(
        &self,
        scope: &MatrixScope,
        cells: &[AssessmentCell],
    ) -> Result<(), StoreError> {
        let mut stored = self.inner.cells.entry(*scope).or_default();
        for cell in cells {
            let key = cell.key();
            match stored.iter().position(|c| c.matches(&key)) {
                Some(i) => stored[i].evaluation = cell.evaluation,
                None => stored.push(cell.clone()),
            }
        }
        Ok(())
    }

    async fn insert_missing_cells(
        &self,
        scope: &MatrixScope,
        cells: &[AssessmentCell],
    ) -> Result<usize, StoreError> {
        let mut stored = self.inner.cells.entry(*scope).or_default();
        let mut inserted = 0;
        for cell in cells {
            let key = cell.key();
            if !stored.iter().any(|c| c.matches(&key)) {
                stored.push(cell.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[async_trait]
impl AdditionalMeasureStore for InMemoryStore {
    async fn create_measure(&self, measure: &AdditionalMeasure) -> Result<(), StoreError> {
        let _guard = self.inner.measure_lock.write();
        self.inner.measures.insert(measure.id, measure.clone());
        Ok(())
    }

    async fn get_measure(
        &self,
        id: AdditionalMeasureId,
    ) -> Result<Option<AdditionalMeasure>, StoreError> {
        let _guard = self.inner.measure_lock.read();
        Ok(self.inner.measures.get(&id).map(|m| m.clone()))
    }

    async fn list_measures(
        &self,
        scope: &MatrixScope,
    ) -> Result<Vec<AdditionalMeasure>, StoreError> {
        let _guard = self.inner.measure_lock.read();
        let mut measures: Vec<AdditionalMeasure> = self
            .inner
            .measures
            .iter()
            .filter(|m| {
                m.application_id == scope.application_id && m.requirement == scope.requirement
            })
            .map(|m| m.value().clone())
            .collect();
        measures.sort_by_key(|m| m.created_at);
        Ok(measures)
    }

    async fn update_attachment(
        &self,
        id: AdditionalMeasureId,
        attachment: Option<&str>,
    ) -> Result<(), StoreError> {
        let _guard = self.inner.measure_lock.write();
        let mut measure = self
            .inner
            .measures
            .get_mut(&id)
            .ok_or(StoreError::MeasureNotFound(id))?;
        measure.attachment = attachment.map(str::to_string);
        Ok(())
    }

    async fn delete_measure(&self, id: AdditionalMeasureId) -> Result<(), StoreError> {
        let _guard = self.inner.measure_lock.write();
        let (_, measure) = self
            .inner
            .measures
            .remove(&id)
            .ok_or(StoreError::MeasureNotFound(id))?;
        let scope = MatrixScope::new(measure.application_id, measure.requirement);
        if let Some(mut relations) = self.inner.relations.get_mut(&scope) {
            relations.retain(|k| k.measure_id != id);
        }
        if let Some(mut entries) = self.inner.ma_assessments.get_mut(&scope) {
            entries.retain(|k, _| k.measure_id != id);
        }
        Ok(())
    }

    async fn toggle_relation(
        &self,
        scope: &MatrixScope,
        key: &MaCellKey,
    ) -> Result<ToggleOutcome, StoreError> {
        let _guard = self.inner.measure_lock.write();
        self.measure_in_scope(scope, key.measure_id)?;
        let mut relations = self.inner.relations.entry(*scope).or_default();
        let mut entries = self.inner.ma_assessments.entry(*scope).or_default();
        if relations.remove(key) {
            entries.remove(key);
            Ok(ToggleOutcome::Removed)
        } else {
            relations.insert(key.clone());
            entries.entry(key.clone()).or_default();
            Ok(ToggleOutcome::Added)
        }
    }

    async fn list_relations(&self, scope: &MatrixScope) -> Result<Vec<MaCellKey>, StoreError> {
        let _guard = self.inner.measure_lock.read();
        Ok(self
            .inner
            .relations
            .get(scope)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_ma_assessments(
        &self,
        scope: &MatrixScope,
    ) -> Result<Vec<MaAssessment>, StoreError> {
        let _guard = self.inner.measure_lock.read();
        Ok(self
            .inner
            .ma_assessments
            .get(scope)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(k, e)| MaAssessment {
                        measure_id: k.measure_id,
                        subclause_id: k.subclause_id.clone(),
                        evaluation: *e,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn upsert_ma_assessments(
        &self,
        scope: &MatrixScope,
        entries: &[MaAssessment],
    ) -> Result<(), StoreError> {
        let _guard = self.inner.measure_lock.write();
        let mut stored = self.inner.ma_assessments.entry(*scope).or_default();
        for entry in entries {
            stored.insert(entry.key(), entry.evaluation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csa_core::{
        ApplicationId, MaturityLevel, MeasureCode, RequirementCode, RequirementVersion, SubclauseId,
    };
    use csa_matrix::{CellKey, NewAdditionalMeasure, Provenance};

    fn scope() -> MatrixScope {
        MatrixScope::new(ApplicationId::new(), RequirementCode::QualityMgmt)
    }

    fn cell(m: &str, s: &str) -> AssessmentCell {
        AssessmentCell::catalog(CellKey::new(
            MeasureCode::new(m).unwrap(),
            SubclauseId::new(s).unwrap(),
        ))
    }

    fn new_measure(scope: &MatrixScope) -> AdditionalMeasure {
        NewAdditionalMeasure {
            title: "Extra control".into(),
            description: None,
            attachment: None,
        }
        .into_measure(scope.application_id, scope.requirement)
    }

    #[tokio::test]
    async fn test_unknown_catalog_is_error() {
        let store = InMemoryStore::new();
        let scope = CatalogScope::new(RequirementCode::Accuracy, RequirementVersion::default());
        let err = store.get_catalog_relations(&scope).await.unwrap_err();
        assert!(matches!(err, StoreError::CatalogNotFound(_)));
    }

    #[tokio::test]
    async fn test_insert_missing_never_overwrites() {
        let store = InMemoryStore::new();
        let scope = scope();
        let mut rated = cell("MG_01", "S1");
        rated.evaluation.maturity = Some(MaturityLevel::L4);
        store.upsert_cells(&scope, &[rated]).await.unwrap();

        let inserted = store
            .insert_missing_cells(&scope, &[cell("MG_01", "S1"), cell("MG_02", "S1")])
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let cells = store.get_cells(&scope).await.unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].evaluation.maturity, Some(MaturityLevel::L4));
    }

    #[tokio::test]
    async fn test_same_key_in_two_requirements_stays_separate() {
        let store = InMemoryStore::new();
        let application_id = ApplicationId::new();
        let quality = MatrixScope::new(application_id, RequirementCode::QualityMgmt);
        let risk = MatrixScope::new(application_id, RequirementCode::RiskMgmt);

        store
            .insert_missing_cells(&risk, &[cell("MG_05", "S1")])
            .await
            .unwrap();
        let mut added = AssessmentCell::user_added(CellKey::new(
            MeasureCode::new("MG_05").unwrap(),
            SubclauseId::new("S1").unwrap(),
        ));
        added.evaluation.maturity = Some(MaturityLevel::L3);
        store.upsert_cells(&quality, &[added]).await.unwrap();

        let quality_cells = store.get_cells(&quality).await.unwrap();
        assert_eq!(quality_cells.len(), 1);
        assert_eq!(quality_cells[0].provenance, Provenance::UserAdded);
        assert_eq!(quality_cells[0].evaluation.maturity, Some(MaturityLevel::L3));

        let risk_cells = store.get_cells(&risk).await.unwrap();
        assert_eq!(risk_cells.len(), 1);
        assert_eq!(risk_cells[0].provenance, Provenance::Catalog);
        assert_eq!(risk_cells[0].evaluation.maturity, None);
    }

    #[tokio::test]
    async fn test_upsert_keeps_provenance() {
        let store = InMemoryStore::new();
        let scope = scope();
        store.insert_missing_cells(&scope, &[cell("MG_01", "S1")]).await.unwrap();

        let mut user = AssessmentCell::user_added(cell("MG_01", "S1").key());
        user.evaluation.maturity = Some(MaturityLevel::L8);
        store.upsert_cells(&scope, &[user]).await.unwrap();

        let cells = store.get_cells(&scope).await.unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].provenance, Provenance::Catalog);
        assert_eq!(cells[0].evaluation.maturity, Some(MaturityLevel::L8));
    }

    #[tokio::test]
    async fn test_toggle_creates_and_removes_companion() {
        let store = InMemoryStore::new();
        let scope = scope();
        let m = new_measure(&scope);
        store.create_measure(&m).await.unwrap();
        let key = MaCellKey::new(m.id, SubclauseId::new("S1").unwrap());

        assert_eq!(store.toggle_relation(&scope, &key).await.unwrap(), ToggleOutcome::Added);
        assert_eq!(store.list_relations(&scope).await.unwrap().len(), 1);
        assert_eq!(store.get_ma_assessments(&scope).await.unwrap().len(), 1);

        assert_eq!(store.toggle_relation(&scope, &key).await.unwrap(), ToggleOutcome::Removed);
        assert!(store.list_relations(&scope).await.unwrap().is_empty());
        assert!(store.get_ma_assessments(&scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_foreign_measure_rejected() {
        let store = InMemoryStore::new();
        let scope = scope();
        let other = MatrixScope::new(ApplicationId::new(), RequirementCode::QualityMgmt);
        let m = new_measure(&other);
        store.create_measure(&m).await.unwrap();
        let key = MaCellKey::new(m.id, SubclauseId::new("S1").unwrap());
        assert!(store.toggle_relation(&scope, &key).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let store = InMemoryStore::new();
        let scope = scope();
        let m = new_measure(&scope);
        store.create_measure(&m).await.unwrap();
        for s in ["S1", "S2", "S3"] {
            let key = MaCellKey::new(m.id, SubclauseId::new(s).unwrap());
            store.toggle_relation(&scope, &key).await.unwrap();
        }
        store.delete_measure(m.id).await.unwrap();
        assert!(store.get_measure(m.id).await.unwrap().is_none());
        assert!(store.list_relations(&scope).await.unwrap().is_empty());
        assert!(store.get_ma_assessments(&scope).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_measure(m.id).await,
            Err(StoreError::MeasureNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_measures_is_scoped_and_ordered() {
        let store = InMemoryStore::new();
        let scope = scope();
        let first = new_measure(&scope);
        let mut second = new_measure(&scope);
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        store.create_measure(&second).await.unwrap();
        store.create_measure(&first).await.unwrap();
        store
            .create_measure(&new_measure(&MatrixScope::new(
                scope.application_id,
                RequirementCode::Logging,
            )))
            .await
            .unwrap();

        let listed = store.list_measures(&scope).await.unwrap();
        assert_eq!(listed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![first.id, second.id]);
    }
}
