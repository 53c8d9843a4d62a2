//! # Additional-Measure Session
//!
//! Live [`AdditionalMeasureRelationSet`] for one open scope.
//!
//! - Toggle and delete go straight to the store. Local state changes only
//!   after the store confirms, and only by what the store reports.
//! - MA-assessment edits follow the same debounce and flush protocol as
//!   guide-measure cells.
//! - Toggle, delete and flush share one lock, so a flush snapshot can never
//!   resurrect an assessment row removed by a concurrent toggle or delete.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use csa_core::{AdditionalMeasureId, FieldUpdate, SubclauseId};
use csa_matrix::{
    AdditionalMeasure, AdditionalMeasureRelationSet, MaAssessment, MaCellKey, MatrixScope,
    NewAdditionalMeasure, Progress, ToggleOutcome,
};
use csa_store::AdditionalMeasureStore;

use crate::debounce::Debouncer;
use crate::error::EngineError;
use crate::session::FlushOutcome;

struct Shared {
    set: Mutex<AdditionalMeasureRelationSet>,
    dirty: AtomicBool,
    store_lock: tokio::sync::Mutex<()>,
    store: Arc<dyn AdditionalMeasureStore>,
}

impl Shared {
    async fn flush(&self) -> Result<FlushOutcome, EngineError> {
        let _serial = self.store_lock.lock().await;
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(FlushOutcome::Clean);
        }
        let (scope, entries) = {
            let set = self.set.lock();
            (*set.scope(), set.assessments())
        };
        match self.store.upsert_ma_assessments(&scope, &entries).await {
            Ok(()) => {
                metrics::counter!("csa_flush_total", "kind" => "ma").increment(1);
                tracing::debug!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    entries = entries.len(),
                    "MA assessments flushed"
                );
                Ok(FlushOutcome::Flushed(entries.len()))
            }
            Err(e) => {
                self.dirty.store(true, Ordering::SeqCst);
                metrics::counter!("csa_flush_failures_total", "kind" => "ma").increment(1);
                tracing::warn!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    entries = entries.len(),
                    error = %e,
                    "MA assessment flush failed; changes kept in memory"
                );
                Err(e.into())
            }
        }
    }
}

/// Additional measures of one open scope.
pub struct AdditionalMeasureSession {
    shared: Arc<Shared>,
    debouncer: Debouncer,
    load_failed: bool,
}

impl AdditionalMeasureSession {
    pub(crate) fn new(
        set: AdditionalMeasureRelationSet,
        store: Arc<dyn AdditionalMeasureStore>,
        debounce: Duration,
        load_failed: bool,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                set: Mutex::new(set),
                dirty: AtomicBool::new(false),
                store_lock: tokio::sync::Mutex::new(()),
                store,
            }),
            debouncer: Debouncer::new(debounce),
            load_failed,
        }
    }

    pub fn scope(&self) -> MatrixScope {
        *self.shared.set.lock().scope()
    }

    /// Whether reading stored measures failed when the scope was opened.
    pub fn load_failed(&self) -> bool {
        self.load_failed
    }

    pub fn measures(&self) -> Vec<AdditionalMeasure> {
        self.shared.set.lock().measures().to_vec()
    }

    pub fn measure(&self, id: AdditionalMeasureId) -> Option<AdditionalMeasure> {
        self.shared.set.lock().measure(id).cloned()
    }

    pub fn relations(&self) -> Vec<MaCellKey> {
        self.shared.set.lock().relations().cloned().collect()
    }

    pub fn relations_for(&self, id: AdditionalMeasureId) -> Vec<SubclauseId> {
        self.shared.set.lock().relations_for(id)
    }

    pub fn assessments(&self) -> Vec<MaAssessment> {
        self.shared.set.lock().assessments()
    }

    pub fn assessments_for(&self, id: AdditionalMeasureId) -> Vec<MaAssessment> {
        self.shared.set.lock().assessments_for(id)
    }

    pub fn is_complete(&self) -> bool {
        self.shared.set.lock().is_complete()
    }

    pub fn progress(&self) -> Progress {
        self.shared.set.lock().progress()
    }

    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.load(Ordering::SeqCst)
    }

    /// Persist a new measure, then add it locally.
    pub async fn create_measure(
        &self,
        new: NewAdditionalMeasure,
    ) -> Result<AdditionalMeasure, EngineError> {
        let scope = self.scope();
        let measure = new.into_measure(scope.application_id, scope.requirement);
        self.shared.store.create_measure(&measure).await.map_err(|e| {
            tracing::warn!(
                application_id = %scope.application_id,
                requirement = %scope.requirement,
                error = %e,
                "additional measure creation failed"
            );
            e
        })?;
        self.shared.set.lock().add_measure(measure.clone());
        tracing::info!(
            application_id = %scope.application_id,
            requirement = %scope.requirement,
            measure_id = %measure.id,
            "additional measure created"
        );
        Ok(measure)
    }

    pub async fn update_attachment(
        &self,
        id: AdditionalMeasureId,
        attachment: Option<String>,
    ) -> Result<(), EngineError> {
        if self.measure(id).is_none() {
            return Err(csa_matrix::MatrixError::UnknownMeasure(id).into());
        }
        self.shared
            .store
            .update_attachment(id, attachment.as_deref())
            .await?;
        self.shared.set.lock().set_attachment(id, attachment)?;
        Ok(())
    }

    /// Add the relation if absent, remove it if present.
    ///
    /// Returns what actually happened. Any failure yields
    /// [`ToggleOutcome::Unchanged`] and leaves local state untouched.
    pub async fn toggle(&self, key: MaCellKey) -> ToggleOutcome {
        let scope = self.scope();
        if self.measure(key.measure_id).is_none() {
            tracing::warn!(
                application_id = %scope.application_id,
                key = %key,
                "toggle for a measure outside this scope ignored"
            );
            return ToggleOutcome::Unchanged;
        }
        let _serial = self.shared.store_lock.lock().await;
        match self.shared.store.toggle_relation(&scope, &key).await {
            Ok(outcome) => {
                self.shared.set.lock().apply_toggle(key, outcome);
                let label = if outcome.added() { "added" } else { "removed" };
                metrics::counter!("csa_relation_toggles_total", "outcome" => label).increment(1);
                outcome
            }
            Err(e) => {
                metrics::counter!("csa_relation_toggles_total", "outcome" => "failed")
                    .increment(1);
                tracing::warn!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    key = %key,
                    error = %e,
                    "relation toggle failed; no change applied"
                );
                ToggleOutcome::Unchanged
            }
        }
    }

    /// Delete a measure with its relations and assessments. On failure
    /// nothing is removed locally.
    pub async fn delete_measure(&self, id: AdditionalMeasureId) -> Result<(), EngineError> {
        let scope = self.scope();
        if self.measure(id).is_none() {
            return Err(csa_matrix::MatrixError::UnknownMeasure(id).into());
        }
        let _serial = self.shared.store_lock.lock().await;
        if let Err(e) = self.shared.store.delete_measure(id).await {
            tracing::warn!(
                application_id = %scope.application_id,
                requirement = %scope.requirement,
                measure_id = %id,
                error = %e,
                "additional measure delete failed; local state kept"
            );
            return Err(e.into());
        }
        self.shared.set.lock().remove_measure(id);
        tracing::info!(
            application_id = %scope.application_id,
            measure_id = %id,
            "additional measure deleted"
        );
        Ok(())
    }

    /// Edit the assessment of an active relation.
    pub fn set_field(&self, key: &MaCellKey, update: FieldUpdate) -> Result<(), EngineError> {
        self.shared.set.lock().set_field(key, update)?;
        self.shared.dirty.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        self.debouncer.schedule(move || async move {
            let _ = shared.flush().await;
        });
        Ok(())
    }

    pub async fn flush_now(&self) -> Result<FlushOutcome, EngineError> {
        self.debouncer.cancel();
        self.shared.flush().await
    }
}

impl std::fmt::Debug for AdditionalMeasureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = self.shared.set.lock();
        f.debug_struct("AdditionalMeasureSession")
            .field("scope", set.scope())
            .field("measures", &set.measures().len())
            .field("relations", &set.relations().count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csa_core::{ApplicationId, MaturityLevel, RequirementCode};
    use csa_store::{Fault, FlakyStore, InMemoryStore};

    fn session(store: &FlakyStore) -> AdditionalMeasureSession {
        let scope = MatrixScope::new(ApplicationId::new(), RequirementCode::Transparency);
        AdditionalMeasureSession::new(
            AdditionalMeasureRelationSet::new(scope),
            Arc::new(store.clone()),
            Duration::from_millis(1000),
            false,
        )
    }

    fn new_measure(title: &str) -> NewAdditionalMeasure {
        NewAdditionalMeasure {
            title: title.to_string(),
            description: Some("user-authored".into()),
            attachment: None,
        }
    }

    fn sub(s: &str) -> SubclauseId {
        SubclauseId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_toggle_roundtrip_against_store() {
        let store = FlakyStore::new(InMemoryStore::new());
        let s = session(&store);
        let m = s.create_measure(new_measure("Model card")).await.unwrap();
        assert_eq!(m.evaluator_status, "00");
        let key = MaCellKey::new(m.id, sub("S1"));

        assert_eq!(s.toggle(key.clone()).await, ToggleOutcome::Added);
        assert_eq!(s.assessments().len(), 1);
        assert_eq!(s.toggle(key.clone()).await, ToggleOutcome::Removed);
        assert!(s.relations().is_empty());
        assert!(s.assessments().is_empty());
        assert!(store.inner().list_relations(&s.scope()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_toggle_changes_nothing() {
        let store = FlakyStore::new(InMemoryStore::new());
        let s = session(&store);
        let m = s.create_measure(new_measure("Bias audit")).await.unwrap();
        store.fail(Fault::Toggle);
        let outcome = s.toggle(MaCellKey::new(m.id, sub("S2"))).await;
        assert_eq!(outcome, ToggleOutcome::Unchanged);
        assert!(!outcome.added() && !outcome.removed());
        assert!(s.relations().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_unknown_measure_is_unchanged() {
        let store = FlakyStore::new(InMemoryStore::new());
        let s = session(&store);
        let outcome = s.toggle(MaCellKey::new(AdditionalMeasureId::new(), sub("S1"))).await;
        assert_eq!(outcome, ToggleOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_delete_cascade_and_failure() {
        let store = FlakyStore::new(InMemoryStore::new());
        let s = session(&store);
        let m = s.create_measure(new_measure("Red team")).await.unwrap();
        for sc in ["S1", "S2", "S3"] {
            s.toggle(MaCellKey::new(m.id, sub(sc))).await;
        }
        assert_eq!(s.assessments_for(m.id).len(), 3);

        store.fail(Fault::Delete);
        assert!(s.delete_measure(m.id).await.is_err());
        assert_eq!(s.relations_for(m.id).len(), 3);
        assert!(s.measure(m.id).is_some());

        store.heal(Fault::Delete);
        s.delete_measure(m.id).await.unwrap();
        assert!(s.relations_for(m.id).is_empty());
        assert!(s.assessments_for(m.id).is_empty());
        assert!(store.inner().get_ma_assessments(&s.scope()).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ma_edits_are_debounced() {
        let store = FlakyStore::new(InMemoryStore::new());
        let s = session(&store);
        let m = s.create_measure(new_measure("Incident drill")).await.unwrap();
        let a = MaCellKey::new(m.id, sub("S1"));
        let b = MaCellKey::new(m.id, sub("S2"));
        s.toggle(a.clone()).await;
        s.toggle(b.clone()).await;

        s.set_field(&a, FieldUpdate::Maturity(Some(MaturityLevel::L2))).unwrap();
        s.set_field(&b, FieldUpdate::Maturity(Some(MaturityLevel::L7))).unwrap();
        assert!(s.is_complete());
        tokio::time::sleep(Duration::from_millis(1200)).await;

        assert_eq!(store.ma_upsert_calls(), 1);
        assert_eq!(store.last_ma_upsert().len(), 2);
        let stored = store.inner().get_ma_assessments(&s.scope()).await.unwrap();
        assert!(stored.iter().all(|e| e.evaluation.is_completed()));
    }

    #[tokio::test]
    async fn test_set_field_without_relation_is_error() {
        let store = FlakyStore::new(InMemoryStore::new());
        let s = session(&store);
        let m = s.create_measure(new_measure("Review")).await.unwrap();
        let err = s
            .set_field(&MaCellKey::new(m.id, sub("S5")), FieldUpdate::Maturity(None))
            .unwrap_err();
        assert!(matches!(err, EngineError::Matrix(_)));
        assert!(!s.is_dirty());
    }

    #[tokio::test]
    async fn test_update_attachment() {
        let store = FlakyStore::new(InMemoryStore::new());
        let s = session(&store);
        let m = s.create_measure(new_measure("Logging policy")).await.unwrap();
        s.update_attachment(m.id, Some("policy.pdf".into())).await.unwrap();
        assert_eq!(s.measure(m.id).unwrap().attachment.as_deref(), Some("policy.pdf"));
        let stored = store.inner().get_measure(m.id).await.unwrap().unwrap();
        assert_eq!(stored.attachment.as_deref(), Some("policy.pdf"));
    }
}
