//! # Test Doubles
//!
//! [`FlakyStore`] wraps an [`InMemoryStore`] with per-operation fault
//! injection and call recording. Engine and integration tests use it to
//! observe flush coalescing and to drive the seed, load, flush, toggle and
//! cascade failure paths.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use csa_core::{AdditionalMeasureId, CatalogRelation, CatalogScope};
use csa_matrix::{
    AdditionalMeasure, AssessmentCell, MaAssessment, MaCellKey, MatrixScope, ToggleOutcome,
};

use crate::error::StoreError;
use crate::memory::InMemoryStore;
use crate::traits::{AdditionalMeasureStore, AssessmentStore, CatalogStore};

/// Store operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Catalog,
    Seed,
    Load,
    Upsert,
    Toggle,
    Delete,
    MaUpsert,
    MaLoad,
}

#[derive(Default)]
struct Recorder {
    faults: Mutex<HashSet<Fault>>,
    upsert_calls: AtomicUsize,
    ma_upsert_calls: AtomicUsize,
    seed_calls: AtomicUsize,
    last_upsert: Mutex<Vec<AssessmentCell>>,
    last_ma_upsert: Mutex<Vec<MaAssessment>>,
}

/// Fault-injecting, call-recording wrapper around [`InMemoryStore`].
#[derive(Clone)]
pub struct FlakyStore {
    inner: InMemoryStore,
    recorder: Arc<Recorder>,
}

impl FlakyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            recorder: Arc::new(Recorder::default()),
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn fail(&self, fault: Fault) {
        self.recorder.faults.lock().insert(fault);
    }

    pub fn heal(&self, fault: Fault) {
        self.recorder.faults.lock().remove(&fault);
    }

    pub fn upsert_calls(&self) -> usize {
        self.recorder.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn ma_upsert_calls(&self) -> usize {
        self.recorder.ma_upsert_calls.load(Ordering::SeqCst)
    }

    pub fn seed_calls(&self) -> usize {
        self.recorder.seed_calls.load(Ordering::SeqCst)
    }

    /// Payload of the most recent cell upsert attempt.
    pub fn last_upsert(&self) -> Vec<AssessmentCell> {
        self.recorder.last_upsert.lock().clone()
    }

    pub fn last_ma_upsert(&self) -> Vec<MaAssessment> {
        self.recorder.last_ma_upsert.lock().clone()
    }

    fn check(&self, fault: Fault) -> Result<(), StoreError> {
        if self.recorder.faults.lock().contains(&fault) {
            Err(StoreError::Unavailable(format!("injected {fault:?} fault")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CatalogStore for FlakyStore {
    async fn get_catalog_relations(
        &self,
        scope: &CatalogScope,
    ) -> Result<Vec<CatalogRelation>, StoreError> {
        self.check(Fault::Catalog)?;
        self.inner.get_catalog_relations(scope).await
    }
}

#[async_trait]
impl AssessmentStore for FlakyStore {
    async fn get_cells(&self, scope: &MatrixScope) -> Result<Vec<AssessmentCell>, StoreError> {
        self.check(Fault::Load)?;
        self.inner.get_cells(scope).await
    }

    async fn upsert_cells(
        &self,
        scope: &MatrixScope,
        cells: &[AssessmentCell],
    ) -> Result<(), StoreError> {
        self.recorder.upsert_calls.fetch_add(1, Ordering::SeqCst);
        *self.recorder.last_upsert.lock() = cells.to_vec();
        self.check(Fault::Upsert)?;
        self.inner.upsert_cells(scope, cells).await
    }

    async fn insert_missing_cells(
        &self,
        scope: &MatrixScope,
        cells: &[AssessmentCell],
    ) -> Result<usize, StoreError> {
        self.recorder.seed_calls.fetch_add(1, Ordering::SeqCst);
        self.check(Fault::Seed)?;
        self.inner.insert_missing_cells(scope, cells).await
    }
}

#[async_trait]
impl AdditionalMeasureStore for FlakyStore {
    async fn create_measure(&self, measure: &AdditionalMeasure) -> Result<(), StoreError> {
        self.inner.create_measure(measure).await
    }

    async fn get_measure(
        &self,
        id: AdditionalMeasureId,
    ) -> Result<Option<AdditionalMeasure>, StoreError> {
        self.inner.get_measure(id).await
    }

    async fn list_measures(
        &self,
        scope: &MatrixScope,
    ) -> Result<Vec<AdditionalMeasure>, StoreError> {
        self.check(Fault::MaLoad)?;
        self.inner.list_measures(scope).await
    }

    async fn update_attachment(
        &self,
        id: AdditionalMeasureId,
        attachment: Option<&str>,
    ) -> Result<(), StoreError> {
        self.inner.update_attachment(id, attachment).await
    }

    async fn delete_measure(&self, id: AdditionalMeasureId) -> Result<(), StoreError> {
        self.check(Fault::Delete)?;
        self.inner.delete_measure(id).await
    }

    async fn toggle_relation(
        &self,
        scope: &MatrixScope,
        key: &MaCellKey,
    ) -> Result<ToggleOutcome, StoreError> {
        self.check(Fault::Toggle)?;
        self.inner.toggle_relation(scope, key).await
    }

    async fn list_relations(&self, scope: &MatrixScope) -> Result<Vec<MaCellKey>, StoreError> {
        self.check(Fault::MaLoad)?;
        self.inner.list_relations(scope).await
    }

    async fn get_ma_assessments(
        &self,
        scope: &MatrixScope,
    ) -> Result<Vec<MaAssessment>, StoreError> {
        self.check(Fault::MaLoad)?;
        self.inner.get_ma_assessments(scope).await
    }

    async fn upsert_ma_assessments(
        &self,
        scope: &MatrixScope,
        entries: &[MaAssessment],
    ) -> Result<(), StoreError> {
        self.recorder.ma_upsert_calls.fetch_add(1, Ordering::SeqCst);
        *self.recorder.last_ma_upsert.lock() = entries.to_vec();
        self.check(Fault::MaUpsert)?;
        self.inner.upsert_ma_assessments(scope, entries).await
    }
}
