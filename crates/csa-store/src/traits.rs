//! # Store Traits
//!
//! Object-safe async interfaces for the engine's storage collaborators.
//! Implementations must be `Send + Sync` so they can be shared as
//! `Arc<dyn …>` across the debounce tasks of every open scope.

use async_trait::async_trait;

use csa_core::{AdditionalMeasureId, CatalogRelation, CatalogScope};
use csa_matrix::{
    AdditionalMeasure, AssessmentCell, MaAssessment, MaCellKey, MatrixScope, ToggleOutcome,
};

use crate::error::StoreError;

/// Read-only access to the versioned catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Relations defined for `(requirement, version)`.
    ///
    /// An unknown scope is an error ([`StoreError::CatalogNotFound`]), not an
    /// empty list.
    async fn get_catalog_relations(
        &self,
        scope: &CatalogScope,
    ) -> Result<Vec<CatalogRelation>, StoreError>;
}

/// Persisted guide-measure cells.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// All persisted cells for the scope, in insertion order.
    async fn get_cells(&self, scope: &MatrixScope) -> Result<Vec<AssessmentCell>, StoreError>;

    /// Insert or update every cell, keyed by `(application, requirement,
    /// measure, sub-clause)`. Existing rows keep their provenance.
    async fn upsert_cells(
        &self,
        scope: &MatrixScope,
        cells: &[AssessmentCell],
    ) -> Result<(), StoreError>;

    /// Insert only the cells whose key is absent. Never overwrites an existing
    /// row. Returns how many rows were inserted.
    async fn insert_missing_cells(
        &self,
        scope: &MatrixScope,
        cells: &[AssessmentCell],
    ) -> Result<usize, StoreError>;
}

/// User-declared measures, their relations and MA assessments.
#[async_trait]
pub trait AdditionalMeasureStore: Send + Sync {
    async fn create_measure(&self, measure: &AdditionalMeasure) -> Result<(), StoreError>;

    async fn get_measure(
        &self,
        id: AdditionalMeasureId,
    ) -> Result<Option<AdditionalMeasure>, StoreError>;

    /// Measures of the scope ordered by creation time.
    async fn list_measures(
        &self,
        scope: &MatrixScope,
    ) -> Result<Vec<AdditionalMeasure>, StoreError>;

    async fn update_attachment(
        &self,
        id: AdditionalMeasureId,
        attachment: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Delete a measure together with all of its relations and assessments.
    /// Either everything is removed or nothing is.
    async fn delete_measure(&self, id: AdditionalMeasureId) -> Result<(), StoreError>;

    /// Existence check plus insert-or-delete in one call. Adding a relation
    /// also creates its unset assessment row; removing deletes it.
    async fn toggle_relation(
        &self,
        scope: &MatrixScope,
        key: &MaCellKey,
    ) -> Result<ToggleOutcome, StoreError>;

    async fn list_relations(&self, scope: &MatrixScope) -> Result<Vec<MaCellKey>, StoreError>;

    async fn get_ma_assessments(
        &self,
        scope: &MatrixScope,
    ) -> Result<Vec<MaAssessment>, StoreError>;

    /// Upsert keyed by `(measure, requirement, sub-clause)`.
    async fn upsert_ma_assessments(
        &self,
        scope: &MatrixScope,
        entries: &[MaAssessment],
    ) -> Result<(), StoreError>;
}
