//! # Catalog Seeder
//!
//! Builds the initial guide-measure cells for a scope from the catalog's
//! static relation list. Every produced cell is unset and tagged
//! [`Provenance::Catalog`](crate::Provenance::Catalog).
//!
//! Seeding is pure. Storage-level idempotence (insert-if-absent keyed by
//! `(application, requirement, measure, sub-clause)`) is the store's job;
//! this type only guarantees that one relation list yields one cell per
//! distinct key.

use std::collections::HashSet;

use csa_core::{CatalogRelation, CatalogScope};

use crate::cell::{AssessmentCell, CellKey};
use crate::matrix::{AssessmentMatrix, MatrixScope};

/// Stateless seeding entry point.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogSeeder;

impl CatalogSeeder {
    /// One unset catalog cell per distinct `(measure, sub-clause)` in
    /// `relations`, in catalog order.
    ///
    /// `catalog` must name the requirement of `scope`; relations listed for
    /// another requirement produce no cells.
    pub fn seed(
        scope: &MatrixScope,
        catalog: &CatalogScope,
        relations: &[CatalogRelation],
    ) -> Vec<AssessmentCell> {
        if catalog.requirement != scope.requirement {
            tracing::warn!(
                scope = %scope,
                catalog = %catalog,
                "catalog scope does not match matrix requirement; seeding nothing"
            );
            return Vec::new();
        }
        let mut seen = HashSet::with_capacity(relations.len());
        relations
            .iter()
            .map(|r| CellKey::new(r.measure_code.clone(), r.subclause_id.clone()))
            .filter(|k| seen.insert(k.clone()))
            .map(AssessmentCell::catalog)
            .collect()
    }

    /// Convenience: a fresh matrix holding only seeded cells. Used as the
    /// in-memory fallback when nothing could be read back from storage.
    pub fn seed_matrix(
        scope: MatrixScope,
        catalog: &CatalogScope,
        relations: &[CatalogRelation],
    ) -> AssessmentMatrix {
        let cells = Self::seed(&scope, catalog, relations);
        AssessmentMatrix::from_cells(scope, cells)
    }
}
