//! # Assessment Matrix
//!
//! The mutable collection of [`AssessmentCell`]s for one
//! `(application, requirement)` scope.
//!
//! Cells are kept in insertion order: catalog cells first (in catalog
//! order), user-added cells appended. A user-added cell may share its key
//! with an existing catalog cell; such duplicates are kept as separate rows
//! in memory and edited together by [`AssessmentMatrix::set_field`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use csa_core::{ApplicationId, FieldUpdate, RequirementCode};

use crate::cell::{AssessmentCell, CellKey, CellView, Provenance};
use crate::error::MatrixError;

/// The `(application, requirement)` pair a matrix belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixScope {
    pub application_id: ApplicationId,
    pub requirement: RequirementCode,
}

impl MatrixScope {
    pub fn new(application_id: ApplicationId, requirement: RequirementCode) -> Self {
        Self {
            application_id,
            requirement,
        }
    }
}

impl std::fmt::Display for MatrixScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.application_id, self.requirement)
    }
}

/// Completed-over-total counter for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Fraction of completed cells; `0.0` for an empty scope.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Whether every counted entry is completed. Vacuously true when empty.
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

/// Guide-measure cells for one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentMatrix {
    scope: MatrixScope,
    cells: Vec<AssessmentCell>,
}

impl AssessmentMatrix {
    /// An empty matrix for `scope`.
    pub fn new(scope: MatrixScope) -> Self {
        Self {
            scope,
            cells: Vec::new(),
        }
    }

    /// A matrix holding `cells` verbatim, provenance and values preserved.
    pub fn from_cells(scope: MatrixScope, cells: Vec<AssessmentCell>) -> Self {
        Self { scope, cells }
    }

    pub fn scope(&self) -> &MatrixScope {
        &self.scope
    }

    pub fn cells(&self) -> &[AssessmentCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.cells.iter().any(|c| c.matches(key))
    }

    /// Apply `update` to every cell with `key`. Returns how many cells changed.
    ///
    /// More than one cell is touched only when a user-added cell duplicates
    /// a catalog key.
    pub fn set_field(&mut self, key: &CellKey, update: FieldUpdate) -> Result<usize, MatrixError> {
        let mut touched = 0;
        for cell in self.cells.iter_mut().filter(|c| c.matches(key)) {
            cell.evaluation.apply(update);
            touched += 1;
        }
        if touched == 0 {
            return Err(MatrixError::UnknownCell {
                measure_code: key.measure_code.clone(),
                subclause_id: key.subclause_id.clone(),
            });
        }
        Ok(touched)
    }

    /// Append an unset user-added cell, even when the key already exists.
    pub fn add_cell(&mut self, key: CellKey) -> &AssessmentCell {
        if self.contains(&key) {
            tracing::debug!(
                scope = %self.scope,
                key = %key,
                "user-added cell duplicates an existing key"
            );
        }
        let index = self.cells.len();
        self.cells.push(AssessmentCell::user_added(key));
        &self.cells[index]
    }

    /// Take over persisted values for every key not in `local_wins`.
    ///
    /// Keys present in storage but missing here are appended. Returns the
    /// number of persisted rows taken over.
    pub fn absorb_persisted(
        &mut self,
        persisted: Vec<AssessmentCell>,
        local_wins: &HashSet<CellKey>,
    ) -> usize {
        let mut absorbed = 0;
        for stored in persisted {
            let key = stored.key();
            if local_wins.contains(&key) {
                continue;
            }
            let mut matched = false;
            for cell in self.cells.iter_mut().filter(|c| c.matches(&key)) {
                cell.evaluation = stored.evaluation;
                matched = true;
            }
            if !matched {
                self.cells.push(stored);
            }
            absorbed += 1;
        }
        absorbed
    }

    /// Whether every cell has a maturity recorded.
    pub fn is_fully_evaluated(&self) -> bool {
        self.cells.iter().all(|c| c.evaluation.is_completed())
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self
                .cells
                .iter()
                .filter(|c| c.evaluation.is_completed())
                .count(),
            total: self.cells.len(),
        }
    }

    pub fn views(&self) -> Vec<CellView> {
        self.cells.iter().map(AssessmentCell::view).collect()
    }

    /// One row per distinct key, for a bulk upsert keyed by
    /// `(application, requirement, measure, sub-clause)`.
    ///
    /// The first occurrence of a key wins. Duplicated keys always carry equal
    /// evaluations because `set_field` edits them together; a catalog row
    /// precedes any user-added duplicate, so catalog provenance is kept.
    pub fn flush_rows(&self) -> Vec<AssessmentCell> {
        let mut seen = HashSet::with_capacity(self.cells.len());
        self.cells
            .iter()
            .filter(|c| seen.insert(c.key()))
            .cloned()
            .collect()
    }

    pub fn count_by_provenance(&self, provenance: Provenance) -> usize {
        self.cells
            .iter()
            .filter(|c| c.provenance == provenance)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csa_core::{Difficulty, MaturityLevel, MeasureCode, SubclauseId};

    fn key(m: &str, s: &str) -> CellKey {
        CellKey::new(MeasureCode::new(m).unwrap(), SubclauseId::new(s).unwrap())
    }

    fn scope() -> MatrixScope {
        MatrixScope::new(ApplicationId::new(), RequirementCode::QualityMgmt)
    }

    fn catalog_matrix() -> AssessmentMatrix {
        AssessmentMatrix::from_cells(
            scope(),
            vec![
                AssessmentCell::catalog(key("MG_01", "S1")),
                AssessmentCell::catalog(key("MG_01", "S2")),
                AssessmentCell::catalog(key("MG_02", "S1")),
            ],
        )
    }

    #[test]
    fn test_set_field_updates_single_cell() {
        let mut m = catalog_matrix();
        let touched = m
            .set_field(&key("MG_01", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L5)))
            .unwrap();
        assert_eq!(touched, 1);
        let views = m.views();
        assert_eq!(views[0].adaptation_plan, "03");
        assert_eq!(views[1].adaptation_plan, "-");
        assert_eq!(views[2].adaptation_plan, "-");
    }

    #[test]
    fn test_absorb_persisted_skips_locally_edited_keys() {
        let mut m = catalog_matrix();
        m.set_field(&key("MG_01", "S2"), FieldUpdate::Maturity(Some(MaturityLevel::L2)))
            .unwrap();

        let rated = |k: CellKey| {
            let mut c = AssessmentCell::catalog(k);
            c.evaluation.maturity = Some(MaturityLevel::L7);
            c
        };
        let persisted = vec![
            rated(key("MG_01", "S1")),
            rated(key("MG_01", "S2")),
            rated(key("MG_04", "S3")),
        ];
        let local_wins = HashSet::from([key("MG_01", "S2")]);

        assert_eq!(m.absorb_persisted(persisted, &local_wins), 2);
        assert_eq!(m.len(), 4);
        let maturity = |k: CellKey| {
            m.cells()
                .iter()
                .find(|c| c.matches(&k))
                .and_then(|c| c.evaluation.maturity)
        };
        assert_eq!(maturity(key("MG_01", "S1")), Some(MaturityLevel::L7));
        assert_eq!(maturity(key("MG_01", "S2")), Some(MaturityLevel::L2));
        assert_eq!(maturity(key("MG_02", "S1")), None);
        assert_eq!(maturity(key("MG_04", "S3")), Some(MaturityLevel::L7));
    }

    #[test]
    fn test_set_field_unknown_key_is_error() {
        let mut m = catalog_matrix();
        let err = m
            .set_field(&key("MG_09", "S1"), FieldUpdate::Difficulty(Some(Difficulty::Low)))
            .unwrap_err();
        assert!(matches!(err, MatrixError::UnknownCell { .. }));
        assert_eq!(m.cells(), catalog_matrix().cells());
    }

    #[test]
    fn test_add_cell_appends_user_added() {
        let mut m = catalog_matrix();
        let before: Vec<_> = m.cells().to_vec();
        let added = m.add_cell(key("MG_03", "S2")).clone();
        assert_eq!(added.provenance, Provenance::UserAdded);
        assert_eq!(m.len(), 4);
        assert_eq!(&m.cells()[..3], &before[..]);
        assert_eq!(m.count_by_provenance(Provenance::Catalog), 3);
    }

    #[test]
    fn test_duplicate_key_is_permitted_and_edited_together() {
        let mut m = catalog_matrix();
        m.add_cell(key("MG_01", "S1"));
        assert_eq!(m.len(), 4);
        let touched = m
            .set_field(&key("MG_01", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L2)))
            .unwrap();
        assert_eq!(touched, 2);

        let rows = m.flush_rows();
        assert_eq!(rows.len(), 3);
        let first = rows.iter().find(|c| c.matches(&key("MG_01", "S1"))).unwrap();
        assert_eq!(first.provenance, Provenance::Catalog);
        assert_eq!(first.evaluation.maturity, Some(MaturityLevel::L2));
    }

    #[test]
    fn test_progress_and_completion() {
        let mut m = catalog_matrix();
        assert_eq!(m.progress(), Progress { completed: 0, total: 3 });
        assert!(!m.is_fully_evaluated());

        m.set_field(&key("MG_01", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L5)))
            .unwrap();
        let p = m.progress();
        assert_eq!(p.completed, 1);
        assert!((p.ratio() - 1.0 / 3.0).abs() < f64::EPSILON);

        for k in [key("MG_01", "S2"), key("MG_02", "S1")] {
            m.set_field(&k, FieldUpdate::Maturity(Some(MaturityLevel::L8)))
                .unwrap();
        }
        assert!(m.is_fully_evaluated());
        assert!(m.progress().is_complete());
    }

    #[test]
    fn test_difficulty_alone_does_not_complete() {
        let mut m = catalog_matrix();
        m.set_field(&key("MG_02", "S1"), FieldUpdate::Difficulty(Some(Difficulty::High)))
            .unwrap();
        assert_eq!(m.progress().completed, 0);
    }

    #[test]
    fn test_empty_matrix_progress_is_zero() {
        let m = AssessmentMatrix::new(scope());
        assert_eq!(m.progress().ratio(), 0.0);
        assert!(m.is_fully_evaluated());
    }
}
