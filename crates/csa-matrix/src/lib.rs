//! # csa-matrix: Per-Scope Assessment State
//!
//! In-memory models for one `(application, requirement)` scope:
//!
//! - [`AssessmentMatrix`]: guide-measure cells seeded from the catalog plus
//!   user-added cells, with field edits, completion and progress.
//! - [`CatalogSeeder`]: pure construction of the initial catalog cells.
//! - [`AdditionalMeasureRelationSet`]: user-declared measures, their
//!   sub-clause relations and the companion assessment entries, kept in
//!   lockstep by construction.
//!
//! Nothing here performs IO. Persistence, debouncing and reconciliation
//! against stored state live in `csa-engine`.
//!
//! ## Crate Policy
//!
//! - Depends only on `csa-core`.
//! - Programming errors (editing a key that does not exist) are returned as
//!   [`MatrixError`], never panics.

pub mod cell;
pub mod error;
pub mod matrix;
pub mod measure;
pub mod relation_set;
pub mod seeder;

pub use cell::{AssessmentCell, CellKey, CellView, Provenance};
pub use error::MatrixError;
pub use matrix::{AssessmentMatrix, MatrixScope, Progress};
pub use measure::{AdditionalMeasure, NewAdditionalMeasure, EVALUATOR_STATUS_PENDING};
pub use relation_set::{
    AdditionalMeasureRelationSet, MaAssessment, MaCellKey, ToggleFlags, ToggleOutcome,
};
pub use seeder::CatalogSeeder;
