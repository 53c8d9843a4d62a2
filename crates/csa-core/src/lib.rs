//! # csa-core: Foundational Types for the Compliance Self-Assessment Engine
//!
//! Defines the vocabulary every other `csa-*` crate speaks: the 8-level
//! maturity scale and its fixed derivation into adaptation plans and
//! diagnosis status, the 12 assessed requirements, the difficulty scale,
//! catalog relations, and identifier newtypes.
//!
//! ## Key Design Principles
//!
//! 1. **Derivation is a total function.** [`plan_for`] and [`status_for`]
//!    accept every [`MaturityLevel`] and the unset case. The lenient string
//!    entry points ([`plan_code_for`], [`status_code_for`]) map unknown codes
//!    to `"-"` / pending instead of failing.
//!
//! 2. **Derived fields are never stored as truth.** [`Evaluation`] carries
//!    only `difficulty` and `maturity`; plan and status are recomputed on
//!    every read.
//!
//! 3. **Single `RequirementCode` enum.** One definition, 12 variants,
//!    exhaustive `match` everywhere.
//!
//! 4. **Newtype identifiers.** Applications, additional measures, catalog
//!    measure codes and sub-clauses cannot be confused with one another.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `csa-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod catalog;
pub mod derivation;
pub mod difficulty;
pub mod error;
pub mod evaluation;
pub mod identity;
pub mod maturity;
pub mod requirement;

// Re-export primary types for ergonomic imports.
pub use catalog::{CatalogRelation, CatalogScope};
pub use derivation::{derive_all, Derivation, DerivationInput};
pub use difficulty::Difficulty;
pub use error::CsaError;
pub use evaluation::{Evaluation, FieldUpdate};
pub use identity::{AdditionalMeasureId, ApplicationId, MeasureCode, SubclauseId};
pub use maturity::{
    plan_code_for, plan_for, status_code_for, status_for, AdaptationPlan, DiagnosisStatus,
    MaturityLevel, MATURITY_LEVEL_COUNT, UNSET_PLAN_CODE,
};
pub use requirement::{RequirementCode, RequirementVersion, REQUIREMENT_COUNT};
