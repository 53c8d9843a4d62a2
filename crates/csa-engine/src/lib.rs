//! # csa-engine: Assessment Reconciliation Engine
//!
//! Turns the pure matrix types of `csa-matrix` into live, persisted scopes.
//!
//! ## Modules
//!
//! - **Reconciler** ([`reconciler`]): opens a scope by seeding it from the
//!   catalog and reading back persisted cells, falling back to an in-memory
//!   seed when storage is unreachable.
//! - **Sessions** ([`session`], [`additional`]): live guide-measure matrix
//!   and additional-measure relation set with debounced bulk persistence.
//! - **Debounce** ([`debounce`]): per-scope cancel-and-restart timer.
//! - **Export** ([`export`]): flattened payloads for the export collaborator
//!   and an HTTP client for it.
//! - **Config** ([`config`]): debounce window and default catalog version.
//!
//! ## Crate Policy
//!
//! - Store failures never escape into matrix logic. Opening a scope always
//!   succeeds; background flush failures are logged and counted, and leave
//!   the scope dirty.
//! - Interactive operations (toggle, delete, explicit flush) report what
//!   actually happened. Local state follows the store, never the request.
//! - Sessions require a Tokio runtime.

pub mod additional;
pub mod config;
pub mod debounce;
pub mod error;
pub mod export;
pub mod reconciler;
pub mod session;

pub use additional::AdditionalMeasureSession;
pub use config::{EngineConfig, DEFAULT_DEBOUNCE_MS};
pub use debounce::Debouncer;
pub use error::{EngineError, ExportError};
pub use export::{
    ExportArtifact, ExportCollaborator, FullExport, HttpExportClient, MaExportRow, MaRelationRow,
    MeasureExportRow, MgExportRow, RequirementExport,
};
pub use reconciler::{PersistenceReconciler, RequirementSession};
pub use session::{AssessmentSession, FlushOutcome, MatrixSource, ReconcileReport};
