//! # csa-store: Storage Collaborators
//!
//! The engine talks to storage only through three object-safe traits:
//!
//! - [`CatalogStore`]: read-only catalog relations per `(requirement, version)`.
//! - [`AssessmentStore`]: guide-measure cells, with insert-if-absent seeding
//!   and upsert keyed by `(application, requirement, measure, sub-clause)`.
//! - [`AdditionalMeasureStore`]: additional-measure CRUD, single round-trip
//!   relation toggle, cascading delete, and MA-assessment upsert keyed by
//!   `(measure, requirement, sub-clause)`.
//!
//! ## Backends
//!
//! - [`InMemoryStore`]: `DashMap`-backed, for development and tests.
//! - [`PgStore`]: PostgreSQL via SQLx with embedded migrations.
//! - [`YamlCatalog`]: catalog relations loaded from a YAML file.
//!
//! Store handles are constructed explicitly and injected into the engine as
//! `Arc<dyn Trait>`; there is no global client.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod testing;
pub mod traits;

pub use catalog::{CatalogFile, CatalogFileEntry, YamlCatalog};
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use testing::{Fault, FlakyStore};
pub use traits::{AdditionalMeasureStore, AssessmentStore, CatalogStore};
