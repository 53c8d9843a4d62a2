//! # csa-cli: Self-Assessment Command-Line Interface
//!
//! Offline tooling around the derivation table and the catalog.
//!
//! ## Subcommands
//!
//! - `levels`: the 8 maturity levels and the plan each derives
//! - `requirements`: the 12 assessed requirements
//! - `plan <CODE>`: plan and diagnosis status for one maturity code
//! - `derive --input <file.json>`: annotate `{id, maturity}` records
//! - `catalog --file <catalog.yaml> --requirement <CODE>`: preview seeded cells
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers return their rendered output; `main` prints it.

pub mod catalog;
pub mod derive;
pub mod reference;
