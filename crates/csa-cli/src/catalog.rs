//! # Catalog Subcommand
//!
//! Loads a YAML catalog and previews the cells a fresh scope of one
//! requirement would be seeded with. Duplicate relations collapse to one
//! cell, exactly as seeding does.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use csa_core::{ApplicationId, CatalogScope, RequirementCode, RequirementVersion};
use csa_matrix::{CatalogSeeder, MatrixScope};
use csa_store::YamlCatalog;

/// Arguments for the catalog subcommand.
#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Catalog YAML file.
    #[arg(long)]
    pub file: PathBuf,

    /// Requirement code, e.g. QUALITY_MGMT.
    #[arg(long)]
    pub requirement: String,

    /// Catalog version.
    #[arg(long, default_value = RequirementVersion::DEFAULT)]
    pub version: String,

    /// Emit the seeded cells as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run_catalog(args: &CatalogArgs) -> Result<String> {
    let catalog = YamlCatalog::from_path(&args.file)
        .with_context(|| format!("failed to load catalog {}", args.file.display()))?;
    let requirement: RequirementCode = args.requirement.parse()?;
    let scope = CatalogScope::new(requirement, RequirementVersion::new(args.version.as_str())?);

    let relations = catalog.relations(&scope).with_context(|| {
        let known = catalog
            .scopes()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("no catalog for {scope}; available: {known}")
    })?;

    let matrix_scope = MatrixScope::new(ApplicationId::new(), requirement);
    let cells = CatalogSeeder::seed(&matrix_scope, &scope, relations);
    tracing::info!(
        catalog = %scope,
        relations = relations.len(),
        cells = cells.len(),
        "seeding preview"
    );

    if args.json {
        let views: Vec<_> = cells.iter().map(|c| c.view()).collect();
        return Ok(format!("{}\n", serde_json::to_string_pretty(&views)?));
    }

    let mut out = format!("{scope}: {} relations, {} cells\n", relations.len(), cells.len());
    for cell in &cells {
        out.push_str(&format!(
            "  {:<12} {:<12} {}\n",
            cell.measure_code.as_str(),
            cell.subclause_id.as_str(),
            cell.provenance.as_str()
        ));
    }
    Ok(out)
}
