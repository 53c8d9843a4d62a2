//! # csa CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Output goes to stdout, diagnostics to stderr.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use csa_cli::catalog::{run_catalog, CatalogArgs};
use csa_cli::derive::{run_derive, DeriveArgs};
use csa_cli::reference::{render_levels, render_requirements, run_plan, PlanArgs};

/// Compliance self-assessment toolchain.
///
/// Inspects reference data, derives adaptation plans offline and previews
/// catalog seeding without a running service.
#[derive(Parser, Debug)]
#[command(name = "csa", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the eight maturity levels with their adaptation plans.
    Levels,

    /// List the twelve requirement codes.
    Requirements,

    /// Derive the adaptation plan and diagnosis status of one maturity code.
    Plan(PlanArgs),

    /// Derive plans for a JSON array of `{id, maturity}` objects.
    Derive(DeriveArgs),

    /// Preview the cells a catalog would seed for one requirement.
    Catalog(CatalogArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Levels => Ok(render_levels()),
        Commands::Requirements => Ok(render_requirements()),
        Commands::Plan(args) => run_plan(&args),
        Commands::Derive(args) => run_derive(&args),
        Commands::Catalog(args) => run_catalog(&args),
    };

    match result {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
