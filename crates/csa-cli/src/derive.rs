//! # Derive Subcommand
//!
//! Annotates a JSON array of `{id, maturity}` records with plan code, plan
//! label and diagnosis status. Output is a JSON array in input order.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use csa_core::{derive_all, DerivationInput};

/// Arguments for the derive subcommand.
#[derive(Args, Debug)]
pub struct DeriveArgs {
    /// JSON file holding an array of `{"id": .., "maturity": ..}` records.
    #[arg(long)]
    pub input: PathBuf,
}

pub fn run_derive(args: &DeriveArgs) -> Result<String> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let inputs: Vec<DerivationInput> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of records", args.input.display()))?;
    let annotated = derive_all(&inputs);
    tracing::info!(records = annotated.len(), "derived adaptation plans");
    Ok(format!("{}\n", serde_json::to_string_pretty(&annotated)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_derive_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "m1", "maturity": "L7"}}, {{"id": "m2", "maturity": null}}]"#
        )
        .unwrap();

        let out = run_derive(&DeriveArgs {
            input: file.path().to_path_buf(),
        })
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json[0]["adaptation_plan"], "04");
        assert_eq!(json[1]["adaptation_plan"], "-");
        assert_eq!(json[1]["diagnosis_status"], "00");
    }

    #[test]
    fn test_derive_rejects_non_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"id": "m1"}}"#).unwrap();
        assert!(run_derive(&DeriveArgs {
            input: file.path().to_path_buf(),
        })
        .is_err());
    }
}
