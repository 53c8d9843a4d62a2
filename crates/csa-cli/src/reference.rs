//! # Reference Subcommands
//!
//! `levels`, `requirements` and `plan`.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use csa_core::{plan_for, status_for, MaturityLevel, RequirementCode, UNSET_PLAN_CODE};

/// Arguments for the plan subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Maturity code (L1..L8). Unknown codes derive as unset.
    pub code: String,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PlanOutput {
    maturity: Option<MaturityLevel>,
    adaptation_plan: &'static str,
    adaptation_plan_label: Option<&'static str>,
    diagnosis_status: &'static str,
}

pub fn render_levels() -> String {
    let mut out = String::new();
    for level in MaturityLevel::all_levels() {
        let plan = level.plan();
        out.push_str(&format!(
            "{:<3} {:<40} plan {} ({})\n",
            level.as_str(),
            level.description(),
            plan.code(),
            plan.label()
        ));
    }
    out
}

pub fn render_requirements() -> String {
    let mut out = String::new();
    for code in RequirementCode::all() {
        out.push_str(&format!("{:<16} {}\n", code.as_str(), code.title()));
    }
    out
}

pub fn run_plan(args: &PlanArgs) -> Result<String> {
    let maturity = MaturityLevel::parse_lenient(&args.code);
    if maturity.is_none() {
        tracing::warn!(code = %args.code, "unrecognized maturity code; deriving as unset");
    }
    let plan = plan_for(maturity);
    let output = PlanOutput {
        maturity,
        adaptation_plan: plan.map(|p| p.code()).unwrap_or(UNSET_PLAN_CODE),
        adaptation_plan_label: plan.map(|p| p.label()),
        diagnosis_status: status_for(maturity).code(),
    };
    if args.json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(&output)?));
    }
    Ok(format!(
        "maturity:         {}\nadaptation plan:  {}{}\ndiagnosis status: {}\n",
        maturity.map(|m| m.as_str()).unwrap_or("(unset)"),
        output.adaptation_plan,
        output
            .adaptation_plan_label
            .map(|l| format!(" ({l})"))
            .unwrap_or_default(),
        output.diagnosis_status,
    ))
}
