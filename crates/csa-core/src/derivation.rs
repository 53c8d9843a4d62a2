//! Batch plan derivation over raw `{id, maturity}` records.
//!
//! Input maturity strings are taken as-is from callers (forms, JSON files),
//! so parsing is lenient: unknown or blank codes annotate as unset.

use serde::{Deserialize, Serialize};

use crate::maturity::{plan_for, status_for, MaturityLevel, UNSET_PLAN_CODE};

/// A record to annotate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationInput {
    pub id: String,
    #[serde(default)]
    pub maturity: Option<String>,
}

/// A record annotated with its derived plan and diagnosis status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Derivation {
    pub id: String,
    /// Normalized maturity, `None` when missing or unrecognized.
    pub maturity: Option<MaturityLevel>,
    pub adaptation_plan: String,
    pub adaptation_plan_label: Option<String>,
    pub diagnosis_status: String,
}

impl Derivation {
    pub fn from_input(input: &DerivationInput) -> Self {
        let maturity = input
            .maturity
            .as_deref()
            .and_then(MaturityLevel::parse_lenient);
        let plan = plan_for(maturity);
        Self {
            id: input.id.clone(),
            maturity,
            adaptation_plan: plan
                .map(|p| p.code())
                .unwrap_or(UNSET_PLAN_CODE)
                .to_string(),
            adaptation_plan_label: plan.map(|p| p.label().to_string()),
            diagnosis_status: status_for(maturity).code().to_string(),
        }
    }
}

/// Annotate every record, preserving order.
pub fn derive_all(inputs: &[DerivationInput]) -> Vec<Derivation> {
    inputs.iter().map(Derivation::from_input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: &str, maturity: Option<&str>) -> DerivationInput {
        DerivationInput {
            id: id.to_string(),
            maturity: maturity.map(str::to_string),
        }
    }

    #[test]
    fn test_annotates_known_and_unknown_codes() {
        let out = derive_all(&[
            input("a", Some("L5")),
            input("b", None),
            input("c", Some("L9")),
            input("d", Some(" L8 ")),
        ]);
        assert_eq!(out[0].adaptation_plan, "03");
        assert_eq!(out[0].diagnosis_status, "01");
        assert!(out[0].adaptation_plan_label.is_some());

        for unset in &out[1..3] {
            assert_eq!(unset.adaptation_plan, "-");
            assert_eq!(unset.diagnosis_status, "00");
            assert_eq!(unset.maturity, None);
            assert_eq!(unset.adaptation_plan_label, None);
        }
        assert_eq!(out[3].maturity, Some(MaturityLevel::L8));
        assert_eq!(out[3].adaptation_plan, "05");
    }

    #[test]
    fn test_preserves_order_and_ids() {
        let ids: Vec<_> = derive_all(&[input("z", None), input("y", None)])
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, ["z", "y"]);
    }
}
