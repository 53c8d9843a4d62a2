//! # Per-Cell Evaluation State
//!
//! [`Evaluation`] is the only mutable payload of an assessment cell. Plan
//! and diagnosis status are computed from `maturity` on every call and are
//! never stored alongside it.

use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;
use crate::maturity::{
    plan_for, status_for, AdaptationPlan, DiagnosisStatus, MaturityLevel, UNSET_PLAN_CODE,
};

/// Difficulty and maturity recorded for one cell. Both start unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Evaluation {
    pub difficulty: Option<Difficulty>,
    pub maturity: Option<MaturityLevel>,
}

impl Evaluation {
    pub fn new(difficulty: Option<Difficulty>, maturity: Option<MaturityLevel>) -> Self {
        Self {
            difficulty,
            maturity,
        }
    }

    pub fn plan(&self) -> Option<AdaptationPlan> {
        plan_for(self.maturity)
    }

    /// Plan code as rendered to users: `"01"`..`"05"` or `"-"`.
    pub fn plan_code(&self) -> &'static str {
        self.plan().map(|p| p.code()).unwrap_or(UNSET_PLAN_CODE)
    }

    pub fn status(&self) -> DiagnosisStatus {
        status_for(self.maturity)
    }

    /// A cell counts as completed once a maturity is recorded.
    pub fn is_completed(&self) -> bool {
        self.maturity.is_some()
    }

    /// Apply a single-field edit.
    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::Difficulty(d) => self.difficulty = d,
            FieldUpdate::Maturity(m) => self.maturity = m,
        }
    }
}

/// A single-field edit issued by the wizard. `None` clears the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate {
    Difficulty(Option<Difficulty>),
    Maturity(Option<MaturityLevel>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_evaluation() {
        let e = Evaluation::default();
        assert_eq!(e.plan(), None);
        assert_eq!(e.plan_code(), "-");
        assert_eq!(e.status(), DiagnosisStatus::Pending);
        assert!(!e.is_completed());
    }

    #[test]
    fn test_apply_maturity_derives_plan() {
        let mut e = Evaluation::default();
        e.apply(FieldUpdate::Maturity(Some(MaturityLevel::L5)));
        assert_eq!(e.plan_code(), "03");
        assert_eq!(e.status(), DiagnosisStatus::Diagnosed);
        e.apply(FieldUpdate::Maturity(None));
        assert_eq!(e.plan_code(), "-");
    }

    #[test]
    fn test_apply_difficulty_leaves_maturity() {
        let mut e = Evaluation::new(None, Some(MaturityLevel::L2));
        e.apply(FieldUpdate::Difficulty(Some(Difficulty::Medium)));
        assert_eq!(e.difficulty, Some(Difficulty::Medium));
        assert_eq!(e.maturity, Some(MaturityLevel::L2));
    }

    #[test]
    fn test_field_update_wire_format() {
        let u: FieldUpdate =
            serde_json::from_str(r#"{"field":"maturity","value":"L7"}"#).unwrap();
        assert_eq!(u, FieldUpdate::Maturity(Some(MaturityLevel::L7)));
        let cleared: FieldUpdate =
            serde_json::from_str(r#"{"field":"difficulty","value":null}"#).unwrap();
        assert_eq!(cleared, FieldUpdate::Difficulty(None));
    }
}
