//! # Assessment Cell
//!
//! The atomic unit of evaluated state: one `(measure, sub-clause)` pair with
//! its [`Evaluation`] and a provenance tag.

use serde::{Deserialize, Serialize};

use csa_core::{
    DiagnosisStatus, Difficulty, Evaluation, MaturityLevel, MeasureCode, SubclauseId,
};

/// Where a cell came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Seeded from a catalog relation.
    Catalog,
    /// Added by the user in the wizard.
    UserAdded,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "CATALOG",
            Self::UserAdded => "USER_ADDED",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provenance {
    type Err = csa_core::CsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CATALOG" => Ok(Self::Catalog),
            "USER_ADDED" => Ok(Self::UserAdded),
            other => Err(csa_core::CsaError::UnknownCode {
                kind: "provenance",
                value: other.to_string(),
            }),
        }
    }
}

/// Key of a guide-measure cell within a scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub measure_code: MeasureCode,
    pub subclause_id: SubclauseId,
}

impl CellKey {
    pub fn new(measure_code: MeasureCode, subclause_id: SubclauseId) -> Self {
        Self {
            measure_code,
            subclause_id,
        }
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.measure_code, self.subclause_id)
    }
}

/// One evaluated `(measure, sub-clause)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentCell {
    pub measure_code: MeasureCode,
    pub subclause_id: SubclauseId,
    pub provenance: Provenance,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

impl AssessmentCell {
    /// An unset cell seeded from the catalog.
    pub fn catalog(key: CellKey) -> Self {
        Self::unset(key, Provenance::Catalog)
    }

    /// An unset cell added by the user.
    pub fn user_added(key: CellKey) -> Self {
        Self::unset(key, Provenance::UserAdded)
    }

    fn unset(key: CellKey, provenance: Provenance) -> Self {
        Self {
            measure_code: key.measure_code,
            subclause_id: key.subclause_id,
            provenance,
            evaluation: Evaluation::default(),
        }
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.measure_code.clone(), self.subclause_id.clone())
    }

    pub fn matches(&self, key: &CellKey) -> bool {
        self.measure_code == key.measure_code && self.subclause_id == key.subclause_id
    }

    /// Presentation form with derived plan and status filled in.
    pub fn view(&self) -> CellView {
        CellView {
            measure_code: self.measure_code.clone(),
            subclause_id: self.subclause_id.clone(),
            provenance: self.provenance,
            difficulty: self.evaluation.difficulty,
            maturity: self.evaluation.maturity,
            adaptation_plan: self.evaluation.plan_code().to_string(),
            diagnosis_status: self.evaluation.status(),
        }
    }
}

/// Read model of a cell, including the derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub measure_code: MeasureCode,
    pub subclause_id: SubclauseId,
    pub provenance: Provenance,
    pub difficulty: Option<Difficulty>,
    pub maturity: Option<MaturityLevel>,
    pub adaptation_plan: String,
    pub diagnosis_status: DiagnosisStatus,
}
