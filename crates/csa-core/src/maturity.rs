//! # Maturity Scale and Plan Derivation
//!
//! The 8-level maturity scale, the 5 adaptation plans, and the fixed table
//! that maps one onto the other.
//!
//! | Maturity | Plan | Plan label |
//! |----------|------|------------|
//! | L1, L2   | 01   | Document and implement |
//! | L3, L4   | 02   | Implement |
//! | L5       | 03   | Full adaptation |
//! | L6, L7   | 04   | Document |
//! | L8       | 05   | No action |
//! | unset    | `-`  | |
//!
//! Diagnosis status is `00` (pending) when no maturity is recorded and
//! `01` (diagnosed) otherwise.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CsaError;

/// Rendering of the adaptation plan when no maturity has been recorded.
pub const UNSET_PLAN_CODE: &str = "-";

/// Total number of maturity levels.
pub const MATURITY_LEVEL_COUNT: usize = 8;

/// Ordinal rating of how implemented and documented a measure is.
///
/// Ordering follows the code: `L1 < L2 < ... < L8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaturityLevel {
    /// Not identified.
    L1,
    /// Identified but not documented.
    L2,
    /// Documented but not implemented.
    L3,
    /// Partially implemented.
    L4,
    /// Implemented without evidence.
    L5,
    /// Implemented with partial evidence.
    L6,
    /// Implemented with complete evidence.
    L7,
    /// Measure not necessary.
    L8,
}

impl MaturityLevel {
    /// Returns all maturity levels in ascending order.
    pub fn all_levels() -> &'static [MaturityLevel] {
        &[
            Self::L1,
            Self::L2,
            Self::L3,
            Self::L4,
            Self::L5,
            Self::L6,
            Self::L7,
            Self::L8,
        ]
    }

    /// Returns the wire code (`"L1"` .. `"L8"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::L4 => "L4",
            Self::L5 => "L5",
            Self::L6 => "L6",
            Self::L7 => "L7",
            Self::L8 => "L8",
        }
    }

    /// Human-readable description shown next to the code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::L1 => "Not identified",
            Self::L2 => "Identified but not documented",
            Self::L3 => "Documented but not implemented",
            Self::L4 => "Partially implemented",
            Self::L5 => "Implemented without evidence",
            Self::L6 => "Implemented, partial evidence",
            Self::L7 => "Implemented, complete evidence",
            Self::L8 => "Measure not necessary",
        }
    }

    /// Adaptation plan this level maps to.
    pub fn plan(&self) -> AdaptationPlan {
        match self {
            Self::L1 | Self::L2 => AdaptationPlan::DocumentAndImplement,
            Self::L3 | Self::L4 => AdaptationPlan::Implement,
            Self::L5 => AdaptationPlan::FullAdaptation,
            Self::L6 | Self::L7 => AdaptationPlan::Document,
            Self::L8 => AdaptationPlan::NoAction,
        }
    }

    /// Parse without failing: unknown or blank input yields `None`.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        s.trim().parse().ok()
    }
}

impl std::fmt::Display for MaturityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaturityLevel {
    type Err = CsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L1" => Ok(Self::L1),
            "L2" => Ok(Self::L2),
            "L3" => Ok(Self::L3),
            "L4" => Ok(Self::L4),
            "L5" => Ok(Self::L5),
            "L6" => Ok(Self::L6),
            "L7" => Ok(Self::L7),
            "L8" => Ok(Self::L8),
            other => Err(CsaError::unknown("maturity", other)),
        }
    }
}

/// Remediation category derived from a maturity level. Never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdaptationPlan {
    /// `01`
    #[serde(rename = "01")]
    DocumentAndImplement,
    /// `02`
    #[serde(rename = "02")]
    Implement,
    /// `03`
    #[serde(rename = "03")]
    FullAdaptation,
    /// `04`
    #[serde(rename = "04")]
    Document,
    /// `05`
    #[serde(rename = "05")]
    NoAction,
}

impl AdaptationPlan {
    /// Returns all plans in code order.
    pub fn all_plans() -> &'static [AdaptationPlan] {
        &[
            Self::DocumentAndImplement,
            Self::Implement,
            Self::FullAdaptation,
            Self::Document,
            Self::NoAction,
        ]
    }

    /// Returns the two-digit plan code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DocumentAndImplement => "01",
            Self::Implement => "02",
            Self::FullAdaptation => "03",
            Self::Document => "04",
            Self::NoAction => "05",
        }
    }

    /// Fixed human label for the plan.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DocumentAndImplement => "Document and implement",
            Self::Implement => "Implement",
            Self::FullAdaptation => "Full adaptation",
            Self::Document => "Document",
            Self::NoAction => "No action",
        }
    }
}

impl std::fmt::Display for AdaptationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AdaptationPlan {
    type Err = CsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all_plans()
            .iter()
            .copied()
            .find(|p| p.code() == s)
            .ok_or_else(|| CsaError::unknown("plan", s))
    }
}

/// Whether a cell has been rated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosisStatus {
    /// `00`: no maturity recorded.
    #[serde(rename = "00")]
    Pending,
    /// `01`: maturity recorded.
    #[serde(rename = "01")]
    Diagnosed,
}

impl DiagnosisStatus {
    /// Returns the two-digit status code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pending => "00",
            Self::Diagnosed => "01",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Diagnosed => "Diagnosed",
        }
    }
}

impl std::fmt::Display for DiagnosisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Plan for an optional maturity. `None` means the plan renders as `"-"`.
pub fn plan_for(maturity: Option<MaturityLevel>) -> Option<AdaptationPlan> {
    maturity.map(|m| m.plan())
}

/// Diagnosis status for an optional maturity.
pub fn status_for(maturity: Option<MaturityLevel>) -> DiagnosisStatus {
    match maturity {
        Some(_) => DiagnosisStatus::Diagnosed,
        None => DiagnosisStatus::Pending,
    }
}

/// Plan code for a raw maturity string. Unknown, blank or missing input
/// yields [`UNSET_PLAN_CODE`].
pub fn plan_code_for(maturity: Option<&str>) -> &'static str {
    maturity
        .and_then(MaturityLevel::parse_lenient)
        .map(|m| m.plan().code())
        .unwrap_or(UNSET_PLAN_CODE)
}

/// Status code for a raw maturity string. Unknown input counts as pending.
pub fn status_code_for(maturity: Option<&str>) -> &'static str {
    status_for(maturity.and_then(MaturityLevel::parse_lenient)).code()
}
