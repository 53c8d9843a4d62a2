//! # Requirement Catalogue
//!
//! The 12 top-level legal obligations an application is assessed against,
//! and the catalog version string that pins which relation set applies.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CsaError;

/// Total number of assessed requirements.
pub const REQUIREMENT_COUNT: usize = 12;

/// One of the 12 assessed requirements.
///
/// Wire format is the SCREAMING_SNAKE_CASE code, e.g. `"QUALITY_MGMT"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementCode {
    /// Quality management system.
    QualityMgmt,
    /// Risk management system.
    RiskMgmt,
    /// Human oversight.
    HumanOversight,
    /// Data and data governance.
    DataGovernance,
    /// Transparency and provision of information to users.
    Transparency,
    /// Accuracy.
    Accuracy,
    /// Robustness.
    Robustness,
    /// Cybersecurity.
    Cybersecurity,
    /// Record keeping and logging.
    Logging,
    /// Technical documentation.
    TechnicalDoc,
    /// Post-market monitoring.
    PostMarket,
    /// Serious incident management.
    IncidentMgmt,
}

impl RequirementCode {
    /// Returns all requirements in canonical order.
    pub fn all() -> &'static [RequirementCode] {
        &[
            Self::QualityMgmt,
            Self::RiskMgmt,
            Self::HumanOversight,
            Self::DataGovernance,
            Self::Transparency,
            Self::Accuracy,
            Self::Robustness,
            Self::Cybersecurity,
            Self::Logging,
            Self::TechnicalDoc,
            Self::PostMarket,
            Self::IncidentMgmt,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QualityMgmt => "QUALITY_MGMT",
            Self::RiskMgmt => "RISK_MGMT",
            Self::HumanOversight => "HUMAN_OVERSIGHT",
            Self::DataGovernance => "DATA_GOVERNANCE",
            Self::Transparency => "TRANSPARENCY",
            Self::Accuracy => "ACCURACY",
            Self::Robustness => "ROBUSTNESS",
            Self::Cybersecurity => "CYBERSECURITY",
            Self::Logging => "LOGGING",
            Self::TechnicalDoc => "TECHNICAL_DOC",
            Self::PostMarket => "POST_MARKET",
            Self::IncidentMgmt => "INCIDENT_MGMT",
        }
    }

    /// Display title of the requirement.
    pub fn title(&self) -> &'static str {
        match self {
            Self::QualityMgmt => "Quality management system",
            Self::RiskMgmt => "Risk management system",
            Self::HumanOversight => "Human oversight",
            Self::DataGovernance => "Data and data governance",
            Self::Transparency => "Transparency and information to users",
            Self::Accuracy => "Accuracy",
            Self::Robustness => "Robustness",
            Self::Cybersecurity => "Cybersecurity",
            Self::Logging => "Record keeping",
            Self::TechnicalDoc => "Technical documentation",
            Self::PostMarket => "Post-market monitoring",
            Self::IncidentMgmt => "Serious incident management",
        }
    }
}

impl std::fmt::Display for RequirementCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequirementCode {
    type Err = CsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| CsaError::unknown("requirement", s))
    }
}

/// Catalog version for a requirement, e.g. `"1.0"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementVersion(String);

impl RequirementVersion {
    /// Version used when a scope is opened without an explicit one.
    pub const DEFAULT: &'static str = "1.0";

    /// Validated constructor: the version must be non-blank.
    pub fn new(version: impl Into<String>) -> Result<Self, CsaError> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(CsaError::Validation(
                "requirement version must not be empty".to_string(),
            ));
        }
        Ok(Self(version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequirementVersion {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for RequirementVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_count() {
        assert_eq!(RequirementCode::all().len(), REQUIREMENT_COUNT);
    }

    #[test]
    fn test_as_str_matches_serde() {
        for r in RequirementCode::all() {
            let json = serde_json::to_string(r).unwrap();
            assert_eq!(json, format!("\"{}\"", r.as_str()));
            assert_eq!(r.as_str().parse::<RequirementCode>().unwrap(), *r);
        }
    }

    #[test]
    fn test_unknown_requirement() {
        assert!("quality_mgmt".parse::<RequirementCode>().is_err());
        assert!("".parse::<RequirementCode>().is_err());
    }

    #[test]
    fn test_version_default_and_validation() {
        assert_eq!(RequirementVersion::default().as_str(), "1.0");
        assert!(RequirementVersion::new("  ").is_err());
        assert_eq!(RequirementVersion::new("2.1").unwrap().to_string(), "2.1");
    }
}
