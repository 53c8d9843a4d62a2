//! Three-level implementation difficulty scale.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CsaError;

/// How hard a measure is to put in place, as judged by the assessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// `00`
    #[serde(rename = "00")]
    High,
    /// `01`
    #[serde(rename = "01")]
    Medium,
    /// `02`
    #[serde(rename = "02")]
    Low,
}

impl Difficulty {
    pub fn all() -> &'static [Difficulty] {
        &[Self::High, Self::Medium, Self::Low]
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::High => "00",
            Self::Medium => "01",
            Self::Low => "02",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Difficulty {
    type Err = CsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "00" => Ok(Self::High),
            "01" => Ok(Self::Medium),
            "02" => Ok(Self::Low),
            other => Err(CsaError::unknown("difficulty", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_parse_back() {
        for d in Difficulty::all() {
            assert_eq!(d.code().parse::<Difficulty>().unwrap(), *d);
            assert_eq!(d.to_string(), d.code());
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert!("03".parse::<Difficulty>().is_err());
        assert!("High".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_serde_uses_code() {
        assert_eq!(serde_json::to_string(&Difficulty::Low).unwrap(), "\"02\"");
    }
}
