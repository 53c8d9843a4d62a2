//! User-declared additional measures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use csa_core::{AdditionalMeasureId, ApplicationId, RequirementCode};

/// Evaluator status assigned to a newly created measure.
pub const EVALUATOR_STATUS_PENDING: &str = "00";

/// A control authored by the user, scoped to one `(application, requirement)`.
///
/// `evaluator_status` is written by an external reviewer and is read-only to
/// this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalMeasure {
    pub id: AdditionalMeasureId,
    pub application_id: ApplicationId,
    pub requirement: RequirementCode,
    pub title: String,
    pub description: Option<String>,
    /// Reference to an uploaded attachment (file name or storage key).
    pub attachment: Option<String>,
    pub evaluator_status: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the user when declaring a measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdditionalMeasure {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attachment: Option<String>,
}

impl NewAdditionalMeasure {
    /// Materialize with a fresh id, pending evaluator status and `now`.
    pub fn into_measure(
        self,
        application_id: ApplicationId,
        requirement: RequirementCode,
    ) -> AdditionalMeasure {
        AdditionalMeasure {
            id: AdditionalMeasureId::new(),
            application_id,
            requirement,
            title: self.title,
            description: self.description,
            attachment: self.attachment,
            evaluator_status: EVALUATOR_STATUS_PENDING.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_measure_is_pending() {
        let m = NewAdditionalMeasure {
            title: "Supplier audit".into(),
            description: None,
            attachment: None,
        }
        .into_measure(ApplicationId::new(), RequirementCode::RiskMgmt);
        assert_eq!(m.evaluator_status, "00");
        assert_eq!(m.requirement, RequirementCode::RiskMgmt);
    }

    #[test]
    fn test_new_measure_optional_fields_default() {
        let m: NewAdditionalMeasure = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert!(m.description.is_none());
        assert!(m.attachment.is_none());
    }
}
