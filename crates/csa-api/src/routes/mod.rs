//! # Route Modules
//!
//! | Prefix | Module |
//! |--------|--------|
//! | `/v1/maturity-levels`, `/v1/requirements`, `/v1/calculate-*` | [`reference`] |
//! | `/v1/applications/{app}/requirements/{code}/{open,cells,flush,progress}` | [`scopes`] |
//! | `…/additional-measures`, `…/ma-assessments`, `/v1/additional-measures/{id}` | [`additional`] |
//! | `…/export`, `/v1/applications/{app}/export` | [`export`] |

pub mod additional;
pub mod export;
pub mod reference;
pub mod scopes;

use std::str::FromStr;

use serde::Deserialize;
use uuid::Uuid;

use csa_core::{AdditionalMeasureId, ApplicationId, RequirementCode};
use csa_matrix::MatrixScope;

use crate::error::AppError;

/// Path parameters naming one `(application, requirement)` scope.
#[derive(Debug, Deserialize)]
pub struct ScopePath {
    pub app: String,
    pub code: String,
}

impl ScopePath {
    pub fn scope(&self) -> Result<MatrixScope, AppError> {
        Ok(MatrixScope::new(
            parse_application(&self.app)?,
            parse_requirement(&self.code)?,
        ))
    }
}

pub fn parse_application(raw: &str) -> Result<ApplicationId, AppError> {
    Uuid::parse_str(raw)
        .map(ApplicationId)
        .map_err(|_| AppError::Validation(format!("invalid application id: {raw:?}")))
}

pub fn parse_requirement(raw: &str) -> Result<RequirementCode, AppError> {
    RequirementCode::from_str(raw).map_err(AppError::from)
}

pub fn parse_measure(raw: &str) -> Result<AdditionalMeasureId, AppError> {
    Uuid::parse_str(raw)
        .map(AdditionalMeasureId)
        .map_err(|_| AppError::Validation(format!("invalid measure id: {raw:?}")))
}
