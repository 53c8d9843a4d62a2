//! # Reference Data and Plan Derivation
//!
//! - `GET  /v1/maturity-levels`       : the 8 levels with their derived plan
//! - `GET  /v1/requirements`          : the 12 assessed requirements
//! - `POST /v1/calculate-plan`        : plan and status for one maturity
//! - `POST /v1/calculate-assessments` : batch annotation of `{id, maturity}`

use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use csa_core::{
    derive_all, plan_for, status_for, Derivation, DerivationInput, MaturityLevel, RequirementCode,
    UNSET_PLAN_CODE,
};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/maturity-levels", get(maturity_levels))
        .route("/v1/requirements", get(requirements))
        .route("/v1/calculate-plan", post(calculate_plan))
        .route("/v1/calculate-assessments", post(calculate_assessments))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MaturityLevelInfo {
    pub level: MaturityLevel,
    pub description: String,
    pub adaptation_plan: String,
    pub adaptation_plan_label: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequirementInfo {
    pub code: RequirementCode,
    pub title: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CalculatePlanRequest {
    #[serde(default)]
    pub maturity: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResponse {
    pub maturity: Option<MaturityLevel>,
    pub adaptation_plan: String,
    pub adaptation_plan_label: Option<String>,
    pub diagnosis_status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalculateAssessmentsRequest {
    pub assessments: Vec<DerivationInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CalculateAssessmentsResponse {
    pub assessments: Vec<Derivation>,
}

async fn maturity_levels() -> Json<Vec<MaturityLevelInfo>> {
    Json(
        MaturityLevel::all_levels()
            .iter()
            .map(|&level| MaturityLevelInfo {
                level,
                description: level.description().to_string(),
                adaptation_plan: level.plan().code().to_string(),
                adaptation_plan_label: level.plan().label().to_string(),
            })
            .collect(),
    )
}

async fn requirements() -> Json<Vec<RequirementInfo>> {
    Json(
        RequirementCode::all()
            .iter()
            .map(|&code| RequirementInfo {
                code,
                title: code.title().to_string(),
            })
            .collect(),
    )
}

/// Unknown maturity codes derive as unset rather than failing.
async fn calculate_plan(
    body: Result<Json<CalculatePlanRequest>, JsonRejection>,
) -> Result<Json<PlanResponse>, AppError> {
    let req = extract_json(body)?;
    let maturity = req.maturity.as_deref().and_then(MaturityLevel::parse_lenient);
    let plan = plan_for(maturity);
    Ok(Json(PlanResponse {
        maturity,
        adaptation_plan: plan.map(|p| p.code()).unwrap_or(UNSET_PLAN_CODE).to_string(),
        adaptation_plan_label: plan.map(|p| p.label().to_string()),
        diagnosis_status: status_for(maturity).code().to_string(),
    }))
}

async fn calculate_assessments(
    body: Result<Json<CalculateAssessmentsRequest>, JsonRejection>,
) -> Result<Json<CalculateAssessmentsResponse>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(CalculateAssessmentsResponse {
        assessments: derive_all(&req.assessments),
    }))
}
