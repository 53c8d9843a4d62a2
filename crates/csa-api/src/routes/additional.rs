//! # Additional-Measure Routes
//!
//! - `GET    …/additional-measures`                         : measures, relations, MA entries
//! - `POST   …/additional-measures`                         : declare a measure
//! - `PATCH  …/additional-measures/{id}`                    : replace the attachment reference
//! - `POST   …/additional-measures/{id}/relations/{subclause}`: toggle a relation
//! - `PATCH  …/ma-assessments`                              : set difficulty or maturity
//! - `DELETE /v1/additional-measures/{id}`                  : cascade delete
//!
//! The delete route resolves the owning scope from the stored measure.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use csa_core::{FieldUpdate, SubclauseId};
use csa_matrix::{AdditionalMeasure, MaCellKey, MatrixScope, NewAdditionalMeasure, ToggleOutcome};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::routes::scopes::{AdditionalView, ProgressView, SCOPE_PREFIX};
use crate::routes::{parse_measure, ScopePath};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            &format!("{SCOPE_PREFIX}/additional-measures"),
            get(list_measures).post(create_measure),
        )
        .route(
            &format!("{SCOPE_PREFIX}/additional-measures/{{id}}"),
            patch(update_attachment),
        )
        .route(
            &format!("{SCOPE_PREFIX}/additional-measures/{{id}}/relations/{{subclause}}"),
            post(toggle_relation),
        )
        .route(
            &format!("{SCOPE_PREFIX}/ma-assessments"),
            patch(set_ma_field),
        )
        .route("/v1/additional-measures/{id}", delete(delete_measure))
}

#[derive(Debug, Deserialize)]
pub struct MeasurePath {
    pub app: String,
    pub code: String,
    pub id: String,
}

impl MeasurePath {
    fn scope(&self) -> Result<MatrixScope, AppError> {
        ScopePath {
            app: self.app.clone(),
            code: self.code.clone(),
        }
        .scope()
    }
}

#[derive(Debug, Deserialize)]
pub struct RelationPath {
    pub app: String,
    pub code: String,
    pub id: String,
    pub subclause: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMeasureRequest {
    #[serde(flatten)]
    pub measure: NewAdditionalMeasure,
}

impl Validate for CreateMeasureRequest {
    fn validate(&self) -> Result<(), String> {
        if self.measure.title.trim().is_empty() {
            return Err("title must not be blank".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachmentRequest {
    #[serde(default)]
    pub attachment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetMaFieldRequest {
    pub measure_id: String,
    pub subclause_id: String,
    pub update: FieldUpdate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetMaFieldResponse {
    pub progress: ProgressView,
}

async fn list_measures(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
) -> Result<Json<AdditionalView>, AppError> {
    let session = state.session(path.scope()?).await;
    Ok(Json(AdditionalView::of(&session)))
}

async fn create_measure(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
    body: Result<Json<CreateMeasureRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AdditionalMeasure>), AppError> {
    let scope = path.scope()?;
    let req = extract_validated_json(body)?;
    let session = state.session(scope).await;
    let measure = session.additional.create_measure(req.measure).await?;
    Ok((StatusCode::CREATED, Json(measure)))
}

async fn update_attachment(
    State(state): State<AppState>,
    Path(path): Path<MeasurePath>,
    body: Result<Json<AttachmentRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let scope = path.scope()?;
    let id = parse_measure(&path.id)?;
    let req = extract_json(body)?;
    let session = state.session(scope).await;
    session.additional.update_attachment(id, req.attachment).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Always 200: the body reports what actually changed, and
/// `{added:false, removed:false}` means nothing did.
async fn toggle_relation(
    State(state): State<AppState>,
    Path(path): Path<RelationPath>,
) -> Result<Json<ToggleOutcome>, AppError> {
    let scope = ScopePath {
        app: path.app,
        code: path.code,
    }
    .scope()?;
    let key = MaCellKey::new(parse_measure(&path.id)?, SubclauseId::new(path.subclause)?);
    let session = state.session(scope).await;
    Ok(Json(session.additional.toggle(key).await))
}

async fn set_ma_field(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
    body: Result<Json<SetMaFieldRequest>, JsonRejection>,
) -> Result<Json<SetMaFieldResponse>, AppError> {
    let scope = path.scope()?;
    let req = extract_json(body)?;
    let key = MaCellKey::new(
        parse_measure(&req.measure_id)?,
        SubclauseId::new(req.subclause_id)?,
    );
    let session = state.session(scope).await;
    session.additional.set_field(&key, req.update)?;
    Ok(Json(SetMaFieldResponse {
        progress: ProgressView::of(&session),
    }))
}

async fn delete_measure(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_measure(&id)?;
    let measure = state.find_measure(id).await?;
    let scope = MatrixScope::new(measure.application_id, measure.requirement);
    let session = state.session(scope).await;
    session.additional.delete_measure(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
