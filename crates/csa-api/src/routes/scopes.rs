//! # Scope Routes
//!
//! Guide-measure matrix of one `(application, requirement)` scope.
//!
//! - `POST  …/open`     : reconcile the scope (again) and return its state
//! - `GET   …/cells`    : cells with derived plan and status
//! - `PATCH …/cells`    : set difficulty or maturity on one key
//! - `POST  …/cells`    : append a user-added cell
//! - `POST  …/flush`    : flush pending edits now
//! - `POST  …/close`    : flush and release the open scope (204)
//! - `GET   …/progress` : completion of both matrices
//!
//! `…` is `/v1/applications/{app}/requirements/{code}`. Every route except
//! `open` and `close` reconciles the scope on first use.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use csa_core::{FieldUpdate, MeasureCode, RequirementVersion, SubclauseId};
use csa_engine::{FlushOutcome, ReconcileReport, RequirementSession};
use csa_matrix::{
    AdditionalMeasure, CellKey, CellView, MaAssessment, MaCellKey, MatrixScope, Progress,
};

use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, optional_json, Validate};
use crate::routes::ScopePath;
use crate::state::AppState;

pub const SCOPE_PREFIX: &str = "/v1/applications/{app}/requirements/{code}";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(&format!("{SCOPE_PREFIX}/open"), post(open_scope))
        .route(
            &format!("{SCOPE_PREFIX}/cells"),
            get(list_cells).patch(set_cell_field).post(add_cell),
        )
        .route(&format!("{SCOPE_PREFIX}/flush"), post(flush))
        .route(&format!("{SCOPE_PREFIX}/close"), post(close_scope))
        .route(&format!("{SCOPE_PREFIX}/progress"), get(progress))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OpenRequest {
    /// Catalog version; the configured default when absent.
    #[serde(default)]
    pub version: Option<String>,
}

/// Additional-measure half of a scope.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdditionalView {
    pub measures: Vec<AdditionalMeasure>,
    pub relations: Vec<MaCellKey>,
    pub assessments: Vec<MaAssessment>,
    pub load_failed: bool,
}

impl AdditionalView {
    pub fn of(session: &RequirementSession) -> Self {
        Self {
            measures: session.additional.measures(),
            relations: session.additional.relations(),
            assessments: session.additional.assessments(),
            load_failed: session.additional.load_failed(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressView {
    pub guide: Progress,
    pub additional: Progress,
    pub complete: bool,
}

impl ProgressView {
    pub fn of(session: &RequirementSession) -> Self {
        Self {
            guide: session.guide.progress(),
            additional: session.additional.progress(),
            complete: session.is_complete(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScopeView {
    pub scope: MatrixScope,
    pub report: ReconcileReport,
    pub cells: Vec<CellView>,
    pub additional: AdditionalView,
    pub progress: ProgressView,
}

impl ScopeView {
    fn of(session: &RequirementSession) -> Self {
        Self {
            scope: session.scope(),
            report: *session.guide.report(),
            cells: session.guide.views(),
            additional: AdditionalView::of(session),
            progress: ProgressView::of(session),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CellKeyRequest {
    pub measure_code: String,
    pub subclause_id: String,
}

impl CellKeyRequest {
    fn key(&self) -> Result<CellKey, AppError> {
        Ok(CellKey::new(
            MeasureCode::new(self.measure_code.as_str())?,
            SubclauseId::new(self.subclause_id.as_str())?,
        ))
    }
}

impl Validate for CellKeyRequest {
    fn validate(&self) -> Result<(), String> {
        self.key().map(|_| ()).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetFieldRequest {
    #[serde(flatten)]
    pub key: CellKeyRequest,
    pub update: FieldUpdate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetFieldResponse {
    /// Cells sharing the key that were updated.
    pub updated: usize,
    pub progress: ProgressView,
}

#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub guide: FlushOutcome,
    pub additional: FlushOutcome,
}

async fn open_scope(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
    body: Bytes,
) -> Result<Json<ScopeView>, AppError> {
    let scope = path.scope()?;
    let req: OpenRequest = optional_json(&body)?;
    let version = req.version.map(RequirementVersion::new).transpose()?;
    let session = state.reopen(scope, version).await;
    Ok(Json(ScopeView::of(&session)))
}

async fn list_cells(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
) -> Result<Json<Vec<CellView>>, AppError> {
    let session = state.session(path.scope()?).await;
    Ok(Json(session.guide.views()))
}

async fn set_cell_field(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
    body: Result<Json<SetFieldRequest>, JsonRejection>,
) -> Result<Json<SetFieldResponse>, AppError> {
    let scope = path.scope()?;
    let req = extract_json(body)?;
    let key = req.key.key()?;
    let session = state.session(scope).await;
    let updated = session.guide.set_field(&key, req.update)?;
    Ok(Json(SetFieldResponse {
        updated,
        progress: ProgressView::of(&session),
    }))
}

async fn add_cell(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
    body: Result<Json<CellKeyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CellView>), AppError> {
    let scope = path.scope()?;
    let req = extract_validated_json(body)?;
    let key = req.key()?;
    let session = state.session(scope).await;
    let cell = session.guide.add_cell(key);
    Ok((StatusCode::CREATED, Json(cell.view())))
}

async fn flush(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
) -> Result<Json<FlushResponse>, AppError> {
    let session = state.session(path.scope()?).await;
    let (guide, additional) = session.flush_now().await?;
    Ok(Json(FlushResponse { guide, additional }))
}

async fn close_scope(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
) -> Result<StatusCode, AppError> {
    state.close(path.scope()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn progress(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
) -> Result<Json<ProgressView>, AppError> {
    let session = state.session(path.scope()?).await;
    Ok(Json(ProgressView::of(&session)))
}
