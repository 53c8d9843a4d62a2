//! # Export Routes
//!
//! - `GET  …/export`                         : flattened payload of one requirement
//! - `POST …/export/render`                  : render it through the export collaborator
//! - `POST /v1/applications/{app}/export`    : render several requirements at once
//!
//! Rendering returns the collaborator's artifact verbatim, or 503 when no
//! collaborator is configured.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use csa_engine::{ExportArtifact, FullExport, RequirementExport};
use csa_matrix::MatrixScope;

use crate::error::AppError;
use crate::extractors::optional_json;
use crate::routes::scopes::SCOPE_PREFIX;
use crate::routes::{parse_application, parse_requirement, ScopePath};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(&format!("{SCOPE_PREFIX}/export"), get(requirement_payload))
        .route(&format!("{SCOPE_PREFIX}/export/render"), post(render_requirement))
        .route("/v1/applications/{app}/export", post(render_full))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Free-form application metadata passed to the collaborator.
    #[serde(default)]
    pub application_info: serde_json::Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FullRenderRequest {
    /// Requirement codes to include. Empty means every open requirement of
    /// the application.
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub application_info: serde_json::Value,
}

async fn requirement_payload(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
) -> Result<Json<RequirementExport>, AppError> {
    let session = state.session(path.scope()?).await;
    Ok(Json(RequirementExport::from_session(
        &session,
        serde_json::Value::Null,
    )))
}

async fn render_requirement(
    State(state): State<AppState>,
    Path(path): Path<ScopePath>,
    body: Bytes,
) -> Result<Response, AppError> {
    let scope = path.scope()?;
    let req: RenderRequest = optional_json(&body)?;
    let export = state
        .export
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("export service not configured".into()))?;
    let session = state.session(scope).await;
    let payload = RequirementExport::from_session(&session, req.application_info);
    let artifact = export.export_single(&payload).await?;
    Ok(artifact_response(artifact))
}

async fn render_full(
    State(state): State<AppState>,
    Path(app): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let application_id = parse_application(&app)?;
    let req: FullRenderRequest = optional_json(&body)?;
    let export = state
        .export
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("export service not configured".into()))?;

    let sessions = if req.requirements.is_empty() {
        state.sessions_for(application_id)
    } else {
        let mut sessions = Vec::with_capacity(req.requirements.len());
        for code in &req.requirements {
            let scope = MatrixScope::new(application_id, parse_requirement(code)?);
            sessions.push(state.session(scope).await);
        }
        sessions
    };
    if sessions.is_empty() {
        return Err(AppError::NotFound(format!(
            "no open requirements for {application_id}"
        )));
    }

    let payload = FullExport {
        application_id,
        requirements: sessions
            .iter()
            .map(|s| RequirementExport::from_session(s, req.application_info.clone()))
            .collect(),
    };
    let artifact = export.export_full(&payload).await?;
    Ok(artifact_response(artifact))
}

fn artifact_response(artifact: ExportArtifact) -> Response {
    let disposition = artifact
        .file_name
        .map(|name| format!("attachment; filename=\"{name}\""))
        .unwrap_or_else(|| "attachment".to_string());
    (
        [
            (header::CONTENT_TYPE, artifact.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response()
}
