//! # Export Payloads
//!
//! Flattens an open requirement into the shape the export collaborator
//! consumes, and ships it over HTTP.
//!
//! One `assessments_mg` row per matrix cell and one `assessments_ma` row per
//! MA entry, unset fields included as `null`. Rendering the downloadable
//! document is the collaborator's job; this module only shapes the payload.
//!
//! ## Collaborator endpoints
//!
//! | Method | Path | Payload |
//! |--------|------|---------|
//! | POST | `/export/single/{code}` | [`RequirementExport`] |
//! | POST | `/export/full` | [`FullExport`] |

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use csa_core::{
    AdditionalMeasureId, ApplicationId, Difficulty, MaturityLevel, MeasureCode, RequirementCode,
    SubclauseId,
};
use csa_matrix::{AdditionalMeasure, AssessmentCell, MaAssessment, MaCellKey};

use crate::error::ExportError;
use crate::reconciler::RequirementSession;

/// One guide-measure row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MgExportRow {
    pub mg_id: MeasureCode,
    pub subpart_id: SubclauseId,
    pub difficulty: Option<Difficulty>,
    pub maturity: Option<MaturityLevel>,
}

/// One additional measure as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureExportRow {
    pub id: AdditionalMeasureId,
    pub title: String,
    pub description: Option<String>,
    pub file_name: Option<String>,
}

/// One MA-assessment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaExportRow {
    pub ma_id: AdditionalMeasureId,
    pub subpart_id: SubclauseId,
    pub difficulty: Option<Difficulty>,
    pub maturity: Option<MaturityLevel>,
}

/// One active measure-to-sub-clause relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaRelationRow {
    pub ma_id: AdditionalMeasureId,
    pub subpart_id: SubclauseId,
}

/// Payload for a single requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementExport {
    pub requirement_code: RequirementCode,
    pub assessments_mg: Vec<MgExportRow>,
    pub measures_additional: Vec<MeasureExportRow>,
    pub assessments_ma: Vec<MaExportRow>,
    pub ma_to_subpart: Vec<MaRelationRow>,
    /// Free-form application metadata passed through untouched.
    #[serde(default)]
    pub application_info: serde_json::Value,
}

impl RequirementExport {
    pub fn from_parts(
        requirement_code: RequirementCode,
        cells: &[AssessmentCell],
        measures: &[AdditionalMeasure],
        assessments: &[MaAssessment],
        relations: &[MaCellKey],
        application_info: serde_json::Value,
    ) -> Self {
        Self {
            requirement_code,
            assessments_mg: cells
                .iter()
                .map(|c| MgExportRow {
                    mg_id: c.measure_code.clone(),
                    subpart_id: c.subclause_id.clone(),
                    difficulty: c.evaluation.difficulty,
                    maturity: c.evaluation.maturity,
                })
                .collect(),
            measures_additional: measures
                .iter()
                .map(|m| MeasureExportRow {
                    id: m.id,
                    title: m.title.clone(),
                    description: m.description.clone(),
                    file_name: m.attachment.clone(),
                })
                .collect(),
            assessments_ma: assessments
                .iter()
                .map(|a| MaExportRow {
                    ma_id: a.measure_id,
                    subpart_id: a.subclause_id.clone(),
                    difficulty: a.evaluation.difficulty,
                    maturity: a.evaluation.maturity,
                })
                .collect(),
            ma_to_subpart: relations
                .iter()
                .map(|k| MaRelationRow {
                    ma_id: k.measure_id,
                    subpart_id: k.subclause_id.clone(),
                })
                .collect(),
            application_info,
        }
    }

    /// Snapshot the current in-memory state of an open requirement.
    pub fn from_session(session: &RequirementSession, application_info: serde_json::Value) -> Self {
        Self::from_parts(
            session.scope().requirement,
            &session.guide.cells(),
            &session.additional.measures(),
            &session.additional.assessments(),
            &session.additional.relations(),
            application_info,
        )
    }
}

/// Payload covering several requirements of one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullExport {
    pub application_id: ApplicationId,
    pub requirements: Vec<RequirementExport>,
}

/// Opaque document returned by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub content_type: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Renders export payloads into downloadable artifacts.
#[async_trait]
pub trait ExportCollaborator: Send + Sync {
    async fn export_single(&self, payload: &RequirementExport)
        -> Result<ExportArtifact, ExportError>;

    async fn export_full(&self, payload: &FullExport) -> Result<ExportArtifact, ExportError>;
}

/// [`ExportCollaborator`] reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpExportClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpExportClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ExportError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ExportError::Config(format!(
                "export base URL must be http(s): {base_url:?}"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExportError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: Serialize + Sync>(
        &self,
        endpoint: String,
        path: &str,
        payload: &T,
    ) -> Result<ExportArtifact, ExportError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ExportError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(endpoint = %endpoint, status, "export collaborator rejected payload");
            return Err(ExportError::Api {
                endpoint,
                status,
                body,
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_file_name);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ExportError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?
            .to_vec();

        tracing::info!(endpoint = %endpoint, bytes = bytes.len(), "export artifact received");
        Ok(ExportArtifact {
            content_type,
            file_name,
            bytes,
        })
    }
}

#[async_trait]
impl ExportCollaborator for HttpExportClient {
    async fn export_single(
        &self,
        payload: &RequirementExport,
    ) -> Result<ExportArtifact, ExportError> {
        let code = payload.requirement_code.as_str();
        self.post(
            format!("POST /export/single/{code}"),
            &format!("/export/single/{code}"),
            payload,
        )
        .await
    }

    async fn export_full(&self, payload: &FullExport) -> Result<ExportArtifact, ExportError> {
        self.post("POST /export/full".to_string(), "/export/full", payload)
            .await
    }
}

/// `attachment; filename="report.docx"` → `report.docx`.
fn disposition_file_name(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        part.strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
            .filter(|name| !name.is_empty())
    })
}
