//! # PostgreSQL Store
//!
//! SQLx-backed implementation of the three store traits. Queries are runtime
//! checked (`sqlx::query` / `query_as`) so the crate builds without a live
//! database.
//!
//! - A cell is identified by `(application_id, requirement_code,
//!   measure_code, subclause_id)`; sub-clause ids repeat across
//!   requirements. Upserts use `DO UPDATE` on that key, seeding uses
//!   `DO NOTHING`.
//! - MA-assessment upserts use `ON CONFLICT (measure_id, requirement_code,
//!   subclause_id) DO UPDATE`.
//! - Relation toggle and cascading delete run inside a transaction.
//! - `adaptation_plan` / `diagnosis_status` columns are written as a display
//!   cache and ignored on read.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;
use uuid::Uuid;

use csa_core::{
    AdditionalMeasureId, ApplicationId, CatalogRelation, CatalogScope, Difficulty, Evaluation,
    MaturityLevel, MeasureCode, RequirementCode, SubclauseId,
};
use csa_matrix::{
    AdditionalMeasure, AssessmentCell, MaAssessment, MaCellKey, MatrixScope, Provenance,
    ToggleOutcome,
};

use crate::error::StoreError;
use crate::traits::{AdditionalMeasureStore, AssessmentStore, CatalogStore};

/// Postgres-backed store. Cloning shares the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `url` and apply the embedded migrations.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round-trip a trivial query; used by readiness probes.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Load catalog relations into `catalog_relations`, skipping rows that
    /// already exist.
    pub async fn import_catalog(
        &self,
        scope: &CatalogScope,
        relations: &[CatalogRelation],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for r in relations {
            sqlx::query(
                "INSERT INTO catalog_relations (requirement_code, requirement_version, measure_code, subclause_id, is_primary)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT DO NOTHING",
            )
            .bind(scope.requirement.as_str())
            .bind(scope.version.as_str())
            .bind(r.measure_code.as_str())
            .bind(r.subclause_id.as_str())
            .bind(r.is_primary)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn get_catalog_relations(
        &self,
        scope: &CatalogScope,
    ) -> Result<Vec<CatalogRelation>, StoreError> {
        let rows = sqlx::query_as::<_, CatalogRelationRow>(
            "SELECT measure_code, subclause_id, is_primary
             FROM catalog_relations
             WHERE requirement_code = $1 AND requirement_version = $2
             ORDER BY measure_code, subclause_id",
        )
        .bind(scope.requirement.as_str())
        .bind(scope.version.as_str())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Err(StoreError::CatalogNotFound(scope.to_string()));
        }
        rows.into_iter().map(CatalogRelationRow::into_relation).collect()
    }
}

const UPSERT_CELL_SQL: &str = "INSERT INTO assessment_cells (application_id, requirement_code, measure_code, subclause_id, provenance, difficulty, maturity, adaptation_plan, diagnosis_status)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
     ON CONFLICT (application_id, requirement_code, measure_code, subclause_id) DO UPDATE SET
        difficulty = EXCLUDED.difficulty,
        maturity = EXCLUDED.maturity,
        adaptation_plan = EXCLUDED.adaptation_plan,
        diagnosis_status = EXCLUDED.diagnosis_status,
        updated_at = now()";

const SEED_CELL_SQL: &str = "INSERT INTO assessment_cells (application_id, requirement_code, measure_code, subclause_id, provenance)
     VALUES ($1, $2, $3, $4, $5)
     ON CONFLICT (application_id, requirement_code, measure_code, subclause_id) DO NOTHING";

#[async_trait]
impl AssessmentStore for PgStore {
    async fn get_cells(&self, scope: &MatrixScope) -> Result<Vec<AssessmentCell>, StoreError> {
        let rows = sqlx::query_as::<_, AssessmentCellRow>(
            "SELECT measure_code, subclause_id, provenance, difficulty, maturity
             FROM assessment_cells
             WHERE application_id = $1 AND requirement_code = $2
             ORDER BY seq",
        )
        .bind(scope.application_id.0)
        .bind(scope.requirement.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AssessmentCellRow::into_cell).collect()
    }

    async fn upsert_cells(
        &self,
        scope: &MatrixScope,
        cells: &[AssessmentCell],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for cell in cells {
            sqlx::query(UPSERT_CELL_SQL)
            .bind(scope.application_id.0)
            .bind(scope.requirement.as_str())
            .bind(cell.measure_code.as_str())
            .bind(cell.subclause_id.as_str())
            .bind(cell.provenance.as_str())
            .bind(cell.evaluation.difficulty.map(|d| d.code()))
            .bind(cell.evaluation.maturity.map(|m| m.as_str()))
            .bind(cell.evaluation.plan_code())
            .bind(cell.evaluation.status().code())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn insert_missing_cells(
        &self,
        scope: &MatrixScope,
        cells: &[AssessmentCell],
    ) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;
        for cell in cells {
            let result = sqlx::query(SEED_CELL_SQL)
            .bind(scope.application_id.0)
            .bind(scope.requirement.as_str())
            .bind(cell.measure_code.as_str())
            .bind(cell.subclause_id.as_str())
            .bind(cell.provenance.as_str())
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await?;
        Ok(inserted)
    }
}

#[async_trait]
impl AdditionalMeasureStore for PgStore {
    async fn create_measure(&self, measure: &AdditionalMeasure) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO additional_measures (id, application_id, requirement_code, title, description, attachment, evaluator_status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(measure.id.0)
        .bind(measure.application_id.0)
        .bind(measure.requirement.as_str())
        .bind(&measure.title)
        .bind(&measure.description)
        .bind(&measure.attachment)
        .bind(&measure.evaluator_status)
        .bind(measure.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_measure(
        &self,
        id: AdditionalMeasureId,
    ) -> Result<Option<AdditionalMeasure>, StoreError> {
        let row = sqlx::query_as::<_, AdditionalMeasureRow>(
            "SELECT id, application_id, requirement_code, title, description, attachment, evaluator_status, created_at
             FROM additional_measures WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(AdditionalMeasureRow::into_measure).transpose()
    }

    async fn list_measures(
        &self,
        scope: &MatrixScope,
    ) -> Result<Vec<AdditionalMeasure>, StoreError> {
        let rows = sqlx::query_as::<_, AdditionalMeasureRow>(
            "SELECT id, application_id, requirement_code, title, description, attachment, evaluator_status, created_at
             FROM additional_measures
             WHERE application_id = $1 AND requirement_code = $2
             ORDER BY created_at",
        )
        .bind(scope.application_id.0)
        .bind(scope.requirement.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AdditionalMeasureRow::into_measure).collect()
    }

    async fn update_attachment(
        &self,
        id: AdditionalMeasureId,
        attachment: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE additional_measures SET attachment = $2 WHERE id = $1")
            .bind(id.0)
            .bind(attachment)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::MeasureNotFound(id));
        }
        Ok(())
    }

    async fn delete_measure(&self, id: AdditionalMeasureId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM ma_assessments WHERE measure_id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM ma_relations WHERE measure_id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM additional_measures WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::MeasureNotFound(id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn toggle_relation(
        &self,
        scope: &MatrixScope,
        key: &MaCellKey,
    ) -> Result<ToggleOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let owned: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM additional_measures
             WHERE id = $1 AND application_id = $2 AND requirement_code = $3
             FOR UPDATE",
        )
        .bind(key.measure_id.0)
        .bind(scope.application_id.0)
        .bind(scope.requirement.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        if owned.is_none() {
            tx.rollback().await?;
            return Err(StoreError::MeasureNotFound(key.measure_id));
        }

        let removed = sqlx::query(
            "DELETE FROM ma_relations WHERE measure_id = $1 AND subclause_id = $2",
        )
        .bind(key.measure_id.0)
        .bind(key.subclause_id.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outcome = if removed > 0 {
            sqlx::query(
                "DELETE FROM ma_assessments
                 WHERE measure_id = $1 AND requirement_code = $2 AND subclause_id = $3",
            )
            .bind(key.measure_id.0)
            .bind(scope.requirement.as_str())
            .bind(key.subclause_id.as_str())
            .execute(&mut *tx)
            .await?;
            ToggleOutcome::Removed
        } else {
            sqlx::query("INSERT INTO ma_relations (measure_id, subclause_id) VALUES ($1, $2)")
                .bind(key.measure_id.0)
                .bind(key.subclause_id.as_str())
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO ma_assessments (measure_id, requirement_code, subclause_id)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (measure_id, requirement_code, subclause_id) DO NOTHING",
            )
            .bind(key.measure_id.0)
            .bind(scope.requirement.as_str())
            .bind(key.subclause_id.as_str())
            .execute(&mut *tx)
            .await?;
            ToggleOutcome::Added
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_relations(&self, scope: &MatrixScope) -> Result<Vec<MaCellKey>, StoreError> {
        let rows = sqlx::query_as::<_, MaRelationRow>(
            "SELECT r.measure_id, r.subclause_id
             FROM ma_relations r
             JOIN additional_measures m ON m.id = r.measure_id
             WHERE m.application_id = $1 AND m.requirement_code = $2
             ORDER BY r.measure_id, r.subclause_id",
        )
        .bind(scope.application_id.0)
        .bind(scope.requirement.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MaRelationRow::into_key).collect()
    }

    async fn get_ma_assessments(
        &self,
        scope: &MatrixScope,
    ) -> Result<Vec<MaAssessment>, StoreError> {
        let rows = sqlx::query_as::<_, MaAssessmentRow>(
            "SELECT a.measure_id, a.subclause_id, a.difficulty, a.maturity
             FROM ma_assessments a
             JOIN additional_measures m ON m.id = a.measure_id
             WHERE m.application_id = $1 AND a.requirement_code = $2
             ORDER BY a.measure_id, a.subclause_id",
        )
        .bind(scope.application_id.0)
        .bind(scope.requirement.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MaAssessmentRow::into_assessment).collect()
    }

    async fn upsert_ma_assessments(
        &self,
        scope: &MatrixScope,
        entries: &[MaAssessment],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            upsert_ma_assessment(&mut tx, scope.requirement, entry).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn upsert_ma_assessment(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    requirement: RequirementCode,
    entry: &MaAssessment,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO ma_assessments (measure_id, requirement_code, subclause_id, difficulty, maturity, adaptation_plan, diagnosis_status)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (measure_id, requirement_code, subclause_id) DO UPDATE SET
            difficulty = EXCLUDED.difficulty,
            maturity = EXCLUDED.maturity,
            adaptation_plan = EXCLUDED.adaptation_plan,
            diagnosis_status = EXCLUDED.diagnosis_status,
            updated_at = now()",
    )
    .bind(entry.measure_id.0)
    .bind(requirement.as_str())
    .bind(entry.subclause_id.as_str())
    .bind(entry.evaluation.difficulty.map(|d| d.code()))
    .bind(entry.evaluation.maturity.map(|m| m.as_str()))
    .bind(entry.evaluation.plan_code())
    .bind(entry.evaluation.status().code())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct CatalogRelationRow {
    measure_code: String,
    subclause_id: String,
    is_primary: bool,
}

impl CatalogRelationRow {
    fn into_relation(self) -> Result<CatalogRelation, StoreError> {
        Ok(CatalogRelation::new(
            parse_measure_code(self.measure_code)?,
            parse_subclause(self.subclause_id)?,
            self.is_primary,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct AssessmentCellRow {
    measure_code: String,
    subclause_id: String,
    provenance: String,
    difficulty: Option<String>,
    maturity: Option<String>,
}

impl AssessmentCellRow {
    fn into_cell(self) -> Result<AssessmentCell, StoreError> {
        let provenance = self.provenance.parse::<Provenance>().unwrap_or_else(|_| {
            tracing::warn!(
                value = %self.provenance,
                "unrecognized cell provenance in database, defaulting to CATALOG"
            );
            Provenance::Catalog
        });
        Ok(AssessmentCell {
            measure_code: parse_measure_code(self.measure_code)?,
            subclause_id: parse_subclause(self.subclause_id)?,
            provenance,
            evaluation: parse_evaluation(self.difficulty.as_deref(), self.maturity.as_deref()),
        })
    }
}

#[derive(sqlx::FromRow)]
struct AdditionalMeasureRow {
    id: Uuid,
    application_id: Uuid,
    requirement_code: String,
    title: String,
    description: Option<String>,
    attachment: Option<String>,
    evaluator_status: String,
    created_at: DateTime<Utc>,
}

impl AdditionalMeasureRow {
    fn into_measure(self) -> Result<AdditionalMeasure, StoreError> {
        let requirement = self
            .requirement_code
            .parse::<RequirementCode>()
            .map_err(|e| StoreError::Corrupt(format!("additional measure {}: {e}", self.id)))?;
        Ok(AdditionalMeasure {
            id: AdditionalMeasureId(self.id),
            application_id: ApplicationId(self.application_id),
            requirement,
            title: self.title,
            description: self.description,
            attachment: self.attachment,
            evaluator_status: self.evaluator_status,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MaRelationRow {
    measure_id: Uuid,
    subclause_id: String,
}

impl MaRelationRow {
    fn into_key(self) -> Result<MaCellKey, StoreError> {
        Ok(MaCellKey::new(
            AdditionalMeasureId(self.measure_id),
            parse_subclause(self.subclause_id)?,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct MaAssessmentRow {
    measure_id: Uuid,
    subclause_id: String,
    difficulty: Option<String>,
    maturity: Option<String>,
}

impl MaAssessmentRow {
    fn into_assessment(self) -> Result<MaAssessment, StoreError> {
        Ok(MaAssessment {
            measure_id: AdditionalMeasureId(self.measure_id),
            subclause_id: parse_subclause(self.subclause_id)?,
            evaluation: parse_evaluation(self.difficulty.as_deref(), self.maturity.as_deref()),
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_measure_code(s: String) -> Result<MeasureCode, StoreError> {
    MeasureCode::new(s).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse_subclause(s: String) -> Result<SubclauseId, StoreError> {
    SubclauseId::new(s).map_err(|e| StoreError::Corrupt(e.to_string()))
}

/// Unknown codes are treated as unset, matching the lenient derivation rules.
fn parse_evaluation(difficulty: Option<&str>, maturity: Option<&str>) -> Evaluation {
    let difficulty = difficulty.and_then(|d| match d.parse::<Difficulty>() {
        Ok(d) => Some(d),
        Err(_) => {
            tracing::warn!(value = d, "unrecognized difficulty in database, treating as unset");
            None
        }
    });
    let maturity = maturity.and_then(|m| {
        let parsed = MaturityLevel::parse_lenient(m);
        if parsed.is_none() {
            tracing::warn!(value = m, "unrecognized maturity in database, treating as unset");
        }
        parsed
    });
    Evaluation::new(difficulty, maturity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL_KEY: &str = "(application_id, requirement_code, measure_code, subclause_id)";

    #[test]
    fn test_cell_writes_conflict_on_the_full_scope_key() {
        assert!(UPSERT_CELL_SQL.contains(&format!("ON CONFLICT {CELL_KEY} DO UPDATE")));
        assert!(SEED_CELL_SQL.contains(&format!("ON CONFLICT {CELL_KEY} DO NOTHING")));
        let migration = include_str!("../migrations/0001_init.sql");
        assert!(migration.contains(&format!("UNIQUE {CELL_KEY}")));
    }

    #[test]
    fn test_parse_evaluation_lenient() {
        let e = parse_evaluation(Some("01"), Some("L6"));
        assert_eq!(e.difficulty, Some(Difficulty::Medium));
        assert_eq!(e.maturity, Some(MaturityLevel::L6));

        let e = parse_evaluation(Some("bogus"), Some("L99"));
        assert_eq!(e, Evaluation::default());
        assert_eq!(parse_evaluation(None, None), Evaluation::default());
    }

    #[test]
    fn test_cell_row_mapping() {
        let row = AssessmentCellRow {
            measure_code: "MG_01".into(),
            subclause_id: "S1".into(),
            provenance: "USER_ADDED".into(),
            difficulty: None,
            maturity: Some("L5".into()),
        };
        let cell = row.into_cell().unwrap();
        assert_eq!(cell.provenance, Provenance::UserAdded);
        assert_eq!(cell.evaluation.plan_code(), "03");
    }

    #[test]
    fn test_blank_measure_code_is_corrupt() {
        let row = CatalogRelationRow {
            measure_code: String::new(),
            subclause_id: "S1".into(),
            is_primary: false,
        };
        assert!(matches!(row.into_relation(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_measure_row_rejects_unknown_requirement() {
        let row = AdditionalMeasureRow {
            id: Uuid::new_v4(),
            application_id: Uuid::new_v4(),
            requirement_code: "UNKNOWN".into(),
            title: "t".into(),
            description: None,
            attachment: None,
            evaluator_status: "00".into(),
            created_at: Utc::now(),
        };
        assert!(matches!(row.into_measure(), Err(StoreError::Corrupt(_))));
    }
}
