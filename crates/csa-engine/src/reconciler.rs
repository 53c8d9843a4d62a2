//! # Persistence Reconciler
//!
//! Opens a scope: seeds it from the catalog, reads back what is persisted,
//! and hands out a live session.
//!
//! ## Open protocol
//!
//! 1. Look up the catalog relations for `(requirement, version)`.
//! 2. Insert one unset catalog cell per relation, skipping keys that already
//!    exist. Repeated opens never duplicate or overwrite rows.
//! 3. Read the scope's persisted cells. If there are any they become the
//!    matrix verbatim.
//! 4. Otherwise build the matrix in memory from the relation list. When the
//!    primary catalog lookup failed, a configured fallback catalog is used.
//!
//! No failure in steps 1–3 escapes: each is logged, recorded in the
//! [`ReconcileReport`], and the scope stays usable.

use std::sync::Arc;

use csa_core::{CatalogRelation, CatalogScope, RequirementVersion};
use csa_matrix::{AdditionalMeasureRelationSet, CatalogSeeder, MatrixScope};
use csa_store::{AdditionalMeasureStore, AssessmentStore, CatalogStore};

use crate::additional::AdditionalMeasureSession;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::session::{AssessmentSession, FlushOutcome, MatrixSource, ReconcileReport};

/// Both halves of one open requirement scope.
#[derive(Debug)]
pub struct RequirementSession {
    pub guide: AssessmentSession,
    pub additional: AdditionalMeasureSession,
}

impl RequirementSession {
    pub fn scope(&self) -> MatrixScope {
        self.guide.scope()
    }

    /// Guide matrix fully evaluated and every MA entry rated.
    pub fn is_complete(&self) -> bool {
        self.guide.is_fully_evaluated() && self.additional.is_complete()
    }

    /// Flush both halves. The MA flush runs even when the guide flush
    /// fails; the first error is returned.
    pub async fn flush_now(&self) -> Result<(FlushOutcome, FlushOutcome), EngineError> {
        let guide = self.guide.flush_now().await;
        let additional = self.additional.flush_now().await;
        Ok((guide?, additional?))
    }
}

/// Factory for scope sessions. Holds the injected store handles.
#[derive(Clone)]
pub struct PersistenceReconciler {
    catalog: Arc<dyn CatalogStore>,
    fallback_catalog: Option<Arc<dyn CatalogStore>>,
    assessments: Arc<dyn AssessmentStore>,
    measures: Arc<dyn AdditionalMeasureStore>,
    config: EngineConfig,
}

impl PersistenceReconciler {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        assessments: Arc<dyn AssessmentStore>,
        measures: Arc<dyn AdditionalMeasureStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            catalog,
            fallback_catalog: None,
            assessments,
            measures,
            config,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Local relation source consulted when the primary catalog fails.
    pub fn with_fallback_catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.fallback_catalog = Some(catalog);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconcile the guide-measure matrix of `scope`.
    pub async fn open_scope(
        &self,
        scope: MatrixScope,
        version: Option<RequirementVersion>,
    ) -> AssessmentSession {
        let catalog_scope = CatalogScope::new(
            scope.requirement,
            version.unwrap_or_else(|| self.config.default_version.clone()),
        );

        let relations = match self.catalog.get_catalog_relations(&catalog_scope).await {
            Ok(relations) => Some(relations),
            Err(e) => {
                tracing::warn!(
                    application_id = %scope.application_id,
                    catalog = %catalog_scope,
                    error = %e,
                    "catalog lookup failed; seeding skipped"
                );
                None
            }
        };
        let catalog_failed = relations.is_none();

        let mut seeded = 0;
        let mut seed_failed = false;
        if let Some(relations) = &relations {
            let cells = CatalogSeeder::seed(&scope, &catalog_scope, relations);
            match self.assessments.insert_missing_cells(&scope, &cells).await {
                Ok(inserted) => seeded = inserted,
                Err(e) => {
                    seed_failed = true;
                    tracing::warn!(
                        application_id = %scope.application_id,
                        requirement = %scope.requirement,
                        cells = cells.len(),
                        error = %e,
                        "seed insert failed"
                    );
                }
            }
        }

        let (persisted, load_failed) = match self.assessments.get_cells(&scope).await {
            Ok(cells) => (cells, false),
            Err(e) => {
                tracing::warn!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    error = %e,
                    "loading persisted cells failed"
                );
                (Vec::new(), true)
            }
        };

        let relations = match relations {
            Some(r) => r,
            None => self.fallback_relations(&catalog_scope).await,
        };

        let (matrix, source) = if persisted.is_empty() {
            (
                CatalogSeeder::seed_matrix(scope, &catalog_scope, &relations),
                MatrixSource::InMemoryFallback,
            )
        } else {
            (
                csa_matrix::AssessmentMatrix::from_cells(scope, persisted),
                MatrixSource::Persisted,
            )
        };

        let report = ReconcileReport {
            source,
            catalog_relations: relations.len(),
            seeded,
            catalog_failed,
            seed_failed,
            load_failed,
        };
        if source == MatrixSource::InMemoryFallback {
            tracing::info!(
                application_id = %scope.application_id,
                requirement = %scope.requirement,
                cells = matrix.len(),
                seed_failed,
                load_failed,
                "scope opened from in-memory seed"
            );
        } else {
            tracing::debug!(
                application_id = %scope.application_id,
                requirement = %scope.requirement,
                cells = matrix.len(),
                seeded,
                "scope reconciled"
            );
        }

        AssessmentSession::new(
            matrix,
            Arc::clone(&self.assessments),
            self.config.debounce,
            report,
        )
    }

    /// Load the additional measures, relations and MA assessments of `scope`.
    /// A load failure opens an empty set flagged with `load_failed`.
    pub async fn open_additional(&self, scope: MatrixScope) -> AdditionalMeasureSession {
        let loaded = async {
            let measures = self.measures.list_measures(&scope).await?;
            let relations = self.measures.list_relations(&scope).await?;
            let assessments = self.measures.get_ma_assessments(&scope).await?;
            Ok::<_, csa_store::StoreError>((measures, relations, assessments))
        }
        .await;

        let (set, load_failed) = match loaded {
            Ok((measures, relations, assessments)) => (
                AdditionalMeasureRelationSet::from_parts(scope, measures, relations, assessments),
                false,
            ),
            Err(e) => {
                tracing::warn!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    error = %e,
                    "loading additional measures failed"
                );
                (AdditionalMeasureRelationSet::new(scope), true)
            }
        };

        AdditionalMeasureSession::new(
            set,
            Arc::clone(&self.measures),
            self.config.debounce,
            load_failed,
        )
    }

    /// Open both halves of a requirement scope.
    pub async fn open_requirement(
        &self,
        scope: MatrixScope,
        version: Option<RequirementVersion>,
    ) -> RequirementSession {
        RequirementSession {
            guide: self.open_scope(scope, version).await,
            additional: self.open_additional(scope).await,
        }
    }

    async fn fallback_relations(&self, catalog_scope: &CatalogScope) -> Vec<CatalogRelation> {
        let Some(fallback) = &self.fallback_catalog else {
            return Vec::new();
        };
        match fallback.get_catalog_relations(catalog_scope).await {
            Ok(relations) => relations,
            Err(e) => {
                tracing::warn!(
                    catalog = %catalog_scope,
                    error = %e,
                    "fallback catalog lookup failed"
                );
                Vec::new()
            }
        }
    }
}
