//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState holds:
//! - **Reconciler**: opens scopes against the injected stores.
//! - **Open sessions**: one [`RequirementSession`] per `(application,
//!   requirement)`, opened on first use, replaced on explicit re-open and
//!   dropped on close once its edits are flushed.
//! - **Measure store**: resolves the owning scope of an additional measure
//!   for scope-less routes.
//! - **Export collaborator**: optional; render routes return 503 without it.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;

use csa_core::{AdditionalMeasureId, RequirementVersion};
use csa_engine::{EngineConfig, ExportCollaborator, PersistenceReconciler, RequirementSession};
use csa_matrix::{AdditionalMeasure, MatrixScope};
use csa_store::{AdditionalMeasureStore, CatalogStore, InMemoryStore, PgStore};

use crate::error::AppError;

/// Service configuration, read from the environment.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// PostgreSQL connection string. `None` selects in-memory stores.
    pub database_url: Option<String>,
    /// YAML catalog file. Primary catalog in memory mode, fallback otherwise.
    pub catalog_path: Option<PathBuf>,
    /// Base URL of the export collaborator.
    pub export_url: Option<String>,
    pub export_timeout_secs: u64,
    pub engine: EngineConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("catalog_path", &self.catalog_path)
            .field("export_url", &self.export_url)
            .field("export_timeout_secs", &self.export_timeout_secs)
            .field("engine", &self.engine)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: Self::DEFAULT_PORT,
            database_url: None,
            catalog_path: None,
            export_url: None,
            export_timeout_secs: Self::DEFAULT_EXPORT_TIMEOUT_SECS,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_EXPORT_TIMEOUT_SECS: u64 = 30;

    /// Read `CSA_PORT`, `DATABASE_URL`, `CSA_CATALOG_PATH`, `CSA_EXPORT_URL`,
    /// `CSA_EXPORT_TIMEOUT_SECS` and the engine variables.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("CSA_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::Validation(format!("CSA_PORT must be a port, got {raw:?}")))?,
            None => Self::DEFAULT_PORT,
        };
        let export_timeout_secs = match non_empty("CSA_EXPORT_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::Validation(format!(
                    "CSA_EXPORT_TIMEOUT_SECS must be an integer, got {raw:?}"
                ))
            })?,
            None => Self::DEFAULT_EXPORT_TIMEOUT_SECS,
        };
        let engine =
            EngineConfig::from_lookup(&lookup).map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(Self {
            port,
            database_url: non_empty("DATABASE_URL"),
            catalog_path: non_empty("CSA_CATALOG_PATH").map(PathBuf::from),
            export_url: non_empty("CSA_EXPORT_URL"),
            export_timeout_secs,
            engine,
        })
    }
}

/// Which backend the stores live in. Readiness probes Postgres.
#[derive(Clone)]
pub enum Storage {
    Memory(InMemoryStore),
    Postgres(PgStore),
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub reconciler: PersistenceReconciler,
    pub measures: Arc<dyn AdditionalMeasureStore>,
    pub storage: Storage,
    pub sessions: Arc<DashMap<MatrixScope, Arc<RequirementSession>>>,
    pub export: Option<Arc<dyn ExportCollaborator>>,
}

impl AppState {
    /// State backed by the given in-memory store for all three roles.
    pub fn in_memory(config: AppConfig, store: InMemoryStore) -> Self {
        let shared = Arc::new(store.clone());
        let reconciler = PersistenceReconciler::new(
            shared.clone(),
            shared.clone(),
            shared.clone(),
            config.engine.clone(),
        );
        Self {
            config,
            reconciler,
            measures: shared,
            storage: Storage::Memory(store),
            sessions: Arc::new(DashMap::new()),
            export: None,
        }
    }

    /// State backed by PostgreSQL for all three roles.
    pub fn postgres(config: AppConfig, store: PgStore) -> Self {
        let shared = Arc::new(store.clone());
        let reconciler = PersistenceReconciler::new(
            shared.clone(),
            shared.clone(),
            shared.clone(),
            config.engine.clone(),
        );
        Self {
            config,
            reconciler,
            measures: shared,
            storage: Storage::Postgres(store),
            sessions: Arc::new(DashMap::new()),
            export: None,
        }
    }

    /// Replace the catalog store while keeping the other two roles.
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.reconciler = self.reconciler.with_catalog(catalog);
        self
    }

    pub fn with_fallback_catalog(mut self, catalog: Arc<dyn CatalogStore>) -> Self {
        self.reconciler = self.reconciler.with_fallback_catalog(catalog);
        self
    }

    pub fn with_export(mut self, export: Arc<dyn ExportCollaborator>) -> Self {
        self.export = Some(export);
        self
    }

    /// The open session for `scope`, reconciling it on first use.
    pub async fn session(&self, scope: MatrixScope) -> Arc<RequirementSession> {
        if let Some(existing) = self.sessions.get(&scope).map(|s| Arc::clone(s.value())) {
            return existing;
        }
        let opened = Arc::new(self.reconciler.open_requirement(scope, None).await);
        Arc::clone(self.sessions.entry(scope).or_insert(opened).value())
    }

    /// Reconcile `scope` again and replace the open session.
    ///
    /// Pending edits of the current session are flushed first. If that flush
    /// fails the current session is kept, since re-reading storage would
    /// drop the unpersisted edits.
    pub async fn reopen(
        &self,
        scope: MatrixScope,
        version: Option<RequirementVersion>,
    ) -> Arc<RequirementSession> {
        if let Some(existing) = self.sessions.get(&scope).map(|s| Arc::clone(s.value())) {
            if existing.flush_now().await.is_err() {
                tracing::warn!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    "pending edits could not be flushed; keeping the open session"
                );
                return existing;
            }
        }
        let opened = Arc::new(self.reconciler.open_requirement(scope, version).await);
        self.sessions.insert(scope, Arc::clone(&opened));
        opened
    }

    /// Flush the open session of `scope` and drop it.
    ///
    /// On a failed flush the session stays open and the error is returned.
    /// Closing a scope that is not open is a no-op.
    pub async fn close(&self, scope: MatrixScope) -> Result<(), AppError> {
        let Some(existing) = self.sessions.get(&scope).map(|s| Arc::clone(s.value())) else {
            return Ok(());
        };
        existing.flush_now().await?;
        // A concurrent re-open may have replaced the entry; leave that one.
        self.sessions
            .remove_if(&scope, |_, open| Arc::ptr_eq(open, &existing));
        tracing::debug!(
            application_id = %scope.application_id,
            requirement = %scope.requirement,
            "scope closed"
        );
        Ok(())
    }

    /// Open sessions of one application, in requirement order.
    pub fn sessions_for(
        &self,
        application_id: csa_core::ApplicationId,
    ) -> Vec<Arc<RequirementSession>> {
        let mut found: Vec<_> = self
            .sessions
            .iter()
            .filter(|e| e.key().application_id == application_id)
            .map(|e| Arc::clone(e.value()))
            .collect();
        found.sort_by_key(|s| s.scope().requirement);
        found
    }

    /// Find a stored additional measure regardless of scope.
    pub async fn find_measure(&self, id: AdditionalMeasureId) -> Result<AdditionalMeasure, AppError> {
        match self.measures.get_measure(id).await {
            Ok(Some(m)) => Ok(m),
            Ok(None) => Err(AppError::NotFound(format!("additional measure {id}"))),
            Err(e) => {
                tracing::warn!(measure_id = %id, error = %e, "measure lookup failed");
                Err(AppError::ServiceUnavailable(
                    "storage unavailable".to_string(),
                ))
            }
        }
    }

    /// Probe the backing store.
    pub async fn is_ready(&self) -> bool {
        match &self.storage {
            Storage::Memory(_) => true,
            Storage::Postgres(pg) => match pg.ping().await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "database readiness check failed");
                    false
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert!(config.catalog_path.is_none());
        assert!(config.export_url.is_none());
        assert_eq!(config.engine.debounce, Duration::from_millis(1000));
    }

    #[test]
    fn test_config_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CSA_PORT", "9000"),
            ("DATABASE_URL", "postgres://csa@localhost/csa"),
            ("CSA_CATALOG_PATH", "/etc/csa/catalog.yaml"),
            ("CSA_EXPORT_URL", "http://exporter:8000"),
            ("CSA_DEBOUNCE_MS", "50"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.catalog_path, Some(PathBuf::from("/etc/csa/catalog.yaml")));
        assert_eq!(config.engine.debounce, Duration::from_millis(50));
    }

    #[test]
    fn test_config_blank_values_are_unset() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_config_rejects_bad_port() {
        assert!(AppConfig::from_lookup(lookup(&[("CSA_PORT", "eighty")])).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = AppConfig {
            database_url: Some("postgres://user:hunter2@db/csa".into()),
            ..AppConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
