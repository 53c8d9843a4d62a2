//! # Assessment Session
//!
//! A live guide-measure matrix for one open scope. Edits apply to the
//! in-memory matrix immediately, mark it dirty, and (re)start the scope's
//! debounce timer. When the timer fires, the whole current cell set is
//! written with one bulk upsert.
//!
//! ## Flush protocol
//!
//! - Flushes of one scope are serialized by `flush_lock`.
//! - The row snapshot is taken after acquiring the lock, so a flush always
//!   carries the latest value of every key.
//! - A failed flush is logged and leaves the scope dirty. Nothing is retried
//!   until the next edit restarts the timer.
//!
//! ## Unsynced scopes
//!
//! A scope whose persisted cells could not be read opens from an unset
//! in-memory seed and is *unsynced*: storage may hold ratings this session
//! has never seen. Until it resyncs, a flush inserts untouched cells only
//! if absent and upserts only the keys edited in this session, then reads
//! storage back and takes over persisted values for every other key.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use csa_core::FieldUpdate;
use csa_matrix::{AssessmentCell, AssessmentMatrix, CellKey, CellView, MatrixScope, Progress};
use csa_store::{AssessmentStore, StoreError};

use crate::debounce::Debouncer;
use crate::error::EngineError;

/// Result of a flush attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "rows", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Rows written.
    Flushed(usize),
    /// Nothing had changed since the last successful flush.
    Clean,
}

/// Where the cells of a freshly opened scope came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixSource {
    /// Read back from the assessment store.
    Persisted,
    /// Nothing could be read back; seeded in memory from the catalog.
    InMemoryFallback,
}

/// What happened while a scope was reconciled.
///
/// A failed seed and a failed load both end in the in-memory fallback;
/// the flags keep the two causes apart for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub source: MatrixSource,
    /// Catalog relations available for the scope.
    pub catalog_relations: usize,
    /// Rows newly inserted by seeding.
    pub seeded: usize,
    /// Catalog lookup failed (unknown requirement/version or store error).
    pub catalog_failed: bool,
    /// The insert-if-absent seed call failed.
    pub seed_failed: bool,
    /// Reading persisted cells failed.
    pub load_failed: bool,
}

struct Shared {
    matrix: Mutex<AssessmentMatrix>,
    dirty: AtomicBool,
    synced: AtomicBool,
    /// Keys edited while unsynced. Locked before `matrix` when both are held.
    edited: Mutex<HashSet<CellKey>>,
    flush_lock: tokio::sync::Mutex<()>,
    store: Arc<dyn AssessmentStore>,
}

impl Shared {
    async fn flush(&self) -> Result<FlushOutcome, EngineError> {
        let _serial = self.flush_lock.lock().await;
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(FlushOutcome::Clean);
        }
        let (scope, rows) = {
            let matrix = self.matrix.lock();
            (*matrix.scope(), matrix.flush_rows())
        };
        let written = if self.synced.load(Ordering::SeqCst) {
            self.store.upsert_cells(&scope, &rows).await.map(|()| rows.len())
        } else {
            self.write_unsynced(&scope, &rows).await
        };
        match written {
            Ok(written) => {
                metrics::counter!("csa_flush_total", "kind" => "mg").increment(1);
                tracing::debug!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    cells = written,
                    "assessment cells flushed"
                );
                Ok(FlushOutcome::Flushed(written))
            }
            Err(e) => {
                self.dirty.store(true, Ordering::SeqCst);
                metrics::counter!("csa_flush_failures_total", "kind" => "mg").increment(1);
                tracing::warn!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    cells = rows.len(),
                    error = %e,
                    "assessment flush failed; changes kept in memory"
                );
                Err(e.into())
            }
        }
    }

    /// Write without overwriting rows this session has not edited, then
    /// resync from storage. Returns the number of upserted rows.
    async fn write_unsynced(
        &self,
        scope: &MatrixScope,
        rows: &[AssessmentCell],
    ) -> Result<usize, StoreError> {
        let edited = self.edited.lock().clone();
        self.store.insert_missing_cells(scope, rows).await?;
        let touched: Vec<AssessmentCell> = rows
            .iter()
            .filter(|c| edited.contains(&c.key()))
            .cloned()
            .collect();
        if !touched.is_empty() {
            self.store.upsert_cells(scope, &touched).await?;
        }

        match self.store.get_cells(scope).await {
            Ok(persisted) => {
                let mut edited = self.edited.lock();
                let absorbed = self.matrix.lock().absorb_persisted(persisted, &edited);
                edited.clear();
                self.synced.store(true, Ordering::SeqCst);
                tracing::info!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    absorbed,
                    "scope resynced with storage"
                );
            }
            Err(e) => {
                tracing::warn!(
                    application_id = %scope.application_id,
                    requirement = %scope.requirement,
                    error = %e,
                    "read-back after flush failed; scope stays unsynced"
                );
            }
        }
        Ok(touched.len())
    }
}

/// Guide-measure matrix of one open scope, with debounced persistence.
///
/// All methods take `&self`; the session can be shared behind an `Arc`.
/// Mutating methods must be called from within a Tokio runtime.
pub struct AssessmentSession {
    shared: Arc<Shared>,
    debouncer: Debouncer,
    report: ReconcileReport,
}

impl AssessmentSession {
    pub(crate) fn new(
        matrix: AssessmentMatrix,
        store: Arc<dyn AssessmentStore>,
        debounce: Duration,
        report: ReconcileReport,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                matrix: Mutex::new(matrix),
                dirty: AtomicBool::new(false),
                synced: AtomicBool::new(!report.load_failed),
                edited: Mutex::new(HashSet::new()),
                flush_lock: tokio::sync::Mutex::new(()),
                store,
            }),
            debouncer: Debouncer::new(debounce),
            report,
        }
    }

    pub fn scope(&self) -> MatrixScope {
        *self.shared.matrix.lock().scope()
    }

    pub fn report(&self) -> &ReconcileReport {
        &self.report
    }

    pub fn cells(&self) -> Vec<AssessmentCell> {
        self.shared.matrix.lock().cells().to_vec()
    }

    pub fn views(&self) -> Vec<CellView> {
        self.shared.matrix.lock().views()
    }

    pub fn len(&self) -> usize {
        self.shared.matrix.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.matrix.lock().is_empty()
    }

    /// Set difficulty or maturity on the cell(s) with `key`.
    pub fn set_field(&self, key: &CellKey, update: FieldUpdate) -> Result<usize, EngineError> {
        self.note_edit(key);
        let touched = self.shared.matrix.lock().set_field(key, update)?;
        self.mark_dirty();
        Ok(touched)
    }

    /// Append a user-added cell.
    pub fn add_cell(&self, key: CellKey) -> AssessmentCell {
        self.note_edit(&key);
        let cell = self.shared.matrix.lock().add_cell(key).clone();
        self.mark_dirty();
        cell
    }

    pub fn progress(&self) -> Progress {
        self.shared.matrix.lock().progress()
    }

    pub fn is_fully_evaluated(&self) -> bool {
        self.shared.matrix.lock().is_fully_evaluated()
    }

    /// Whether there are edits not yet written by a successful flush.
    pub fn is_dirty(&self) -> bool {
        self.shared.dirty.load(Ordering::SeqCst)
    }

    /// False while persisted cells may exist that this session has not
    /// read back.
    pub fn is_synced(&self) -> bool {
        self.shared.synced.load(Ordering::SeqCst)
    }

    pub fn flush_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Cancel the pending debounce and flush immediately.
    pub async fn flush_now(&self) -> Result<FlushOutcome, EngineError> {
        self.debouncer.cancel();
        self.shared.flush().await
    }

    /// Recorded before the matrix changes, so a concurrent resync never
    /// overwrites the edit with an older persisted value.
    fn note_edit(&self, key: &CellKey) {
        if !self.is_synced() {
            self.shared.edited.lock().insert(key.clone());
        }
    }

    fn mark_dirty(&self) {
        self.shared.dirty.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        self.debouncer.schedule(move || async move {
            // Failures are already logged inside `flush`.
            let _ = shared.flush().await;
        });
    }
}

impl std::fmt::Debug for AssessmentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentSession")
            .field("scope", &self.scope())
            .field("cells", &self.len())
            .field("dirty", &self.is_dirty())
            .field("synced", &self.is_synced())
            .finish()
    }
}
