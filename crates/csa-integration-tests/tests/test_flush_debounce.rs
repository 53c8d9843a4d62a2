//! Debounced persistence through a reconciled session, with store faults.

mod common;

use std::time::Duration;

use csa_core::{FieldUpdate, MaturityLevel};
use csa_engine::{FlushOutcome, MatrixSource};
use csa_store::Fault;

use common::*;

#[tokio::test(start_paused = true)]
async fn rapid_edits_on_distinct_cells_flush_once() {
    let mut relations = quality_catalog();
    relations.push(rel("MG_02", "S2", false));
    relations.push(rel("MG_03", "S1", true));
    let store = store_with(relations);
    let session = reconciler(&store).open_scope(quality_scope(), None).await;
    assert_eq!(session.len(), 5);

    let keys: Vec<_> = session.cells().iter().map(|c| c.key()).collect();
    for k in &keys {
        session
            .set_field(k, FieldUpdate::Maturity(Some(MaturityLevel::L4)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
    }
    assert_eq!(store.upsert_calls(), 0);
    assert!(session.flush_pending());

    tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
    assert_eq!(store.upsert_calls(), 1);
    let rows = store.last_upsert();
    assert_eq!(rows.len(), 5);
    assert!(rows
        .iter()
        .all(|c| c.evaluation.maturity == Some(MaturityLevel::L4)));
    assert!(!session.is_dirty());
}

#[tokio::test(start_paused = true)]
async fn failed_flush_keeps_edits_for_next_attempt() {
    let store = store_with(quality_catalog());
    let session = reconciler(&store).open_scope(quality_scope(), None).await;

    store.fail(Fault::Upsert);
    session
        .set_field(&key("MG_02", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L3)))
        .unwrap();
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
    assert_eq!(store.upsert_calls(), 1);
    assert!(session.is_dirty());

    // No retry without a new edit or an explicit flush.
    tokio::time::sleep(DEBOUNCE * 3).await;
    assert_eq!(store.upsert_calls(), 1);

    store.heal(Fault::Upsert);
    assert_eq!(session.flush_now().await.unwrap(), FlushOutcome::Flushed(3));
    assert!(!session.is_dirty());
    assert_eq!(session.flush_now().await.unwrap(), FlushOutcome::Clean);
}

#[tokio::test(start_paused = true)]
async fn seed_failure_falls_back_to_memory_and_still_edits() {
    let store = store_with(quality_catalog());
    store.fail(Fault::Seed);
    let session = reconciler(&store).open_scope(quality_scope(), None).await;

    assert_eq!(session.report().source, MatrixSource::InMemoryFallback);
    assert!(session.report().seed_failed);
    assert!(!session.report().load_failed);
    assert_eq!(session.len(), 3);

    session
        .set_field(&key("MG_01", "S2"), FieldUpdate::Maturity(Some(MaturityLevel::L6)))
        .unwrap();
    assert_eq!(session.progress().completed, 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_a_session_does_not_cancel_its_flush() {
    let store = store_with(quality_catalog());
    let scope = quality_scope();
    {
        let session = reconciler(&store).open_scope(scope, None).await;
        session
            .set_field(&key("MG_01", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L8)))
            .unwrap();
    }
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(50)).await;
    assert_eq!(store.upsert_calls(), 1);
}
