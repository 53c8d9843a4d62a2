//! Seeding, merge and user-added cell scenarios across matrix, store and
//! engine.

mod common;

use csa_core::{DiagnosisStatus, FieldUpdate, MaturityLevel};
use csa_engine::MatrixSource;
use csa_matrix::Provenance;
use csa_store::{AssessmentStore, Fault};

use common::*;

#[tokio::test]
async fn fresh_scope_seeds_catalog_cells_and_derives_plan() {
    let store = store_with(quality_catalog());
    let scope = quality_scope();
    let session = reconciler(&store).open_scope(scope, None).await;

    assert_eq!(session.report().source, MatrixSource::Persisted);
    assert_eq!(session.report().seeded, 3);
    let cells = session.cells();
    assert_eq!(cells.len(), 3);
    assert!(cells.iter().all(|c| c.provenance == Provenance::Catalog));
    assert!(cells.iter().all(|c| c.evaluation.maturity.is_none()));

    session
        .set_field(&key("MG_01", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L5)))
        .unwrap();

    let cells = session.cells();
    let rated = cells.iter().find(|c| c.matches(&key("MG_01", "S1"))).unwrap();
    assert_eq!(rated.evaluation.plan_code(), "03");
    assert_eq!(rated.evaluation.status(), DiagnosisStatus::Diagnosed);
    let pending = cells
        .iter()
        .filter(|c| c.evaluation.status() == DiagnosisStatus::Pending)
        .count();
    assert_eq!(pending, 2);

    let progress = session.progress();
    assert_eq!((progress.completed, progress.total), (1, 3));
    assert!((progress.ratio() - 1.0 / 3.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn reseeding_never_exceeds_distinct_relations() {
    let mut relations = quality_catalog();
    relations.push(rel("MG_01", "S1", false));
    let store = store_with(relations);
    let scope = quality_scope();
    let reconciler = reconciler(&store);

    let first = reconciler.open_scope(scope, None).await;
    assert_eq!(first.len(), 3);
    first
        .set_field(&key("MG_02", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L2)))
        .unwrap();
    first.flush_now().await.unwrap();

    for _ in 0..3 {
        let again = reconciler.open_scope(scope, None).await;
        assert_eq!(again.report().seeded, 0);
        assert_eq!(again.len(), 3);
    }
    assert_eq!(store.inner().cell_count(&scope), 3);
}

#[tokio::test]
async fn reopening_keeps_persisted_values() {
    let store = store_with(quality_catalog());
    let scope = quality_scope();
    let reconciler = reconciler(&store);

    let session = reconciler.open_scope(scope, None).await;
    session
        .set_field(&key("MG_01", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L7)))
        .unwrap();
    session
        .set_field(&key("MG_01", "S2"), FieldUpdate::Maturity(Some(MaturityLevel::L1)))
        .unwrap();
    session.flush_now().await.unwrap();

    let reopened = reconciler.open_scope(scope, None).await;
    assert_eq!(reopened.len(), 3);
    let cells = reopened.cells();
    let maturity = |m: &str, s: &str| {
        cells
            .iter()
            .find(|c| c.matches(&key(m, s)))
            .and_then(|c| c.evaluation.maturity)
    };
    assert_eq!(maturity("MG_01", "S1"), Some(MaturityLevel::L7));
    assert_eq!(maturity("MG_01", "S2"), Some(MaturityLevel::L1));
    assert_eq!(maturity("MG_02", "S1"), None);
}

#[tokio::test]
async fn edit_after_failed_load_keeps_persisted_ratings() {
    let store = store_with(quality_catalog());
    let scope = quality_scope();
    let reconciler = reconciler(&store);

    let first = reconciler.open_scope(scope, None).await;
    for (m, s) in [("MG_01", "S1"), ("MG_01", "S2"), ("MG_02", "S1")] {
        first
            .set_field(&key(m, s), FieldUpdate::Maturity(Some(MaturityLevel::L5)))
            .unwrap();
    }
    first.flush_now().await.unwrap();

    store.fail(Fault::Load);
    let reopened = reconciler.open_scope(scope, None).await;
    assert!(reopened.report().load_failed);
    assert_eq!(reopened.report().source, MatrixSource::InMemoryFallback);
    assert!(!reopened.is_synced());
    store.heal(Fault::Load);

    reopened
        .set_field(&key("MG_02", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L2)))
        .unwrap();
    reopened.flush_now().await.unwrap();
    assert!(reopened.is_synced());

    let persisted = store.inner().get_cells(&scope).await.unwrap();
    let rated = |cells: &[csa_matrix::AssessmentCell], level: MaturityLevel| {
        cells
            .iter()
            .filter(|c| c.evaluation.maturity == Some(level))
            .count()
    };
    assert_eq!(persisted.len(), 3);
    assert_eq!(rated(&persisted, MaturityLevel::L5), 2);
    assert_eq!(rated(&persisted, MaturityLevel::L2), 1);

    let local = reopened.cells();
    assert_eq!(rated(&local, MaturityLevel::L5), 2);
    assert_eq!(rated(&local, MaturityLevel::L2), 1);
    assert!(reopened.is_fully_evaluated());
}

#[tokio::test]
async fn user_added_cell_leaves_catalog_cells_alone() {
    let store = store_with(quality_catalog());
    let session = reconciler(&store).open_scope(quality_scope(), None).await;
    let before: Vec<_> = session.cells();

    let added = session.add_cell(key("MG_03", "S2"));
    assert_eq!(added.provenance, Provenance::UserAdded);

    let after = session.cells();
    assert_eq!(after.len(), 4);
    assert_eq!(&after[..3], &before[..]);
}

#[tokio::test]
async fn unknown_version_opens_empty_matrix() {
    let store = store_with(quality_catalog());
    let version = csa_core::RequirementVersion::new("9.9").unwrap();
    let session = reconciler(&store)
        .open_scope(quality_scope(), Some(version))
        .await;
    assert!(session.is_empty());
    assert!(session.report().catalog_failed);
    assert!(session.is_fully_evaluated());
}
