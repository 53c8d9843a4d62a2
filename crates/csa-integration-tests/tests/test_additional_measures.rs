//! Additional-measure relation toggling, cascade delete and export rows.

mod common;

use csa_core::{FieldUpdate, MaturityLevel, SubclauseId};
use csa_engine::RequirementExport;
use csa_matrix::{MaCellKey, NewAdditionalMeasure, ToggleOutcome};
use csa_store::{AdditionalMeasureStore, Fault};

use common::*;

fn measure(title: &str) -> NewAdditionalMeasure {
    NewAdditionalMeasure {
        title: title.to_string(),
        description: None,
        attachment: Some("policy.pdf".into()),
    }
}

fn sub(s: &str) -> SubclauseId {
    SubclauseId::new(s).unwrap()
}

#[tokio::test]
async fn toggle_twice_returns_to_absent() {
    let store = store_with(quality_catalog());
    let scope = quality_scope();
    let session = reconciler(&store).open_additional(scope).await;
    let m = session.create_measure(measure("Supplier audit")).await.unwrap();
    let k = MaCellKey::new(m.id, sub("S1"));

    let first = session.toggle(k.clone()).await;
    assert_eq!(first, ToggleOutcome::Added);
    assert_eq!(
        serde_json::to_value(first).unwrap(),
        serde_json::json!({"added": true, "removed": false})
    );
    assert_eq!(session.relations(), vec![k.clone()]);

    let second = session.toggle(k).await;
    assert_eq!(
        serde_json::to_value(second).unwrap(),
        serde_json::json!({"added": false, "removed": true})
    );
    assert!(session.relations().is_empty());
    assert!(store.list_relations(&scope).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_toggle_reports_unchanged() {
    let store = store_with(quality_catalog());
    let session = reconciler(&store).open_additional(quality_scope()).await;
    let m = session.create_measure(measure("Access review")).await.unwrap();

    store.fail(Fault::Toggle);
    let outcome = session.toggle(MaCellKey::new(m.id, sub("S2"))).await;
    assert_eq!(outcome, ToggleOutcome::Unchanged);
    assert!(session.relations().is_empty());
}

#[tokio::test]
async fn delete_cascades_relations_and_assessments() {
    let store = store_with(quality_catalog());
    let scope = quality_scope();
    let reconciler = reconciler(&store);
    let session = reconciler.open_additional(scope).await;
    let m = session.create_measure(measure("Bias testing")).await.unwrap();

    for s in ["S1", "S2", "S3"] {
        let k = MaCellKey::new(m.id, sub(s));
        assert!(session.toggle(k.clone()).await.added());
        session
            .set_field(&k, FieldUpdate::Maturity(Some(MaturityLevel::L5)))
            .unwrap();
    }
    session.flush_now().await.unwrap();
    assert_eq!(session.relations_for(m.id).len(), 3);
    assert_eq!(session.assessments_for(m.id).len(), 3);

    session.delete_measure(m.id).await.unwrap();
    assert!(session.relations_for(m.id).is_empty());
    assert!(session.assessments_for(m.id).is_empty());
    assert!(store.get_measure(m.id).await.unwrap().is_none());

    let reopened = reconciler.open_additional(scope).await;
    assert!(reopened.measures().is_empty());
    assert!(reopened.relations().is_empty());
    assert!(reopened.assessments().is_empty());
}

#[tokio::test]
async fn failed_delete_keeps_local_state() {
    let store = store_with(quality_catalog());
    let session = reconciler(&store).open_additional(quality_scope()).await;
    let m = session.create_measure(measure("Incident drills")).await.unwrap();
    session.toggle(MaCellKey::new(m.id, sub("S1"))).await;

    store.fail(Fault::Delete);
    assert!(session.delete_measure(m.id).await.is_err());
    assert!(session.measure(m.id).is_some());
    assert_eq!(session.relations_for(m.id).len(), 1);
}

#[tokio::test]
async fn export_rows_cover_both_halves() {
    let store = store_with(quality_catalog());
    let scope = quality_scope();
    let requirement = reconciler(&store).open_requirement(scope, None).await;

    requirement
        .guide
        .set_field(&key("MG_01", "S1"), FieldUpdate::Maturity(Some(MaturityLevel::L2)))
        .unwrap();
    let m = requirement
        .additional
        .create_measure(measure("Model card"))
        .await
        .unwrap();
    requirement
        .additional
        .toggle(MaCellKey::new(m.id, sub("S2")))
        .await;

    let export = RequirementExport::from_session(
        &requirement,
        serde_json::json!({"system": "triage-assistant"}),
    );
    assert_eq!(export.assessments_mg.len(), 3);
    assert_eq!(export.measures_additional.len(), 1);
    assert_eq!(
        export.measures_additional[0].file_name.as_deref(),
        Some("policy.pdf")
    );
    assert_eq!(export.ma_to_subpart.len(), 1);
    assert_eq!(export.assessments_ma.len(), 1);
    assert!(export.assessments_ma[0].maturity.is_none());

    let json = serde_json::to_value(&export).unwrap();
    assert_eq!(json["requirement_code"], "QUALITY_MGMT");
    assert_eq!(json["application_info"]["system"], "triage-assistant");
    assert!(!requirement.is_complete());
}
