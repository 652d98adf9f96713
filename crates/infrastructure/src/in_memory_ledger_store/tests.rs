use std::path::PathBuf;
use std::sync::Arc;

use medconsent_application::{
    LedgerStore, PermissionGrantInput, PermissionService, StateQueryIterator,
};
use medconsent_core::AppError;

use super::{InMemoryLedgerStore, LedgerSnapshot};

fn snapshot_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "medconsent-{name}-{}-snapshot.json",
        std::process::id()
    ))
}

async fn seeded_store() -> InMemoryLedgerStore {
    let store = InMemoryLedgerStore::new();
    for (key, value) in [
        ("\u{0}permissionId\u{0}D1\u{0}labs\u{0}P1\u{0}", vec![0x00]),
        ("\u{0}permissionId\u{0}D1\u{0}imaging\u{0}P2\u{0}", vec![0x00]),
        ("\u{0}permissionId\u{0}D10\u{0}labs\u{0}P1\u{0}", vec![0x00]),
        ("\u{0}patientPermissionId\u{0}P1\u{0}labs\u{0}D1\u{0}", vec![0x00]),
        ("D1labsP1", b"{}".to_vec()),
    ] {
        let stored = store.put_state(key, value).await;
        assert!(stored.is_ok());
    }
    store
}

async fn drain(store: &InMemoryLedgerStore, namespace: &str, components: &[&str]) -> Vec<String> {
    let mut iterator = store
        .get_state_by_partial_composite_key(namespace, components)
        .await
        .unwrap_or_else(|_| unreachable!());
    let mut keys = Vec::new();
    while iterator.has_next().await {
        let entry = iterator.next().await.unwrap_or_else(|_| unreachable!());
        keys.push(entry.key);
    }
    assert!(iterator.close().is_ok());
    keys
}

#[tokio::test]
async fn get_put_delete_single_keys() {
    let store = InMemoryLedgerStore::new();

    assert_eq!(store.get_state("k").await.unwrap_or_default(), None);
    assert!(store.put_state("k", b"v".to_vec()).await.is_ok());
    assert_eq!(
        store.get_state("k").await.unwrap_or_default(),
        Some(b"v".to_vec())
    );
    assert!(store.del_state("k").await.is_ok());
    assert_eq!(store.get_state("k").await.unwrap_or_default(), None);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn empty_keys_are_rejected() {
    let store = InMemoryLedgerStore::new();

    let stored = store.put_state("", b"v".to_vec()).await;
    assert!(matches!(stored, Err(AppError::Store(_))));
}

#[tokio::test]
async fn plain_keys_cannot_start_with_the_separator() {
    let store = InMemoryLedgerStore::new();

    let stored = store.put_state("\u{0}permissionId", vec![0x00]).await;
    assert!(matches!(stored, Err(AppError::Store(_))));
    let deleted = store.del_state("\u{0}").await;
    assert!(matches!(deleted, Err(AppError::Store(_))));
    assert!(store.is_empty().await);

    let composite = store
        .create_composite_key("permissionId", &["D1", "labs", "P1"])
        .unwrap_or_default();
    assert!(store.put_state(&composite, vec![0x00]).await.is_ok());
    assert!(store.del_state(&composite).await.is_ok());
}

#[tokio::test]
async fn partial_key_query_matches_whole_components_in_order() {
    let store = seeded_store().await;

    let keys = drain(&store, "permissionId", &["D1"]).await;
    assert_eq!(
        keys,
        vec![
            "\u{0}permissionId\u{0}D1\u{0}imaging\u{0}P2\u{0}".to_owned(),
            "\u{0}permissionId\u{0}D1\u{0}labs\u{0}P1\u{0}".to_owned(),
        ]
    );
}

#[tokio::test]
async fn empty_prefix_scans_the_whole_namespace() {
    let store = seeded_store().await;

    assert_eq!(drain(&store, "permissionId", &[]).await.len(), 3);
    assert_eq!(drain(&store, "patientPermissionId", &[]).await.len(), 1);
}

#[tokio::test]
async fn closed_iterator_yields_nothing() {
    let store = seeded_store().await;
    let mut iterator = store
        .get_state_by_partial_composite_key("permissionId", &["D1"])
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(iterator.close().is_ok());
    assert!(!iterator.has_next().await);
    assert!(iterator.next().await.is_err());
}

#[tokio::test]
async fn query_rejects_invalid_namespace() {
    let store = InMemoryLedgerStore::new();

    let opened = store.get_state_by_partial_composite_key("", &["D1"]).await;
    assert!(matches!(opened, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn snapshot_restores_every_entry() {
    let store = seeded_store().await;

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.len(), 5);

    let restored = InMemoryLedgerStore::from_snapshot(snapshot.clone())
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(restored.snapshot().await, snapshot);
    assert_eq!(
        restored
            .get_state("\u{0}permissionId\u{0}D1\u{0}labs\u{0}P1\u{0}")
            .await
            .unwrap_or_default(),
        Some(vec![0x00])
    );
}

#[tokio::test]
async fn snapshot_with_invalid_base64_is_rejected() {
    let snapshot: LedgerSnapshot =
        serde_json::from_str(r#"{"entries":{"D1labsP1":"***"}}"#).unwrap_or_default();
    assert!(!snapshot.is_empty());

    let restored = InMemoryLedgerStore::from_snapshot(snapshot);
    assert!(matches!(restored, Err(AppError::Serialization(_))));
}

#[tokio::test]
async fn missing_snapshot_file_loads_empty_store() {
    let path = snapshot_path("missing");
    let _ = tokio::fs::remove_file(&path).await;

    let store = InMemoryLedgerStore::load_from_file(&path).await;
    assert!(store.is_ok());
    assert!(store.unwrap_or_default().is_empty().await);
}

#[tokio::test]
async fn service_state_survives_a_file_roundtrip() {
    let path = snapshot_path("roundtrip");
    let store = Arc::new(InMemoryLedgerStore::new());
    let service = PermissionService::new(store.clone());
    let created = service
        .create_permission(PermissionGrantInput {
            doctor_id: "D1".to_owned(),
            data_category: "labs".to_owned(),
            patient_id: "P1".to_owned(),
            right: "read".to_owned(),
            from: "2024-01-01".to_owned(),
            to: "2024-12-31".to_owned(),
        })
        .await;
    assert!(created.is_ok());
    assert!(store.save_to_file(&path).await.is_ok());

    let reloaded = Arc::new(
        InMemoryLedgerStore::load_from_file(&path)
            .await
            .unwrap_or_default(),
    );
    let _ = tokio::fs::remove_file(&path).await;
    let reloaded_service = PermissionService::new(reloaded);

    let listed = reloaded_service
        .list_patient_permissions("P1")
        .await
        .unwrap_or_default();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].permission_id(), "D1labsP1");
    assert_eq!(listed[0].right(), "read");
}
