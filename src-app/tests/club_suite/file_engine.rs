// FICHIER : src-app/tests/club_suite/file_engine.rs

use clubhouse::store::file::{FileStore, FileStoreConfig};
use clubhouse::store::seed::seed_sample_data;
use clubhouse::store::{into_document, DocumentStore, Filter, COLLECTIONS, FACILITIES};
use clubhouse::utils::json::json;
use clubhouse::utils::AppError;

#[tokio::test]
async fn test_seeded_base_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = FileStoreConfig::new(dir.path(), "club_booking_db");

    {
        let store = FileStore::create(config.clone()).await.unwrap();
        let report = seed_sample_data(&store).await.unwrap();
        assert_eq!(report.total_inserted(), 5);
        store
            .insert(
                FACILITIES,
                into_document(json!({"name": "Court", "status": "available"})).unwrap(),
            )
            .await
            .unwrap();
    }

    let store = FileStore::open(config).await.unwrap();
    let names = store.list_collections().await.unwrap();
    for c in COLLECTIONS {
        assert!(names.contains(c), "collection manquante : {}", c);
    }
    let facilities = store.find(FACILITIES, &Filter::all(), None).await.unwrap();
    let order: Vec<_> = facilities.iter().map(|f| f["name"].clone()).collect();
    assert_eq!(order, [json!("Gym A"), json!("Pool 1"), json!("Court")]);

    // Second amorçage : rien de nouveau
    assert_eq!(seed_sample_data(&store).await.unwrap().total_inserted(), 0);
}

#[tokio::test]
async fn test_missing_root_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let config = FileStoreConfig::new(dir.path().join("absent"), "club_booking_db");
    assert!(matches!(
        FileStore::open(config).await,
        Err(AppError::Connection(_))
    ));
}

#[tokio::test]
async fn test_filter_json_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::create(FileStoreConfig::new(dir.path(), "db"))
        .await
        .unwrap();
    seed_sample_data(&store).await.unwrap();

    let filter = Filter::parse(&json!({"status": {"$in": ["available", "closed"]}})).unwrap();
    let found = store.find(FACILITIES, &filter, None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Gym A");

    let by_staff = Filter::parse(&json!({"assignedStaff.0.role": "lifeguard"})).unwrap();
    assert_eq!(store.count(FACILITIES, &by_staff).await.unwrap(), 1);

    assert!(matches!(
        Filter::parse(&json!({"status": {"$regex": "a"}})),
        Err(AppError::Validation(_))
    ));
}
