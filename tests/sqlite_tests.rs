mod support;

use std::time::Duration;

use stowage::application::storage::Storage;
use stowage::domain::StorageKind;
use stowage::error::{Error, StoreError};
use stowage::port::outbound::store::{AllocationStore, PresenceStore, ResourceStore};
use stowage::testkit;
use support::db::TempDb;

#[tokio::test]
async fn failing_resource_step_rolls_back_presence_deletes() {
    let db = TempDb::create();
    let backend = db.storage();
    let storage = Storage::from_backend(backend.clone());
    let a = testkit::domain::seed(&*backend, "node-a", 2, 1).await.unwrap();

    db.execute(
        "CREATE TRIGGER block_resource_delete BEFORE DELETE ON resources \
         BEGIN SELECT RAISE(ABORT, 'resources are locked'); END;",
    );

    let err = storage.unregister_allocation(&a.id).await.unwrap_err();
    match err {
        Error::Store {
            operation: "unregister_allocation",
            source: StoreError::Database(message),
            ..
        } => assert!(message.contains("resources are locked"), "{message}"),
        other => panic!("expected database error, got {other}"),
    }

    assert!(storage.fetch_allocations().await.unwrap().contains(&a.id));
    assert_eq!(
        storage.fetch_allocation_presences(&a.id).await.unwrap().len(),
        a.presences.len()
    );
    assert_eq!(
        storage.fetch_allocation_resources(&a.id).await.unwrap().len(),
        a.resources.len()
    );

    db.execute("DROP TRIGGER block_resource_delete;");
    storage.unregister_allocation(&a.id).await.unwrap();
    assert!(storage.fetch_allocations().await.unwrap().is_empty());
}

#[tokio::test]
async fn dropped_unregister_is_all_or_nothing() {
    let db = TempDb::create();
    let backend = db.storage();
    let storage = Storage::from_backend(backend.clone());
    let a = testkit::domain::seed(&*backend, "node-a", 5, 5).await.unwrap();

    // A zero deadline drops the operation right after it starts; the
    // blocking transaction either committed already or rolls back.
    let _ = tokio::time::timeout(Duration::ZERO, storage.unregister_allocation(&a.id)).await;
    // Let the blocking task finish.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let present = storage.fetch_allocations().await.unwrap().contains(&a.id);
    let presences = storage.fetch_allocation_presences(&a.id).await.unwrap().len();
    let resources = storage.fetch_allocation_resources(&a.id).await.unwrap().len();
    if present {
        assert_eq!((presences, resources), (5, 5));
    } else {
        assert_eq!((presences, resources), (0, 0));
    }
}

#[tokio::test]
async fn fetch_allocations_is_distinct_and_sorted() {
    let db = TempDb::create();
    let storage = Storage::from_backend(db.storage());
    for id in ["node-c", "node-a", "node-b", "node-a", "node-c"] {
        storage
            .register_allocation(&testkit::domain::allocation(id))
            .await
            .unwrap();
    }

    let ids: Vec<String> = storage
        .fetch_allocations()
        .await
        .unwrap()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ids, ["node-a", "node-b", "node-c"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_register_and_unregister_leave_no_orphans() {
    let db = TempDb::create();
    let backend = db.storage();
    let storage = Storage::from_backend(backend.clone());
    let seeded = testkit::domain::seed(&*backend, "node-a", 3, 2).await.unwrap();
    let id = seeded.id.clone();

    let mut tasks = Vec::new();
    for n in 0..10 {
        let storage = storage.clone();
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            if n % 2 == 0 {
                storage.register_allocation(&id).await
            } else {
                storage.unregister_allocation(&id).await
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let allocations = storage.fetch_allocations().await.unwrap();
    assert!(allocations.len() <= 1);
    let presences = storage.fetch_allocation_presences(&id).await.unwrap().len();
    let resources = storage.fetch_allocation_resources(&id).await.unwrap().len();
    match storage.fetch_allocation(&id).await.unwrap() {
        Some(allocation) => {
            assert!(allocation.updated_at >= allocation.created_at);
            // Either no cascade ran or owned state was removed as a whole.
            assert!(
                (presences, resources) == (3, 2) || (presences, resources) == (0, 0),
                "partial owned state: {presences} presences, {resources} resources"
            );
        }
        None => assert_eq!((presences, resources), (0, 0)),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_half_removed_allocation() {
    let db = TempDb::create();
    let backend = db.storage();
    let storage = Storage::from_backend(backend.clone());

    for round in 0..20 {
        let seeded = testkit::domain::seed(&*backend, &format!("node-{round}"), 3, 2)
            .await
            .unwrap();

        let reader = {
            let storage = storage.clone();
            let id = seeded.id.clone();
            tokio::spawn(async move {
                for _ in 0..20 {
                    let present = storage.fetch_allocations().await.unwrap().contains(&id);
                    let presences = storage.fetch_allocation_presences(&id).await.unwrap().len();
                    let resources = storage.fetch_allocation_resources(&id).await.unwrap().len();
                    if !present {
                        assert_eq!((presences, resources), (0, 0));
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        storage.unregister_allocation(&seeded.id).await.unwrap();
        reader.await.unwrap();
        assert!(storage.fetch_allocation_presences(&seeded.id).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn sqlite_facade_reports_local_only() {
    let db = TempDb::create();
    let storage = Storage::from_backend(db.storage());
    assert_eq!(storage.kind(), StorageKind::Sqlite);
    assert!(!storage.is_cluster_compatible());
}

#[tokio::test]
async fn facade_initializes_from_sqlite_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = testkit::config::sqlite(&dir.path().join("init.db"));

    let storage = Storage::initialize(&config).await.unwrap();
    let user = testkit::domain::user("alice");
    let id = testkit::domain::allocation("node-a");
    storage.register_allocation(&id).await.unwrap();
    storage
        .upsert_presence(&testkit::domain::presence(&user.username, "desk", &id))
        .await
        .unwrap();
    storage.shutdown().await.unwrap();

    // State survives reopening the file.
    let reopened = Storage::initialize(&config).await.unwrap();
    assert!(reopened.fetch_allocations().await.unwrap().contains(&id));
    assert!(reopened
        .fetch_presence("alice", "desk")
        .await
        .unwrap()
        .is_some());
    reopened.shutdown().await.unwrap();
}
