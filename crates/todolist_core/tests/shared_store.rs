use std::sync::{Arc, Barrier};
use std::thread;
use todolist_core::{
    init_shared_store, shared_store, DatabaseConfig, Item, ItemStorage, SharedStoreError,
};

// One test per binary: the shared store lives for the whole process.
#[test]
fn concurrent_first_access_builds_one_store() {
    assert!(shared_store().is_none());

    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::file(dir.path().join("shared.sqlite3"));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let config = config.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                init_shared_store(&config).unwrap()
            })
        })
        .collect();
    let stores: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    let first = &stores[0];
    assert!(stores.iter().all(|store| Arc::ptr_eq(store, first)));
    assert!(Arc::ptr_eq(&shared_store().unwrap(), first));

    let item = first.merge(&Item::new("shared")).unwrap();
    assert_eq!(shared_store().unwrap().get(&item).unwrap(), Some(item));

    let same_via_dot = DatabaseConfig::file(dir.path().join(".").join("shared.sqlite3"));
    assert!(Arc::ptr_eq(&init_shared_store(&same_via_dot).unwrap(), first));

    let other = DatabaseConfig::file(dir.path().join("other.sqlite3"));
    let err = init_shared_store(&other).unwrap_err();
    assert!(matches!(err, SharedStoreError::Conflict { .. }));

    first.close();
    assert!(shared_store().unwrap().is_closed());
}
