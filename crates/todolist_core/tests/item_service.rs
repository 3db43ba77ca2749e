use std::collections::BTreeMap;
use std::sync::Mutex;
use todolist_core::{
    Item, ItemId, ItemService, ItemStorage, RepoError, RepoResult, SqliteItemStore,
};

/// Map-backed storage proving the service only depends on the trait.
#[derive(Default)]
struct MapStorage {
    items: Mutex<BTreeMap<ItemId, Item>>,
}

impl ItemStorage for MapStorage {
    fn get_by_id(&self, id: ItemId) -> RepoResult<Option<Item>> {
        Ok(self.items.lock().unwrap().get(&id).cloned())
    }

    fn merge(&self, item: &Item) -> RepoResult<Item> {
        let mut items = self.items.lock().unwrap();
        let id = match item.id {
            Some(id) if items.contains_key(&id) => id,
            _ => items.keys().next_back().map_or(1, |last| last + 1),
        };
        let stored = Item {
            id: Some(id),
            ..item.clone()
        };
        items.insert(id, stored.clone());
        Ok(stored)
    }

    fn update(&self, item: &Item) -> RepoResult<Item> {
        let id = item.id.ok_or(RepoError::MissingId)?;
        let mut items = self.items.lock().unwrap();
        match items.get_mut(&id) {
            Some(stored) => {
                *stored = item.clone();
                Ok(item.clone())
            }
            None => Err(RepoError::NotFound(id)),
        }
    }

    fn get_all(&self) -> RepoResult<Vec<Item>> {
        Ok(self.items.lock().unwrap().values().cloned().collect())
    }

    fn close(&self) {}
}

/// SQLite storage that clears the table right after every lookup, so the
/// row disappears between the service's read and its write.
struct ClearAfterRead<'a> {
    store: &'a SqliteItemStore,
}

impl ItemStorage for ClearAfterRead<'_> {
    fn get_by_id(&self, id: ItemId) -> RepoResult<Option<Item>> {
        let found = self.store.get_by_id(id)?;
        self.store.clear()?;
        Ok(found)
    }

    fn merge(&self, item: &Item) -> RepoResult<Item> {
        self.store.merge(item)
    }

    fn update(&self, item: &Item) -> RepoResult<Item> {
        self.store.update(item)
    }

    fn get_all(&self) -> RepoResult<Vec<Item>> {
        self.store.get_all()
    }

    fn close(&self) {
        self.store.close();
    }
}

#[test]
fn add_complete_and_list_items() {
    let store = SqliteItemStore::open_in_memory().unwrap();
    let service = ItemService::new(&store);

    let milk = service.add_item("buy milk").unwrap();
    let bread = service.add_item("buy bread").unwrap();
    assert!(!milk.done);

    let done = service.set_done(milk.id.unwrap(), true).unwrap();
    assert!(done.done);

    let open_items = service.list_items(false).unwrap();
    assert_eq!(open_items, vec![bread]);
    assert_eq!(service.list_items(true).unwrap().len(), 2);
    assert_eq!(store.get_all().unwrap().len(), 2);
}

#[test]
fn rename_replaces_description_only() {
    let store = SqliteItemStore::open_in_memory().unwrap();
    let service = ItemService::new(&store);

    let item = service.add_item("draft").unwrap();
    let renamed = service.rename_item(item.id.unwrap(), "final").unwrap();

    assert_eq!(renamed.id, item.id);
    assert_eq!(renamed.description, "final");
    assert_eq!(renamed.created_at, item.created_at);
    assert_eq!(service.get_item(item.id.unwrap()).unwrap(), Some(renamed));
}

#[test]
fn updates_on_unknown_ids_return_not_found() {
    let store = SqliteItemStore::open_in_memory().unwrap();
    let service = ItemService::new(&store);

    let err = service.set_done(99, true).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(99)));
    let err = service.rename_item(99, "ghost").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(99)));
    assert!(store.get_all().unwrap().is_empty());
}

#[test]
fn service_runs_on_any_storage_backend() {
    let service = ItemService::new(MapStorage::default());

    let item = service.add_item("from map").unwrap();
    service.set_done(item.id.unwrap(), true).unwrap();

    assert!(service.list_items(false).unwrap().is_empty());
    assert!(service.storage().get(&item).unwrap().unwrap().done);
}

#[test]
fn item_deleted_between_read_and_write_is_not_resurrected() {
    let store = SqliteItemStore::open_in_memory().unwrap();
    let item = store.merge(&Item::with_created_at("x", 1)).unwrap();
    let id = item.id.unwrap();
    let service = ItemService::new(ClearAfterRead { store: &store });

    let err = service.set_done(id, true).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
    assert!(store.get_all().unwrap().is_empty());

    let restored = store.merge(&item).unwrap();
    let err = service.rename_item(restored.id.unwrap(), "renamed").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
    assert!(store.get_all().unwrap().is_empty());
}
