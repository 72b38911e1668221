//! In-memory entity store.
//!
//! Mutex-guarded maps with clone-on-read semantics, so a handed-out entity
//! is a snapshot, not a live reference. Used by tests and by callers that
//! want a throwaway store; durability comes from [`SqliteStore`](super::SqliteStore).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::model::collection::Collection;
use crate::model::ids::{CollectionId, PrincipalId, WorkItemId};
use crate::model::principal::Principal;
use crate::model::work_item::WorkItem;

use super::{EntityStore, StoreError};

/// Volatile store backed by three in-process maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    principals: Mutex<HashMap<PrincipalId, Principal>>,
    collections: Mutex<HashMap<CollectionId, Collection>>,
    work_items: Mutex<HashMap<WorkItemId, WorkItem>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Documents are cloned in and out, so a poisoned map is still coherent.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EntityStore for MemoryStore {
    fn principal(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError> {
        Ok(lock(&self.principals).get(id).cloned())
    }

    fn put_principal(&self, principal: &Principal) -> Result<(), StoreError> {
        lock(&self.principals).insert(principal.id.clone(), principal.clone());
        Ok(())
    }

    fn collection(&self, id: &CollectionId) -> Result<Option<Collection>, StoreError> {
        Ok(lock(&self.collections).get(id).cloned())
    }

    fn put_collection(&self, collection: &Collection) -> Result<(), StoreError> {
        lock(&self.collections).insert(collection.id.clone(), collection.clone());
        Ok(())
    }

    fn work_item(&self, id: &WorkItemId) -> Result<Option<WorkItem>, StoreError> {
        Ok(lock(&self.work_items).get(id).cloned())
    }

    fn put_work_item(&self, item: &WorkItem) -> Result<(), StoreError> {
        lock(&self.work_items).insert(item.id.clone(), item.clone());
        Ok(())
    }

    fn work_items_in(&self, collection_id: &CollectionId) -> Result<Vec<WorkItem>, StoreError> {
        let mut items: Vec<WorkItem> = lock(&self.work_items)
            .values()
            .filter(|item| item.collection_id == *collection_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    fn next_work_item_id(&self) -> Result<WorkItemId, StoreError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(WorkItemId::new(format!("wi-{n}")))
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::model::collection::Collection;
    use crate::model::ids::{CollectionId, PrincipalId};
    use crate::model::principal::{Principal, Role};
    use crate::model::work_item::{Priority, Status, WorkItem};
    use crate::store::EntityStore;
    use chrono::Utc;

    fn item(store: &MemoryStore, collection: &str) -> WorkItem {
        let now = Utc::now();
        WorkItem {
            id: store.next_work_item_id().expect("allocate id"),
            collection_id: CollectionId::new(collection),
            assignee_id: PrincipalId::new("p-1"),
            creator_id: PrincipalId::new("p-1"),
            title: "task".to_string(),
            description: None,
            status: Status::Pending,
            priority: Priority::Normal,
            due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn put_then_get_returns_the_document() {
        let store = MemoryStore::new();
        let principal = Principal::new(PrincipalId::new("p-1"), "Sam", Role::Member);
        store.put_principal(&principal).unwrap();
        assert_eq!(store.principal(&principal.id).unwrap(), Some(principal));

        assert!(store.principal(&PrincipalId::new("missing")).unwrap().is_none());
    }

    #[test]
    fn put_replaces_the_whole_document() {
        let store = MemoryStore::new();
        let mut collection =
            Collection::new(CollectionId::new("c-1"), "Launch", PrincipalId::new("p-1"));
        store.put_collection(&collection).unwrap();

        collection.progress = 50;
        store.put_collection(&collection).unwrap();
        let stored = store.collection(&collection.id).unwrap().expect("stored");
        assert_eq!(stored.progress, 50);
    }

    #[test]
    fn containment_query_filters_by_collection() {
        let store = MemoryStore::new();
        let a = item(&store, "c-a");
        let b = item(&store, "c-b");
        store.put_work_item(&a).unwrap();
        store.put_work_item(&b).unwrap();

        let found = store.work_items_in(&CollectionId::new("c-a")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);
    }

    #[test]
    fn allocated_ids_are_unique() {
        let store = MemoryStore::new();
        let first = store.next_work_item_id().unwrap();
        let second = store.next_work_item_id().unwrap();
        assert_ne!(first, second);
    }
}
