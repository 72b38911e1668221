//! Entity store abstraction.
//!
//! The backing store is document-oriented with per-document atomicity only:
//! each `put_*` replaces one document atomically, and there is no
//! multi-document transaction. Cross-document invariants are the operation
//! modules' problem, maintained by write ordering and re-derivation, never
//! by the store.
//!
//! Referential integrity is likewise not the store's concern: a work item
//! may reference a principal that was deleted out from under it, and reads
//! simply return `None` for the missing document.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::model::collection::Collection;
use crate::model::ids::{CollectionId, PrincipalId, WorkItemId};
use crate::model::principal::Principal;
use crate::model::work_item::WorkItem;

/// Error raised by an entity store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document codec: {0}")]
    Codec(#[from] serde_json::Error),

    /// Backend temporarily unable to serve the request.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// A typed document store holding the three entity collections.
///
/// Implementations take `&self`; interior synchronization is the backend's
/// responsibility. Every method maps to at most one document read or one
/// document write, except [`work_items_in`](Self::work_items_in), which is
/// the store's single containment query.
pub trait EntityStore {
    /// # Errors
    /// Returns an error if the backend read fails.
    fn principal(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError>;

    /// Insert or replace one principal document.
    ///
    /// # Errors
    /// Returns an error if the backend write fails.
    fn put_principal(&self, principal: &Principal) -> Result<(), StoreError>;

    /// # Errors
    /// Returns an error if the backend read fails.
    fn collection(&self, id: &CollectionId) -> Result<Option<Collection>, StoreError>;

    /// Insert or replace one collection document.
    ///
    /// # Errors
    /// Returns an error if the backend write fails.
    fn put_collection(&self, collection: &Collection) -> Result<(), StoreError>;

    /// # Errors
    /// Returns an error if the backend read fails.
    fn work_item(&self, id: &WorkItemId) -> Result<Option<WorkItem>, StoreError>;

    /// Insert or replace one work-item document.
    ///
    /// # Errors
    /// Returns an error if the backend write fails.
    fn put_work_item(&self, item: &WorkItem) -> Result<(), StoreError>;

    /// All work items whose `collection_id` matches, in unspecified order.
    ///
    /// # Errors
    /// Returns an error if the backend query fails.
    fn work_items_in(&self, collection_id: &CollectionId) -> Result<Vec<WorkItem>, StoreError>;

    /// Allocate a fresh work-item identifier.
    ///
    /// Document stores assign ids; the core never invents them. Allocated
    /// ids are unique for the lifetime of the store.
    ///
    /// # Errors
    /// Returns an error if the backend cannot allocate.
    fn next_work_item_id(&self) -> Result<WorkItemId, StoreError>;
}
