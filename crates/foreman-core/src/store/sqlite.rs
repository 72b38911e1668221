//! SQLite-backed entity store.
//!
//! Each entity collection is one table of JSON documents keyed by id; the
//! work-item table additionally denormalizes `collection_id` so the
//! containment query stays indexed. Per-document atomicity comes from
//! SQLite's per-statement atomicity; there are deliberately no
//! multi-document transactions, matching the [`EntityStore`] contract.
//!
//! Runtime defaults are conservative:
//! - `journal_mode = WAL` to allow concurrent readers while writers append
//! - `busy_timeout = 5s` to reduce transient lock failures under contention

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::model::collection::Collection;
use crate::model::ids::{CollectionId, PrincipalId, WorkItemId};
use crate::model::principal::Principal;
use crate::model::work_item::WorkItem;

use super::{EntityStore, StoreError};

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 1;

const MIGRATION_V1_SQL: &str = "
CREATE TABLE IF NOT EXISTS principals (
    principal_id TEXT PRIMARY KEY,
    doc TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS collections (
    collection_id TEXT PRIMARY KEY,
    doc TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS work_items (
    work_item_id TEXT PRIMARY KEY,
    collection_id TEXT NOT NULL,
    doc TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_work_items_collection
    ON work_items (collection_id);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    next_work_item_seq INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, next_work_item_seq) VALUES (1, 1);
";

const MIGRATIONS: &[(u32, &str)] = &[(1, MIGRATION_V1_SQL)];

/// Durable entity store over a single SQLite database file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store database, apply runtime pragmas, and
    /// migrate schema to the latest version.
    ///
    /// # Errors
    ///
    /// Returns an error if opening/configuring/migrating the database fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create store directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("open store database {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory store, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if configuring or migrating the database fails.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory store database")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        configure_connection(&conn).context("configure sqlite pragmas")?;
        migrate(&mut conn).context("apply store migrations")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_doc<T: serde::de::DeserializeOwned>(
        &self,
        sql: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        let conn = self.conn();
        let doc: Option<String> = conn
            .query_row(sql, params![id], |row| row.get(0))
            .optional()?;
        doc.map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StoreError::from)
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}

/// Read `PRAGMA user_version` and convert it to a Rust `u32`.
fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Integer, Box::new(error))
    })
}

/// Apply all pending migrations in ascending order.
///
/// Idempotent: each migration only runs when its version is above
/// `user_version`, and the DDL itself uses `IF NOT EXISTS`.
fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut current = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", i64::from(*version))?;
        tx.commit()?;
        current = *version;
    }

    Ok(current)
}

impl EntityStore for SqliteStore {
    fn principal(&self, id: &PrincipalId) -> Result<Option<Principal>, StoreError> {
        self.read_doc(
            "SELECT doc FROM principals WHERE principal_id = ?1",
            id.as_str(),
        )
    }

    fn put_principal(&self, principal: &Principal) -> Result<(), StoreError> {
        let doc = serde_json::to_string(principal)?;
        self.conn().execute(
            "INSERT INTO principals (principal_id, doc) VALUES (?1, ?2)
             ON CONFLICT (principal_id) DO UPDATE SET doc = excluded.doc",
            params![principal.id.as_str(), doc],
        )?;
        Ok(())
    }

    fn collection(&self, id: &CollectionId) -> Result<Option<Collection>, StoreError> {
        self.read_doc(
            "SELECT doc FROM collections WHERE collection_id = ?1",
            id.as_str(),
        )
    }

    fn put_collection(&self, collection: &Collection) -> Result<(), StoreError> {
        let doc = serde_json::to_string(collection)?;
        self.conn().execute(
            "INSERT INTO collections (collection_id, doc) VALUES (?1, ?2)
             ON CONFLICT (collection_id) DO UPDATE SET doc = excluded.doc",
            params![collection.id.as_str(), doc],
        )?;
        Ok(())
    }

    fn work_item(&self, id: &WorkItemId) -> Result<Option<WorkItem>, StoreError> {
        self.read_doc(
            "SELECT doc FROM work_items WHERE work_item_id = ?1",
            id.as_str(),
        )
    }

    fn put_work_item(&self, item: &WorkItem) -> Result<(), StoreError> {
        let doc = serde_json::to_string(item)?;
        self.conn().execute(
            "INSERT INTO work_items (work_item_id, collection_id, doc) VALUES (?1, ?2, ?3)
             ON CONFLICT (work_item_id) DO UPDATE
             SET collection_id = excluded.collection_id, doc = excluded.doc",
            params![item.id.as_str(), item.collection_id.as_str(), doc],
        )?;
        Ok(())
    }

    fn work_items_in(&self, collection_id: &CollectionId) -> Result<Vec<WorkItem>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT doc FROM work_items WHERE collection_id = ?1 ORDER BY work_item_id",
        )?;
        let rows = stmt.query_map(params![collection_id.as_str()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut items = Vec::new();
        for raw in rows {
            items.push(serde_json::from_str(&raw?)?);
        }
        Ok(items)
    }

    fn next_work_item_id(&self) -> Result<WorkItemId, StoreError> {
        let seq: i64 = self.conn().query_row(
            "UPDATE store_meta SET next_work_item_seq = next_work_item_seq + 1
             WHERE id = 1
             RETURNING next_work_item_seq - 1",
            [],
            |row| row.get(0),
        )?;
        Ok(WorkItemId::new(format!("wi-{seq}")))
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BUSY_TIMEOUT, LATEST_SCHEMA_VERSION, SqliteStore, current_schema_version};
    use crate::model::ids::{CollectionId, PrincipalId};
    use crate::model::principal::{Principal, Role};
    use crate::store::EntityStore;
    use tempfile::TempDir;

    fn temp_db_path() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("foreman.sqlite3");
        (dir, path)
    }

    #[test]
    fn open_sets_wal_and_busy_timeout_and_migrates() {
        let (_dir, path) = temp_db_path();
        let store = SqliteStore::open(&path).expect("open store db");
        let conn = store.conn();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .expect("query journal_mode");
        assert_eq!(journal_mode.to_ascii_lowercase(), "wal");

        let busy_timeout_ms: u64 = conn
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .expect("query busy_timeout");
        assert_eq!(
            u128::from(busy_timeout_ms),
            DEFAULT_BUSY_TIMEOUT.as_millis()
        );

        let version = current_schema_version(&conn).expect("schema version query");
        assert_eq!(version, LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn documents_roundtrip_through_json() {
        let store = SqliteStore::open_in_memory().expect("open in-memory store");
        let mut principal = Principal::new(PrincipalId::new("p-1"), "Sam", Role::Lead);
        principal.led_collection_ids.insert(CollectionId::new("c-1"));

        store.put_principal(&principal).expect("put principal");
        let stored = store
            .principal(&principal.id)
            .expect("read principal")
            .expect("present");
        assert_eq!(stored, principal);
    }

    #[test]
    fn put_is_an_upsert() {
        let store = SqliteStore::open_in_memory().expect("open in-memory store");
        let mut principal = Principal::new(PrincipalId::new("p-1"), "Sam", Role::Member);
        store.put_principal(&principal).expect("insert");

        principal.active = false;
        store.put_principal(&principal).expect("replace");
        let stored = store
            .principal(&principal.id)
            .expect("read")
            .expect("present");
        assert!(!stored.active);
    }

    #[test]
    fn allocated_ids_are_sequential_and_unique() {
        let store = SqliteStore::open_in_memory().expect("open in-memory store");
        let first = store.next_work_item_id().expect("first id");
        let second = store.next_work_item_id().expect("second id");
        assert_eq!(first.as_str(), "wi-1");
        assert_eq!(second.as_str(), "wi-2");
    }

    #[test]
    fn reopening_a_file_store_preserves_documents() {
        let (_dir, path) = temp_db_path();
        {
            let store = SqliteStore::open(&path).expect("open");
            let principal = Principal::new(PrincipalId::new("p-1"), "Sam", Role::Member);
            store.put_principal(&principal).expect("put");
        }

        let reopened = SqliteStore::open(&path).expect("reopen");
        assert!(
            reopened
                .principal(&PrincipalId::new("p-1"))
                .expect("read")
                .is_some()
        );
    }
}
