//! SQLite storage implementation

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;

use super::registry::SchemaRegistry;
use super::schema;
use super::table::TableSchemaManager;
use crate::object::ObjectType;
use crate::{Error, Result};

/// Default time a writer waits on another connection's lock
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Connection tuning
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub busy_timeout_ms: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

struct Inner {
    conn: Connection,
    tables: TableSchemaManager,
}

/// SQLite-backed object store.
///
/// One connection and its column cache live behind a mutex, so a store can be
/// shared across threads through an `Arc`. Separate stores (or processes) on
/// the same file are serialized by SQLite's write lock.
pub struct SqliteStore {
    inner: Mutex<Inner>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &StoreOptions::default())
    }

    pub fn open_with(path: &Path, options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys=ON;", [])?;
        let store = Self {
            inner: Mutex::new(Inner {
                conn,
                tables: TableSchemaManager::new(),
            }),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the fixed directory tables
    fn initialize_schema(&self) -> Result<()> {
        self.with_conn(|conn, _| {
            for stmt in schema::all_schema_statements() {
                conn.execute_batch(stmt)?;
            }
            Ok(())
        })
    }

    /// Run `f` with exclusive use of the connection and the table manager
    pub fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection, &mut TableSchemaManager) -> Result<R>,
    {
        let mut guard = self.inner.lock().map_err(|_| Error::Poisoned)?;
        let Inner { conn, tables } = &mut *guard;
        f(conn, tables)
    }

    /// All registered object types
    pub fn list_types(&self) -> Result<Vec<ObjectType>> {
        self.with_conn(|conn, _| SchemaRegistry::list(conn))
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        self.with_conn(|conn, _| {
            let count = |sql: &str| -> Result<usize> {
                let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
                Ok(n as usize)
            };
            Ok(DbStats {
                types: count("SELECT COUNT(*) FROM dynamic_object_types")?,
                objects: count("SELECT COUNT(*) FROM dynamic_objects WHERE is_deleted = 0")?,
                masters: count(
                    "SELECT COUNT(*) FROM dynamic_objects WHERE is_deleted = 0 AND master_object_id IS NULL",
                )?,
                deleted: count("SELECT COUNT(*) FROM dynamic_objects WHERE is_deleted = 1")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub types: usize,
    pub objects: usize,
    pub masters: usize,
    pub deleted: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Types: {}", self.types)?;
        writeln!(f, "  Live objects: {}", self.objects)?;
        writeln!(f, "  Masters: {}", self.masters)?;
        writeln!(f, "  Deleted: {}", self.deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_creates_directory_tables() {
        let store = SqliteStore::open_in_memory().unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(
            stats,
            DbStats {
                types: 0,
                objects: 0,
                masters: 0,
                deleted: 0
            }
        );
        assert!(store.list_types().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_file_keeps_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .with_conn(|conn, _| SchemaRegistry::resolve_or_create(conn, "Customer"))
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let types = store.list_types().unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "Customer");
    }
}
