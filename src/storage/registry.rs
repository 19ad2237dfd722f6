//! Type directory: one durable identity per type name

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::object::ObjectType;
use crate::{Error, Result};

/// Maps type names to [`ObjectType`] identities, creating them on first use.
pub struct SchemaRegistry;

impl SchemaRegistry {
    /// Look up a type by exact (case-sensitive) name
    pub fn find(conn: &Connection, name: &str) -> Result<Option<ObjectType>> {
        conn.query_row(
            "SELECT id, name, created_at FROM dynamic_object_types WHERE name = ?1 COLLATE BINARY",
            [name],
            Self::row_to_type,
        )
        .optional()
        .map_err(Into::into)
    }

    /// All known types, oldest first
    pub fn list(conn: &Connection) -> Result<Vec<ObjectType>> {
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM dynamic_object_types ORDER BY id")?;
        let types = stmt
            .query_map([], Self::row_to_type)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(types)
    }

    /// Resolve `name` to its type identity, registering it if unseen.
    ///
    /// Returns `(type, is_new)`. Registration commits on its own, so a type
    /// stays registered even if the data write that discovered it fails.
    /// Concurrent first callers converge on one row through the unique
    /// constraint: the loser's insert is a no-op and it reads the winner's row.
    pub fn resolve_or_create(conn: &mut Connection, name: &str) -> Result<(ObjectType, bool)> {
        if let Some(existing) = Self::find(conn, name)? {
            return Ok((existing, false));
        }

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // An index, view or trigger of the same name would block the table
        let taken_by: Option<String> = tx
            .query_row(
                "SELECT type FROM sqlite_schema WHERE name = ?1 COLLATE NOCASE AND type <> 'table'",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(kind) = taken_by {
            return Err(Error::schema(name, format!("name is taken by an existing {}", kind)));
        }

        let inserted = tx.execute(
            "INSERT INTO dynamic_object_types (name, created_at) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            params![name, Utc::now()],
        )?;

        let Some(object_type) = Self::find(&tx, name)? else {
            // The unique index ignores case; another spelling owns the table name
            let other: String = tx.query_row(
                "SELECT name FROM dynamic_object_types WHERE name = ?1",
                [name],
                |row| row.get(0),
            )?;
            return Err(Error::schema(
                name,
                format!("type name collides with existing type '{}'", other),
            ));
        };
        tx.commit()?;

        let is_new = inserted == 1;
        if is_new {
            tracing::info!("Registered object type '{}' (id {})", object_type.name, object_type.id);
        }
        Ok((object_type, is_new))
    }

    fn row_to_type(row: &rusqlite::Row) -> rusqlite::Result<ObjectType> {
        Ok(ObjectType {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[test]
    fn test_resolve_creates_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .with_conn(|conn, _| {
                let (first, new_first) = SchemaRegistry::resolve_or_create(conn, "Order")?;
                let (second, new_second) = SchemaRegistry::resolve_or_create(conn, "Order")?;
                assert!(new_first);
                assert!(!new_second);
                assert_eq!(first, second);
                assert_eq!(SchemaRegistry::list(conn)?.len(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .with_conn(|conn, _| {
                SchemaRegistry::resolve_or_create(conn, "Order")?;
                assert!(SchemaRegistry::find(conn, "Order")?.is_some());
                assert!(SchemaRegistry::find(conn, "order")?.is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_name_of_schema_object_is_refused() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .with_conn(|conn, _| {
                conn.execute_batch("CREATE VIEW Summary AS SELECT 1")?;
                SchemaRegistry::resolve_or_create(conn, "summary")
            })
            .unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::SchemaEvolution);
        assert!(err.to_string().contains("view"));
        assert!(store.list_types().unwrap().is_empty());
    }

    #[test]
    fn test_case_variant_collides() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .with_conn(|conn, _| {
                SchemaRegistry::resolve_or_create(conn, "Order")?;
                SchemaRegistry::resolve_or_create(conn, "ORDER")
            })
            .unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::SchemaEvolution);
        assert!(err.to_string().contains("'Order'"));
    }
}
