//! Per-type tables, created and widened on write
//!
//! Each type's table starts as `("Id" INTEGER PRIMARY KEY)` and gains the
//! linkage column plus one column per field name the first time that name is
//! written. Field columns carry no declared type, so they hold text of any
//! length and keep integers as integers. Columns are never dropped or retyped.

use std::collections::{HashMap, HashSet};

use rusqlite::{Connection, TransactionBehavior};

use super::schema::{quote_ident, ID_COLUMN, LINK_COLUMN};
use crate::{Error, Result};

/// Keeps per-type storage in step with the field names being written.
///
/// Remembers the columns it has already seen per table so repeated writes of
/// a known shape skip the catalog lookups. Columns only ever get added, so a
/// cached "exists" never goes stale.
#[derive(Debug, Default)]
pub struct TableSchemaManager {
    known: HashMap<String, HashSet<String>>,
}

impl TableSchemaManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the table for `type_name` exists with `link_column` and a
    /// column for every name in `field_names`.
    ///
    /// Idempotent and safe to race: checks and alterations run inside one
    /// IMMEDIATE transaction, and a duplicate-column error from a writer that
    /// got there first is treated as success.
    pub fn ensure_storage<'a, I>(
        &mut self,
        conn: &mut Connection,
        type_name: &str,
        field_names: I,
        link_column: &str,
    ) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let key = type_name.to_lowercase();
        let wanted: Vec<&str> = field_names.into_iter().collect();

        if let Some(columns) = self.known.get(&key) {
            let covered = columns.contains(&link_column.to_lowercase())
                && wanted.iter().all(|f| columns.contains(&f.to_lowercase()));
            if covered {
                return Ok(());
            }
        }

        let columns = Self::evolve(conn, type_name, &wanted, link_column).map_err(|e| match e {
            Error::Storage(err) => Error::schema(type_name, err),
            other => other,
        })?;
        self.known.insert(key, columns);
        Ok(())
    }

    fn evolve(
        conn: &mut Connection,
        type_name: &str,
        wanted: &[&str],
        link_column: &str,
    ) -> Result<HashSet<String>> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let table = quote_ident(type_name);

        let mut existing: HashSet<String> = Self::column_names(&tx, type_name)?
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect();

        if existing.is_empty() {
            tx.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY REFERENCES dynamic_objects(id))",
                    table,
                    quote_ident(ID_COLUMN)
                ),
                [],
            )?;
            tracing::info!("Created storage for type '{}'", type_name);
            existing.insert(ID_COLUMN.to_lowercase());
        }

        let mut added = Vec::new();
        for column in std::iter::once(link_column).chain(wanted.iter().copied()) {
            let lower = column.to_lowercase();
            if existing.contains(&lower) {
                continue;
            }

            let declared = if column == link_column { " INTEGER" } else { "" };
            let sql = format!("ALTER TABLE {} ADD COLUMN {}{}", table, quote_ident(column), declared);
            match tx.execute(&sql, []) {
                Ok(_) => added.push(column),
                Err(e) if is_duplicate_column(&e) => {
                    tracing::warn!("Column '{}' on '{}' already added by another writer", column, type_name);
                }
                Err(e) => return Err(e.into()),
            }
            existing.insert(lower);
        }
        tx.commit()?;

        if !added.is_empty() {
            tracing::info!("Added columns {:?} to '{}'", added, type_name);
        }
        Ok(existing)
    }

    /// Column names of a type's table as created, in table order.
    /// Empty if the table does not exist.
    pub fn column_names(conn: &Connection, type_name: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt
            .query_map([type_name], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Field columns only: everything except the identity and linkage columns
    pub fn field_columns(conn: &Connection, type_name: &str) -> Result<Vec<String>> {
        Ok(Self::column_names(conn, type_name)?
            .into_iter()
            .filter(|c| !is_reserved_column(c))
            .collect())
    }
}

/// Whether a column is bookkeeping rather than a field
pub fn is_reserved_column(name: &str) -> bool {
    name.eq_ignore_ascii_case(ID_COLUMN) || name.eq_ignore_ascii_case(LINK_COLUMN)
}

fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.starts_with("duplicate column name"),
        _ => false,
    }
}
