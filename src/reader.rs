//! Object reader - fetch an object without knowing its columns up front

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use crate::object::DynamicObject;
use crate::storage::schema::{quote_ident, ID_COLUMN};
use crate::storage::table::is_reserved_column;
use crate::storage::{SchemaRegistry, SqliteStore, TableSchemaManager};
use crate::value::{FieldValue, Fields};
use crate::{Error, Result};

/// Number of catalog columns selected ahead of the type table's columns
const META_COLUMNS: usize = 4;

pub struct ObjectReader<'a> {
    store: &'a SqliteStore,
}

impl<'a> ObjectReader<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Fetch a live object of `type_name` by identity.
    ///
    /// The field map is rebuilt from whatever columns the type's table has at
    /// read time. Columns this object never set come back as `Null`.
    pub fn get(&self, type_name: &str, id: i64) -> Result<DynamicObject> {
        let not_found = || Error::NotFound(format!("{} {}", type_name, id));

        self.store.with_conn(|conn, _| {
            let object_type = SchemaRegistry::find(conn, type_name)?.ok_or_else(not_found)?;
            // Registered but never stored: nothing to read
            if TableSchemaManager::column_names(conn, &object_type.name)?.is_empty() {
                return Err(not_found());
            }

            let sql = format!(
                "SELECT o.created_at, o.modified_at, o.is_deleted, o.master_object_id, t.*
                 FROM dynamic_objects o JOIN {} t ON t.{} = o.id
                 WHERE o.id = ?1 AND o.type_id = ?2 AND o.is_deleted = 0",
                quote_ident(&object_type.name),
                quote_ident(ID_COLUMN)
            );
            let mut stmt = conn.prepare(&sql)?;
            let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

            let row = stmt
                .query_row(rusqlite::params![id, object_type.id], |row| {
                    let created_at: DateTime<Utc> = row.get(0)?;
                    let modified_at: Option<DateTime<Utc>> = row.get(1)?;
                    let deleted: bool = row.get(2)?;
                    let master_object_id: Option<i64> = row.get(3)?;

                    let mut fields = Fields::new();
                    for (idx, name) in names.iter().enumerate().skip(META_COLUMNS) {
                        if is_reserved_column(name) {
                            continue;
                        }
                        fields.insert(name.clone(), row.get::<_, FieldValue>(idx)?);
                    }
                    Ok((created_at, modified_at, deleted, master_object_id, fields))
                })
                .optional()?;

            let (created_at, modified_at, deleted, master_object_id, fields) =
                row.ok_or_else(not_found)?;
            Ok(DynamicObject {
                id,
                object_type,
                fields,
                created_at,
                modified_at,
                deleted,
                master_object_id,
            })
        })
    }
}
