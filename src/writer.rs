//! Object writer - hierarchical create and replace-style update
//!
//! A create runs in two passes over the tree:
//! 1. Validate, normalize, resolve the type and widen its table for every
//!    node in depth-first order. The first invalid node stops the write before
//!    any object row exists. Types and columns added here stay.
//! 2. Insert every node inside one transaction. All descendants, at any depth,
//!    link to the top-level master rather than to their immediate parent.

use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde_json::{Map, Value};

use crate::object::{ObjectNode, ObjectType};
use crate::policy::{validate_field_names, validate_type_name, RequiredFieldPolicy};
use crate::storage::schema::{quote_ident, ID_COLUMN, LINK_COLUMN};
use crate::storage::{SchemaRegistry, SqliteStore, TableSchemaManager};
use crate::value::{normalize, FieldValue, Fields};
use crate::{Error, Result};

/// A validated, normalized node whose storage is known to exist
struct PlannedRow {
    object_type: ObjectType,
    fields: Fields,
}

pub struct ObjectWriter<'a> {
    store: &'a SqliteStore,
    policy: &'a RequiredFieldPolicy,
}

impl<'a> ObjectWriter<'a> {
    pub fn new(store: &'a SqliteStore, policy: &'a RequiredFieldPolicy) -> Self {
        Self { store, policy }
    }

    /// Persist `tree` atomically and return the master's identity.
    pub fn create_hierarchy(&self, tree: &ObjectNode) -> Result<i64> {
        self.store.with_conn(|conn, tables| {
            let master = self.prepare(conn, tables, &tree.type_name, &tree.fields)?;
            let mut descendants = Vec::new();
            for (depth, node) in tree.walk().into_iter().skip(1) {
                tracing::debug!("Planning '{}' at depth {}", node.type_name, depth);
                descendants.push(self.prepare(conn, tables, &node.type_name, &node.fields)?);
            }

            let master_id = Self::insert_plan(conn, &master, &descendants)?;
            tracing::info!(
                "Created {} object {} with {} sub-objects",
                master.object_type.name,
                master_id,
                descendants.len()
            );
            Ok(master_id)
        })
    }

    /// Replace the field set of a live object.
    ///
    /// Every field column of the type ends up holding the supplied value, or
    /// NULL when the new field set omits it.
    pub fn update(&self, id: i64, raw: &Map<String, Value>) -> Result<()> {
        self.store.with_conn(|conn, tables| {
            let object_type = live_type_of(conn, id)?
                .ok_or_else(|| Error::NotFound(format!("object {}", id)))?;

            validate_field_names(&object_type.name, raw.keys().map(String::as_str))?;
            self.policy.validate(&object_type.name, raw.keys().map(String::as_str))?;
            let fields = normalize(raw);
            tables.ensure_storage(conn, &object_type.name, fields.names(), LINK_COLUMN)?;

            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let touched = tx.execute(
                "UPDATE dynamic_objects SET modified_at = ?1 WHERE id = ?2 AND is_deleted = 0",
                params![Utc::now(), id],
            )?;
            if touched == 0 {
                // Deleted between the lookup and the lock
                return Err(Error::NotFound(format!("object {}", id)));
            }

            let columns = TableSchemaManager::field_columns(&tx, &object_type.name)?;
            if !columns.is_empty() {
                let assignments = columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{} = ?{}", quote_ident(c), i + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "UPDATE {} SET {} WHERE {} = ?{}",
                    quote_ident(&object_type.name),
                    assignments,
                    quote_ident(ID_COLUMN),
                    columns.len() + 1
                );

                let null = FieldValue::Null;
                let mut values: Vec<&dyn ToSql> = columns
                    .iter()
                    .map(|c| fields.get_ignore_case(c).unwrap_or(&null) as &dyn ToSql)
                    .collect();
                values.push(&id);
                tx.execute(&sql, values.as_slice())?;
            }
            tx.commit()?;

            tracing::info!("Updated {} object {}", object_type.name, id);
            Ok(())
        })
    }

    fn prepare(
        &self,
        conn: &mut Connection,
        tables: &mut TableSchemaManager,
        type_name: &str,
        raw: &Map<String, Value>,
    ) -> Result<PlannedRow> {
        validate_type_name(type_name)?;
        validate_field_names(type_name, raw.keys().map(String::as_str))?;
        self.policy.validate(type_name, raw.keys().map(String::as_str))?;
        let fields = normalize(raw);

        let (object_type, _) = SchemaRegistry::resolve_or_create(conn, type_name)?;
        tables.ensure_storage(conn, &object_type.name, fields.names(), LINK_COLUMN)?;
        Ok(PlannedRow { object_type, fields })
    }

    fn insert_plan(conn: &mut Connection, master: &PlannedRow, descendants: &[PlannedRow]) -> Result<i64> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let master_id = insert_row(&tx, master, None)?;
        for row in descendants {
            insert_row(&tx, row, Some(master_id))?;
        }
        tx.commit()?;
        Ok(master_id)
    }
}

/// Insert the catalog row and the type row for one object, returning its id
fn insert_row(tx: &Transaction, row: &PlannedRow, master_id: Option<i64>) -> Result<i64> {
    tx.execute(
        "INSERT INTO dynamic_objects (type_id, created_at, master_object_id) VALUES (?1, ?2, ?3)",
        params![row.object_type.id, Utc::now(), master_id],
    )?;
    let id = tx.last_insert_rowid();

    let mut columns = vec![quote_ident(ID_COLUMN), quote_ident(LINK_COLUMN)];
    columns.extend(row.fields.names().map(quote_ident));
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&row.object_type.name),
        columns.join(", "),
        placeholders
    );

    let mut values: Vec<&dyn ToSql> = Vec::with_capacity(columns.len());
    values.push(&id);
    values.push(&master_id);
    values.extend(row.fields.iter().map(|(_, v)| v as &dyn ToSql));
    tx.execute(&sql, values.as_slice())?;
    Ok(id)
}

/// Type of a live (not deleted) object
fn live_type_of(conn: &Connection, id: i64) -> Result<Option<ObjectType>> {
    conn.query_row(
        "SELECT t.id, t.name, t.created_at
         FROM dynamic_objects o JOIN dynamic_object_types t ON t.id = o.type_id
         WHERE o.id = ?1 AND o.is_deleted = 0",
        [id],
        |row| {
            Ok(ObjectType {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}
