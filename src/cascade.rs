//! Soft delete with a one-level cascade
//!
//! Deleting an object marks it and every live object whose
//! `master_object_id` is its id. The cascade stops there: it does not follow
//! the children's own dependents. Since creates link all descendants to the
//! master, deleting a master reaches its whole tree.

use rusqlite::TransactionBehavior;

use crate::storage::SqliteStore;
use crate::{Error, Result};

pub struct SoftDeleteCascade<'a> {
    store: &'a SqliteStore,
}

impl<'a> SoftDeleteCascade<'a> {
    pub fn new(store: &'a SqliteStore) -> Self {
        Self { store }
    }

    /// Mark `id` and its direct children deleted, all or nothing.
    ///
    /// Returns how many children were cascaded. Deleting an unknown or
    /// already-deleted object is `NotFound`.
    pub fn delete(&self, id: i64) -> Result<usize> {
        self.store.with_conn(|conn, _| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let marked = tx.execute(
                "UPDATE dynamic_objects SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
                [id],
            )?;
            if marked == 0 {
                return Err(Error::NotFound(format!("object {}", id)));
            }

            let cascaded = tx.execute(
                "UPDATE dynamic_objects SET is_deleted = 1 WHERE master_object_id = ?1 AND is_deleted = 0",
                [id],
            )?;
            tx.commit()?;

            tracing::info!("Deleted object {} and {} direct children", id, cascaded);
            Ok(cascaded)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectNode;
    use crate::policy::RequiredFieldPolicy;
    use crate::writer::ObjectWriter;
    use serde_json::json;

    fn deleted_flags(store: &SqliteStore) -> Vec<bool> {
        store
            .with_conn(|conn, _| {
                let mut stmt = conn.prepare("SELECT is_deleted FROM dynamic_objects ORDER BY id")?;
                let flags = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<bool>>>()?;
                Ok(flags)
            })
            .unwrap()
    }

    #[test]
    fn test_delete_master_marks_tree() {
        let store = SqliteStore::open_in_memory().unwrap();
        let policy = RequiredFieldPolicy::empty();
        let tree = ObjectNode::from_json("Folder", json!({"Name": "root"})).with_child(
            ObjectNode::from_json("Folder", json!({"Name": "sub"}))
                .with_child(ObjectNode::from_json("File", json!({"Name": "a.txt"}))),
        );
        let master = ObjectWriter::new(&store, &policy).create_hierarchy(&tree).unwrap();

        let cascaded = SoftDeleteCascade::new(&store).delete(master).unwrap();
        assert_eq!(cascaded, 2);
        assert_eq!(deleted_flags(&store), vec![true, true, true]);
    }

    #[test]
    fn test_delete_is_terminal() {
        let store = SqliteStore::open_in_memory().unwrap();
        let policy = RequiredFieldPolicy::empty();
        let id = ObjectWriter::new(&store, &policy)
            .create_hierarchy(&ObjectNode::from_json("Folder", json!({"Name": "x"})))
            .unwrap();
        let cascade = SoftDeleteCascade::new(&store);

        assert_eq!(cascade.delete(id).unwrap(), 0);
        assert_eq!(cascade.delete(id).unwrap_err().kind(), crate::ErrorKind::NotFound);
        assert_eq!(cascade.delete(id + 100).unwrap_err().kind(), crate::ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_leaves_other_trees_alone() {
        let store = SqliteStore::open_in_memory().unwrap();
        let policy = RequiredFieldPolicy::empty();
        let writer = ObjectWriter::new(&store, &policy);
        let tree = |name: &str| {
            ObjectNode::from_json("Folder", json!({ "Name": name }))
                .with_child(ObjectNode::from_json("File", json!({"Name": "f"})))
        };
        let first = writer.create_hierarchy(&tree("one")).unwrap();
        writer.create_hierarchy(&tree("two")).unwrap();

        SoftDeleteCascade::new(&store).delete(first).unwrap();
        assert_eq!(deleted_flags(&store), vec![true, true, false, false]);
    }
}
