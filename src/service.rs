//! Object service - the four operations callers see
//!
//! Owns the store and the required-field policy and hands out the writer,
//! reader and cascade per call. The HTTP layer and the CLI both go through
//! here.

use std::path::Path;

use serde_json::{Map, Value};

use crate::cascade::SoftDeleteCascade;
use crate::object::{DynamicObject, ObjectNode, ObjectType};
use crate::policy::RequiredFieldPolicy;
use crate::reader::ObjectReader;
use crate::storage::{DbStats, SqliteStore, StoreOptions};
use crate::writer::ObjectWriter;
use crate::Result;

pub struct ObjectService {
    store: SqliteStore,
    policy: RequiredFieldPolicy,
}

impl ObjectService {
    pub fn new(store: SqliteStore, policy: RequiredFieldPolicy) -> Self {
        Self { store, policy }
    }

    /// Open a file-backed service
    pub fn open(path: &Path, options: &StoreOptions, policy: RequiredFieldPolicy) -> Result<Self> {
        Ok(Self::new(SqliteStore::open_with(path, options)?, policy))
    }

    /// In-memory service (for testing)
    pub fn in_memory(policy: RequiredFieldPolicy) -> Result<Self> {
        Ok(Self::new(SqliteStore::open_in_memory()?, policy))
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Create a master object and its sub-object tree; returns the master id
    pub fn create(&self, tree: &ObjectNode) -> Result<i64> {
        ObjectWriter::new(&self.store, &self.policy).create_hierarchy(tree)
    }

    pub fn get(&self, type_name: &str, id: i64) -> Result<DynamicObject> {
        ObjectReader::new(&self.store).get(type_name, id)
    }

    /// Replace the fields of a live object
    pub fn update(&self, id: i64, fields: &Map<String, Value>) -> Result<()> {
        ObjectWriter::new(&self.store, &self.policy).update(id, fields)
    }

    /// Soft-delete an object and its direct children; returns children cascaded
    pub fn delete(&self, id: i64) -> Result<usize> {
        SoftDeleteCascade::new(&self.store).delete(id)
    }

    pub fn list_types(&self) -> Result<Vec<ObjectType>> {
        self.store.list_types()
    }

    pub fn stats(&self) -> Result<DbStats> {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;
    use crate::ErrorKind;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn node(type_name: &str, fields: Value) -> ObjectNode {
        ObjectNode::from_json(type_name, fields)
    }

    fn service() -> ObjectService {
        ObjectService::in_memory(RequiredFieldPolicy::default()).unwrap()
    }

    fn live_ids(service: &ObjectService) -> Vec<i64> {
        service
            .store()
            .with_conn(|conn, _| {
                let mut stmt = conn.prepare("SELECT id FROM dynamic_objects WHERE is_deleted = 0")?;
                let ids = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<i64>>>()?;
                Ok(ids)
            })
            .unwrap()
    }

    #[test]
    fn test_round_trip_after_normalization() {
        let service = service();
        let id = service
            .create(&node("Product", json!({"Name": "Lamp", "Price": 9.99, "Stock": 3})))
            .unwrap();

        let object = service.get("Product", id).unwrap();
        let names: Vec<_> = object.fields.names().collect();
        assert_eq!(names, vec!["Name", "Price", "Stock"]);
        assert_eq!(object.fields.get("Name"), Some(&FieldValue::String("Lamp".into())));
        assert_eq!(object.fields.get("Price"), Some(&FieldValue::Integer(9)));
        assert_eq!(object.fields.get("Stock"), Some(&FieldValue::Integer(3)));
    }

    #[test]
    fn test_missing_required_field_persists_nothing() {
        let service = service();
        let tree = node("Order", json!({"ProductList": "p1"}))
            .with_child(node("Address", json!({"City": "Oslo"})));

        let err = service.create(&tree).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.to_string(),
            "Missing required field: CustomerId for object type: Order."
        );

        assert!(live_ids(&service).is_empty());
        for id in 1..=2 {
            assert_eq!(service.get("Order", id).unwrap_err().kind(), ErrorKind::NotFound);
            assert_eq!(service.get("Address", id).unwrap_err().kind(), ErrorKind::NotFound);
        }
    }

    #[test]
    fn test_invalid_deep_child_aborts_tree() {
        let service = service();
        let tree = node("Order", json!({"CustomerId": 5, "ProductList": [1, 2]})).with_child(
            node("Customer", json!({"CustomerId": 5, "Name": "Ada", "City": "Oslo"}))
                .with_child(node("Payment", json!({"Amount": 10}))),
        );

        assert_eq!(service.create(&tree).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(service.get("Order", 1).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(live_ids(&service).is_empty());

        // The same tree succeeds once the grandchild is complete
        let fixed = node("Order", json!({"CustomerId": 5, "ProductList": [1, 2]})).with_child(
            node("Customer", json!({"CustomerId": 5, "Name": "Ada", "City": "Oslo"})).with_child(
                node(
                    "Payment",
                    json!({"Amount": 10, "PaymentMethod": "card", "PaymentDate": "2024-09-19", "Status": "paid"}),
                ),
            ),
        );
        let master = service.create(&fixed).unwrap();
        assert!(service.get("Order", master).is_ok());
    }

    #[test]
    fn test_flattened_linkage() {
        let service = service();
        let tree = node("Category", json!({"Name": "Tools", "Description": "All tools"})).with_child(
            node("Category", json!({"Name": "Saws", "Description": "Cutting"}))
                .with_child(node("Product", json!({"Name": "Hacksaw", "Price": 12}))),
        );
        let master = service.create(&tree).unwrap();

        let child = service.get("Category", master + 1).unwrap();
        let grandchild = service.get("Product", master + 2).unwrap();
        assert_eq!(child.master_object_id, Some(master));
        assert_eq!(grandchild.master_object_id, Some(master));
        assert!(service.get("Category", master).unwrap().is_master());
    }

    #[test]
    fn test_cascade_is_one_level() {
        let service = service();
        let tree = node("Customer", json!({"CustomerId": 1, "Name": "Ada", "City": "Oslo"})).with_child(
            node("Address", json!({"City": "Oslo"}))
                .with_child(node("Address", json!({"City": "Bergen"}))),
        );
        let master = service.create(&tree).unwrap();
        let (child, grandchild) = (master + 1, master + 2);

        // The grandchild links to the master, not to the child it was nested under
        assert_eq!(service.delete(child).unwrap(), 0);
        assert_eq!(service.get("Address", child).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(service.get("Address", grandchild).is_ok());

        assert_eq!(service.delete(master).unwrap(), 1);
        for (type_name, id) in [("Customer", master), ("Address", child), ("Address", grandchild)] {
            assert_eq!(service.get(type_name, id).unwrap_err().kind(), ErrorKind::NotFound);
        }
    }

    #[test]
    fn test_update_then_get() {
        let service = service();
        let id = service.create(&node("Address", json!({"City": "Oslo", "Zip": "0150"}))).unwrap();

        let update = json!({"City": "Bergen", "Country": "NO"});
        service.update(id, update.as_object().unwrap()).unwrap();

        let object = service.get("Address", id).unwrap();
        assert!(object.modified_at.is_some());
        assert_eq!(object.fields.get("City"), Some(&FieldValue::String("Bergen".into())));
        assert_eq!(object.fields.get("Zip"), Some(&FieldValue::Null));
        assert_eq!(object.fields.get("Country"), Some(&FieldValue::String("NO".into())));
    }

    #[test]
    fn test_update_unknown_or_deleted_is_not_found() {
        let service = service();
        let update = json!({"City": "Oslo"});
        let fields = update.as_object().unwrap();

        assert_eq!(service.update(7, fields).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(service.list_types().unwrap().is_empty());

        let id = service.create(&node("Address", json!({"City": "Oslo"}))).unwrap();
        service.delete(id).unwrap();
        assert_eq!(service.update(id, fields).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_concurrent_first_writes_share_one_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.db");
        let options = StoreOptions::default();

        // Two stores on one file model two processes; each is shared by threads
        let services: Vec<Arc<ObjectService>> = (0..2)
            .map(|_| Arc::new(ObjectService::open(&path, &options, RequiredFieldPolicy::empty()).unwrap()))
            .collect();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = Arc::clone(&services[i % 2]);
                thread::spawn(move || {
                    let fields = json!({ "Label": format!("brand-{}", i), "Rank": i });
                    service.create(&node("Brand", fields))
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let types = services[0].list_types().unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].name, "Brand");
        assert_eq!(services[1].stats().unwrap().objects, 8);
    }

    #[test]
    fn test_type_named_after_fixed_index_is_rejected() {
        let service = service();
        let err = service
            .create(&node("idx_dynamic_objects_type", json!({"A": 1})))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(service.list_types().unwrap().is_empty());
        assert_eq!(
            service.get("idx_dynamic_objects_type", 1).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_stats() {
        let service = service();
        let master = service
            .create(&node("Address", json!({"City": "Oslo"})).with_child(node("Note", json!({"Text": "door"}))))
            .unwrap();
        service.create(&node("Address", json!({"City": "Bergen"}))).unwrap();
        service.delete(master).unwrap();

        let stats = service.stats().unwrap();
        assert_eq!(stats.types, 2);
        assert_eq!(stats.objects, 1);
        assert_eq!(stats.masters, 1);
        assert_eq!(stats.deleted, 2);
    }
}
