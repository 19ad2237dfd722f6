//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - dynamic_object_types(id, name, created_at)
//! - dynamic_objects(id, type_id, created_at, modified_at, is_deleted, master_object_id)
//! - one table per object type: ("Id", "MasterObjectId", <one column per field name>)

pub mod schema;
pub mod registry;
pub mod table;
pub mod sqlite;

pub use registry::SchemaRegistry;
pub use sqlite::{DbStats, SqliteStore, StoreOptions};
pub use table::TableSchemaManager;
