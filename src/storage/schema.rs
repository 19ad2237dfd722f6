//! Database schema definitions
//!
//! Only the two directory tables are fixed. Every object type gets its own
//! table at runtime, see [`super::table`].

/// Directory of known types
pub const TYPES_TABLE: &str = "dynamic_object_types";

/// Catalog of every object: identity, type, timestamps, deletion and linkage
pub const OBJECTS_TABLE: &str = "dynamic_objects";

/// Index names created alongside the catalog
pub const MASTER_INDEX: &str = "idx_dynamic_objects_master";
pub const TYPE_INDEX: &str = "idx_dynamic_objects_type";

/// Names owned by the fixed schema; no object type may take one
pub const RESERVED_NAMES: &[&str] = &[TYPES_TABLE, OBJECTS_TABLE, MASTER_INDEX, TYPE_INDEX];

/// Identity key column of every per-type table
pub const ID_COLUMN: &str = "Id";

/// Parent-linkage column of every per-type table
pub const LINK_COLUMN: &str = "MasterObjectId";

/// SQL to create the type directory.
/// Names are unique regardless of case because they also name tables.
pub const CREATE_TYPES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dynamic_object_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL COLLATE NOCASE UNIQUE,
    created_at TEXT NOT NULL
)
"#;

/// SQL to create the object catalog
pub const CREATE_OBJECTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS dynamic_objects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type_id INTEGER NOT NULL REFERENCES dynamic_object_types(id),
    created_at TEXT NOT NULL,
    modified_at TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    master_object_id INTEGER REFERENCES dynamic_objects(id)
)
"#;

pub const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_dynamic_objects_master ON dynamic_objects(master_object_id);
CREATE INDEX IF NOT EXISTS idx_dynamic_objects_type ON dynamic_objects(type_id);
"#;

/// Get all schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_TYPES_TABLE, CREATE_OBJECTS_TABLE, CREATE_INDEXES]
}

/// Quote an identifier for use in SQL.
///
/// Names are validated before they get here; doubling quotes keeps this safe
/// regardless.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names_cover_fixed_schema() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        for stmt in all_schema_statements() {
            conn.execute_batch(stmt).unwrap();
        }

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_schema WHERE name NOT LIKE 'sqlite_%'")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(names.len(), RESERVED_NAMES.len());
        for name in names {
            assert!(RESERVED_NAMES.contains(&name.as_str()), "{} is not reserved", name);
        }
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("Order"), "\"Order\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
