//! # dynobj - Schema-on-write dynamic object store
//!
//! Persist objects of caller-defined types without a predeclared schema.
//!
//! dynobj provides:
//! - A type directory that assigns one durable identity per type name
//! - Per-type SQLite tables that grow a column for every new field name
//! - Atomic writes of a master object plus an arbitrarily deep sub-object tree
//! - Shape-agnostic reads, replace-style updates and one-level soft deletes

pub mod value;
pub mod policy;
pub mod object;
pub mod storage;
pub mod writer;
pub mod reader;
pub mod cascade;
pub mod service;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use value::{FieldValue, Fields};
pub use policy::{RequiredFieldPolicy, ValidationError};
pub use object::{DynamicObject, ObjectNode, ObjectType};
pub use storage::SqliteStore;
pub use service::ObjectService;

/// Result type alias for dynobj operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for dynobj operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Schema evolution failed for type '{type_name}': {reason}")]
    SchemaEvolution { type_name: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Coarse classification used by callers that map errors onto responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    SchemaEvolution,
    Persistence,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::SchemaEvolution { .. } => ErrorKind::SchemaEvolution,
            Error::Storage(_) | Error::Io(_) | Error::Poisoned => ErrorKind::Persistence,
        }
    }

    pub(crate) fn schema(type_name: &str, reason: impl std::fmt::Display) -> Self {
        Error::SchemaEvolution {
            type_name: type_name.to_string(),
            reason: reason.to_string(),
        }
    }
}
