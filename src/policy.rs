//! Write-time validation: mandatory fields per type, and identifier rules
//!
//! Type names become table names and field names become column names, so
//! both are restricted to plain SQL identifiers before anything touches the
//! database.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::storage::schema::{ID_COLUMN, LINK_COLUMN, RESERVED_NAMES};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("identifier pattern is valid")
});

/// Reasons a write is rejected before any state changes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {field} for object type: {type_name}.")]
    MissingField { field: String, type_name: String },

    #[error("Invalid type name: '{0}'")]
    InvalidTypeName(String),

    #[error("Invalid field name '{field}' for object type: {type_name}")]
    InvalidFieldName { field: String, type_name: String },

    #[error("Field '{field}' is reserved for object type: {type_name}")]
    ReservedField { field: String, type_name: String },

    #[error("Field '{field}' is given more than once for object type: {type_name}")]
    DuplicateField { field: String, type_name: String },
}

/// Static mapping of type name to mandatory field names.
///
/// Keys are lower-cased once at construction so lookups never scan.
#[derive(Debug, Clone)]
pub struct RequiredFieldPolicy {
    by_type: HashMap<String, Vec<String>>,
}

impl RequiredFieldPolicy {
    /// Build a policy from a type -> fields mapping.
    ///
    /// If two type names differ only by case, the later entry wins.
    pub fn new<I, K, F>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, F)>,
        K: AsRef<str>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        let by_type = entries
            .into_iter()
            .map(|(k, fields)| {
                (
                    k.as_ref().to_lowercase(),
                    fields.into_iter().map(Into::into).collect(),
                )
            })
            .collect();
        Self { by_type }
    }

    /// A policy that requires nothing
    pub fn empty() -> Self {
        Self { by_type: HashMap::new() }
    }

    pub fn from_config(map: &BTreeMap<String, Vec<String>>) -> Self {
        Self::new(map.iter().map(|(k, v)| (k.as_str(), v.iter().cloned())))
    }

    /// Mandatory fields for a type, in policy order
    pub fn required_for(&self, type_name: &str) -> Option<&[String]> {
        self.by_type.get(&type_name.to_lowercase()).map(Vec::as_slice)
    }

    /// Check that every mandatory field of `type_name` is present.
    ///
    /// Reports only the first missing field in policy order. Types without an
    /// entry always pass.
    pub fn validate<'a, I>(&self, type_name: &str, field_names: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(required) = self.required_for(type_name) else {
            return Ok(());
        };

        let supplied: HashSet<String> = field_names.into_iter().map(str::to_lowercase).collect();
        match required.iter().find(|f| !supplied.contains(&f.to_lowercase())) {
            Some(missing) => Err(ValidationError::MissingField {
                field: missing.clone(),
                type_name: type_name.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Mandatory fields applied when no policy is configured
pub const DEFAULT_REQUIRED_FIELDS: &[(&str, &[&str])] = &[
    ("Product", &["Name", "Price"]),
    ("Order", &["CustomerId", "ProductList"]),
    ("Payment", &["Amount", "PaymentMethod", "PaymentDate", "Status"]),
    ("Customer", &["CustomerId", "Name", "City"]),
    ("Address", &["City"]),
    ("Category", &["Name", "Description"]),
];

impl Default for RequiredFieldPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_REQUIRED_FIELDS
                .iter()
                .map(|(type_name, fields)| (*type_name, fields.iter().copied())),
        )
    }
}

/// Check that a type name can safely name a table
pub fn validate_type_name(type_name: &str) -> Result<(), ValidationError> {
    let lower = type_name.to_lowercase();
    if !IDENTIFIER.is_match(type_name)
        || RESERVED_NAMES.contains(&lower.as_str())
        || lower.starts_with("sqlite_")
    {
        return Err(ValidationError::InvalidTypeName(type_name.to_string()));
    }
    Ok(())
}

/// Check that field names are usable columns for `type_name`
pub fn validate_field_names<'a, I>(type_name: &str, field_names: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for field in field_names {
        if !IDENTIFIER.is_match(field) {
            return Err(ValidationError::InvalidFieldName {
                field: field.to_string(),
                type_name: type_name.to_string(),
            });
        }
        if field.eq_ignore_ascii_case(ID_COLUMN) || field.eq_ignore_ascii_case(LINK_COLUMN) {
            return Err(ValidationError::ReservedField {
                field: field.to_string(),
                type_name: type_name.to_string(),
            });
        }
        if !seen.insert(field.to_lowercase()) {
            return Err(ValidationError::DuplicateField {
                field: field.to_string(),
                type_name: type_name.to_string(),
            });
        }
    }
    Ok(())
}
