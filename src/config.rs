use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::policy::{RequiredFieldPolicy, DEFAULT_REQUIRED_FIELDS};
use crate::storage::StoreOptions;
use crate::storage::sqlite::DEFAULT_BUSY_TIMEOUT_MS;

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DynobjConfig {
    pub database: Option<String>,
    pub port: Option<u16>,
    pub busy_timeout_ms: Option<u64>,
    /// Mandatory fields per type; replaces the built-in policy when present
    pub required_fields: Option<BTreeMap<String, Vec<String>>>,
}

impl DynobjConfig {
    /// A config spelling out every default, for `dynobj init`
    pub fn with_defaults() -> Self {
        let required_fields = DEFAULT_REQUIRED_FIELDS
            .iter()
            .map(|(type_name, fields)| {
                (
                    type_name.to_string(),
                    fields.iter().map(|f| f.to_string()).collect(),
                )
            })
            .collect();

        Self {
            database: Some(default_database_path().to_string_lossy().to_string()),
            port: Some(DEFAULT_PORT),
            busy_timeout_ms: Some(DEFAULT_BUSY_TIMEOUT_MS),
            required_fields: Some(required_fields),
        }
    }

    pub fn policy(&self) -> RequiredFieldPolicy {
        match &self.required_fields {
            Some(map) => RequiredFieldPolicy::from_config(map),
            None => RequiredFieldPolicy::default(),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout_ms: self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("dynobj.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from(".dynobj").join("objects.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<DynobjConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: DynobjConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &DynobjConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
