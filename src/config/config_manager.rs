// ==========================================
// Catalog import - configuration manager
// ==========================================
// Responsibility: configuration lookup and override
// Storage: config_kv table (key-value, scope 'global')
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::importer::error::{ImportError, ImporterResult};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Create a ConfigManager on its own connection
    ///
    /// # Arguments
    /// - db_path: database file path
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// Create a ConfigManager on a shared connection
    ///
    /// The shared tables are created if missing (idempotent).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn.lock().map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Read a config value (scope_id='global')
    ///
    /// # Returns
    /// - Some(String): stored value
    /// - None: key not configured
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Write a config value (scope_id='global'), replacing any previous one
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// All global values, for diagnostics
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let snapshot = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(snapshot)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ImporterResult<String> {
        let value = self
            .get_global_config_value(key)
            .map_err(|e| ImportError::ConfigReadError {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        Ok(value.unwrap_or_else(|| default.to_string()))
    }
}

fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_preview_limit(&self) -> ImporterResult<usize> {
        let value = self.get_config_or_default(config_keys::PREVIEW_LIMIT, "10")?;
        Ok(value.trim().parse::<usize>().unwrap_or(10))
    }

    async fn get_sample_rows(&self) -> ImporterResult<usize> {
        let value = self.get_config_or_default(config_keys::SAMPLE_ROWS, "10")?;
        Ok(value.trim().parse::<usize>().ok().filter(|n| *n > 0).unwrap_or(10))
    }

    async fn get_rename_to_target_field(&self) -> ImporterResult<bool> {
        let value = self.get_config_or_default(config_keys::RENAME_TO_TARGET_FIELD, "false")?;
        Ok(parse_flag(&value, false))
    }

    async fn get_auto_create_template(&self) -> ImporterResult<bool> {
        let value = self.get_config_or_default(config_keys::AUTO_CREATE_TEMPLATE, "true")?;
        Ok(parse_flag(&value, true))
    }

    async fn get_error_sample_limit(&self) -> ImporterResult<usize> {
        let value = self.get_config_or_default(config_keys::ERROR_SAMPLE_LIMIT, "20")?;
        Ok(value.trim().parse::<usize>().unwrap_or(20))
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    pub const PREVIEW_LIMIT: &str = "import.preview_limit";
    pub const SAMPLE_ROWS: &str = "import.sample_rows";
    pub const RENAME_TO_TARGET_FIELD: &str = "import.rename_to_target_field";
    pub const AUTO_CREATE_TEMPLATE: &str = "import.auto_create_template";
    pub const ERROR_SAMPLE_LIMIT: &str = "import.error_sample_limit";
}
