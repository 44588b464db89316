// ==========================================
// School Closure - configuration manager
// ==========================================
// Loads, queries and overrides settings
// Storage: setting table (key-value)
// ==========================================

use crate::config::closure_config_trait::{
    ClosureConfigReader, ConfigResult, DEFAULT_MAX_FAILED_SUBJECTS, DEFAULT_MIN_APPROVAL_GRADE,
    DEFAULT_MIN_PROMOTION_AVERAGE,
};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Open a ConfigManager on its own connection
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Build a ConfigManager over a shared connection
    ///
    /// The shared PRAGMAs are applied again (idempotent).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let guard = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }

        Ok(Self { conn })
    }

    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM setting WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Raw value of a setting (public, reused by the API and the CLI)
    pub fn get_setting(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// Insert or overwrite a setting
    pub fn set_setting(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO setting (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Parse a numeric setting, falling back to `default` when absent or malformed
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "setting is not a valid number, using default"
                );
                Ok(default)
            }
        }
    }

    /// Every setting as a JSON object
    ///
    /// Recorded in the closure audit row so a run can be explained later.
    pub fn get_config_snapshot(&self) -> ConfigResult<JsonValue> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        Ok(load_settings_snapshot(&conn)?)
    }
}

/// Read the whole setting table on an already-held connection
///
/// Used by the orchestrator, which holds the connection lock for the
/// whole run and cannot go back through `ConfigManager`.
pub fn load_settings_snapshot(conn: &Connection) -> rusqlite::Result<JsonValue> {
    let mut stmt = conn.prepare("SELECT key, value FROM setting ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

    let mut settings: BTreeMap<String, String> = BTreeMap::new();
    for row in rows {
        let (key, value) = row?;
        settings.insert(key, value);
    }
    Ok(json!(settings))
}

// ==========================================
// ClosureConfigReader implementation
// ==========================================
#[async_trait]
impl ClosureConfigReader for ConfigManager {
    async fn get_min_approval_grade(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(config_keys::MIN_APPROVAL_GRADE, DEFAULT_MIN_APPROVAL_GRADE)
    }

    async fn get_max_failed_subjects(&self) -> ConfigResult<usize> {
        self.get_parsed_or_default(config_keys::MAX_FAILED_SUBJECTS, DEFAULT_MAX_FAILED_SUBJECTS)
    }

    async fn get_min_promotion_average(&self) -> ConfigResult<f64> {
        self.get_parsed_or_default(
            config_keys::MIN_PROMOTION_AVERAGE,
            DEFAULT_MIN_PROMOTION_AVERAGE,
        )
    }
}

// ==========================================
// Setting keys
// ==========================================
pub mod config_keys {
    pub const MIN_APPROVAL_GRADE: &str = "min_approval_grade";
    pub const MAX_FAILED_SUBJECTS: &str = "max_failed_subjects";
    pub const MIN_PROMOTION_AVERAGE: &str = "min_promotion_average";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_table_is_empty() {
        let config = manager();
        let params = config.resolve_params().await.unwrap();
        assert_eq!(params.min_approval, 10.0);
        assert_eq!(params.max_failed_subjects, 3);
        assert_eq!(params.default_min_average, 10.0);
    }

    #[tokio::test]
    async fn test_overrides_and_malformed_values() {
        let config = manager();
        config.set_setting(config_keys::MIN_APPROVAL_GRADE, "12.5").unwrap();
        config.set_setting(config_keys::MAX_FAILED_SUBJECTS, "many").unwrap();

        assert_eq!(config.get_min_approval_grade().await.unwrap(), 12.5);
        assert_eq!(config.get_max_failed_subjects().await.unwrap(), 3);
    }

    #[test]
    fn test_snapshot_contains_every_setting() {
        let config = manager();
        config.set_setting("min_approval_grade", "11").unwrap();
        config.set_setting("school_name", "Liceo").unwrap();

        let snapshot = config.get_config_snapshot().unwrap();
        assert_eq!(snapshot["min_approval_grade"], "11");
        assert_eq!(snapshot["school_name"], "Liceo");
    }
}
