// ==========================================
// School Closure - application state
// ==========================================
// One shared connection wired into the config manager and the API,
// plus a read connection for previews
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::ClosureApi;
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::ClosurePreviewService;

/// Environment variable overriding the database location
pub const DB_PATH_ENV: &str = "SCHOOL_CLOSURE_DB_PATH";

pub struct AppState {
    pub db_path: String,

    pub config_manager: Arc<ConfigManager>,

    pub closure_api: Arc<ClosureApi<ConfigManager>>,
}

impl AppState {
    /// Open (or create) the database and build the API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "initialising app state");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("cannot open database {}: {}", db_path, e))?;
        init_schema(&conn).map_err(|e| format!("cannot initialise schema: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("cannot create ConfigManager: {}", e))?,
        );
        // previews read on their own connection while a closure holds the shared one
        let preview = ClosurePreviewService::open(&db_path, config_manager.clone())
            .map_err(|e| format!("cannot open preview connection: {}", e))?;
        let closure_api = Arc::new(ClosureApi::new(conn, config_manager.clone()).with_preview(preview));

        Ok(Self {
            db_path,
            config_manager,
            closure_api,
        })
    }
}

/// Database path: env override, else the platform data directory
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join("school-closure");
            if let Err(e) = std::fs::create_dir_all(&dir) {
                tracing::warn!(error = %e, "cannot create data directory, using working directory");
                return "./school_closure.db".to_string();
            }
            dir.join("school_closure.db").to_string_lossy().to_string()
        }
        None => "./school_closure.db".to_string(),
    }
}
