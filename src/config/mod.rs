// ==========================================
// School Closure - configuration layer
// ==========================================
// Storage: setting table
// The engine only sees `ClosureParams`, resolved once per run
// ==========================================

pub mod closure_config_trait;
pub mod config_manager;

pub use closure_config_trait::{ClosureConfigReader, ClosureParams, ConfigError, ConfigResult};
pub use config_manager::{config_keys, load_settings_snapshot, ConfigManager};
