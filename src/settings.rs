use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub db_busy_timeout_ms: u64,
    #[serde(default = "default_sheet")]
    pub sheet: String,
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default = "default_env")]
    pub env: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("supplier-sync")
        .join("suppliers.db")
        .to_string_lossy()
        .to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_sheet() -> String {
    "To Update on DB".to_string()
}

fn default_range() -> String {
    "A3:AR".to_string()
}

fn default_env() -> String {
    "dev".to_string()
}

fn default_service_name() -> String {
    "supplier-sync".to_string()
}

fn default_log_filter() -> String {
    "supplier_sync=info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            db_busy_timeout_ms: default_busy_timeout_ms(),
            sheet: default_sheet(),
            range: default_range(),
            env: default_env(),
            service_name: default_service_name(),
            log_filter: default_log_filter(),
        }
    }
}

pub const ENV_DB_PATH: &str = "SUPPLIER_SYNC_DB_PATH";
pub const ENV_DB_BUSY_TIMEOUT_MS: &str = "SUPPLIER_SYNC_DB_BUSY_TIMEOUT_MS";
pub const ENV_SHEET: &str = "SUPPLIER_SYNC_SHEET";
pub const ENV_RANGE: &str = "SUPPLIER_SYNC_RANGE";
pub const ENV_ENV: &str = "NV_ENV";
pub const ENV_SERVICE_NAME: &str = "NV_SERVICE_NAME";
pub const ENV_LOG: &str = "SUPPLIER_SYNC_LOG";

impl Settings {
    /// Apply the environment overrides that `lookup` knows about. Empty
    /// values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_DB_PATH) {
            self.db_path = shellexpand_path(&v);
        }
        if let Some(v) = get(ENV_DB_BUSY_TIMEOUT_MS) {
            self.db_busy_timeout_ms = v.trim().parse().map_err(|_| {
                SyncError::Settings(format!(
                    "{ENV_DB_BUSY_TIMEOUT_MS} must be a number of milliseconds, got {v:?}"
                ))
            })?;
        }
        if let Some(v) = get(ENV_SHEET) {
            self.sheet = v;
        }
        if let Some(v) = get(ENV_RANGE) {
            self.range = v;
        }
        if let Some(v) = get(ENV_ENV) {
            self.env = v;
        }
        if let Some(v) = get(ENV_SERVICE_NAME) {
            self.service_name = v;
        }
        if let Some(v) = get(ENV_LOG) {
            self.log_filter = v;
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.db_path)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.db_busy_timeout_ms)
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("supplier-sync")
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Parse a settings file. Missing fields take their defaults.
pub fn read_settings_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SyncError::Settings(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| SyncError::Settings(format!("invalid settings in {}: {e}", path.display())))
}

/// Defaults, then the settings file, then the process environment.
///
/// An explicit `config_path` must exist; the default location is optional.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let mut settings = match config_path {
        Some(path) => read_settings_file(path)?,
        None => {
            let path = default_settings_path();
            if path.exists() {
                read_settings_file(&path)?
            } else {
                Settings::default()
            }
        }
    };
    settings.apply_env(|key| std::env::var(key).ok())?;
    Ok(settings)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
