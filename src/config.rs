use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::path::PathBuf;

use crate::credentials::DEFAULT_ADMINS_FILE;
use crate::registry::DEFAULT_DATA_DIR;

/// Configuration for the application, read from `KANBAN_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding board files and audit logs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// JSON file with admin credentials
    #[serde(default = "default_admins_file")]
    pub admins_file: PathBuf,
    /// Fallback tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_admins_file() -> PathBuf {
    PathBuf::from(DEFAULT_ADMINS_FILE)
}

fn default_log_filter() -> String {
    "kanban=info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            admins_file: default_admins_file(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, after reading `.env` if present.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed("KANBAN_").from_iter::<_, Config>(vars)?;
        Ok(config)
    }
}
