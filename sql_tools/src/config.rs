//! Configuration handling for sql_tools

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::schema::analyzer::IntrospectOptions;
use crate::schema::diff::SyncOptions;
use crate::schema::document::SchemaFormat;

/// Load configuration from a TOML file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config_str = fs::read_to_string(path.as_ref())
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

fn default_true() -> bool {
    true
}

fn default_unmanaged_extensions() -> Vec<String> {
    vec!["plpgsql".to_string()]
}

/// Represents the complete sql_tools configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub logging: Option<LoggingConfig>,
    pub output: Option<OutputConfig>,
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
    /// Schema to introspect, `public` when unset
    pub schema: Option<String>,
}

/// Comparison and introspection behavior
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SyncConfig {
    #[serde(default = "default_true")]
    pub allow_table_removal: bool,
    #[serde(default = "default_true")]
    pub allow_column_removal: bool,
    #[serde(default)]
    pub unmanaged_tables: Vec<String>,
    #[serde(default = "default_unmanaged_extensions")]
    pub unmanaged_extensions: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            allow_table_removal: true,
            allow_column_removal: true,
            unmanaged_tables: Vec::new(),
            unmanaged_extensions: default_unmanaged_extensions(),
        }
    }
}

impl SyncConfig {
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            allow_table_removal: self.allow_table_removal,
            allow_column_removal: self.allow_column_removal,
        }
    }

    pub fn introspect_options(&self) -> IntrospectOptions {
        IntrospectOptions {
            unmanaged_tables: self.unmanaged_tables.clone(),
            unmanaged_extensions: self.unmanaged_extensions.clone(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Log to stdout instead of stderr. Off by default so plan output stays clean.
    #[serde(default)]
    pub stdout: bool,
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Output configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    /// Format used when printing introspected schemas
    #[serde(default)]
    pub format: SchemaFormat,
}
