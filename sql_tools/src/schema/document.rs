//! Schema documents
//!
//! A declared schema can also arrive as a JSON, YAML or TOML document with the
//! same shape an introspected snapshot serializes to.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::types::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFormat {
    #[default]
    Json,
    Yaml,
    Toml,
}

impl SchemaFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(SchemaFormat::Json),
            Some("yaml") | Some("yml") => Ok(SchemaFormat::Yaml),
            Some("toml") => Ok(SchemaFormat::Toml),
            other => Err(Error::ConfigError(format!(
                "Unsupported schema document extension: {:?}",
                other
            ))),
        }
    }
}

impl std::str::FromStr for SchemaFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(SchemaFormat::Json),
            "yaml" | "yml" => Ok(SchemaFormat::Yaml),
            "toml" => Ok(SchemaFormat::Toml),
            _ => Err(Error::ConfigError(format!("Unknown schema format: {}", s))),
        }
    }
}

/// Load and validate a declared schema from a file
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<Schema> {
    let path = path.as_ref();
    let format = SchemaFormat::from_path(path)?;
    let text = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read schema file {}: {}", path.display(), e))
    })?;

    tracing::debug!(path = %path.display(), ?format, "Loading schema document");
    parse_schema(&text, format)
}

/// Parse and validate a declared schema
pub fn parse_schema(text: &str, format: SchemaFormat) -> Result<Schema> {
    let schema: Schema = match format {
        SchemaFormat::Json => serde_json::from_str(text)?,
        SchemaFormat::Yaml => serde_yaml::from_str(text)?,
        SchemaFormat::Toml => toml::from_str(text)?,
    };

    Ok(schema.finalize()?)
}

/// Serialize a schema snapshot
pub fn to_string(schema: &Schema, format: SchemaFormat) -> Result<String> {
    let text = match format {
        SchemaFormat::Json => serde_json::to_string_pretty(schema)?,
        SchemaFormat::Yaml => serde_yaml::to_string(schema)?,
        SchemaFormat::Toml => toml::to_string_pretty(schema)?,
    };
    Ok(text)
}
