mod config_error;
pub mod schema;
mod semantic_validator;

use anyhow::Context;
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};

pub use crate::config_error::{ConfigError, JsonError, ValidationError, ValidationErrors};
pub use crate::schema::{LoadConfig, Payload, ReportConfig, ReportFormat, RetryConfig, Target};
pub use crate::semantic_validator::{Rule, Validator};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Reads and deserializes a config file without running the semantic rules.
pub fn parse_config(path: impl AsRef<Path>) -> Result<LoadConfig> {
    let path = path.as_ref();
    log::debug!("config path: {}", path.display());
    let content = fs::read_to_string(path)?;
    let config: LoadConfig = serde_json::from_str(&content).map_err(JsonError::from)?;
    Ok(config)
}

pub fn load(path: impl AsRef<Path>) -> Result<LoadConfig> {
    let config = parse_config(path)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate(path: impl AsRef<Path>) -> Result<()> {
    load(path).map(|_| ())
}

pub fn validate_config(config: &LoadConfig) -> Result<()> {
    let mut errors: Vec<ValidationError> = Vec::new();
    Validator::standard().validate(config, &mut errors);

    if !errors.is_empty() {
        log::warn!("Config is invalid ({} errors)", errors.len());
        return Err(ValidationErrors { items: errors }.into());
    }
    Ok(())
}

pub fn export_schema(out_path: impl AsRef<Path>, version: Option<String>) -> anyhow::Result<PathBuf> {
    let path = out_path.as_ref();
    let final_path = with_version(path, version.as_deref())?;
    let mut schema = schema_for!(LoadConfig);
    let v = version.unwrap_or_else(|| "1".to_string());
    schema.insert("$version".to_string(), serde_json::Value::String(v));
    fs::write(&final_path, serde_json::to_string_pretty(&schema)?)
        .with_context(|| format!("Failed to write schema to {}", final_path.display()))?;

    Ok(final_path)
}

fn with_version(path: &Path, version: Option<&str>) -> anyhow::Result<PathBuf> {
    let Some(version) = version else {
        return Ok(path.to_path_buf());
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid output file name"))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("json");

    let new_name = format!("{stem}-v{version}.{ext}");
    Ok(path.with_file_name(new_name))
}

pub fn generate_config(out_path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = out_path.as_ref();
    fs::write(path, serde_json::to_string_pretty(&LoadConfig::default())?)
        .context("Failed to write default config to file")
}
