// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};

/// Load a configuration file and the manifest it names, without semantic
/// validation. Use [`load_and_validate`] for that.
///
/// The directory containing the config file becomes the project root.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        PipelineError::ConfigError(format!("cannot read config file {:?}: {e}", path))
    })?;

    let mut config: RawConfigFile = toml::from_str(&contents)?;
    config.root = project_root(path);

    if let Some(manifest) = config.manifest.clone() {
        config.pkg = Some(load_manifest(&config.root.join(&manifest))?);
    }

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML and the manifest.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Resolves every task target's templates.
/// - Checks queues for unknown tasks and alias cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `Assetpipe.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Assetpipe.toml")
}

/// Read and parse the JSON manifest.
///
/// A manifest that is declared but missing or malformed is a config error.
pub fn load_manifest(path: &Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path).map_err(|e| {
        PipelineError::ConfigError(format!("cannot read manifest {:?}: {e}", path))
    })?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        PipelineError::ConfigError(format!("manifest {:?} is not valid JSON: {e}", path))
    })?;
    if !value.is_object() {
        return Err(PipelineError::ConfigError(format!(
            "manifest {:?} must be a JSON object",
            path
        )));
    }
    debug!(manifest = ?path, "loaded manifest");
    Ok(value)
}

fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
