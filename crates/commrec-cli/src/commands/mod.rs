//! Subcommand implementations.

pub mod config;
pub mod inspect;
pub mod run;

use std::path::{Path, PathBuf};

use tracing::debug;

use commrec_core::models::ReconConfig;

/// Default configuration location, `<config dir>/commrec/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("commrec")
        .join("config.json")
}

/// Resolve the configuration file in use: the `--config` path if given,
/// otherwise the default location.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration. An explicit path must exist; the default location
/// falls back to built-in defaults when absent.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<ReconConfig> {
    if let Some(path) = explicit {
        return read_config(Path::new(path));
    }

    let path = default_config_path();
    if path.exists() {
        read_config(&path)
    } else {
        debug!("No config at {}, using defaults", path.display());
        Ok(ReconConfig::default())
    }
}

fn read_config(path: &Path) -> anyhow::Result<ReconConfig> {
    ReconConfig::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))
}
