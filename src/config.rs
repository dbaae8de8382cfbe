//! Optional config file loading. Search order: ./kindlenotes.toml, then
//! $XDG_CONFIG_HOME/kindlenotes/config.toml (or ~/.config/kindlenotes/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; only present keys override defaults.
///
/// The session cookie is deliberately not a config key; it is always prompted for.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct Config {
    /// Notebook URL (e.g. a regional store such as https://read.amazon.co.uk/notebook).
    pub endpoint: Option<String>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Chooser command line (default "fzf").
    pub chooser: Option<String>,
    /// Render notes below their highlight (default false).
    pub include_notes: Option<bool>,
    /// Output format: markdown (default) or json.
    pub format: Option<String>,
}

/// Search order: (1) ./kindlenotes.toml, (2) $XDG_CONFIG_HOME/kindlenotes/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    for path in config_search_paths() {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

pub fn load_config_file(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

/// Candidate config paths in search order. The first is relative to the current directory.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("kindlenotes.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("kindlenotes").join("config.toml"));
    }
    paths
}
