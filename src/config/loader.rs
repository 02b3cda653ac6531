//! Configuration structures and loading logic.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the content directory used when none is configured.
pub const DEFAULT_ROOT: &str = "categories";

/// Default per-stream item cap. Effectively unbounded.
pub const DEFAULT_ITEM_LIMIT: usize = 1_000_000;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub sync: SyncConfig,
}

/// Where the category tree lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Content root holding one directory per category.
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// Feed synchronization options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum number of items a stream may hold after a merge.
    #[serde(default = "default_item_limit")]
    pub item_limit: usize,

    /// Failed downloads tolerated per stream before giving up for the pass.
    #[serde(default = "default_max_download_failures")]
    pub max_download_failures: u32,

    /// Timeout applied to every feed fetch and download request.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// User agent sent with feed and download requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether to show download progress.
    #[serde(default = "default_true")]
    pub show_downloads: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            item_limit: default_item_limit(),
            max_download_failures: default_max_download_failures(),
            fetch_timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            show_downloads: true,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

fn default_item_limit() -> usize {
    DEFAULT_ITEM_LIMIT
}

fn default_max_download_failures() -> u32 {
    3
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("autocon/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Platform config file location, e.g. `~/.config/autocon/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "autocon").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the content root directory.
    pub fn root(&self) -> &Path {
        &self.library.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.library.root, PathBuf::from("categories"));
        assert_eq!(config.sync.item_limit, 1_000_000);
        assert_eq!(config.sync.max_download_failures, 3);
        assert!(config.sync.show_downloads);
    }

    #[test]
    fn test_partial_sync_section() {
        let config: Config = toml::from_str(
            r#"
            [library]
            root = "/media/library"

            [sync]
            item_limit = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.root(), Path::new("/media/library"));
        assert_eq!(config.sync.item_limit, 50);
        assert_eq!(config.sync.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
