//! Engine configuration.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::FsError;
use crate::sort::{SortKey, SortOrder};

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// A remote declared in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMountConfig {
    /// Logical remote name, e.g. `gdrive`.
    pub name: String,

    /// Root understood by the sync tool, e.g. `gdrive:` or `store:/backup`.
    pub remote_root: String,

    /// Local cache directory. Defaults to `<cache_root>/<name>`.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl RemoteMountConfig {
    pub fn new(name: impl Into<String>, remote_root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote_root: remote_root.into(),
            cache_dir: None,
        }
    }

    /// Use an explicit cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }
}

/// Configuration for the file-operation engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Sort key for sibling entries.
    #[builder(default)]
    #[serde(default)]
    pub sort_key: SortKey,

    /// Reverse the sort direction.
    #[builder(default = "false")]
    #[serde(default)]
    pub sort_reverse: bool,

    /// Show dot-files.
    #[builder(default = "false")]
    #[serde(default)]
    pub show_hidden: bool,

    /// Sync tool executable (rclone or a compatible CLI).
    #[builder(default = "default_sync_program()")]
    #[serde(default = "default_sync_program")]
    pub sync_program: String,

    /// Declared remotes.
    #[builder(default)]
    #[serde(default)]
    pub remotes: Vec<RemoteMountConfig>,

    /// Parent directory for remote cache mirrors.
    #[builder(default = "default_cache_root()")]
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,

    /// Command used for recoverable deletes, e.g. `["trash-put"]`.
    /// `None` auto-detects one at startup.
    #[builder(default)]
    #[serde(default)]
    pub trash_command: Option<Vec<String>>,

    /// Bookmark file (`mark:path` per line).
    #[builder(default = "default_bookmark_file()")]
    #[serde(default = "default_bookmark_file")]
    pub bookmark_file: Option<PathBuf>,

    /// Upper bound for blocking quiescence waits, in milliseconds.
    #[builder(default = "10_000")]
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

fn default_sync_program() -> String {
    "rclone".to_string()
}

fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("driftfile")
        .join("remote")
}

fn default_bookmark_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("driftfile").join("bookmarks"))
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref program) = self.sync_program {
            if program.trim().is_empty() {
                return Err("Sync program cannot be empty".to_string());
            }
        }
        if let Some(ref remotes) = self.remotes {
            check_remotes(remotes)?;
        }
        Ok(())
    }
}

fn check_remotes(remotes: &[RemoteMountConfig]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for remote in remotes {
        if remote.name.is_empty() {
            return Err("Remote name cannot be empty".to_string());
        }
        if remote.remote_root.is_empty() {
            return Err(format!("Remote '{}' has an empty remote root", remote.name));
        }
        if !seen.insert(remote.name.as_str()) {
            return Err(format!("Remote '{}' is declared twice", remote.name));
        }
    }
    Ok(())
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("driftfile").join(CONFIG_FILE_NAME))
    }

    /// Load the config from the default location, falling back to defaults
    /// when no file exists.
    pub fn load_default() -> Result<Self, FsError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load the config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, FsError> {
        let text = fs::read_to_string(path).map_err(|e| FsError::io(path, e))?;
        let config: Self = toml::from_str(&text).map_err(|e| FsError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        check_remotes(&config.remotes).map_err(|message| FsError::ConfigFile {
            path: path.to_path_buf(),
            message,
        })?;
        tracing::debug!(path = %path.display(), remotes = config.remotes.len(), "loaded config");
        Ok(config)
    }

    /// Sort order derived from the key and direction.
    pub fn sort_order(&self) -> SortOrder {
        SortOrder::new(self.sort_key, self.sort_reverse)
    }

    /// Cache directory for a remote.
    pub fn cache_dir_for(&self, remote: &RemoteMountConfig) -> PathBuf {
        remote
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.cache_root.join(&remote.name))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sort_key: SortKey::default(),
            sort_reverse: false,
            show_hidden: false,
            sync_program: default_sync_program(),
            remotes: Vec::new(),
            cache_root: default_cache_root(),
            trash_command: None,
            bookmark_file: default_bookmark_file(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .sort_key(SortKey::Size)
            .show_hidden(true)
            .cache_root("/tmp/cache")
            .remotes(vec![RemoteMountConfig::new("gdrive", "gdrive:")])
            .build()
            .unwrap();

        assert_eq!(config.sort_key, SortKey::Size);
        assert!(config.show_hidden);
        assert_eq!(config.sync_program, "rclone");
        assert_eq!(
            config.cache_dir_for(&config.remotes[0]),
            PathBuf::from("/tmp/cache/gdrive")
        );
    }

    #[test]
    fn test_builder_rejects_duplicate_remotes() {
        let result = EngineConfig::builder()
            .remotes(vec![
                RemoteMountConfig::new("a", "a:"),
                RemoteMountConfig::new("a", "b:"),
            ])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_load_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
sort_key = "modified"
trash_command = ["gio", "trash"]

[[remotes]]
name = "store"
remote_root = "store:/backup"
cache_dir = "/tmp/store-cache"
"#,
        )
        .unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.sort_key, SortKey::Modified);
        assert_eq!(config.wait_timeout_ms, 10_000);
        assert_eq!(
            config.trash_command,
            Some(vec!["gio".to_string(), "trash".to_string()])
        );
        assert_eq!(
            config.cache_dir_for(&config.remotes[0]),
            PathBuf::from("/tmp/store-cache")
        );
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "sort_key = 3").unwrap();
        assert!(matches!(
            EngineConfig::load(&path),
            Err(FsError::ConfigFile { .. })
        ));
    }
}
