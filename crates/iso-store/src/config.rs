//! Store configuration.
//!
//! Configures where user and machine stores live and the default byte
//! ceiling for new stores. Defaults follow platform conventions. Override
//! via environment variables, a YAML file, or explicit construction for
//! tests.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default byte ceiling for a new store (1 MiB).
pub const DEFAULT_QUOTA_BYTES: u64 = 1024 * 1024;

pub const USER_ROOT_ENV: &str = "ISO_STORAGE_USER_ROOT";
pub const MACHINE_ROOT_ENV: &str = "ISO_STORAGE_MACHINE_ROOT";
pub const QUOTA_ENV: &str = "ISO_STORAGE_QUOTA_BYTES";

/// Where stores live and how large they may grow by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Parent directory of every user-owned store.
    pub user_root: PathBuf,
    /// Parent directory of every machine-owned store.
    pub machine_root: PathBuf,
    /// Byte ceiling applied to stores without an override.
    pub default_quota_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            user_root: default_user_root(),
            machine_root: default_machine_root(),
            default_quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ISO_STORAGE_USER_ROOT` (default: `$XDG_DATA_HOME/isolated-storage`)
    /// - `ISO_STORAGE_MACHINE_ROOT` (default: `/var/lib/isolated-storage` on Unix)
    /// - `ISO_STORAGE_QUOTA_BYTES` (default: 1048576)
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidQuota` if the quota variable is set but not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let default_quota_bytes = match std::env::var(QUOTA_ENV) {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidQuota(QUOTA_ENV.to_string(), raw.clone()))?,
            Err(_) => defaults.default_quota_bytes,
        };
        Ok(Self {
            user_root: env_path(USER_ROOT_ENV).unwrap_or(defaults.user_root),
            machine_root: env_path(MACHINE_ROOT_ENV).unwrap_or(defaults.machine_root),
            default_quota_bytes,
        })
    }

    /// Load configuration from a YAML file. Missing fields take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Both owner roots under `dir` (`dir/user`, `dir/machine`).
    pub fn rooted_at(dir: &Path) -> Self {
        Self {
            user_root: dir.join("user"),
            machine_root: dir.join("machine"),
            default_quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }

    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.default_quota_bytes = bytes;
        self
    }

    /// Reject relative roots and a zero quota.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, root) in [("user_root", &self.user_root), ("machine_root", &self.machine_root)] {
            if !root.is_absolute() {
                return Err(ConfigError::RelativeRoot(field.to_string(), root.clone()));
            }
        }
        if self.default_quota_bytes == 0 {
            return Err(ConfigError::ZeroQuota);
        }
        Ok(())
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn default_user_root() -> PathBuf {
    if let Some(data) = env_path("XDG_DATA_HOME") {
        return data.join("isolated-storage");
    }
    if let Some(home) = env_path("HOME") {
        return home.join(".local").join("share").join("isolated-storage");
    }
    if let Some(app_data) = env_path("LOCALAPPDATA") {
        return app_data.join("IsolatedStorage");
    }
    std::env::temp_dir().join("isolated-storage").join("user")
}

fn default_machine_root() -> PathBuf {
    if cfg!(unix) {
        return PathBuf::from("/var/lib/isolated-storage");
    }
    if let Some(program_data) = env_path("ProgramData") {
        return program_data.join("IsolatedStorage");
    }
    std::env::temp_dir().join("isolated-storage").join("machine")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid quota in {0}: {1:?} is not a byte count")]
    InvalidQuota(String, String),
    #[error("{0} must be an absolute path, got {1:?}")]
    RelativeRoot(String, PathBuf),
    #[error("default quota must be greater than zero")]
    ZeroQuota,
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}
