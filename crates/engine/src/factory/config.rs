//! Session factory configuration via `clusterbind.toml`
//!
//! Every setting has a default, so an empty file (or no file at all) is a
//! valid configuration. Enum-like settings are kept as strings in the file
//! and validated when the configuration is loaded.

use clusterbind_core::{Error, Result};
use clusterbind_metadata::NullValue;
use clusterbind_storage::LockMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "clusterbind.toml";

/// Session factory configuration loaded from `clusterbind.toml`.
///
/// # Example
///
/// ```toml
/// cluster_name = "clusterbind"
/// database = "test"
/// partition_count = 4
/// lock_mode = "read_committed"
/// null_value = "none"
/// autocommit = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFactoryConfig {
    /// Cluster to connect to; one factory exists per cluster name
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
    /// Database (schema) the mapped tables live in
    #[serde(default = "default_database")]
    pub database: String,
    /// Number of data partitions of the cluster
    #[serde(default = "default_partition_count")]
    pub partition_count: u32,
    /// Lock mode for reads: `"read_committed"`, `"shared"` or `"exclusive"`
    #[serde(default = "default_lock_mode")]
    pub lock_mode: String,
    /// Null-value policy for fields that do not declare one:
    /// `"none"`, `"exception"` or `"default"`
    #[serde(default = "default_null_value")]
    pub null_value: String,
    /// Whether SQL bridge statements outside an explicit transaction commit
    /// on their own
    #[serde(default = "default_autocommit")]
    pub autocommit: bool,
}

fn default_cluster_name() -> String {
    "clusterbind".to_string()
}

fn default_database() -> String {
    "test".to_string()
}

fn default_partition_count() -> u32 {
    4
}

fn default_lock_mode() -> String {
    "read_committed".to_string()
}

fn default_null_value() -> String {
    "none".to_string()
}

fn default_autocommit() -> bool {
    true
}

impl Default for SessionFactoryConfig {
    fn default() -> Self {
        Self {
            cluster_name: default_cluster_name(),
            database: default_database(),
            partition_count: default_partition_count(),
            lock_mode: default_lock_mode(),
            null_value: default_null_value(),
            autocommit: default_autocommit(),
        }
    }
}

impl SessionFactoryConfig {
    /// Default configuration for a named cluster
    pub fn for_cluster(name: impl Into<String>) -> Self {
        Self {
            cluster_name: name.into(),
            ..Self::default()
        }
    }

    /// Parse the lock mode
    ///
    /// # Errors
    ///
    /// Returns a user error for an unknown lock mode.
    pub fn lock_mode(&self) -> Result<LockMode> {
        self.lock_mode.parse::<LockMode>().map_err(|_| {
            Error::user(format!(
                "Invalid lock mode '{}' in {}. Expected \"read_committed\", \"shared\" or \"exclusive\".",
                self.lock_mode, CONFIG_FILE_NAME
            ))
        })
    }

    /// Parse the default null-value policy
    pub fn null_value(&self) -> Result<NullValue> {
        self.null_value
            .parse::<NullValue>()
            .map_err(|e| Error::user(format!("Invalid null_value in {}: {}", CONFIG_FILE_NAME, e)))
    }

    /// Check every setting
    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.trim().is_empty() {
            return Err(Error::user(format!("cluster_name in {} must not be empty", CONFIG_FILE_NAME)));
        }
        if self.partition_count == 0 {
            return Err(Error::user(format!("partition_count in {} must be at least 1", CONFIG_FILE_NAME)));
        }
        self.lock_mode()?;
        self.null_value()?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Clusterbind session factory configuration
#
# Cluster to connect to. Opening a factory for a cluster name that is
# already open returns the existing factory.
cluster_name = "clusterbind"

# Database (schema) holding the mapped tables
database = "test"

# Number of data partitions (must be at least 1)
partition_count = 4

# Lock mode for reads: "read_committed" (default), "shared" or "exclusive"
lock_mode = "read_committed"

# What writing a null into a field without its own policy does:
#   "none"      = write NULL (default)
#   "exception" = fail the operation
#   "default"   = write the column default instead
null_value = "none"

# SQL bridge statements outside an explicit transaction commit on their own
autocommit = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::user(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: SessionFactoryConfig = toml::from_str(&content).map_err(|e| {
            Error::user(format!("Failed to parse config file '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::user(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::fatal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| Error::user(format!("Failed to write config file '{}': {}", path.display(), e)))
    }
}
