//! Configuration file loading and management
//!
//! This module handles loading and parsing the controller configuration from
//! `$XDG_CONFIG_HOME/picker-sync/config.toml`. If the configuration file
//! doesn't exist, a default configuration is created with documented
//! comments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main controller configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Picker feature configuration
    pub picker: PickerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Preference store configuration
    #[serde(default)]
    pub prefs: PrefsConfig,
}

/// Picker feature configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PickerConfig {
    /// Whether cloud media is shown in the photo picker at all
    /// Default: true
    pub cloud_media_enabled: bool,
    /// Authority of the built-in local provider
    /// Default: "local"
    pub local_provider_authority: String,
    /// Package allowed to be auto-selected when no provider is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_cloud_provider_package: Option<String>,
    /// Packages whose providers may be selected as the cloud provider.
    /// An empty list allows none.
    #[serde(default)]
    pub allowed_cloud_packages: Vec<String>,
    /// Page size requested from providers during paged syncs
    /// Default: 500
    pub sync_page_size: i32,
}

/// Database configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to the picker database (SQLite)
    /// If None, uses XDG_DATA_HOME/picker-sync/picker.db
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Preference store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PrefsConfig {
    /// Directory holding the user-prefs and sync-prefs files
    /// If None, uses XDG_DATA_HOME/picker-sync/prefs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            picker: PickerConfig::default(),
            database: DatabaseConfig::default(),
            prefs: PrefsConfig::default(),
        }
    }
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            cloud_media_enabled: true,
            local_provider_authority: "local".to_string(),
            default_cloud_provider_package: None,
            allowed_cloud_packages: Vec::new(),
            sync_page_size: 500,
        }
    }
}

impl Config {
    /// Load configuration from the specified path
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    /// The parsed configuration or an error if loading/parsing fails
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default XDG config location
    ///
    /// If the configuration file doesn't exist, creates a default
    /// configuration file with documented comments.
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_file(&config_path)?;
        }

        Self::load(&config_path)
    }

    /// Get the default configuration file path
    ///
    /// Returns `$XDG_CONFIG_HOME/picker-sync/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "soluna-labs", "picker-sync")
            .context("Failed to determine project directories")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Create a default configuration file with documented comments
    fn create_default_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let default_config = Self::default_config_content();
        fs::write(path, default_config)
            .with_context(|| format!("Failed to write default config file: {}", path.display()))?;

        tracing::info!("Created default configuration file at: {}", path.display());
        Ok(())
    }

    /// Generate the default configuration file content with comments
    fn default_config_content() -> String {
        r#"# Picker Sync Configuration
# This file configures the picker sync controller.

[picker]
# Whether cloud media is shown in the photo picker at all.
# When false, no cloud provider can be selected and cloud syncs are no-ops.
cloud_media_enabled = true

# Authority of the built-in local provider.
local_provider_authority = "local"

# Package allowed to be auto-selected when no cloud provider has ever been
# configured. Must also appear in allowed_cloud_packages.
# default_cloud_provider_package = "com.example.photos"

# Packages whose providers may be selected as the cloud provider.
# An empty list allows none.
allowed_cloud_packages = []

# Page size requested from providers during paged syncs.
sync_page_size = 500

[database]
# Path to the picker SQLite database.
# If not specified, defaults to $XDG_DATA_HOME/picker-sync/picker.db
# path = "/path/to/picker.db"

[prefs]
# Directory holding the user-prefs and sync-prefs files.
# If not specified, defaults to $XDG_DATA_HOME/picker-sync/prefs
# dir = "/path/to/prefs"
"#
        .to_string()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.picker.local_provider_authority.is_empty() {
            anyhow::bail!("picker.local_provider_authority must not be empty");
        }

        if self.picker.sync_page_size <= 0 {
            anyhow::bail!(
                "picker.sync_page_size must be greater than 0, got {}",
                self.picker.sync_page_size
            );
        }

        if let Some(ref pkg) = self.picker.default_cloud_provider_package {
            if pkg.is_empty() {
                anyhow::bail!("picker.default_cloud_provider_package must not be empty when set");
            }
        }

        Ok(())
    }

    /// Whether the cloud-picker feature is on.
    pub fn is_cloud_media_enabled(&self) -> bool {
        self.picker.cloud_media_enabled
    }

    /// Package auto-selected when no provider has ever been configured.
    pub fn default_cloud_provider_package(&self) -> Option<&str> {
        self.picker.default_cloud_provider_package.as_deref()
    }

    /// Whether a package passes the cloud-provider allow-list.
    pub fn is_package_allowed(&self, package: &str) -> bool {
        self.picker.allowed_cloud_packages.iter().any(|p| p == package)
    }

    /// Get the picker database path
    ///
    /// Returns the configured path or the default XDG data directory path
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(ref path) = self.database.path {
            return Ok(path.clone());
        }

        let dirs = directories::ProjectDirs::from("", "soluna-labs", "picker-sync")
            .context("Failed to determine project directories")?;

        Ok(dirs.data_dir().join("picker.db"))
    }

    /// Get the preference store directory
    pub fn prefs_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.prefs.dir {
            return Ok(dir.clone());
        }

        let dirs = directories::ProjectDirs::from("", "soluna-labs", "picker-sync")
            .context("Failed to determine project directories")?;

        Ok(dirs.data_dir().join("prefs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.picker.cloud_media_enabled);
        assert_eq!(config.picker.local_provider_authority, "local");
        assert_eq!(config.picker.sync_page_size, 500);
        assert!(config.picker.allowed_cloud_packages.is_empty());
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[picker]
cloud_media_enabled = true
local_provider_authority = "local"
default_cloud_provider_package = "com.example.photos"
allowed_cloud_packages = ["com.example.photos", "com.other.gallery"]
sync_page_size = 200

[database]
path = "/tmp/picker.db"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.picker.sync_page_size, 200);
        assert_eq!(
            config.default_cloud_provider_package(),
            Some("com.example.photos")
        );
        assert!(config.is_package_allowed("com.other.gallery"));
        assert!(!config.is_package_allowed("com.stranger.app"));
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/picker.db"));
    }

    #[test]
    fn test_load_minimal_config() {
        let config_content = r#"
[picker]
cloud_media_enabled = false
local_provider_authority = "local"
sync_page_size = 500
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert!(!config.is_cloud_media_enabled());
        assert!(config.picker.allowed_cloud_packages.is_empty());
    }

    #[test]
    fn test_validate_empty_local_authority() {
        let mut config = Config::default();
        config.picker.local_provider_authority = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_page_size() {
        let mut config = Config::default();
        config.picker.sync_page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_config_roundtrip() {
        let mut config = Config::default();
        config.picker.allowed_cloud_packages = vec!["com.example.photos".to_string()];
        config.picker.default_cloud_provider_package = Some("com.example.photos".to_string());

        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }
}
