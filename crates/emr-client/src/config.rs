//! API connection settings and their persistence.
//!
//! Settings are stored as TOML in the platform-specific config folder:
//! - macOS: ~/Library/Application Support/org.emr-reports.EMR Reports/
//! - Windows: %APPDATA%/emr-reports/config/
//! - Linux: ~/.config/emr-reports/

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

const APP_QUALIFIER: &str = "org";
const APP_ORG: &str = "emr-reports";
const APP_NAME: &str = "EMR Reports";
const CONFIG_FILENAME: &str = "api.toml";

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "EMR_API_KEY";

/// API version used when the config does not name one.
pub const DEFAULT_API_VERSION: &str = "v1";

/// Where and how to reach the EMR API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Sent verbatim as the `Authorization` header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 9000,
            version: None,
            api_key: None,
        }
    }
}

impl ApiConfig {
    /// Base URL every API path is resolved against.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/api/{}/",
            self.protocol,
            self.host,
            self.port,
            self.version.as_deref().unwrap_or(DEFAULT_API_VERSION)
        )
    }

    /// Applies overrides from the environment.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.api_key = Some(key);
        }
        self
    }
}

/// Get the path to the default config file.
///
/// Returns `None` if the platform-specific directory cannot be determined.
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

/// Load the API config.
///
/// An explicit `path` must exist and parse. Without one, the default location
/// is tried and any problem there falls back to defaults with a warning.
pub fn load_config(path: Option<&Path>) -> Result<ApiConfig> {
    if let Some(path) = path {
        let content = fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = toml::from_str(&content)
            .map_err(|e| ApiError::Config(format!("failed to parse {}: {e}", path.display())))?;
        tracing::debug!("Loaded API config from {:?}", path);
        return Ok(config);
    }

    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config path, using defaults");
        return Ok(ApiConfig::default());
    };

    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::debug!("Loaded API config from {:?}", path);
                Ok(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse API config: {}, using defaults", e);
                Ok(ApiConfig::default())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No API config found at {:?}, using defaults", path);
            Ok(ApiConfig::default())
        }
        Err(e) => {
            tracing::warn!("Failed to read API config: {}, using defaults", e);
            Ok(ApiConfig::default())
        }
    }
}

/// Save the API config, creating the parent directory if needed.
pub fn save_config(config: &ApiConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ApiError::Config(format!("failed to create config directory: {e}")))?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| ApiError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, content)
        .map_err(|e| ApiError::Config(format!("failed to write config file: {e}")))?;
    tracing::info!("Saved API config to {:?}", path);
    Ok(())
}
