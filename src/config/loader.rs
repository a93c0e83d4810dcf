//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::{ServerEndpoint, Settings};
use crate::config::validation::{validate_settings, ValidationError};

/// Default location of the settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_PATH: &str = "settings/connection.json";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Validation(Vec<ValidationError>),
    /// The requested server section is absent.
    MissingServer(String),
    /// The endpoint address could not be resolved.
    Resolve(String, std::io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::MissingServer(name) => write!(f, "No settings for server '{}'", name),
            ConfigError::Resolve(addr, e) => write!(f, "Cannot resolve {}: {}", addr, e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate settings from a JSON file.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let settings: Settings = serde_json::from_str(&content).map_err(ConfigError::Parse)?;

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}

/// Settings file handle.
///
/// Nothing is cached: every call re-reads the file, so calling [`load`] again
/// is the reload operation.
///
/// [`load`]: SettingsSource::load
#[derive(Debug, Clone)]
pub struct SettingsSource {
    path: PathBuf,
}

impl SettingsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole settings file.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        load_settings(&self.path)
    }

    /// Read the endpoint of a single server section.
    pub fn load_endpoint(&self, server: &str) -> Result<ServerEndpoint, ConfigError> {
        let settings = self.load()?;
        settings.endpoint(server).cloned()
    }
}

impl Default for SettingsSource {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_PATH)
    }
}
