//! Loader Options
//!
//! Configuration for the package resolver, loadable from TOML:
//!
//! ```toml
//! locations = ["js/private", ".", "lib"]
//! extension = "toml"
//! error_level = "warn"
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::errors::ErrorLevel;

/// File name of the per-user configuration file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory (under the platform config dir) holding the configuration file.
pub const CONFIG_DIR_NAME: &str = "just";

/// Default file suffix appended to derived package paths.
pub const DEFAULT_EXTENSION: &str = "toml";

fn default_locations() -> Vec<String> {
    vec![".".to_string(), "lib".to_string()]
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadOptions {
    /// Ordered base locations; earlier entries take precedence.
    #[serde(default = "default_locations")]
    pub locations: Vec<String>,

    /// Suffix appended to derived paths (without the dot).
    #[serde(default = "default_extension")]
    pub extension: String,

    /// How load failures are surfaced.
    #[serde(default)]
    pub error_level: ErrorLevel,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            locations: default_locations(),
            extension: default_extension(),
            error_level: ErrorLevel::default(),
        }
    }
}

/// Errors reading loader configuration.
#[derive(Debug)]
pub enum OptionsError {
    /// Configuration file could not be read.
    Io(PathBuf, std::io::Error),
    /// Configuration was not valid TOML for `LoadOptions`.
    Parse(toml::de::Error),
}

impl std::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsError::Io(path, err) => {
                write!(f, "Failed to read '{}': {}", path.display(), err)
            }
            OptionsError::Parse(err) => write!(f, "Invalid loader configuration: {}", err),
        }
    }
}

impl std::error::Error for OptionsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OptionsError::Io(_, err) => Some(err),
            OptionsError::Parse(err) => Some(err),
        }
    }
}

impl LoadOptions {
    /// Parse options from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, OptionsError> {
        toml::from_str(content).map_err(OptionsError::Parse)
    }

    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OptionsError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&content)
    }

    /// Path of the per-user configuration file, if the platform has a config dir.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the per-user configuration, falling back to defaults when it does not exist.
    pub fn load_default() -> Result<Self, OptionsError> {
        match Self::user_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_error_level(mut self, level: ErrorLevel) -> Self {
        self.error_level = level;
        self
    }
}
