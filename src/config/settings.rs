//! TOML-based configuration for mediaql.
//!
//! Supports a config file (mediaql.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [engine]
//! dialect = "postgres"
//! max_in_values = 500
//!
//! [naming]
//! item_table = "MEDIA_ITEMS"
//! item_id_column = "MEDIA_ITEM_ID"
//! value_order_column = "VALUE_ORDER"
//!
//! [store]
//! database = "${HOME}/media/library.db"
//!
//! [logging]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compiler::{CompilerOptions, DEFAULT_MAX_IN_VALUES};
use crate::schema::StorageNaming;
use crate::sql::Dialect;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Compiler settings.
    pub engine: EngineSettings,

    /// Physical naming conventions of the media store.
    pub naming: StorageNaming,

    /// Store location.
    pub store: StoreSettings,

    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Compiler settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// SQL dialect of the store (sqlite, postgres, tsql).
    pub dialect: Dialect,

    /// Largest IN list before it is split into OR'ed clusters.
    pub max_in_values: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_in_values: DEFAULT_MAX_IN_VALUES,
        }
    }
}

impl EngineSettings {
    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            dialect: self.dialect,
            max_in_values: self.max_in_values,
        }
    }
}

/// Store settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database path (supports ${ENV_VAR} expansion).
    pub database: Option<String>,
}

impl StoreSettings {
    /// Get the database path with environment variables expanded.
    pub fn resolved_database(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.database
            .as_deref()
            .map(|path| expand_env_vars(path).map(PathBuf::from))
            .transpose()
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `MEDIAQL_LOG` is not set.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `MEDIAQL_CONFIG`
    /// 2. `./mediaql.toml`
    /// 3. `~/.config/mediaql/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("MEDIAQL_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("mediaql.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("mediaql").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject settings the compiler cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.engine.max_in_values == 0 {
            return Err(SettingsError::InvalidConfig(
                "engine.max_in_values must be greater than 0".to_string(),
            ));
        }
        self.naming
            .validate()
            .map_err(|e| SettingsError::InvalidConfig(e.to_string()))
    }

    pub fn compiler_options(&self) -> CompilerOptions {
        self.engine.compiler_options()
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                result.push('$');
                continue;
            }
        }

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
