//! Configuration module for mediaql.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, EngineSettings, LoggingSettings, Settings, SettingsError, StoreSettings,
};
