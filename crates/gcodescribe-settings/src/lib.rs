//! gcodescribe Settings Crate
//!
//! Handles configuration loading, validation and persistence.

pub mod config;
pub mod error;

pub use config::{
    Config, MappingSettings, OutputSettings, PreviewSettings, TranslationSettings, APP_DIR_NAME,
    CONFIG_FILE_NAME, DEFAULT_TRANSCRIPT_FILE,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
