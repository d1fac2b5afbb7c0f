//! Configuration for gcodescribe
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats; the default file lives in the
//! platform config directory.
//!
//! Configuration is organized into logical sections:
//! - Mapping selection (firmware flavor, mapping file)
//! - Translation behaviour (comment truncation, blacklist, previews)
//! - Output shaping (transcript, cleaning, sorting, grouping)

use std::path::{Path, PathBuf};

use gcodescribe_core::FirmwareFlavor;
use gcodescribe_translator::aggregate::{DEFAULT_PRIMARY_PREFIX, DEFAULT_SECONDARY_PREFIX};
use gcodescribe_translator::classifier::PARAMETER_LABEL;
use gcodescribe_translator::preview::{
    DEFAULT_BEGIN_MARKER, DEFAULT_END_MARKER, DEFAULT_PREVIEW_STEM,
};
use gcodescribe_translator::{
    CommentBlacklist, ImageMarkers, OutputOptions, PartitionOptions, PreviewMode,
    TranslatorOptions, DEFAULT_COMMENT_LIMIT,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Application directory name under the platform config directory
pub const APP_DIR_NAME: &str = "gcodescribe";

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default transcript file
pub const DEFAULT_TRANSCRIPT_FILE: &str = "output.txt";

/// Mapping selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Firmware flavor picking the bundled mapping file
    pub flavor: FirmwareFlavor,
    /// Explicit mapping file, overriding the flavor default
    pub path: Option<PathBuf>,
}

impl MappingSettings {
    /// Mapping file to load, resolving the flavor default against `resource_dir`
    pub fn resolve_path(&self, resource_dir: &Path) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => self.flavor.default_mapping_path(resource_dir),
        }
    }
}

/// Preview image handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Ignore, capture, or store image blocks
    pub mode: PreviewMode,
    /// Prefix of the line opening an image block
    pub begin_marker: String,
    /// Prefix of the line closing an image block
    pub end_marker: String,
    /// Directory receiving stored previews; the working directory if unset
    pub output_dir: Option<PathBuf>,
    /// File name stem of stored previews
    pub file_stem: String,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            mode: PreviewMode::default(),
            begin_marker: DEFAULT_BEGIN_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            output_dir: None,
            file_stem: DEFAULT_PREVIEW_STEM.to_string(),
        }
    }
}

/// Translation behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    /// End index (in characters) for informational comment truncation
    pub comment_limit: usize,
    /// Terms rejecting informational comments
    pub blacklist: CommentBlacklist,
    /// Preview image handling
    pub preview: PreviewSettings,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            comment_limit: DEFAULT_COMMENT_LIMIT,
            blacklist: CommentBlacklist::default(),
            preview: PreviewSettings::default(),
        }
    }
}

/// Output shaping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Write the raw transcript
    pub transcript: bool,
    /// Raw transcript destination
    pub transcript_path: PathBuf,
    /// Strip `clean_marker` from aggregate values
    pub clean: bool,
    /// Marker stripped from aggregate values
    pub clean_marker: String,
    /// Sort aggregate keys
    pub sort: bool,
    /// Split the aggregate into groups
    pub filter: bool,
    /// Join multi-occurrence values into one string
    pub stringify_multiple: bool,
    /// Leading character of the primary group
    pub primary_prefix: char,
    /// Leading character of the secondary group
    pub secondary_prefix: char,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            transcript: true,
            transcript_path: PathBuf::from(DEFAULT_TRANSCRIPT_FILE),
            clean: true,
            clean_marker: PARAMETER_LABEL.to_string(),
            sort: true,
            filter: true,
            stringify_multiple: true,
            primary_prefix: DEFAULT_PRIMARY_PREFIX,
            secondary_prefix: DEFAULT_SECONDARY_PREFIX,
        }
    }
}

impl OutputSettings {
    /// Transcript destination, if a transcript is written
    pub fn transcript_path(&self) -> Option<&Path> {
        self.transcript.then_some(self.transcript_path.as_path())
    }

    /// Marker to strip, if cleaning is enabled
    pub fn clean_marker(&self) -> Option<&str> {
        self.clean.then_some(self.clean_marker.as_str())
    }
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mapping selection
    pub mapping: MappingSettings,
    /// Translation behaviour
    pub translation: TranslationSettings,
    /// Output shaping
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location
    pub fn default_config_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            SettingsError::Config(ConfigError::UnsupportedPlatform(
                std::env::consts::OS.to_string(),
            ))
        })?;
        Ok(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else the default file if it exists, else defaults
    ///
    /// An explicit path must exist; a missing default file is not an error.
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        match Self::default_config_path() {
            Ok(default) if default.is_file() => Self::load_from_file(&default),
            Ok(_) => Ok(Self::default()),
            Err(e) => {
                debug!("No config directory: {}", e);
                Ok(Self::default())
            }
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.translation.comment_limit == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "translation.comment_limit".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        let preview = &self.translation.preview;
        if preview.begin_marker.is_empty() {
            return Err(SettingsError::InvalidSetting {
                key: "translation.preview.begin_marker".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if preview.end_marker.is_empty() {
            return Err(SettingsError::InvalidSetting {
                key: "translation.preview.end_marker".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if preview.file_stem.trim().is_empty() {
            return Err(SettingsError::InvalidSetting {
                key: "translation.preview.file_stem".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.output.primary_prefix == self.output.secondary_prefix {
            return Err(ConfigError::Conflict {
                first: "output.primary_prefix".to_string(),
                second: "output.secondary_prefix".to_string(),
                value: self.output.primary_prefix.to_string(),
            }
            .into());
        }

        if self.output.clean && self.output.clean_marker.is_empty() {
            return Err(SettingsError::InvalidSetting {
                key: "output.clean_marker".to_string(),
                reason: "must not be empty; set output.clean = false to disable cleaning"
                    .to_string(),
            });
        }

        if self.output.transcript && self.output.transcript_path.as_os_str().is_empty() {
            return Err(SettingsError::InvalidSetting {
                key: "output.transcript_path".to_string(),
                reason: "must not be empty; set output.transcript = false to disable it"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Options for the line translator
    pub fn translator_options(&self) -> TranslatorOptions {
        let translation = &self.translation;
        TranslatorOptions {
            markers: ImageMarkers {
                begin: translation.preview.begin_marker.clone(),
                end: translation.preview.end_marker.clone(),
            },
            preview_mode: translation.preview.mode,
            blacklist: translation.blacklist.clone(),
            comment_limit: translation.comment_limit,
        }
    }

    /// Options for finalizing and grouping the aggregate
    pub fn output_options(&self) -> OutputOptions {
        let output = &self.output;
        OutputOptions {
            clean_marker: output.clean_marker().map(str::to_string),
            sort: output.sort,
            filter: output.filter,
            partition: PartitionOptions {
                primary_prefix: output.primary_prefix,
                secondary_prefix: output.secondary_prefix,
                stringify_multiple: output.stringify_multiple,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.translation.comment_limit, DEFAULT_COMMENT_LIMIT);
        assert_eq!(
            config.output.transcript_path(),
            Some(Path::new(DEFAULT_TRANSCRIPT_FILE))
        );
        assert_eq!(config.output.clean_marker(), Some(PARAMETER_LABEL));
        assert_eq!(config.translation.preview.mode, PreviewMode::Store);
        assert!(config.output.stringify_multiple);
    }

    #[test]
    fn test_validate_rejects_zero_comment_limit() {
        let mut config = Config::new();
        config.translation.comment_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(SettingsError::Config(ConfigError::ValueOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_equal_prefixes() {
        let mut config = Config::new();
        config.output.secondary_prefix = 'G';
        assert!(matches!(
            config.validate(),
            Err(SettingsError::Config(ConfigError::Conflict { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_markers() {
        let mut config = Config::new();
        config.translation.preview.end_marker.clear();
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_clean_marker_only_when_cleaning() {
        let mut config = Config::new();
        config.output.clean_marker.clear();
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { key, .. }) if key == "output.clean_marker"
        ));

        config.output.clean = false;
        assert!(config.validate().is_ok());
        assert_eq!(config.output_options().clean_marker, None);
    }

    #[test]
    fn test_disabled_outputs_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [output]
            transcript = false
            clean = false
            "#,
        )
        .unwrap();
        assert_eq!(config.output.transcript_path(), None);
        assert_eq!(config.output.clean_marker(), None);
        assert_eq!(config.output_options().clean_marker, None);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [translation]
            comment_limit = 80

            [output]
            sort = false
            "#,
        )
        .unwrap();
        assert_eq!(config.translation.comment_limit, 80);
        assert!(!config.output.sort);
        assert!(config.output.filter);
        assert_eq!(config.translation.blacklist, CommentBlacklist::default());
    }

    #[test]
    fn test_flavor_and_blacklist_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [mapping]
            flavor = "marlin"

            [translation]
            blacklist = ["Estimated", "layer"]

            [translation.preview]
            mode = "ignore"
            "#,
        )
        .unwrap();
        assert_eq!(config.mapping.flavor, FirmwareFlavor::Marlin);
        assert_eq!(
            config.translation.blacklist.terms(),
            &["estimated".to_string(), "layer".to_string()]
        );
        assert_eq!(config.translation.preview.mode, PreviewMode::Ignore);
    }

    #[test]
    fn test_translator_and_output_options() {
        let mut config = Config::new();
        config.translation.preview.begin_marker = "; png begin".to_string();
        config.output.stringify_multiple = false;
        config.output.clean = false;

        let translator = config.translator_options();
        assert_eq!(translator.markers.begin, "; png begin");
        assert_eq!(translator.markers.end, DEFAULT_END_MARKER);

        let output = config.output_options();
        assert!(!output.partition.stringify_multiple);
        assert_eq!(output.clean_marker, None);
        assert_eq!(output.partition.primary_prefix, 'G');
    }

    #[test]
    fn test_mapping_path_resolution() {
        let resources = Path::new("/opt/gcodescribe");
        let mut mapping = MappingSettings::default();
        assert_eq!(
            mapping.resolve_path(resources),
            resources.join(FirmwareFlavor::Marlin.mapping_file_name())
        );

        mapping.path = Some(PathBuf::from("custom.json"));
        assert_eq!(mapping.resolve_path(resources), PathBuf::from("custom.json"));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            ConfigFormat::from_path(Path::new("config.yaml")),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"
        ));
        assert_eq!(
            ConfigFormat::from_path(Path::new("config.TOML")).unwrap(),
            ConfigFormat::Toml
        );
    }
}
