//! Command mapping provider
//!
//! A command mapping is a read-only table from command identifiers (`G1`,
//! `M104`, ...) to human-readable descriptions. The translator only ever sees
//! it through the [`CommandLookup`] trait, so any table shape can back it.
//!
//! Mappings are loaded from a flat JSON object on disk, or built from a plain
//! text reference listing where each line looks like `G0-G1 - Linear Move`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MappingError;

/// File name of the bundled Marlin mapping resource
pub const MARLIN_MAPPING_FILE: &str = "marlin_mapping.json";

/// Largest number of commands a single listing range may expand to
pub const MAX_RANGE_SPAN: u32 = 10_000;

/// Read-only command description lookup
pub trait CommandLookup {
    /// Get the description for a command identifier, if known
    fn describe(&self, command: &str) -> Option<&str>;
}

impl CommandLookup for HashMap<String, String> {
    fn describe(&self, command: &str) -> Option<&str> {
        self.get(command).map(String::as_str)
    }
}

impl CommandLookup for BTreeMap<String, String> {
    fn describe(&self, command: &str) -> Option<&str> {
        self.get(command).map(String::as_str)
    }
}

/// Firmware flavor the mapping was written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FirmwareFlavor {
    /// No specific firmware, treated as Marlin
    #[default]
    Generic,
    /// Marlin firmware
    Marlin,
}

impl FirmwareFlavor {
    /// Resolve the flavor whose mapping is actually used
    pub fn resolve(self) -> Self {
        match self {
            Self::Generic | Self::Marlin => Self::Marlin,
        }
    }

    /// Default mapping resource file for this flavor
    pub fn mapping_file_name(self) -> &'static str {
        match self.resolve() {
            Self::Generic | Self::Marlin => MARLIN_MAPPING_FILE,
        }
    }

    /// Default mapping path relative to a resource directory
    pub fn default_mapping_path(self, resource_dir: &Path) -> PathBuf {
        resource_dir.join(self.mapping_file_name())
    }
}

impl std::fmt::Display for FirmwareFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::Marlin => write!(f, "marlin"),
        }
    }
}

/// Command identifier to description table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandMapping {
    entries: BTreeMap<String, String>,
}

impl CommandMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a description
    pub fn insert(&mut self, command: impl Into<String>, description: impl Into<String>) {
        self.entries.insert(command.into(), description.into());
    }

    /// Number of known commands
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no commands are known
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(command, description)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse a flat JSON object of command descriptions
    pub fn from_json_str(json: &str) -> Result<Self, MappingError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a mapping from a JSON file
    pub fn load_json_file(path: &Path) -> Result<Self, MappingError> {
        let content = std::fs::read_to_string(path)?;
        let mapping = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded {} command descriptions from {}",
            mapping.len(),
            path.display()
        );
        Ok(mapping)
    }

    /// Save the mapping as pretty-printed JSON, creating parent directories
    pub fn save_json_file(&self, path: &Path) -> Result<(), MappingError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build a mapping from a plain text reference listing
    ///
    /// Every line of the form `<code>[-<code>] <separator> <description>` adds
    /// one entry per code. Lines that do not start with a G or M code are
    /// skipped; ranges that cannot be expanded are logged and skipped.
    pub fn parse_reference_listing(text: &str) -> Self {
        static ENTRY_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        let entry_regex = ENTRY_REGEX.get_or_init(|| {
            Regex::new(r"(?i)^([GM]\d+(?:-[GM]?\d+)?)(?:[:\s-]+)(.*)$")
                .expect("invalid regex pattern")
        });

        let mut mapping = Self::new();
        for line in text.lines() {
            let Some(caps) = entry_regex.captures(line.trim()) else {
                continue;
            };
            let code = &caps[1];
            let description = caps[2].trim();

            if code.contains('-') {
                match expand_command_range(code) {
                    Ok(commands) => {
                        for command in commands {
                            mapping.insert(command, description);
                        }
                    }
                    Err(e) => tracing::warn!("Skipping listing entry: {}", e),
                }
            } else {
                mapping.insert(code.to_ascii_uppercase(), description);
            }
        }
        mapping
    }
}

impl CommandLookup for CommandMapping {
    fn describe(&self, command: &str) -> Option<&str> {
        self.entries.get(command).map(String::as_str)
    }
}

impl FromIterator<(String, String)> for CommandMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Expand a command range such as `G0-G3` or `M260-261` into its commands
///
/// A missing end letter reuses the start letter. The start letter names every
/// expanded command.
pub fn expand_command_range(range: &str) -> Result<Vec<String>, MappingError> {
    static RANGE_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let range_regex = RANGE_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^([GM])(\d+)-([GM])?(\d+)$").expect("invalid regex pattern")
    });

    let invalid = |reason: &str| MappingError::InvalidRange {
        range: range.to_string(),
        reason: reason.to_string(),
    };

    let caps = range_regex
        .captures(range.trim())
        .ok_or_else(|| invalid("expected <letter><number>-[letter]<number>"))?;

    let letter = caps[1].to_ascii_uppercase();
    if let Some(end_letter) = caps.get(3) {
        if !end_letter.as_str().eq_ignore_ascii_case(&letter) {
            return Err(invalid("range spans two command letters"));
        }
    }

    let start: u32 = caps[2].parse().map_err(|_| invalid("start is not a number"))?;
    let end: u32 = caps[4].parse().map_err(|_| invalid("end is not a number"))?;
    if end < start {
        return Err(invalid("end is below start"));
    }
    if end - start >= MAX_RANGE_SPAN {
        return Err(invalid("range is too large"));
    }

    Ok((start..=end).map(|n| format!("{}{}", letter, n)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_simple_range() {
        let commands = expand_command_range("G0-G3").unwrap();
        assert_eq!(commands, vec!["G0", "G1", "G2", "G3"]);
    }

    #[test]
    fn test_expand_range_without_end_letter() {
        let commands = expand_command_range("M260-261").unwrap();
        assert_eq!(commands, vec!["M260", "M261"]);
    }

    #[test]
    fn test_expand_range_rejects_descending() {
        let err = expand_command_range("G5-G2").unwrap_err();
        assert!(matches!(err, MappingError::InvalidRange { .. }));
    }

    #[test]
    fn test_expand_range_rejects_mixed_letters() {
        assert!(expand_command_range("G1-M3").is_err());
    }

    #[test]
    fn test_parse_reference_listing() {
        let listing = "\
G0-G1 - Linear Move
G28: Auto Home
M104 - Set Hotend Temperature
Not a command line
g4 Dwell";
        let mapping = CommandMapping::parse_reference_listing(listing);

        assert_eq!(mapping.describe("G0"), Some("Linear Move"));
        assert_eq!(mapping.describe("G1"), Some("Linear Move"));
        assert_eq!(mapping.describe("G28"), Some("Auto Home"));
        assert_eq!(mapping.describe("M104"), Some("Set Hotend Temperature"));
        assert_eq!(mapping.describe("G4"), Some("Dwell"));
        assert_eq!(mapping.len(), 5);
    }

    #[test]
    fn test_json_round_trip_shape() {
        let mapping = CommandMapping::from_json_str(r#"{"G1": "Linear Move"}"#).unwrap();
        assert_eq!(mapping.describe("G1"), Some("Linear Move"));
        assert_eq!(mapping.describe("G2"), None);

        assert!(CommandMapping::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_hash_map_lookup() {
        let mut table = HashMap::new();
        table.insert("M84".to_string(), "Disable steppers".to_string());
        assert_eq!(table.describe("M84"), Some("Disable steppers"));
    }

    #[test]
    fn test_flavor_resolves_to_marlin() {
        assert_eq!(FirmwareFlavor::Generic.resolve(), FirmwareFlavor::Marlin);
        assert_eq!(
            FirmwareFlavor::Generic.mapping_file_name(),
            MARLIN_MAPPING_FILE
        );
    }
}
