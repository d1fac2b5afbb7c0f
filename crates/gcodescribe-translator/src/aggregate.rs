//! Result aggregation
//!
//! [`ResultAggregator`] collects translated command lines into an
//! insertion-ordered map keyed by command. A key seen once holds a single
//! parameter string; every repeat promotes it to an ordered list.
//!
//! After ingestion the aggregate can be cleaned, sorted by
//! `(letter, number)`, and partitioned into primary (`G`), secondary (`M`)
//! and other command groups.

use std::borrow::Cow;
use std::collections::HashMap;

use gcodescribe_core::TranslateError;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::classifier::{FLAG_PARAMETER, PARAMETER_LABEL, UNKNOWN_COMMAND};

/// Separates the command part of a translated line from its parameters
pub const STRUCTURE_SEPARATOR: char = '|';

/// Replaces the unknown-command sentinel when a trailing comment explains it
pub const SPECIAL_COMMAND_PREFIX: &str = "Special command - ";

/// Sort value for keys without digits; undigited keys sort last in their letter group
pub const UNNUMBERED_SORT_KEY: u64 = u64::MAX;

/// Default primary command letter
pub const DEFAULT_PRIMARY_PREFIX: char = 'G';

/// Default secondary command letter
pub const DEFAULT_SECONDARY_PREFIX: char = 'M';

/// Parameters recorded for one command key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Seen once
    Single(String),
    /// Seen more than once, in order of appearance
    Multiple(Vec<String>),
}

impl ParamValue {
    /// Add another occurrence, promoting a single value to a list
    pub fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                let first = std::mem::take(first);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }

    /// Whether this value was promoted to a list
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    /// Number of recorded occurrences
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(values) => values.len(),
        }
    }

    /// Whether no occurrences are recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the recorded values
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multiple(values) => values,
        };
        values.iter().map(String::as_str)
    }

    /// All values joined into one string
    pub fn joined(&self, separator: &str) -> String {
        self.iter().collect::<Vec<_>>().join(separator)
    }

    fn map_each(&mut self, f: impl Fn(&str) -> String) {
        match self {
            Self::Single(value) => *value = f(value),
            Self::Multiple(values) => {
                for value in values.iter_mut() {
                    *value = f(value);
                }
            }
        }
    }
}

/// What happened to an ingested line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Not a structured line
    Ignored,
    /// Structured line that could not be keyed
    Malformed(TranslateError),
    /// First occurrence of a key
    Inserted,
    /// Second occurrence; the key now holds a list
    Promoted,
    /// Later occurrence appended to an existing list
    Appended,
}

/// Parse a structured line into `(key, parameters)`
///
/// Returns `None` for lines without a separator. Extraction is best effort:
/// extra separators are tolerated, only an empty key is rejected.
pub fn parse_structured_line(line: &str) -> Option<Result<(String, String), TranslateError>> {
    let (head, tail) = line.split_once(STRUCTURE_SEPARATOR)?;

    let mut key = head.trim().to_string();
    if key.is_empty() {
        return Some(Err(TranslateError::MalformedStructuredLine {
            line: line.trim_end().to_string(),
        }));
    }

    let hint = line
        .rsplit_once(';')
        .map(|(_, hint)| hint.trim())
        .unwrap_or_default();
    if key.contains(UNKNOWN_COMMAND) && !hint.is_empty() {
        key = key.replace(
            UNKNOWN_COMMAND,
            &format!("{}{}", SPECIAL_COMMAND_PREFIX, hint),
        );
    }

    let segment = tail.split(STRUCTURE_SEPARATOR).next().unwrap_or(tail);
    let segment = segment.split(';').next().unwrap_or(segment);
    let mut params = segment
        .trim_matches(|c: char| matches!(c, ' ' | ',' | '\t' | '\r' | '\n'))
        .to_string();

    if params.contains(PARAMETER_LABEL) {
        let label_only = params
            .split_once(':')
            .is_some_and(|(_, rest)| rest.trim().is_empty());
        if label_only {
            params.push(' ');
            params.push_str(FLAG_PARAMETER);
        }
    }

    Some(Ok((key, params)))
}

/// Sort key `(leading character, digits in key)` for a command key
pub fn command_sort_key(key: &str) -> (char, u64) {
    let prefix = key.chars().next().unwrap_or_default();
    let digits: String = key.chars().filter(char::is_ascii_digit).collect();
    let number = if digits.is_empty() {
        UNNUMBERED_SORT_KEY
    } else {
        digits.parse().unwrap_or(UNNUMBERED_SORT_KEY)
    };
    (prefix, number)
}

/// Group boundaries for [`ResultAggregator::partition`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOptions {
    /// Leading character of the primary group
    pub primary_prefix: char,
    /// Leading character of the secondary group
    pub secondary_prefix: char,
    /// Join list values into one string so every value is a string
    pub stringify_multiple: bool,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            primary_prefix: DEFAULT_PRIMARY_PREFIX,
            secondary_prefix: DEFAULT_SECONDARY_PREFIX,
            stringify_multiple: false,
        }
    }
}

/// Post-processing applied by [`ResultAggregator::finalize`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Marker removed from every value; `None` skips cleaning
    pub clean_marker: Option<String>,
    /// Sort keys by `(letter, number)`
    pub sort: bool,
    /// Split into primary, secondary and other groups
    pub filter: bool,
    /// Group boundaries
    pub partition: PartitionOptions,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            clean_marker: Some(PARAMETER_LABEL.to_string()),
            sort: true,
            filter: true,
            partition: PartitionOptions::default(),
        }
    }
}

/// Ordered, borrowed view of some aggregate entries
///
/// Serializes as a JSON object preserving entry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandGroup<'a> {
    entries: Vec<(&'a str, Cow<'a, ParamValue>)>,
}

impl<'a> CommandGroup<'a> {
    fn push(&mut self, key: &'a str, value: Cow<'a, ParamValue>) {
        self.entries.push((key, value));
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the group is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in group order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| *key)
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| &**v)
    }

    /// Iterate over `(key, value)` pairs in group order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (*k, &**v))
    }
}

impl Serialize for CommandGroup<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, &**value)?;
        }
        map.end()
    }
}

/// Aggregate split into three disjoint groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionedResult<'a> {
    /// Keys starting with the primary prefix
    pub primary: CommandGroup<'a>,
    /// Keys starting with the secondary prefix
    pub secondary: CommandGroup<'a>,
    /// Every other key
    pub other: CommandGroup<'a>,
}

impl<'a> PartitionedResult<'a> {
    /// The groups in `[primary, secondary, other]` order
    pub fn into_groups(self) -> Vec<CommandGroup<'a>> {
        vec![self.primary, self.secondary, self.other]
    }
}

impl Serialize for PartitionedResult<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.primary)?;
        seq.serialize_element(&self.secondary)?;
        seq.serialize_element(&self.other)?;
        seq.end()
    }
}

/// Insertion-ordered aggregate of translated command lines
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    entries: Vec<(String, ParamValue)>,
    index: HashMap<String, usize>,
}

impl ResultAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one translated line into the aggregate
    pub fn ingest(&mut self, translated: &str) -> IngestOutcome {
        let (key, params) = match parse_structured_line(translated) {
            None => return IngestOutcome::Ignored,
            Some(Err(e)) => {
                tracing::debug!("{}", e);
                return IngestOutcome::Malformed(e);
            }
            Some(Ok(parsed)) => parsed,
        };

        match self.index.get(&key) {
            Some(&i) => {
                let value = &mut self.entries[i].1;
                let outcome = if value.is_multiple() {
                    IngestOutcome::Appended
                } else {
                    IngestOutcome::Promoted
                };
                value.push(params);
                outcome
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, ParamValue::Single(params)));
                IngestOutcome::Inserted
            }
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was aggregated
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Keys in current order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Iterate over `(key, value)` pairs in current order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Remove `marker` from every value and trim the result
    pub fn clean(&mut self, marker: &str) {
        for (_, value) in self.entries.iter_mut() {
            value.map_each(|v| v.replace(marker, "").trim().to_string());
        }
    }

    /// Stable sort by `(leading character, numeric suffix)`
    pub fn sort(&mut self) {
        self.entries.sort_by_key(|(key, _)| command_sort_key(key));
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();
    }

    /// Split entries into primary, secondary and other groups, keeping order
    pub fn partition(&self, options: &PartitionOptions) -> PartitionedResult<'_> {
        let mut result = PartitionedResult::default();
        for (key, value) in &self.entries {
            let value = if options.stringify_multiple && value.is_multiple() {
                Cow::Owned(ParamValue::Single(value.joined(", ")))
            } else {
                Cow::Borrowed(value)
            };

            let group = if key.starts_with(options.primary_prefix) {
                &mut result.primary
            } else if key.starts_with(options.secondary_prefix) {
                &mut result.secondary
            } else {
                &mut result.other
            };
            group.push(key.as_str(), value);
        }
        result
    }

    /// Apply the cleaning and sorting steps of `options`
    pub fn finalize(&mut self, options: &OutputOptions) {
        if let Some(marker) = options.clean_marker.as_deref() {
            self.clean(marker);
        }
        if options.sort {
            self.sort();
        }
    }

    /// Output groups per `options`: three groups when filtering, else one
    pub fn groups(&self, options: &OutputOptions) -> Vec<CommandGroup<'_>> {
        if options.filter {
            return self.partition(&options.partition).into_groups();
        }

        let mut all = CommandGroup::default();
        for (key, value) in &self.entries {
            all.push(key.as_str(), Cow::Borrowed(value));
        }
        vec![all]
    }
}
