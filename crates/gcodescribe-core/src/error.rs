//! Error handling for gcodescribe
//!
//! Provides error types for every layer of the translator:
//! - Translation errors (recoverable, reported as diagnostics)
//! - Mapping errors (loading or parsing command description tables)
//!
//! Nothing raised while translating a line is fatal to the run. Translation
//! errors are wrapped in a [`Diagnostic`] carrying the line number and handed
//! back to the caller instead of aborting the line-by-line iteration.
//!
//! All error types use `thiserror` for ergonomic error handling.

use std::fmt;

use thiserror::Error;

/// Translation error type
///
/// Represents the local, recoverable failure modes of the line classifier
/// and the result aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// No command mapping could be loaded; every command is left undescribed
    #[error("Command mapping unavailable: {reason}")]
    MappingUnavailable {
        /// Why the mapping could not be loaded.
        reason: String,
    },

    /// An embedded preview payload could not be decoded
    #[error("Failed to decode preview image: {reason}")]
    ImageDecodeFailure {
        /// The decoder's failure description.
        reason: String,
    },

    /// An image block was closed without any captured fragments
    #[error("No preview image data found")]
    EmptyImageBlock,

    /// A decoded preview could not be handed to its sink
    #[error("Failed to store preview image: {reason}")]
    PreviewStore {
        /// The sink's failure description.
        reason: String,
    },

    /// A line contained the structure separator but not the expected shape
    #[error("Malformed structured line: {line}")]
    MalformedStructuredLine {
        /// The offending translated line.
        line: String,
    },
}

impl TranslateError {
    /// Check if this error concerns an embedded preview image
    pub fn is_preview_error(&self) -> bool {
        matches!(
            self,
            TranslateError::ImageDecodeFailure { .. }
                | TranslateError::EmptyImageBlock
                | TranslateError::PreviewStore { .. }
        )
    }
}

/// A recoverable problem attributed to an input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// One-based input line number, `None` when not tied to a line.
    pub line_number: Option<u64>,
    /// What went wrong.
    pub error: TranslateError,
}

impl Diagnostic {
    /// Create a diagnostic tied to an input line
    pub fn at_line(line_number: u64, error: TranslateError) -> Self {
        Self {
            line_number: Some(line_number),
            error,
        }
    }

    /// Create a diagnostic that applies to the whole run
    pub fn global(error: TranslateError) -> Self {
        Self {
            line_number: None,
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_number {
            Some(line) => write!(f, "line {}: {}", line, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Mapping error type
///
/// Represents errors related to loading, parsing, or saving a command mapping.
#[derive(Error, Debug)]
pub enum MappingError {
    /// The mapping file could not be read or written
    #[error("Mapping I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The mapping file is not a flat JSON object of strings
    #[error("Invalid mapping JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A command range in a reference listing could not be expanded
    #[error("Invalid command range '{range}': {reason}")]
    InvalidRange {
        /// The range text as it appeared in the listing.
        range: String,
        /// Why the range was rejected.
        reason: String,
    },
}

/// Main error type for gcodescribe
///
/// A unified error type that can represent any error from the library crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Translation error
    #[error(transparent)]
    Translate(#[from] TranslateError),

    /// Mapping error
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a mapping error
    pub fn is_mapping_error(&self) -> bool {
        matches!(
            self,
            Error::Mapping(_) | Error::Translate(TranslateError::MappingUnavailable { .. })
        )
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_error_display() {
        let err = TranslateError::MappingUnavailable {
            reason: "file not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command mapping unavailable: file not found"
        );

        let err = TranslateError::EmptyImageBlock;
        assert_eq!(err.to_string(), "No preview image data found");

        let err = TranslateError::MalformedStructuredLine {
            line: "| X10".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed structured line: | X10");
    }

    #[test]
    fn test_preview_error_classification() {
        assert!(TranslateError::EmptyImageBlock.is_preview_error());
        assert!(TranslateError::ImageDecodeFailure {
            reason: "bad".to_string()
        }
        .is_preview_error());
        assert!(!TranslateError::MalformedStructuredLine {
            line: String::new()
        }
        .is_preview_error());
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::at_line(42, TranslateError::EmptyImageBlock);
        assert_eq!(diag.to_string(), "line 42: No preview image data found");

        let diag = Diagnostic::global(TranslateError::MappingUnavailable {
            reason: "offline".to_string(),
        });
        assert_eq!(diag.to_string(), "Command mapping unavailable: offline");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = TranslateError::EmptyImageBlock.into();
        assert!(matches!(err, Error::Translate(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = MappingError::from(io_err).into();
        assert!(err.is_mapping_error());
    }
}
