//! Line classification and translation
//!
//! [`LineTranslator`] consumes a G-code file one line at a time and decides
//! what every line is: an image block marker, an image fragment, an
//! informational comment, a plain comment or blank line, or a firmware
//! command. Commands are rewritten as
//! `<command>: <description> | Parameter: <params>`.
//!
//! Classification is ordered; the first matching rule wins:
//!
//! 1. image block end marker
//! 2. image block begin marker, or any line while capturing an image
//! 3. informational comment
//! 4. other comment or blank line (passed through unchanged)
//! 5. command

use std::path::PathBuf;

use gcodescribe_core::{CommandLookup, Diagnostic, TranslateError};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::comment::{is_informational_comment, CommentBlacklist, COMMENT_SIGIL};
use crate::preview::{
    decode_preview, fragment_text, ImageMarkers, PreviewError, PreviewImage, PreviewMode,
    PreviewSink,
};

/// Description used when the mapping has no entry for a command
pub const UNKNOWN_COMMAND: &str = "Unknown command";

/// Description used when no mapping was supplied at all
pub const UNKNOWN_MAPPING: &str = "Unknown mapping";

/// Parameter text for commands given without parameters
pub const FLAG_PARAMETER: &str = "True";

/// Label separating the description from the parameters
pub const PARAMETER_LABEL: &str = "Parameter:";

/// Default end index (in characters) when truncating informational comments
pub const DEFAULT_COMMENT_LIMIT: usize = 200;

/// Which end of an image block a marker line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    /// Opens a block
    Begin,
    /// Closes a block
    End,
}

/// Classification of an input line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    /// Empty or whitespace-only line
    Blank,
    /// Image block begin or end marker
    ImageBlockMarker(MarkerKind),
    /// Payload line inside an image block
    ImageFragment,
    /// Comment with human-relevant content
    InformationalComment,
    /// Any other comment
    PlainComment,
    /// Firmware command
    Command,
}

/// Result of translating one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// Translated or passed-through text; empty for absorbed lines
    pub text: String,
    /// Whether the text is a freeform informational comment
    pub informational: bool,
    /// How the line was classified
    pub kind: LineKind,
}

impl Translation {
    fn absorbed(kind: LineKind) -> Self {
        Self {
            text: String::new(),
            informational: false,
            kind,
        }
    }

    /// Whether the translation carries no visible text
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Image block capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewState {
    /// Outside any image block
    #[default]
    Idle,
    /// Between a begin and an end marker
    CapturingImage,
}

/// Translator options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorOptions {
    /// Image block marker prefixes
    pub markers: ImageMarkers,
    /// What to do with image blocks
    pub preview_mode: PreviewMode,
    /// Metadata terms rejecting informational comments
    pub blacklist: CommentBlacklist,
    /// Character end index for informational comment truncation
    pub comment_limit: usize,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            markers: ImageMarkers::default(),
            preview_mode: PreviewMode::default(),
            blacklist: CommentBlacklist::default(),
            comment_limit: DEFAULT_COMMENT_LIMIT,
        }
    }
}

/// Stateful per-file line translator
pub struct LineTranslator {
    options: TranslatorOptions,
    state: PreviewState,
    fragments: Vec<String>,
    sink: Option<Box<dyn PreviewSink>>,
    line_number: u64,
    decode_attempts: usize,
    last_preview: Option<PreviewImage>,
    stored_previews: Vec<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl LineTranslator {
    /// Create a translator with default options
    pub fn new() -> Self {
        Self::with_options(TranslatorOptions::default())
    }

    /// Create a translator with explicit options
    pub fn with_options(options: TranslatorOptions) -> Self {
        Self {
            options,
            state: PreviewState::Idle,
            fragments: Vec::new(),
            sink: None,
            line_number: 0,
            decode_attempts: 0,
            last_preview: None,
            stored_previews: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Attach the sink receiving decoded previews
    pub fn with_preview_sink(mut self, sink: Box<dyn PreviewSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Translator options
    pub fn options(&self) -> &TranslatorOptions {
        &self.options
    }

    /// Current image block state
    pub fn state(&self) -> PreviewState {
        self.state
    }

    /// Number of lines translated so far
    pub fn lines_seen(&self) -> u64 {
        self.line_number
    }

    /// Fragments captured for the current or most recent image block
    pub fn preview_fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Decode the captured fragments without storing them
    pub fn decode_preview(&self) -> Result<PreviewImage, PreviewError> {
        decode_preview(&self.fragments)
    }

    /// Number of image blocks decoded at an end marker
    pub fn decode_attempts(&self) -> usize {
        self.decode_attempts
    }

    /// Most recently decoded preview
    pub fn last_preview(&self) -> Option<&PreviewImage> {
        self.last_preview.as_ref()
    }

    /// Locations of previews written by the sink
    pub fn stored_previews(&self) -> &[PathBuf] {
        &self.stored_previews
    }

    /// Diagnostics recorded so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain recorded diagnostics
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Classify and translate a single line
    ///
    /// Lines must be fed in input order; image block detection carries state
    /// across calls. A `None` mapping yields [`UNKNOWN_MAPPING`] descriptions.
    pub fn translate_line(
        &mut self,
        line: &str,
        mapping: Option<&dyn CommandLookup>,
    ) -> Translation {
        self.line_number += 1;

        if line.starts_with(self.options.markers.end.as_str()) {
            self.end_image_block();
            return Translation::absorbed(LineKind::ImageBlockMarker(MarkerKind::End));
        }

        let is_begin = line.starts_with(self.options.markers.begin.as_str());
        if is_begin || self.state == PreviewState::CapturingImage {
            return self.capture_image_line(line, is_begin);
        }

        let trimmed = line.trim();
        if is_informational_comment(line, &self.options.blacklist) {
            return Translation {
                text: truncate_comment(line, self.options.comment_limit),
                informational: true,
                kind: LineKind::InformationalComment,
            };
        }

        if trimmed.is_empty() {
            return Translation {
                text: line.to_string(),
                informational: false,
                kind: LineKind::Blank,
            };
        }

        if trimmed.starts_with(COMMENT_SIGIL) {
            return Translation {
                text: line.to_string(),
                informational: false,
                kind: LineKind::PlainComment,
            };
        }

        Translation {
            text: translate_command(trimmed, mapping),
            informational: false,
            kind: LineKind::Command,
        }
    }

    fn capture_image_line(&mut self, line: &str, is_begin: bool) -> Translation {
        if self.state == PreviewState::Idle {
            trace!("Entering image block at line {}", self.line_number);
            self.fragments.clear();
            self.state = PreviewState::CapturingImage;
        }

        if is_begin {
            return Translation::absorbed(LineKind::ImageBlockMarker(MarkerKind::Begin));
        }

        if let Some(stem) = self.options.markers.stem() {
            if line.starts_with(stem) {
                trace!("Skipping image block metadata at line {}", self.line_number);
                return Translation::absorbed(LineKind::ImageFragment);
            }
        }

        if self.options.preview_mode.captures() {
            self.fragments.push(fragment_text(line).to_string());
        }
        Translation::absorbed(LineKind::ImageFragment)
    }

    fn end_image_block(&mut self) {
        if self.state != PreviewState::CapturingImage {
            debug!(
                "Image block end marker outside a block at line {}",
                self.line_number
            );
            return;
        }
        self.state = PreviewState::Idle;
        trace!(
            "Leaving image block at line {} with {} fragments",
            self.line_number,
            self.fragments.len()
        );

        if !self.options.preview_mode.stores() {
            return;
        }

        self.decode_attempts += 1;
        let image = match decode_preview(&self.fragments) {
            Ok(image) => image,
            Err(PreviewError::Empty) => {
                self.report(TranslateError::EmptyImageBlock);
                return;
            }
            Err(e) => {
                self.report(TranslateError::ImageDecodeFailure {
                    reason: e.to_string(),
                });
                return;
            }
        };

        let stored = self.sink.as_mut().map(|sink| sink.store(&image));
        match stored {
            Some(Ok(Some(path))) => self.stored_previews.push(path),
            Some(Err(e)) => self.report(TranslateError::PreviewStore {
                reason: e.to_string(),
            }),
            Some(Ok(None)) | None => {}
        }
        self.last_preview = Some(image);
    }

    fn report(&mut self, error: TranslateError) {
        warn!("Line {}: {}", self.line_number, error);
        self.diagnostics
            .push(Diagnostic::at_line(self.line_number, error));
    }
}

impl Default for LineTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LineTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineTranslator")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("fragments", &self.fragments.len())
            .field("has_sink", &self.sink.is_some())
            .field("line_number", &self.line_number)
            .finish()
    }
}

/// Sigil-stripped, trimmed copy of a comment, cut at `limit` characters
fn truncate_comment(line: &str, limit: usize) -> String {
    line.trim_start()
        .chars()
        .skip(1)
        .take(limit.saturating_sub(1))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Render a command line as `<command>: <description> | Parameter: <params>`
pub fn translate_command(line: &str, mapping: Option<&dyn CommandLookup>) -> String {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let params = words.collect::<Vec<_>>().join(" ");
    let params = if params.is_empty() {
        FLAG_PARAMETER
    } else {
        params.as_str()
    };

    let description = match mapping {
        Some(mapping) => mapping.describe(command).unwrap_or(UNKNOWN_COMMAND),
        None => UNKNOWN_MAPPING,
    };

    format!(
        "{}: {} | {} {}",
        command, description, PARAMETER_LABEL, params
    )
}
