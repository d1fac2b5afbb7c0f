//! # gcodescribe Translator
//!
//! Turns G-code into an annotated, human-readable form.
//!
//! ## Core Components
//!
//! ### Line classification
//! - **LineTranslator**: per-file state machine classifying every line as
//!   command, comment, blank, or embedded image data
//! - **CommentBlacklist**: swappable list of metadata terms that keep slicer
//!   bookkeeping out of the informational comment stream
//!
//! ### Aggregation
//! - **ResultAggregator**: merges translated commands into an insertion-ordered
//!   map, then cleans, sorts and partitions it into `G`, `M`, and other groups
//!
//! ### Previews
//! - **PreviewSink**: destination for thumbnails decoded from image blocks
//!
//! ### Sessions
//! - **TranslationSession**: runs the pipeline over a file, writing the
//!   transcript and collecting diagnostics
//!
//! ## Architecture
//!
//! ```text
//! GcodeFileReader ── line ──> LineTranslator ── Translation ──> transcript
//!                                  │                       └──> ResultAggregator
//!                                  └── fragments ──> decode_preview ──> PreviewSink
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use gcodescribe_core::CommandMapping;
//! use gcodescribe_translator::LineTranslator;
//!
//! let mut mapping = CommandMapping::new();
//! mapping.insert("G28", "Auto Home");
//!
//! let mut translator = LineTranslator::new();
//! let out = translator.translate_line("G28", Some(&mapping));
//! assert_eq!(out.text, "G28: Auto Home | Parameter: True");
//! ```

pub mod aggregate;
pub mod classifier;
pub mod comment;
pub mod preview;
pub mod reader;
pub mod session;

pub use aggregate::{
    command_sort_key, parse_structured_line, CommandGroup, IngestOutcome, OutputOptions,
    ParamValue, PartitionOptions, PartitionedResult, ResultAggregator, UNNUMBERED_SORT_KEY,
};
pub use classifier::{
    translate_command, LineKind, LineTranslator, MarkerKind, PreviewState, Translation,
    TranslatorOptions, DEFAULT_COMMENT_LIMIT, UNKNOWN_COMMAND, UNKNOWN_MAPPING,
};
pub use comment::{is_informational_comment, CommentBlacklist, DEFAULT_BLACKLIST};
pub use preview::{
    decode_preview, FilePreviewSink, ImageMarkers, MemoryPreviewSink, PreviewError,
    PreviewImage, PreviewMode, PreviewSink,
};
pub use reader::{FileEncoding, FileReadStats, GcodeFileReader};
pub use session::{TranslationReport, TranslationSession};
