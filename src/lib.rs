//! # gcodescribe
//!
//! Translates 3D-printer G-code into an annotated, human-readable transcript
//! and a grouped JSON summary of every command used.
//!
//! ## Architecture
//!
//! gcodescribe is organized as a workspace with multiple crates:
//!
//! 1. **gcodescribe-core** - Error taxonomy, diagnostics, command mapping provider
//! 2. **gcodescribe-translator** - Line classifier, preview extraction, result aggregator
//! 3. **gcodescribe-settings** - Configuration files and validation
//! 4. **gcodescribe** - Command line binary, binary-format preconversion
//!
//! ## Input formats
//!
//! - **.gcode**: translated directly
//! - **.bgcode**: converted to `.gcode` by the external `bgcode` tool first (Linux)
//! - **.gx**: bitmap preview split off, text body translated

pub mod app;
pub mod cli;
pub mod preconvert;

pub use app::{run, AppError, RunOutcome};
pub use cli::Args;
pub use preconvert::{extract_gx_preview, BgcodeConverter, InputFormat, PreconvertError};

pub use gcodescribe_core::{CommandMapping, Diagnostic, Error, Result, TranslateError};
pub use gcodescribe_settings::Config;
pub use gcodescribe_translator::{LineTranslator, ResultAggregator, TranslationSession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr, keeping stdout for the JSON result
/// - RUST_LOG environment variable support
/// - INFO by default, DEBUG when `verbose`
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .with_line_number(verbose);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
