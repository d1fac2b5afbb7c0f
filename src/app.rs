//! Translation pipeline behind the command line

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use gcodescribe_core::{CommandLookup, CommandMapping, Diagnostic, MappingError, TranslateError};
use gcodescribe_settings::{Config, SettingsError};
use gcodescribe_translator::{
    FilePreviewSink, GcodeFileReader, LineTranslator, TranslationReport, TranslationSession,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cli::Args;
use crate::preconvert::{
    extract_gx_preview, BgcodeConverter, InputFormat, PreconvertError, GX_PREVIEW_LEN,
    GX_PREVIEW_OFFSET,
};

/// Environment variable overriding the resource directory
pub const RESOURCE_DIR_ENV: &str = "GCODESCRIBE_RESOURCES";

/// Suffix appended to the preview stem for `.gx` bitmaps
pub const GX_PREVIEW_SUFFIX: &str = "_gx.bmp";

/// Fatal errors of a run, each mapped to a process exit code
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The input file does not exist
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    /// The input could not be prepared for translation
    #[error(transparent)]
    Preconvert(#[from] PreconvertError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Settings(_) | Self::Other(_) => 1,
            Self::MissingInput(_) | Self::Preconvert(PreconvertError::UnsupportedFormat(_)) => 2,
            Self::Preconvert(_) => 3,
        }
    }
}

/// Result of a successful run
#[derive(Debug)]
pub struct RunOutcome {
    /// Detected input format
    pub format: InputFormat,
    /// File actually translated (the converted file for `.bgcode`)
    pub translated_path: PathBuf,
    /// Session summary
    pub report: TranslationReport,
    /// Where the `.gx` bitmap preview was written, if any
    pub gx_preview: Option<PathBuf>,
    /// Finalized aggregate, ready to print
    pub result: serde_json::Value,
}

/// Directory holding bundled mapping files
pub fn resource_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(RESOURCE_DIR_ENV) {
        return PathBuf::from(dir);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("resources")))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("resources"))
}

/// Load the effective configuration: file values, then command line overrides
pub fn load_config(args: &Args) -> Result<Config, AppError> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

/// Load the command mapping, degrading to `None` with a diagnostic on failure
///
/// `.txt` files are read as a plain reference listing (`G28 - Auto Home`),
/// anything else as a JSON object.
pub fn load_mapping(
    config: &Config,
    resource_dir: &Path,
) -> (Option<CommandMapping>, Option<Diagnostic>) {
    let path = config.mapping.resolve_path(resource_dir);
    let loaded = if path.extension().is_some_and(|ext| ext == "txt") {
        std::fs::read_to_string(&path)
            .map(|text| CommandMapping::parse_reference_listing(&text))
            .map_err(MappingError::from)
    } else {
        CommandMapping::load_json_file(&path)
    };
    match loaded {
        Ok(mapping) => (Some(mapping), None),
        Err(e) => {
            let error = TranslateError::MappingUnavailable {
                reason: format!("{}: {}", path.display(), e),
            };
            warn!("{}", error);
            (None, Some(Diagnostic::global(error)))
        }
    }
}

/// Run the whole pipeline for the parsed command line
pub fn run(args: &Args) -> Result<RunOutcome, AppError> {
    let config = load_config(args)?;

    if !args.file.is_file() {
        return Err(AppError::MissingInput(args.file.clone()));
    }
    let format = InputFormat::from_path(&args.file)?;
    debug!("Input {} detected as {}", args.file.display(), format);

    let (mapping, mapping_diagnostic) = load_mapping(&config, &resource_dir());

    let preview = &config.translation.preview;
    let preview_dir = preview
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let mut translator = LineTranslator::with_options(config.translator_options());
    if preview.mode.stores() {
        translator = translator.with_preview_sink(Box::new(FilePreviewSink::with_stem(
            &preview_dir,
            preview.file_stem.as_str(),
        )));
    }

    let lookup = mapping.as_ref().map(|m| m as &dyn CommandLookup);
    let mut session = TranslationSession::new(translator, lookup);
    if let Some(path) = config.output.transcript_path() {
        let file = File::create(path)
            .with_context(|| format!("Failed to create transcript {}", path.display()))?;
        session = session.with_transcript(Box::new(BufWriter::new(file)));
    }
    if let Some(diagnostic) = mapping_diagnostic {
        session.record_diagnostic(diagnostic);
    }

    let mut gx_preview = None;
    let translated_path = match format {
        InputFormat::Gcode => {
            feed_path(&mut session, &args.file)?;
            args.file.clone()
        }
        InputFormat::Bgcode => {
            let converter = args
                .bgcode_exec
                .clone()
                .map(BgcodeConverter::new)
                .unwrap_or_else(BgcodeConverter::bundled);
            let converted = converter.convert(&args.file)?;
            feed_path(&mut session, &converted)?;
            converted
        }
        InputFormat::Gx => {
            let data = std::fs::read(&args.file).map_err(PreconvertError::Io)?;
            let (bitmap, body) = extract_gx_preview(&data, GX_PREVIEW_OFFSET, GX_PREVIEW_LEN);
            if preview.mode.stores() && !bitmap.is_empty() {
                std::fs::create_dir_all(&preview_dir).map_err(PreconvertError::Io)?;
                let path = preview_dir.join(format!("{}{}", preview.file_stem, GX_PREVIEW_SUFFIX));
                std::fs::write(&path, bitmap).map_err(PreconvertError::Io)?;
                info!("Stored bitmap preview at {}", path.display());
                gx_preview = Some(path);
            }
            session
                .feed_str(&String::from_utf8_lossy(body))
                .context("Failed to write transcript")?;
            args.file.clone()
        }
    };

    let (report, mut aggregator) = session.finish().context("Failed to flush transcript")?;
    let options = config.output_options();
    aggregator.finalize(&options);
    let result = serde_json::to_value(aggregator.groups(&options))
        .context("Failed to serialize result")?;

    info!(
        "Translated {} lines ({} commands, {} distinct, {} diagnostics)",
        report.lines_read,
        report.commands,
        aggregator.len(),
        report.diagnostics.len()
    );

    Ok(RunOutcome {
        format,
        translated_path,
        report,
        gx_preview,
        result,
    })
}

fn feed_path(session: &mut TranslationSession<'_>, path: &Path) -> Result<(), AppError> {
    let reader = GcodeFileReader::new(path)?;
    session.feed_file(&reader)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::MissingInput(PathBuf::from("x.gcode")).exit_code(), 2);
        assert_eq!(
            AppError::Preconvert(PreconvertError::UnsupportedFormat("x.stl".into())).exit_code(),
            2
        );
        assert_eq!(
            AppError::Preconvert(PreconvertError::MissingOutput(PathBuf::from("x.gcode")))
                .exit_code(),
            3
        );
        assert_eq!(
            AppError::Settings(SettingsError::LoadError("bad".into())).exit_code(),
            1
        );
    }

    #[test]
    fn test_bundled_mapping_loads() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources");
        let (mapping, diagnostic) = load_mapping(&Config::new(), &dir);
        assert!(diagnostic.is_none());
        let mapping = mapping.unwrap();
        assert_eq!(mapping.describe("G28"), Some("Auto Home"));
        assert_eq!(mapping.describe("M104"), Some("Set Hotend Temperature"));
    }

    #[test]
    fn test_reference_listing_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let listing = dir.path().join("marlin.txt");
        std::fs::write(&listing, "G0-G1 - Linear Move\nM104: Set Hotend Temperature\n").unwrap();

        let mut config = Config::new();
        config.mapping.path = Some(listing);
        let (mapping, diagnostic) = load_mapping(&config, dir.path());
        assert!(diagnostic.is_none());
        let mapping = mapping.unwrap();
        assert_eq!(mapping.describe("G0"), Some("Linear Move"));
        assert_eq!(mapping.describe("G1"), Some("Linear Move"));
        assert_eq!(mapping.describe("M104"), Some("Set Hotend Temperature"));
    }

    #[test]
    fn test_missing_mapping_yields_diagnostic() {
        let mut config = Config::new();
        config.mapping.path = Some(PathBuf::from("/nonexistent/mapping.json"));
        let (mapping, diagnostic) = load_mapping(&config, Path::new("/nonexistent"));
        assert!(mapping.is_none());
        let diagnostic = diagnostic.unwrap();
        assert_eq!(diagnostic.line_number, None);
        assert!(matches!(
            diagnostic.error,
            TranslateError::MappingUnavailable { .. }
        ));
    }
}
