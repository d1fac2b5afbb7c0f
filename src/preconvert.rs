//! Binary-format preconversion
//!
//! Prusa binary G-code (`.bgcode`) is turned into plain G-code by an external
//! converter before translation. Flashforge `.gx` files carry a fixed-size
//! bitmap preview ahead of their text body.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{debug, info};

/// Byte offset of the bitmap preview in a `.gx` file
pub const GX_PREVIEW_OFFSET: usize = 58;

/// Length of the bitmap preview in a `.gx` file
pub const GX_PREVIEW_LEN: usize = 14454;

/// Name of the bundled binary G-code converter
pub const BGCODE_EXECUTABLE: &str = "bgcode";

/// Errors raised before translation starts
#[derive(Error, Debug)]
pub enum PreconvertError {
    /// The file extension is not one we can translate
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// The converter only runs on Linux
    #[error("Binary G-code conversion is not supported on {0}")]
    UnsupportedPlatform(String),

    /// The converter executable is missing
    #[error("Converter executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    /// The converter could not be started
    #[error("Failed to run converter {executable}: {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter exited unsuccessfully
    #[error("Converter failed on {input}: {status}")]
    ConversionFailed { input: PathBuf, status: ExitStatus },

    /// The converter succeeded but produced no output file
    #[error("Converter produced no output at {0}")]
    MissingOutput(PathBuf),

    /// I/O error while preparing the input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Input file format, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Plain text G-code
    Gcode,
    /// Prusa binary G-code
    Bgcode,
    /// Flashforge G-code with a bitmap header
    Gx,
}

impl InputFormat {
    /// Detect the format of `path` from its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, PreconvertError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "gcode" => Ok(Self::Gcode),
            "bgcode" => Ok(Self::Bgcode),
            "gx" => Ok(Self::Gx),
            _ => Err(PreconvertError::UnsupportedFormat(
                path.display().to_string(),
            )),
        }
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gcode => write!(f, "gcode"),
            Self::Bgcode => write!(f, "bgcode"),
            Self::Gx => write!(f, "gx"),
        }
    }
}

/// Split a `.gx` file into its bitmap preview and the bytes after it
///
/// Short inputs yield a truncated (possibly empty) preview and an empty
/// remainder.
pub fn extract_gx_preview(data: &[u8], skip: usize, count: usize) -> (&[u8], &[u8]) {
    let start = skip.min(data.len());
    let end = skip.saturating_add(count).min(data.len());
    (&data[start..end], &data[end..])
}

/// Runs the external binary G-code converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgcodeConverter {
    executable: PathBuf,
}

impl BgcodeConverter {
    /// Use a specific converter executable
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// The converter shipped next to the running binary
    pub fn bundled() -> Self {
        let executable = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(BGCODE_EXECUTABLE)))
            .unwrap_or_else(|| PathBuf::from(BGCODE_EXECUTABLE));
        Self::new(executable)
    }

    /// Converter executable path
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Path of the G-code file the converter writes for `input`
    pub fn output_path(input: &Path) -> PathBuf {
        input.with_extension("gcode")
    }

    /// Convert `input` and return the path of the produced G-code
    pub fn convert(&self, input: &Path) -> Result<PathBuf, PreconvertError> {
        if !cfg!(target_os = "linux") {
            return Err(PreconvertError::UnsupportedPlatform(
                std::env::consts::OS.to_string(),
            ));
        }
        if !self.executable.is_file() {
            return Err(PreconvertError::ExecutableNotFound(self.executable.clone()));
        }
        ensure_executable(&self.executable)?;

        info!("Converting {} with {}", input.display(), self.executable.display());
        let status = Command::new(&self.executable)
            .arg(input)
            .status()
            .map_err(|source| PreconvertError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;
        if !status.success() {
            return Err(PreconvertError::ConversionFailed {
                input: input.to_path_buf(),
                status,
            });
        }

        let output = Self::output_path(input);
        if !output.is_file() {
            return Err(PreconvertError::MissingOutput(output));
        }
        debug!("Converted to {}", output.display());
        Ok(output)
    }
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<(), PreconvertError> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    let mode = permissions.mode();
    if mode & 0o111 != 0o111 {
        permissions.set_mode(mode | 0o111);
        std::fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<(), PreconvertError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_format_from_path() {
        assert_eq!(
            InputFormat::from_path(Path::new("part.gcode")).unwrap(),
            InputFormat::Gcode
        );
        assert_eq!(
            InputFormat::from_path(Path::new("dir/part.BGCODE")).unwrap(),
            InputFormat::Bgcode
        );
        assert_eq!(
            InputFormat::from_path(Path::new("part.gx")).unwrap(),
            InputFormat::Gx
        );
        assert!(matches!(
            InputFormat::from_path(Path::new("part.stl")),
            Err(PreconvertError::UnsupportedFormat(_))
        ));
        assert!(InputFormat::from_path(Path::new("Makefile")).is_err());
    }

    #[test]
    fn test_extract_gx_preview() {
        let data: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();
        let (preview, rest) = extract_gx_preview(&data, GX_PREVIEW_OFFSET, GX_PREVIEW_LEN);
        assert_eq!(preview.len(), GX_PREVIEW_LEN);
        assert_eq!(preview[0], 58);
        assert_eq!(rest.len(), 20_000 - GX_PREVIEW_OFFSET - GX_PREVIEW_LEN);
    }

    #[test]
    fn test_extract_gx_preview_short_input() {
        let data = [1u8; 100];
        let (preview, rest) = extract_gx_preview(&data, GX_PREVIEW_OFFSET, GX_PREVIEW_LEN);
        assert_eq!(preview.len(), 42);
        assert!(rest.is_empty());

        let (preview, rest) = extract_gx_preview(&data[..10], GX_PREVIEW_OFFSET, GX_PREVIEW_LEN);
        assert!(preview.is_empty());
        assert!(rest.is_empty());
    }

    #[test]
    fn test_output_path_replaces_extension() {
        assert_eq!(
            BgcodeConverter::output_path(Path::new("/tmp/part.bgcode")),
            PathBuf::from("/tmp/part.gcode")
        );
    }

    #[test]
    fn test_missing_executable() {
        let converter = BgcodeConverter::new("/nonexistent/bgcode");
        let err = converter.convert(Path::new("part.bgcode")).unwrap_err();
        if cfg!(target_os = "linux") {
            assert!(matches!(err, PreconvertError::ExecutableNotFound(_)));
        } else {
            assert!(matches!(err, PreconvertError::UnsupportedPlatform(_)));
        }
    }
}
