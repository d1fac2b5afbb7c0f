//! Embedded preview images
//!
//! Slicers embed thumbnails as base64 text spread over comment lines between a
//! begin and an end marker. The translator collects the fragments; this module
//! decodes them and hands the resulting image to a [`PreviewSink`].

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default line prefix opening an image block
pub const DEFAULT_BEGIN_MARKER: &str = "; thumbnail begin";

/// Default line prefix closing an image block
pub const DEFAULT_END_MARKER: &str = "; thumbnail end";

/// Default file stem for stored previews
pub const DEFAULT_PREVIEW_STEM: &str = "preview";

/// Errors that can occur while decoding or storing a preview
#[derive(Error, Debug)]
pub enum PreviewError {
    /// The image block contained no payload.
    #[error("No preview image data found")]
    Empty,

    /// The payload is not valid base64.
    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The image could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the translator does with image blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    /// Swallow image blocks without keeping their content
    Ignore,
    /// Keep fragments of the most recent block in memory
    Capture,
    /// Capture, then decode and store every completed block
    #[default]
    Store,
}

impl PreviewMode {
    /// Whether fragments are accumulated
    pub fn captures(self) -> bool {
        matches!(self, Self::Capture | Self::Store)
    }

    /// Whether completed blocks are handed to the sink
    pub fn stores(self) -> bool {
        matches!(self, Self::Store)
    }
}

/// Marker lines delimiting an image block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMarkers {
    /// Prefix of the line opening a block
    pub begin: String,
    /// Prefix of the line closing a block
    pub end: String,
}

impl ImageMarkers {
    /// Prefix shared by both markers, e.g. `; thumbnail`
    ///
    /// Lines starting with it inside a block are metadata, not payload.
    /// `None` when the markers share no visible prefix.
    pub fn stem(&self) -> Option<&str> {
        let shared = self
            .begin
            .char_indices()
            .zip(self.end.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, c), _)| i + c.len_utf8());
        let stem = self.begin[..shared].trim_end();
        (!stem.trim_start_matches(crate::comment::COMMENT_SIGIL).trim().is_empty()).then_some(stem)
    }
}

impl Default for ImageMarkers {
    fn default() -> Self {
        Self {
            begin: DEFAULT_BEGIN_MARKER.to_string(),
            end: DEFAULT_END_MARKER.to_string(),
        }
    }
}

/// A decoded preview image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// File extension matching the detected format
    pub extension: &'static str,
}

impl PreviewImage {
    /// Wrap raw bytes, detecting the image format from its magic bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let extension = image::guess_format(&data)
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
            .unwrap_or("png");
        Self { data, extension }
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the image has no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Strip the comment prefix from an image fragment line
pub fn fragment_text(line: &str) -> &str {
    line.trim_start_matches([';', ' ']).trim()
}

/// Concatenate captured fragments and decode them as base64
pub fn decode_preview<S: AsRef<str>>(fragments: &[S]) -> Result<PreviewImage, PreviewError> {
    let payload: String = fragments.iter().map(AsRef::as_ref).collect();
    if payload.is_empty() {
        return Err(PreviewError::Empty);
    }
    let data = STANDARD.decode(payload.as_bytes())?;
    Ok(PreviewImage::from_bytes(data))
}

/// Destination for decoded preview images
pub trait PreviewSink {
    /// Persist an image, returning its location when it has one
    fn store(&mut self, image: &PreviewImage) -> Result<Option<PathBuf>, PreviewError>;
}

/// Writes previews into a directory
///
/// The first image is `<stem>.<ext>`, later ones `<stem>_<n>.<ext>`.
#[derive(Debug, Clone)]
pub struct FilePreviewSink {
    dir: PathBuf,
    stem: String,
    stored: usize,
}

impl FilePreviewSink {
    /// Create a sink writing into `dir` with the default stem
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_stem(dir, DEFAULT_PREVIEW_STEM)
    }

    /// Create a sink with a custom file stem
    pub fn with_stem(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
            stored: 0,
        }
    }

    /// Target directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self, extension: &str) -> PathBuf {
        let name = if self.stored == 0 {
            format!("{}.{}", self.stem, extension)
        } else {
            format!("{}_{}.{}", self.stem, self.stored, extension)
        };
        self.dir.join(name)
    }
}

impl PreviewSink for FilePreviewSink {
    fn store(&mut self, image: &PreviewImage) -> Result<Option<PathBuf>, PreviewError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.next_path(image.extension);
        std::fs::write(&path, &image.data)?;
        self.stored += 1;
        tracing::info!("Thumbnail saved as '{}'", path.display());
        Ok(Some(path))
    }
}

/// Keeps previews in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPreviewSink {
    images: Vec<PreviewImage>,
}

impl MemoryPreviewSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Images received so far
    pub fn images(&self) -> &[PreviewImage] {
        &self.images
    }
}

impl PreviewSink for MemoryPreviewSink {
    fn store(&mut self, image: &PreviewImage) -> Result<Option<PathBuf>, PreviewError> {
        self.images.push(image.clone());
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 PNG signature followed by padding; enough for format detection
    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn test_fragment_text_strips_sigil_and_spaces() {
        assert_eq!(fragment_text("; iVBORw0KGgo\n"), "iVBORw0KGgo");
        assert_eq!(fragment_text(";;  abc "), "abc");
    }

    #[test]
    fn test_decode_concatenates_fragments() {
        let encoded = STANDARD.encode(PNG_HEADER);
        let (a, b) = encoded.split_at(5);
        let image = decode_preview(&[a, b]).unwrap();
        assert_eq!(image.data, PNG_HEADER);
        assert_eq!(image.extension, "png");
    }

    #[test]
    fn test_decode_unknown_format_defaults_to_png() {
        let encoded = STANDARD.encode(b"not an image");
        let image = decode_preview(&[encoded]).unwrap();
        assert_eq!(image.extension, "png");
    }

    #[test]
    fn test_decode_empty_and_malformed() {
        let empty: [&str; 0] = [];
        assert!(matches!(decode_preview(&empty), Err(PreviewError::Empty)));
        assert!(matches!(
            decode_preview(&["@@not*base64@@"]),
            Err(PreviewError::Decode(_))
        ));
    }

    #[test]
    fn test_marker_stem() {
        assert_eq!(ImageMarkers::default().stem(), Some("; thumbnail"));

        let markers = ImageMarkers {
            begin: "; png begin".to_string(),
            end: "; png end".to_string(),
        };
        assert_eq!(markers.stem(), Some("; png"));

        let markers = ImageMarkers {
            begin: "; begin".to_string(),
            end: "; end".to_string(),
        };
        assert_eq!(markers.stem(), None);
    }

    #[test]
    fn test_preview_mode_flags() {
        assert!(!PreviewMode::Ignore.captures());
        assert!(PreviewMode::Capture.captures());
        assert!(!PreviewMode::Capture.stores());
        assert!(PreviewMode::Store.stores());
    }

    #[test]
    fn test_memory_sink_keeps_images() {
        let mut sink = MemoryPreviewSink::new();
        let image = PreviewImage::from_bytes(PNG_HEADER.to_vec());
        assert_eq!(sink.store(&image).unwrap(), None);
        assert_eq!(sink.images().len(), 1);
    }
}
