//! G-code file reading
//!
//! Streams a G-code file line by line. Slicer output is almost always UTF-8,
//! but stray bytes in comments must not abort a translation, so invalid
//! sequences are replaced rather than rejected.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Buffer size for reading large files (256 KB)
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// How the file's bytes were decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileEncoding {
    /// Every line was valid UTF-8
    Utf8,
    /// At least one line contained invalid UTF-8 that was replaced
    Lossy,
}

/// File read statistics
#[derive(Debug, Clone, Serialize)]
pub struct FileReadStats {
    /// Total bytes read
    pub bytes_read: u64,
    /// Total lines read
    pub lines_read: u64,
    /// How the content was decoded
    pub encoding: FileEncoding,
    /// File size in bytes
    pub file_size: u64,
    /// Time taken to read (milliseconds)
    pub read_time_ms: u64,
}

impl FileReadStats {
    /// Get progress percentage
    pub fn progress_percent(&self) -> f64 {
        if self.file_size == 0 {
            0.0
        } else {
            (self.bytes_read as f64 / self.file_size as f64) * 100.0
        }
    }
}

/// G-code file reader with streaming support
#[derive(Debug, Clone)]
pub struct GcodeFileReader {
    path: PathBuf,
    file_size: u64,
}

impl GcodeFileReader {
    /// Create a new G-code file reader
    ///
    /// # Errors
    /// Returns error if the path does not exist or is not a file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {}", path.display()));
        }

        if !path.is_file() {
            return Err(anyhow!("Path is not a file: {}", path.display()));
        }

        let file_size = fs::metadata(&path)?.len();
        Ok(Self { path, file_size })
    }

    /// Get file size in bytes
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file line by line
    ///
    /// `callback` receives each line without its terminator. Invalid UTF-8
    /// is replaced with U+FFFD.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or the callback fails
    pub fn read_lines<F>(&self, mut callback: F) -> Result<FileReadStats>
    where
        F: FnMut(&str) -> Result<()>,
    {
        let start_time = SystemTime::now();
        let file = File::open(&self.path)?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut lines_read = 0u64;
        let mut bytes_read = 0u64;
        let mut encoding = FileEncoding::Utf8;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            bytes_read += n as u64;

            let line = String::from_utf8_lossy(&buf);
            if matches!(line, std::borrow::Cow::Owned(_)) {
                encoding = FileEncoding::Lossy;
            }

            callback(line.trim_end_matches(['\n', '\r']))?;
            lines_read += 1;
        }

        if encoding == FileEncoding::Lossy {
            tracing::warn!(
                "{} contains invalid UTF-8; affected characters were replaced",
                self.path.display()
            );
        }

        let elapsed = start_time.elapsed().unwrap_or_default().as_millis() as u64;

        Ok(FileReadStats {
            bytes_read,
            lines_read,
            encoding,
            file_size: self.file_size,
            read_time_ms: elapsed,
        })
    }
}
