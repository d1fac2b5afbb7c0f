//! Translation session
//!
//! Drives a [`LineTranslator`] over a whole file: every visible translation is
//! appended to an optional transcript in emission order, and structured
//! command lines are merged into a [`ResultAggregator`].

use std::io::{self, Write};
use std::path::PathBuf;

use gcodescribe_core::{CommandLookup, Diagnostic};
use tracing::debug;

use crate::aggregate::{IngestOutcome, ResultAggregator};
use crate::classifier::{LineKind, LineTranslator, Translation};
use crate::reader::{FileReadStats, GcodeFileReader};

/// Summary of a finished translation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationReport {
    /// Lines fed to the translator
    pub lines_read: u64,
    /// Lines classified as commands
    pub commands: u64,
    /// Informational comments emitted
    pub informational_comments: u64,
    /// Comments and blank lines passed through
    pub passthrough_lines: u64,
    /// Image block lines absorbed
    pub absorbed_lines: u64,
    /// Lines written to the transcript
    pub transcript_lines: u64,
    /// Image blocks decoded
    pub previews_decoded: usize,
    /// Locations of stored previews
    pub stored_previews: Vec<PathBuf>,
    /// Recoverable problems, in the order they occurred
    pub diagnostics: Vec<Diagnostic>,
}

/// One pass of translation over a file
pub struct TranslationSession<'m> {
    translator: LineTranslator,
    aggregator: ResultAggregator,
    mapping: Option<&'m dyn CommandLookup>,
    transcript: Option<Box<dyn Write + 'm>>,
    report: TranslationReport,
}

impl<'m> TranslationSession<'m> {
    /// Create a session translating with `mapping`
    pub fn new(translator: LineTranslator, mapping: Option<&'m dyn CommandLookup>) -> Self {
        Self {
            translator,
            aggregator: ResultAggregator::new(),
            mapping,
            transcript: None,
            report: TranslationReport::default(),
        }
    }

    /// Write every visible translation to `writer`
    pub fn with_transcript(mut self, writer: Box<dyn Write + 'm>) -> Self {
        self.transcript = Some(writer);
        self
    }

    /// Record a problem found outside the line loop, such as a missing mapping
    pub fn record_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.report.diagnostics.push(diagnostic);
    }

    /// The translator driving this session
    pub fn translator(&self) -> &LineTranslator {
        &self.translator
    }

    /// The aggregate collected so far
    pub fn aggregator(&self) -> &ResultAggregator {
        &self.aggregator
    }

    /// Translate one line and route the result
    ///
    /// # Errors
    /// Returns error only if the transcript cannot be written
    pub fn feed_line(&mut self, line: &str) -> io::Result<Translation> {
        let translation = self.translator.translate_line(line, self.mapping);
        self.report.lines_read += 1;
        self.report
            .diagnostics
            .extend(self.translator.take_diagnostics());

        match translation.kind {
            LineKind::Command => self.report.commands += 1,
            LineKind::InformationalComment => self.report.informational_comments += 1,
            LineKind::Blank | LineKind::PlainComment => self.report.passthrough_lines += 1,
            LineKind::ImageBlockMarker(_) | LineKind::ImageFragment => {
                self.report.absorbed_lines += 1
            }
        }

        if translation.is_empty() {
            return Ok(translation);
        }

        if let Some(transcript) = self.transcript.as_mut() {
            writeln!(transcript, "{}", translation.text.trim_end_matches(['\n', '\r']))?;
            self.report.transcript_lines += 1;
        }

        if !translation.informational {
            if let IngestOutcome::Malformed(error) = self.aggregator.ingest(&translation.text) {
                self.report
                    .diagnostics
                    .push(Diagnostic::at_line(self.report.lines_read, error));
            }
        }

        Ok(translation)
    }

    /// Translate every line of an in-memory document
    ///
    /// # Errors
    /// Returns error only if the transcript cannot be written
    pub fn feed_str(&mut self, text: &str) -> io::Result<()> {
        for line in text.lines() {
            self.feed_line(line)?;
        }
        Ok(())
    }

    /// Translate every line of a file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or the transcript cannot be written
    pub fn feed_file(&mut self, reader: &GcodeFileReader) -> anyhow::Result<FileReadStats> {
        debug!("Translating {}", reader.path().display());
        let stats = reader.read_lines(|line| {
            self.feed_line(line)?;
            Ok(())
        })?;
        debug!(
            "Read {} lines ({} bytes) in {}ms",
            stats.lines_read, stats.bytes_read, stats.read_time_ms
        );
        Ok(stats)
    }

    /// Flush the transcript and hand back the report and aggregate
    ///
    /// # Errors
    /// Returns error if the transcript cannot be flushed
    pub fn finish(mut self) -> io::Result<(TranslationReport, ResultAggregator)> {
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.flush()?;
        }

        self.report.previews_decoded = self.translator.decode_attempts();
        self.report.stored_previews = self.translator.stored_previews().to_vec();
        debug!(
            "Session finished: {} lines, {} commands, {} distinct keys, {} diagnostics",
            self.report.lines_read,
            self.report.commands,
            self.aggregator.len(),
            self.report.diagnostics.len()
        );
        Ok((self.report, self.aggregator))
    }
}
