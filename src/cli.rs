use std::path::PathBuf;

use clap::Parser;
use gcodescribe_settings::Config;
use gcodescribe_translator::PreviewMode;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "gcodescribe")]
#[command(about = "Translate 3D-printer G-code into annotated text and a grouped JSON summary")]
#[command(version)]
pub struct Args {
    /// G-code file to translate (.gcode, .bgcode or .gx)
    pub file: PathBuf,

    /// Command mapping file (JSON object of command -> description)
    #[arg(short, long)]
    pub mapping: Option<PathBuf>,

    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the raw transcript here
    #[arg(short, long)]
    pub transcript: Option<PathBuf>,

    /// Do not write a transcript
    #[arg(long, conflicts_with = "transcript")]
    pub no_transcript: bool,

    /// Directory receiving preview images
    #[arg(long)]
    pub preview_dir: Option<PathBuf>,

    /// Skip preview image extraction
    #[arg(long)]
    pub no_preview: bool,

    /// Keep commands in file order
    #[arg(long)]
    pub no_sort: bool,

    /// Emit one group instead of G, M and other
    #[arg(long)]
    pub no_filter: bool,

    /// Keep repeated parameters as JSON arrays
    #[arg(long)]
    pub keep_lists: bool,

    /// Binary G-code converter executable
    #[arg(long)]
    pub bgcode_exec: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Apply command line overrides on top of file configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(mapping) = &self.mapping {
            config.mapping.path = Some(mapping.clone());
        }
        if let Some(transcript) = &self.transcript {
            config.output.transcript = true;
            config.output.transcript_path = transcript.clone();
        }
        if self.no_transcript {
            config.output.transcript = false;
        }
        if let Some(dir) = &self.preview_dir {
            config.translation.preview.output_dir = Some(dir.clone());
        }
        if self.no_preview {
            config.translation.preview.mode = PreviewMode::Ignore;
        }
        if self.no_sort {
            config.output.sort = false;
        }
        if self.no_filter {
            config.output.filter = false;
        }
        if self.keep_lists {
            config.output.stringify_multiple = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["gcodescribe", "part.gcode"]).unwrap();
        assert_eq!(args.file, PathBuf::from("part.gcode"));
        assert!(!args.verbose);

        let mut config = Config::new();
        args.apply_to(&mut config);
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "gcodescribe",
            "part.gcode",
            "--mapping",
            "marlin.json",
            "--no-preview",
            "--no-sort",
            "--keep-lists",
            "--no-transcript",
            "-v",
        ])
        .unwrap();

        let mut config = Config::new();
        args.apply_to(&mut config);
        assert_eq!(config.mapping.path, Some(PathBuf::from("marlin.json")));
        assert_eq!(config.translation.preview.mode, PreviewMode::Ignore);
        assert!(!config.output.sort);
        assert!(config.output.filter);
        assert!(!config.output.stringify_multiple);
        assert_eq!(config.output.transcript_path(), None);
        assert!(args.verbose);
    }

    #[test]
    fn test_missing_file_is_usage_error() {
        assert!(Args::try_parse_from(["gcodescribe"]).is_err());
    }

    #[test]
    fn test_transcript_conflicts_with_no_transcript() {
        assert!(Args::try_parse_from([
            "gcodescribe",
            "part.gcode",
            "--transcript",
            "out.txt",
            "--no-transcript"
        ])
        .is_err());
    }
}
