//! Command-line interface for md2speech
//!
//! Provides argument parsing using clap derive macros.

use crate::config::Config;
use crate::defaults;
use clap::Parser;
use std::path::PathBuf;

/// Convert a markdown document to speech
#[derive(Parser, Debug)]
#[command(
    name = "md2speech",
    version,
    about = "Convert a markdown document into a single narrated audio file"
)]
pub struct Cli {
    /// Markdown document to read
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the joined audio
    #[arg(short, long, value_name = "PATH", default_value = defaults::OUTPUT_FILE)]
    pub output: PathBuf,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for cached fragment audio (default: ~/.cache/md2speech/tts)
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Maximum number of synthesis workers (capped by the CPU count)
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-process timeout for edge-tts and ffmpeg. Examples: 90s, 2m, 1m30s
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout_secs)]
    pub timeout: Option<u64>,

    /// Show fragments, voices and cache status without synthesizing
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress and summary output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose output (-v: info logs, -vv: debug logs)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a timeout string into whole seconds.
///
/// Supports any duration format accepted by `humantime`, plus bare numbers
/// (seconds). Zero is rejected.
fn parse_timeout_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let secs = match s.parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => humantime::parse_duration(s)
            .map(|d| d.as_secs())
            .map_err(|e| e.to_string())?,
    };
    if secs == 0 {
        return Err("timeout must be at least one second".to_string());
    }
    Ok(secs)
}

impl Cli {
    /// Apply command-line overrides on top of file and environment settings.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        if let Some(workers) = self.workers {
            config.synthesis.max_workers = workers;
        }
        if let Some(secs) = self.timeout {
            config.synthesis.timeout_secs = secs;
            config.mux.timeout_secs = secs;
        }
    }

    /// Default log filter for the selected verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_only_uses_defaults() {
        let cli = Cli::try_parse_from(["md2speech", "notes.md"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("notes.md"));
        assert_eq!(cli.output, PathBuf::from("speech.mp3"));
        assert!(cli.config.is_none());
        assert!(cli.cache_dir.is_none());
        assert!(cli.workers.is_none());
        assert!(cli.timeout.is_none());
        assert!(!cli.dry_run);
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["md2speech"]).is_err());
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "md2speech",
            "doc.md",
            "-o",
            "out/talk.mp3",
            "--config",
            "/etc/md2speech.toml",
            "--cache-dir",
            "/tmp/tts",
            "-j",
            "3",
            "--timeout",
            "2m",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.output, PathBuf::from("out/talk.mp3"));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/md2speech.toml")));
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/tts")));
        assert_eq!(cli.workers, Some(3));
        assert_eq!(cli.timeout, Some(120));
        assert!(cli.dry_run);
    }

    #[test]
    fn test_verbose_count() {
        let cli = Cli::try_parse_from(["md2speech", "doc.md", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_level(), "debug");
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["md2speech", "doc.md", "-q", "-v"]).is_err());
        let cli = Cli::try_parse_from(["md2speech", "doc.md", "-q"]).unwrap();
        assert_eq!(cli.log_level(), "error");
    }

    #[test]
    fn test_parse_timeout_formats() {
        assert_eq!(parse_timeout_secs("90"), Ok(90));
        assert_eq!(parse_timeout_secs("90s"), Ok(90));
        assert_eq!(parse_timeout_secs("1m30s"), Ok(90));
        assert!(parse_timeout_secs("0").is_err());
        assert!(parse_timeout_secs("soon").is_err());
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let cli = Cli::try_parse_from([
            "md2speech",
            "doc.md",
            "--cache-dir",
            "cache",
            "-j",
            "2",
            "--timeout",
            "30s",
        ])
        .unwrap();
        let mut config = Config::default();

        cli.apply_overrides(&mut config);

        assert_eq!(config.cache.dir, Some(PathBuf::from("cache")));
        assert_eq!(config.synthesis.max_workers, 2);
        assert_eq!(config.synthesis.timeout_secs, 30);
        assert_eq!(config.mux.timeout_secs, 30);
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let cli = Cli::try_parse_from(["md2speech", "doc.md"]).unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config, Config::default());
    }
}
