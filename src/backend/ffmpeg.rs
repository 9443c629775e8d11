//! Stream-copy concatenation through `ffmpeg`'s concat demuxer.

use crate::backend::command::{CommandExecutor, SystemCommandExecutor, ToolLimits};
use crate::cancel::CancellationToken;
use crate::config::MuxConfig;
use crate::error::{Md2SpeechError, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Trait for audio concatenation backends.
pub trait AudioMuxer: Send + Sync {
    /// Join `inputs` in the given order into `out` without re-encoding.
    fn concatenate(&self, inputs: &[PathBuf], out: &Path) -> Result<()>;
}

/// Quote a path for an ffmpeg concat list (`file '<path>'`).
fn concat_list_entry(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{escaped}'\n")
}

/// Render the concat demuxer input list for `inputs`.
///
/// Paths are made absolute because ffmpeg resolves relative entries against
/// the list file's directory, not the working directory.
pub fn concat_list(inputs: &[PathBuf]) -> Result<String> {
    let mut list = String::new();
    for input in inputs {
        let absolute = std::path::absolute(input)?;
        list.push_str(&concat_list_entry(&absolute));
    }
    Ok(list)
}

/// `ffmpeg -f concat -c copy`.
pub struct FfmpegMuxer<E: CommandExecutor> {
    executor: E,
    program: String,
    limits: ToolLimits,
}

impl<E: CommandExecutor> FfmpegMuxer<E> {
    pub fn new(executor: E, config: &MuxConfig) -> Self {
        Self {
            executor,
            program: config.command.clone(),
            limits: ToolLimits::new(
                Some(Duration::from_secs(config.timeout_secs)),
                CancellationToken::new(),
            ),
        }
    }

    /// Kill a running concatenation when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.limits.cancel = cancel;
        self
    }
}

impl FfmpegMuxer<SystemCommandExecutor> {
    /// Create a muxer that runs the real tool.
    pub fn system(config: &MuxConfig) -> Self {
        Self::new(SystemCommandExecutor::new(), config)
    }
}

impl<E: CommandExecutor> AudioMuxer for FfmpegMuxer<E> {
    fn concatenate(&self, inputs: &[PathBuf], out: &Path) -> Result<()> {
        let list_dir = match out.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // Removed when dropped, after ffmpeg has finished with it.
        let mut list_file = tempfile::Builder::new()
            .prefix(".md2speech-concat-")
            .suffix(".txt")
            .tempfile_in(&list_dir)?;
        list_file.write_all(concat_list(inputs)?.as_bytes())?;
        list_file.flush()?;

        let args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_file.path().as_os_str().to_owned(),
            "-c".into(),
            "copy".into(),
            "-y".into(),
            out.as_os_str().to_owned(),
        ];

        self.executor
            .execute(&self.program, &args, &self.limits)
            .map_err(|e| match e {
                Md2SpeechError::Cancelled => Md2SpeechError::Cancelled,
                Md2SpeechError::ToolNotFound { tool } => Md2SpeechError::Concatenation {
                    message: format!(
                        "{tool} not found. Install ffmpeg:\n\
                         Ubuntu/Debian: sudo apt install ffmpeg\n\
                         Arch: sudo pacman -S ffmpeg"
                    ),
                },
                other => Md2SpeechError::Concatenation {
                    message: other.to_string(),
                },
            })?;
        Ok(())
    }
}
