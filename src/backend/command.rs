//! Testable execution of external tools.
//!
//! The synthesis and muxing backends never spawn processes directly; they go
//! through [`CommandExecutor`], which tests replace with mocks.

use crate::cancel::CancellationToken;
use crate::defaults::POLL_INTERVAL_MS;
use crate::error::{Md2SpeechError, Result};
use std::ffi::OsString;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Limits applied to one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolLimits {
    /// Kill the process after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Kill the process as soon as this token is cancelled.
    pub cancel: CancellationToken,
}

impl ToolLimits {
    pub fn new(timeout: Option<Duration>, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }
}

/// Trait for executing external tools.
///
/// Object-safe, Send + Sync for use from worker threads.
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args` to completion.
    ///
    /// Returns the stdout of the command on success. Fails if the program is
    /// missing, exits non-zero, times out or is cancelled.
    fn execute(&self, program: &str, args: &[OsString], limits: &ToolLimits) -> Result<String>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn execute(&self, program: &str, args: &[OsString], limits: &ToolLimits) -> Result<String> {
        (**self).execute(program, args, limits)
    }
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for std::sync::Arc<T> {
    fn execute(&self, program: &str, args: &[OsString], limits: &ToolLimits) -> Result<String> {
        (**self).execute(program, args, limits)
    }
}

/// Production executor using `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe
            && let Err(e) = pipe.read_to_end(&mut buf)
        {
            log::debug!("failed to read tool output: {e}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Short form of an exit status: `code 3`, or the signal description.
fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("code {code}"),
        None => status.to_string(),
    }
}

fn kill_and_reap(program: &str, child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("failed to kill {program}: {e}");
    }
    if let Err(e) = child.wait() {
        log::debug!("failed to reap {program}: {e}");
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, program: &str, args: &[OsString], limits: &ToolLimits) -> Result<String> {
        if limits.cancel.is_cancelled() {
            return Err(Md2SpeechError::Cancelled);
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Md2SpeechError::ToolNotFound {
                        tool: program.to_string(),
                    }
                } else {
                    Md2SpeechError::Other(format!("Failed to execute {program}: {e}"))
                }
            })?;

        // Pipes are drained on helper threads so a chatty tool never blocks
        // on a full pipe while we poll for its exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let poll_interval = Duration::from_millis(POLL_INTERVAL_MS);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    kill_and_reap(program, &mut child);
                    return Err(Md2SpeechError::Other(format!(
                        "Failed to wait for {program}: {e}"
                    )));
                }
            }

            if limits.cancel.is_cancelled() {
                kill_and_reap(program, &mut child);
                return Err(Md2SpeechError::Cancelled);
            }

            if let Some(timeout) = limits.timeout
                && started.elapsed() >= timeout
            {
                kill_and_reap(program, &mut child);
                return Err(Md2SpeechError::ToolTimeout {
                    tool: program.to_string(),
                    seconds: timeout.as_secs(),
                });
            }

            thread::sleep(poll_interval);
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(Md2SpeechError::ToolFailed {
                tool: program.to_string(),
                status: describe_status(status),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

/// Build an argument list from anything string-like.
pub fn os_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    args.into_iter().map(Into::into).collect()
}
