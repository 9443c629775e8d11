//! In-process backends for tests.
//!
//! The mocks produce real files so the cache, the sequencer and the
//! orchestrator can be exercised end to end without `edge-tts` or `ffmpeg`.

use crate::backend::command::{CommandExecutor, ToolLimits};
use crate::backend::edge_tts::SpeechBackend;
use crate::backend::ffmpeg::AudioMuxer;
use crate::defaults::TOOL_TIMEOUT_SECS;
use crate::error::{Md2SpeechError, Result};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn mentions(needles: &[String], text: &str) -> bool {
    needles.iter().any(|needle| text.contains(needle.as_str()))
}

/// Records all command executions and returns queued responses.
///
/// Once the queue is empty every call succeeds with empty stdout.
#[derive(Debug, Default)]
pub struct MockCommandExecutor {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    responses: Mutex<VecDeque<Result<String>>>,
}

impl MockCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next unanswered call.
    pub fn with_response(self, response: Result<String>) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Program and arguments of every call so far.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.calls).clone()
    }
}

impl CommandExecutor for MockCommandExecutor {
    fn execute(&self, program: &str, args: &[OsString], _limits: &ToolLimits) -> Result<String> {
        let args = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        lock(&self.calls).push((program.to_string(), args));
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Synthesis backend that writes `<voice>text</voice>` instead of audio.
#[derive(Debug, Default)]
pub struct MockSpeechBackend {
    fail_on: Vec<String>,
    timeout_on: Vec<String>,
    empty_output: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockSpeechBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request whose text contains `needle`.
    pub fn with_failure_on(mut self, needle: &str) -> Self {
        self.fail_on.push(needle.to_string());
        self
    }

    /// Time out every request whose text contains `needle`, the way a
    /// hung `edge-tts` is reported after the default limit.
    pub fn with_timeout_on(mut self, needle: &str) -> Self {
        self.timeout_on.push(needle.to_string());
        self
    }

    /// Report success without writing anything.
    pub fn with_empty_output(mut self) -> Self {
        self.empty_output = true;
        self
    }

    /// Sleep before answering, to widen race windows in tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Bytes the mock writes for `text` spoken by `voice`.
    pub fn render(text: &str, voice: &str) -> String {
        format!("<{voice}>{text}</{voice}>\n")
    }

    /// `(text, voice)` of every request so far, in arrival order.
    pub fn calls(&self) -> Vec<(String, String)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl SpeechBackend for MockSpeechBackend {
    fn synthesize(&self, text: &str, voice: &str, out: &Path) -> Result<()> {
        lock(&self.calls).push((text.to_string(), voice.to_string()));

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        if mentions(&self.timeout_on, text) {
            return Err(Md2SpeechError::ToolTimeout {
                tool: "edge-tts".to_string(),
                seconds: TOOL_TIMEOUT_SECS,
            });
        }

        if mentions(&self.fail_on, text) {
            return Err(Md2SpeechError::ToolFailed {
                tool: "mock-tts".to_string(),
                status: "code 1".to_string(),
                stderr: format!("mock synthesis failure for {text:?}"),
            });
        }

        if !self.empty_output {
            fs::write(out, Self::render(text, voice))?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock-tts"
    }
}

/// Muxer that byte-concatenates its inputs.
#[derive(Debug, Default)]
pub struct MockMuxer {
    should_fail: bool,
    calls: Mutex<Vec<Vec<PathBuf>>>,
}

impl MockMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail on concatenate.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Input lists of every call so far.
    pub fn calls(&self) -> Vec<Vec<PathBuf>> {
        lock(&self.calls).clone()
    }
}

impl AudioMuxer for MockMuxer {
    fn concatenate(&self, inputs: &[PathBuf], out: &Path) -> Result<()> {
        lock(&self.calls).push(inputs.to_vec());

        if self.should_fail {
            return Err(Md2SpeechError::Concatenation {
                message: "mock concatenation failure".to_string(),
            });
        }

        let mut joined = Vec::new();
        for input in inputs {
            joined.extend(fs::read(input)?);
        }
        fs::write(out, joined)?;
        Ok(())
    }
}
