//! Voice synthesis through the `edge-tts` command-line tool.

use crate::backend::command::{CommandExecutor, SystemCommandExecutor, ToolLimits};
use crate::cancel::CancellationToken;
use crate::config::SynthesisConfig;
use crate::error::{Md2SpeechError, Result};
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// Trait for voice-synthesis backends.
///
/// Swappable so the pipeline can be exercised without network access.
pub trait SpeechBackend: Send + Sync {
    /// Speak `text` with `voice` and write the complete audio file to `out`.
    fn synthesize(&self, text: &str, voice: &str, out: &Path) -> Result<()>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// `edge-tts` invoked once per fragment.
pub struct EdgeTtsBackend<E: CommandExecutor> {
    executor: E,
    program: String,
    rate: String,
    volume: String,
    limits: ToolLimits,
}

impl<E: CommandExecutor> EdgeTtsBackend<E> {
    pub fn new(executor: E, config: &SynthesisConfig) -> Self {
        Self {
            executor,
            program: config.command.clone(),
            rate: config.rate.clone(),
            volume: config.volume.clone(),
            limits: ToolLimits::new(
                Some(Duration::from_secs(config.timeout_secs)),
                CancellationToken::new(),
            ),
        }
    }

    /// Kill in-flight synthesis when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.limits.cancel = cancel;
        self
    }

    // `--opt=value` keeps values such as "-10%" or text starting with a dash
    // from being parsed as flags.
    fn args(&self, text: &str, voice: &str, out: &Path) -> Vec<OsString> {
        let mut write_media = OsString::from("--write-media=");
        write_media.push(out.as_os_str());
        vec![
            format!("--voice={voice}").into(),
            format!("--text={text}").into(),
            write_media,
            format!("--rate={}", self.rate).into(),
            format!("--volume={}", self.volume).into(),
        ]
    }
}

impl EdgeTtsBackend<SystemCommandExecutor> {
    /// Create a backend that runs the real tool.
    pub fn system(config: &SynthesisConfig) -> Self {
        Self::new(SystemCommandExecutor::new(), config)
    }
}

impl<E: CommandExecutor> SpeechBackend for EdgeTtsBackend<E> {
    fn synthesize(&self, text: &str, voice: &str, out: &Path) -> Result<()> {
        self.executor
            .execute(&self.program, &self.args(text, voice, out), &self.limits)
            .map_err(|e| match e {
                Md2SpeechError::ToolNotFound { tool } => Md2SpeechError::Synthesis {
                    message: format!(
                        "{tool} not found. Install it with:\n\
                         pip install edge-tts"
                    ),
                },
                other => other,
            })?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockCommandExecutor;
    use std::path::PathBuf;

    #[test]
    fn passes_voice_text_output_and_modifiers() {
        let executor = MockCommandExecutor::new();
        let backend = EdgeTtsBackend::new(&executor, &SynthesisConfig::default());

        backend
            .synthesize(
                "Hello world.",
                "en-US-AriaNeural",
                Path::new("/tmp/out.mp3"),
            )
            .unwrap();

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        let (program, args) = &calls[0];
        assert_eq!(program, "edge-tts");
        assert_eq!(
            args,
            &vec![
                "--voice=en-US-AriaNeural".to_string(),
                "--text=Hello world.".to_string(),
                "--write-media=/tmp/out.mp3".to_string(),
                "--rate=+0%".to_string(),
                "--volume=+0%".to_string(),
            ]
        );
    }

    #[test]
    fn custom_command_and_modifiers() {
        let executor = MockCommandExecutor::new();
        let config = SynthesisConfig {
            command: "/opt/bin/edge-tts".to_string(),
            rate: "-10%".to_string(),
            volume: "+20%".to_string(),
            ..SynthesisConfig::default()
        };
        let backend = EdgeTtsBackend::new(&executor, &config);

        backend
            .synthesize("text", "ru-RU-SvetlanaNeural", &PathBuf::from("out.mp3"))
            .unwrap();

        let (program, args) = &executor.calls()[0];
        assert_eq!(program, "/opt/bin/edge-tts");
        assert!(args.contains(&"--rate=-10%".to_string()));
        assert!(args.contains(&"--volume=+20%".to_string()));
    }

    #[test]
    fn tool_failure_is_propagated() {
        let failure = Md2SpeechError::ToolFailed {
            tool: "edge-tts".to_string(),
            status: "code 1".to_string(),
            stderr: "NoAudioReceived".to_string(),
        };
        let executor = MockCommandExecutor::new().with_response(Err(failure));
        let backend = EdgeTtsBackend::new(&executor, &SynthesisConfig::default());

        let err = backend
            .synthesize("text", "en-US-AriaNeural", Path::new("out.mp3"))
            .unwrap_err();
        assert!(err.to_string().contains("NoAudioReceived"));
    }

    #[test]
    fn missing_tool_gets_install_hint() {
        let missing = Md2SpeechError::ToolNotFound {
            tool: "edge-tts".to_string(),
        };
        let executor = MockCommandExecutor::new().with_response(Err(missing));
        let backend = EdgeTtsBackend::new(&executor, &SynthesisConfig::default());

        let err = backend
            .synthesize("text", "en-US-AriaNeural", Path::new("out.mp3"))
            .unwrap_err();
        assert!(err.to_string().contains("pip install edge-tts"));
    }
}
