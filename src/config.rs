use crate::defaults;
use crate::error::{Md2SpeechError, Result};
use crate::text::Language;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub synthesis: SynthesisConfig,
    pub voices: VoiceConfig,
    pub cache: CacheConfig,
    pub mux: MuxConfig,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Path or name of the `edge-tts` executable.
    pub command: String,
    /// Upper bound on the worker pool; the CPU count caps it further.
    pub max_workers: usize,
    pub timeout_secs: u64,
    pub rate: String,
    pub volume: String,
}

/// Voice per detected language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    pub ru: String,
    pub en: String,
}

/// Cache location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// `None` selects the per-user cache directory.
    pub dir: Option<PathBuf>,
}

/// Audio concatenation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MuxConfig {
    pub command: String,
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            command: defaults::TTS_COMMAND.to_string(),
            max_workers: defaults::MAX_WORKERS,
            timeout_secs: defaults::TOOL_TIMEOUT_SECS,
            rate: defaults::RATE.to_string(),
            volume: defaults::VOLUME.to_string(),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            ru: defaults::VOICE_RU.to_string(),
            en: defaults::VOICE_EN.to_string(),
        }
    }
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            command: defaults::MUX_COMMAND.to_string(),
            timeout_secs: defaults::TOOL_TIMEOUT_SECS,
        }
    }
}

impl VoiceConfig {
    pub fn voice_for(&self, language: Language) -> &str {
        match language {
            Language::Russian => &self.ru,
            Language::English => &self.en,
        }
    }
}

impl CacheConfig {
    /// The configured directory, else `~/.cache/md2speech/tts`.
    ///
    /// Falls back to `.cache/tts` in the working directory when the platform
    /// has no cache directory.
    pub fn resolved_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        match dirs::cache_dir() {
            Some(base) => base.join("md2speech").join("tts"),
            None => PathBuf::from(".cache").join("tts"),
        }
    }
}

fn check_percent(key: &str, value: &str) -> Result<()> {
    let digits = value
        .strip_suffix('%')
        .and_then(|v| v.strip_prefix('+').or_else(|| v.strip_prefix('-')));
    match digits {
        Some(d) if !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()) => Ok(()),
        _ => Err(Md2SpeechError::ConfigInvalidValue {
            key: key.to_string(),
            message: format!("expected a signed percentage like +0% or -10%, got {value:?}"),
        }),
    }
}

fn check_not_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Md2SpeechError::ConfigInvalidValue {
            key: key.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(Md2SpeechError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Md2SpeechError::ConfigParse {
                message: format!("{}: {e}", path.display()),
            }),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MD2SPEECH_CACHE_DIR → cache.dir
    /// - MD2SPEECH_WORKERS → synthesis.max_workers
    /// - MD2SPEECH_TTS_COMMAND → synthesis.command
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("MD2SPEECH_CACHE_DIR")
            && !dir.is_empty()
        {
            self.cache.dir = Some(PathBuf::from(dir));
        }

        if let Ok(workers) = std::env::var("MD2SPEECH_WORKERS")
            && !workers.is_empty()
        {
            match workers.parse() {
                Ok(n) => self.synthesis.max_workers = n,
                Err(_) => log::warn!("Ignoring MD2SPEECH_WORKERS={workers:?}: not a number"),
            }
        }

        if let Ok(command) = std::env::var("MD2SPEECH_TTS_COMMAND")
            && !command.is_empty()
        {
            self.synthesis.command = command;
        }

        self
    }

    /// Reject values the external tools would choke on mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.synthesis.max_workers == 0 {
            return Err(Md2SpeechError::ConfigInvalidValue {
                key: "synthesis.max_workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        for (key, secs) in [
            ("synthesis.timeout_secs", self.synthesis.timeout_secs),
            ("mux.timeout_secs", self.mux.timeout_secs),
        ] {
            if secs == 0 {
                return Err(Md2SpeechError::ConfigInvalidValue {
                    key: key.to_string(),
                    message: "must be at least 1 second".to_string(),
                });
            }
        }
        check_percent("synthesis.rate", &self.synthesis.rate)?;
        check_percent("synthesis.volume", &self.synthesis.volume)?;
        check_not_empty("synthesis.command", &self.synthesis.command)?;
        check_not_empty("mux.command", &self.mux.command)?;
        check_not_empty("voices.ru", &self.voices.ru)?;
        check_not_empty("voices.en", &self.voices.en)?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/md2speech/config.toml on Linux, or a relative
    /// `md2speech/config.toml` when no config directory is known.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join("md2speech")
            .join("config.toml")
    }
}
