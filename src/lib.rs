//! md2speech - narrate markdown documents
//!
//! Splits a document into speakable fragments, synthesizes them in parallel
//! through a content-addressed cache and joins the audio in document order.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod backend;
pub mod cache;
pub mod cancel;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
#[cfg(feature = "cli")]
pub mod output;
pub mod pipeline;
pub mod text;

// Backends (synthesis → muxing)
pub use backend::{
    AudioMuxer, CommandExecutor, EdgeTtsBackend, FfmpegMuxer, SpeechBackend, SystemCommandExecutor,
};

// Pipeline
pub use pipeline::{Pipeline, PipelineConfig, ProgressObserver, RunReport};

// Cache
pub use cache::{CacheKey, SynthesisCache};

// Error handling
pub use error::{Md2SpeechError, Result};

// Config
pub use config::Config;

// Text
pub use text::{Document, Fragment, Language, detect_language};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
