//! Error types for md2speech.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Md2SpeechError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Input errors
    #[error("Input document not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Failed to read input document {path}: {source}")]
    InputUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    // Aggregate pipeline failures
    #[error("Nothing to synthesize: the document has no speakable fragments")]
    NothingToSynthesize,

    #[error("Nothing to concatenate: all {total} fragments failed to synthesize")]
    NothingToConcatenate { total: usize },

    #[error("Run cancelled")]
    Cancelled,

    // External process errors
    #[error("External tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} timed out after {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    // Synthesis errors
    #[error("Synthesis failed: {message}")]
    Synthesis { message: String },

    #[error("Fragment text is empty after sanitizing")]
    EmptyText,

    // Concatenation errors
    #[error("Concatenation failed: {message}")]
    Concatenation { message: String },

    // Cache errors
    #[error("Cache I/O error at {path}: {source}")]
    Cache {
        path: PathBuf,
        source: std::io::Error,
    },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, Md2SpeechError>;
