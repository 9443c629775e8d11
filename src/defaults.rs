//! Default configuration constants for md2speech.
//!
//! Shared by the config structs, the CLI and the pipeline so every entry
//! point agrees on the same values.

/// Default output file name when `--output` is not given.
pub const OUTPUT_FILE: &str = "speech.mp3";

/// Upper bound on parallel synthesis workers.
///
/// The effective pool size is `min(MAX_WORKERS, available_parallelism)`.
pub const MAX_WORKERS: usize = 12;

/// Per-process timeout for one external tool invocation, in seconds.
pub const TOOL_TIMEOUT_SECS: u64 = 120;

/// Share of Cyrillic characters above which a fragment is spoken in Russian.
pub const CYRILLIC_RATIO_THRESHOLD: f64 = 0.35;

/// Maximum number of characters of tool stderr kept in per-fragment reports.
pub const DIAGNOSTIC_CHARS: usize = 120;

/// Default voice-synthesis program.
pub const TTS_COMMAND: &str = "edge-tts";

/// Default audio muxer program.
pub const MUX_COMMAND: &str = "ffmpeg";

/// Default voice for Russian fragments.
pub const VOICE_RU: &str = "ru-RU-SvetlanaNeural";

/// Default voice for English fragments.
pub const VOICE_EN: &str = "en-US-AriaNeural";

/// Speaking-rate modifier passed to the synthesis backend.
pub const RATE: &str = "+0%";

/// Volume modifier passed to the synthesis backend.
pub const VOLUME: &str = "+0%";

/// File extension of cached and concatenated audio artifacts.
pub const AUDIO_EXTENSION: &str = "mp3";

/// Interval between child-process status checks while waiting on a tool.
pub const POLL_INTERVAL_MS: u64 = 25;

/// Effective worker count for a configured maximum.
///
/// Never returns zero; falls back to one worker when the platform cannot
/// report its parallelism.
pub fn worker_count(configured_max: usize) -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    configured_max.min(available).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_never_zero() {
        assert_eq!(worker_count(0), 1);
    }

    #[test]
    fn worker_count_capped_by_configured_max() {
        assert_eq!(worker_count(1), 1);
        assert!(worker_count(MAX_WORKERS) <= MAX_WORKERS);
    }

    #[test]
    fn threshold_is_a_ratio() {
        assert!(CYRILLIC_RATIO_THRESHOLD > 0.0 && CYRILLIC_RATIO_THRESHOLD < 1.0);
    }
}
