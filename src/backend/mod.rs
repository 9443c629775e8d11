//! External tools behind swappable traits: voice synthesis and audio muxing.

pub mod command;
pub mod edge_tts;
pub mod ffmpeg;
pub mod mock;

pub use command::{CommandExecutor, SystemCommandExecutor, ToolLimits};
pub use edge_tts::{EdgeTtsBackend, SpeechBackend};
pub use ffmpeg::{AudioMuxer, FfmpegMuxer};
pub use mock::{MockCommandExecutor, MockMuxer, MockSpeechBackend};
