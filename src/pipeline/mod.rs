//! Batch synthesis pipeline.
//!
//! The orchestrator fragments a document, fans the fragments out over a
//! bounded worker pool backed by the content-addressed cache, then joins the
//! surviving artifacts in document order.

pub mod orchestrator;
pub mod pool;
pub mod progress;
pub mod sequencer;
pub mod types;

pub use orchestrator::{Pipeline, PipelineConfig, read_document};
pub use pool::{WorkerPool, sanitize_text, truncate_diagnostic};
pub use progress::{LogObserver, ProgressObserver};
pub use types::{FragmentPlan, RunReport, SynthesisJob, SynthesisOutcome, SynthesisResult};
