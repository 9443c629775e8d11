//! Progress reporting for synthesis runs.

use crate::pipeline::types::{CANCELLED_REASON, SynthesisOutcome, SynthesisResult};

/// Receives progress events from a run.
///
/// Called from the thread that drives the run, never from worker threads,
/// so `completed` is strictly increasing.
pub trait ProgressObserver: Send + Sync {
    /// The batch of `total` fragments is about to start.
    fn started(&self, _total: usize) {}

    /// One more fragment finished; `completed` of `total` are done.
    fn fragment_finished(&self, completed: usize, total: usize, result: &SynthesisResult);

    /// All jobs are done and `artifacts` files are being joined.
    fn concatenating(&self, _artifacts: usize) {}
}

/// Observer that writes progress through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn started(&self, total: usize) {
        log::info!("Synthesizing {total} fragment(s)");
    }

    fn fragment_finished(&self, completed: usize, total: usize, result: &SynthesisResult) {
        match &result.outcome {
            SynthesisOutcome::Cached(path) => {
                log::debug!(
                    "[{completed}/{total}] fragment {} cached: {}",
                    result.index,
                    path.display()
                );
            }
            SynthesisOutcome::Synthesized(path) => {
                log::debug!(
                    "[{completed}/{total}] fragment {} synthesized: {}",
                    result.index,
                    path.display()
                );
            }
            SynthesisOutcome::Failed(reason) if reason == CANCELLED_REASON => {
                log::debug!("[{completed}/{total}] fragment {} skipped", result.index);
            }
            SynthesisOutcome::Failed(reason) => {
                log::warn!(
                    "[{completed}/{total}] fragment {} failed: {reason}",
                    result.index
                );
            }
        }
    }

    fn concatenating(&self, artifacts: usize) {
        log::info!("Concatenating {artifacts} artifact(s)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn log_observer_handles_every_outcome() {
        let observer = LogObserver;
        observer.started(3);
        observer.fragment_finished(
            1,
            3,
            &SynthesisResult::new(0, SynthesisOutcome::Cached(PathBuf::from("a.mp3"))),
        );
        observer.fragment_finished(2, 3, &SynthesisResult::failed(1, "boom"));
        observer.fragment_finished(3, 3, &SynthesisResult::failed(2, CANCELLED_REASON));
        observer.concatenating(1);
    }
}
