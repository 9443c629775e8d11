//! Data types flowing through a synthesis run.

use crate::text::{Fragment, Language};
use std::path::{Path, PathBuf};

/// Reason recorded for jobs skipped after cancellation.
pub const CANCELLED_REASON: &str = "cancelled";

/// One fragment waiting to be synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisJob {
    pub fragment: Fragment,
}

impl SynthesisJob {
    pub fn new(fragment: Fragment) -> Self {
        Self { fragment }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// Served from the cache without calling the backend.
    Cached(PathBuf),
    /// Produced by the backend during this run and published to the cache.
    Synthesized(PathBuf),
    /// Not produced; the fragment is left out of the output.
    Failed(String),
}

/// Outcome of one job, tagged with its fragment index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub index: usize,
    pub outcome: SynthesisOutcome,
}

impl SynthesisResult {
    pub fn new(index: usize, outcome: SynthesisOutcome) -> Self {
        Self { index, outcome }
    }

    /// Shorthand for a failed result.
    pub fn failed(index: usize, reason: impl Into<String>) -> Self {
        Self::new(index, SynthesisOutcome::Failed(reason.into()))
    }

    /// The audio artifact, present iff the job succeeded.
    pub fn artifact(&self) -> Option<&Path> {
        match &self.outcome {
            SynthesisOutcome::Cached(path) | SynthesisOutcome::Synthesized(path) => Some(path),
            SynthesisOutcome::Failed(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.artifact().is_some()
    }

    pub fn is_cache_hit(&self) -> bool {
        matches!(self.outcome, SynthesisOutcome::Cached(_))
    }

    /// Failure reason, if the job failed.
    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            SynthesisOutcome::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub output: PathBuf,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cache_hits: usize,
    /// `(fragment index, reason)` for every failed fragment, in index order.
    pub failures: Vec<(usize, String)>,
}

impl RunReport {
    pub fn from_results(output: impl Into<PathBuf>, results: &[SynthesisResult]) -> Self {
        let failures: Vec<(usize, String)> = results
            .iter()
            .filter_map(|r| r.failure().map(|reason| (r.index, reason.to_string())))
            .collect();
        Self {
            output: output.into(),
            total: results.len(),
            succeeded: results.iter().filter(|r| r.is_success()).count(),
            failed: failures.len(),
            cache_hits: results.iter().filter(|r| r.is_cache_hit()).count(),
            failures,
        }
    }
}

/// What a run would do with one fragment, computed without synthesizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentPlan {
    pub index: usize,
    pub text: String,
    pub language: Language,
    pub voice: String,
    /// Whether the artifact is already in the cache.
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_only_for_successes() {
        let cached = SynthesisResult::new(0, SynthesisOutcome::Cached(PathBuf::from("a.mp3")));
        let fresh = SynthesisResult::new(1, SynthesisOutcome::Synthesized(PathBuf::from("b.mp3")));
        let failed = SynthesisResult::failed(2, "boom");

        assert_eq!(cached.artifact(), Some(Path::new("a.mp3")));
        assert_eq!(fresh.artifact(), Some(Path::new("b.mp3")));
        assert_eq!(failed.artifact(), None);
        assert_eq!(failed.failure(), Some("boom"));
        assert!(cached.is_cache_hit());
        assert!(!fresh.is_cache_hit());
    }

    #[test]
    fn report_counts_outcomes() {
        let results = vec![
            SynthesisResult::new(0, SynthesisOutcome::Cached(PathBuf::from("a.mp3"))),
            SynthesisResult::failed(1, "timed out"),
            SynthesisResult::new(2, SynthesisOutcome::Synthesized(PathBuf::from("c.mp3"))),
        ];

        let report = RunReport::from_results("speech.mp3", &results);

        assert_eq!(report.output, PathBuf::from("speech.mp3"));
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.cache_hits, 1);
        assert_eq!(report.failures, vec![(1, "timed out".to_string())]);
    }
}
