//! Parallel synthesis of fragments through the cache.
//!
//! Jobs are queued up front on a crossbeam channel and drained by a fixed
//! number of scoped worker threads. Each result carries its fragment index so
//! the caller can restore document order regardless of completion order.
//! A failing fragment never stops the other workers.

use crate::backend::SpeechBackend;
use crate::cache::{CacheKey, SynthesisCache};
use crate::cancel::CancellationToken;
use crate::config::VoiceConfig;
use crate::defaults::DIAGNOSTIC_CHARS;
use crate::error::{Md2SpeechError, Result};
use crate::pipeline::progress::ProgressObserver;
use crate::pipeline::types::{CANCELLED_REASON, SynthesisJob, SynthesisOutcome, SynthesisResult};
use crate::text::Fragment;
use crossbeam_channel::unbounded;
use std::path::PathBuf;
use std::thread;

/// Characters a shell would interpret, replaced by spaces before synthesis.
const UNSAFE_CHARS: &[char] = &['`', '$', '<', '>', '|', ';', '&', '(', ')', '\\'];

/// Replace shell metacharacters with spaces and trim the result.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Single-line diagnostic of at most `max_chars` characters.
pub fn truncate_diagnostic(message: &str, max_chars: usize) -> String {
    message
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(max_chars)
        .collect()
}

/// Bounded pool of synthesis workers.
pub struct WorkerPool<'a> {
    backend: &'a dyn SpeechBackend,
    cache: &'a SynthesisCache,
    voices: &'a VoiceConfig,
    workers: usize,
    cancel: CancellationToken,
}

impl<'a> WorkerPool<'a> {
    /// `workers` is clamped to at least one thread.
    pub fn new(
        backend: &'a dyn SpeechBackend,
        cache: &'a SynthesisCache,
        voices: &'a VoiceConfig,
        workers: usize,
    ) -> Self {
        Self {
            backend,
            cache,
            voices,
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Jobs not yet started when `cancel` fires are reported as cancelled.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every job and return one result per job, sorted by fragment index.
    pub fn run(
        &self,
        jobs: Vec<SynthesisJob>,
        observer: &dyn ProgressObserver,
    ) -> Vec<SynthesisResult> {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }
        let indices: Vec<usize> = jobs.iter().map(|job| job.fragment.index).collect();
        let workers = self.workers.min(total);

        let (job_tx, job_rx) = unbounded::<(usize, SynthesisJob)>();
        let (result_tx, result_rx) = unbounded::<(usize, SynthesisResult)>();

        for queued in jobs.into_iter().enumerate() {
            // The receiver is alive until the workers below exit.
            if job_tx.send(queued).is_err() {
                break;
            }
        }
        drop(job_tx);

        log::debug!("Starting {workers} synthesis worker(s) for {total} job(s)");

        let mut slots: Vec<Option<SynthesisResult>> = (0..total).map(|_| None).collect();

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (position, job) in job_rx.iter() {
                        let outcome = self.process(&job.fragment);
                        let result = SynthesisResult::new(job.fragment.index, outcome);
                        if result_tx.send((position, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            let mut completed = 0;
            for (position, result) in result_rx.iter() {
                completed += 1;
                observer.fragment_finished(completed, total, &result);
                if let Some(slot) = slots.get_mut(position) {
                    *slot = Some(result);
                }
            }
        });

        let mut results: Vec<SynthesisResult> = slots
            .into_iter()
            .zip(indices)
            .map(|(slot, index)| {
                slot.unwrap_or_else(|| SynthesisResult::failed(index, "worker exited early"))
            })
            .collect();
        results.sort_by_key(|result| result.index);
        results
    }

    fn process(&self, fragment: &Fragment) -> SynthesisOutcome {
        if self.cancel.is_cancelled() {
            return SynthesisOutcome::Failed(CANCELLED_REASON.to_string());
        }

        let key = CacheKey::new(&fragment.text, fragment.language);
        if let Some(path) = self.cache.lookup(&key) {
            log::debug!("Fragment {}: cache hit {key}", fragment.index);
            return SynthesisOutcome::Cached(path);
        }

        let outcome = {
            let lock = self.cache.key_lock(&key);
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.fill(fragment, &key)
        };
        self.cache.release_key_lock(&key);
        outcome
    }

    /// Runs with the key lock held.
    fn fill(&self, fragment: &Fragment, key: &CacheKey) -> SynthesisOutcome {
        // A duplicate fragment may have been published while we waited.
        if let Some(path) = self.cache.lookup(key) {
            log::debug!("Fragment {}: cache hit {key} after wait", fragment.index);
            return SynthesisOutcome::Cached(path);
        }

        match self.synthesize(fragment, key) {
            Ok(path) => SynthesisOutcome::Synthesized(path),
            Err(Md2SpeechError::Cancelled) => {
                SynthesisOutcome::Failed(CANCELLED_REASON.to_string())
            }
            Err(e) => {
                // Reported to the user by the progress observer.
                let diagnostic = truncate_diagnostic(&e.to_string(), DIAGNOSTIC_CHARS);
                log::debug!("Fragment {}: {e}", fragment.index);
                SynthesisOutcome::Failed(diagnostic)
            }
        }
    }

    fn synthesize(&self, fragment: &Fragment, key: &CacheKey) -> Result<PathBuf> {
        let text = sanitize_text(&fragment.text);
        if text.is_empty() {
            return Err(Md2SpeechError::EmptyText);
        }
        let voice = self.voices.voice_for(fragment.language);
        log::debug!(
            "Fragment {}: synthesizing {} chars with {} ({voice})",
            fragment.index,
            text.chars().count(),
            self.backend.name()
        );
        self.cache
            .store(key, |temp| self.backend.synthesize(&text, voice, temp))
    }
}
