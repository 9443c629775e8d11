//! Markdown document in, one audio file out.

use crate::backend::{AudioMuxer, SpeechBackend};
use crate::cache::{CacheKey, SynthesisCache};
use crate::cancel::CancellationToken;
use crate::config::{Config, VoiceConfig};
use crate::defaults;
use crate::error::{Md2SpeechError, Result};
use crate::pipeline::pool::WorkerPool;
use crate::pipeline::progress::{LogObserver, ProgressObserver};
use crate::pipeline::sequencer;
use crate::pipeline::types::{FragmentPlan, RunReport, SynthesisJob};
use crate::text::Document;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Worker threads for synthesis
    pub workers: usize,
    /// Voice per detected language
    pub voices: VoiceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: defaults::worker_count(defaults::MAX_WORKERS),
            voices: VoiceConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Derive the pipeline settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: defaults::worker_count(config.synthesis.max_workers),
            voices: config.voices.clone(),
        }
    }
}

/// Synthesis pipeline: Fragmenter → WorkerPool (+ cache) → Sequencer.
pub struct Pipeline {
    config: PipelineConfig,
    backend: Arc<dyn SpeechBackend>,
    muxer: Arc<dyn AudioMuxer>,
    cache: SynthesisCache,
    observer: Arc<dyn ProgressObserver>,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Creates a new pipeline that reports progress through `log`.
    pub fn new(
        config: PipelineConfig,
        backend: Arc<dyn SpeechBackend>,
        muxer: Arc<dyn AudioMuxer>,
        cache: SynthesisCache,
    ) -> Self {
        Self {
            config,
            backend,
            muxer,
            cache,
            observer: Arc::new(LogObserver),
            cancel: CancellationToken::new(),
        }
    }

    /// Sets a custom progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Stops starting new jobs once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &SynthesisCache {
        &self.cache
    }

    /// Describe what [`Pipeline::run`] would do, without calling any backend.
    pub fn plan(&self, document_text: &str) -> Vec<FragmentPlan> {
        Document::new(document_text)
            .fragments()
            .map(|fragment| {
                let key = CacheKey::new(&fragment.text, fragment.language);
                FragmentPlan {
                    index: fragment.index,
                    voice: self.config.voices.voice_for(fragment.language).to_string(),
                    cached: self.cache.lookup(&key).is_some(),
                    language: fragment.language,
                    text: fragment.text,
                }
            })
            .collect()
    }

    /// Synthesize `document_text` and write the joined audio to `output`.
    ///
    /// Individual fragment failures are tolerated; the run fails only when
    /// there is nothing to speak, nothing was synthesized, the run was
    /// cancelled or concatenation failed. No output is written on failure.
    pub fn run(&self, document_text: &str, output: &Path) -> Result<RunReport> {
        let jobs: Vec<SynthesisJob> = Document::new(document_text)
            .fragments()
            .map(SynthesisJob::new)
            .collect();
        if jobs.is_empty() {
            return Err(Md2SpeechError::NothingToSynthesize);
        }

        // Created only once there is something to store.
        self.cache.ensure_dir()?;

        let total = jobs.len();
        log::info!(
            "{total} fragment(s), {} worker(s), cache at {}",
            self.config.workers.min(total),
            self.cache.dir().display()
        );
        self.observer.started(total);

        let results = WorkerPool::new(
            self.backend.as_ref(),
            &self.cache,
            &self.config.voices,
            self.config.workers,
        )
        .with_cancellation(self.cancel.clone())
        .run(jobs, self.observer.as_ref());

        if self.cancel.is_cancelled() {
            return Err(Md2SpeechError::Cancelled);
        }

        let report = RunReport::from_results(output, &results);
        if report.succeeded > 0 {
            self.observer.concatenating(report.succeeded);
        }
        sequencer::concatenate(self.muxer.as_ref(), &results, output)?;

        log::info!(
            "Wrote {} ({} of {} fragments, {} cached)",
            output.display(),
            report.succeeded,
            report.total,
            report.cache_hits
        );
        Ok(report)
    }

    /// Read `input` and [`run`](Pipeline::run) it.
    pub fn run_file(&self, input: &Path, output: &Path) -> Result<RunReport> {
        let text = read_document(input)?;
        self.run(&text, output)
    }
}

/// Read a document, mapping failures to input errors.
pub fn read_document(input: &Path) -> Result<String> {
    fs::read_to_string(input).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Md2SpeechError::InputNotFound {
                path: input.to_path_buf(),
            }
        } else {
            Md2SpeechError::InputUnreadable {
                path: input.to_path_buf(),
                source: e,
            }
        }
    })
}
