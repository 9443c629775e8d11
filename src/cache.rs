//! Content-addressed store for synthesized audio.
//!
//! Artifacts live at `<cache_dir>/<sha256(text)>_<lang>.mp3`. Entries are
//! written once and never mutated or evicted. Writes go through a temporary
//! file in the same directory and are renamed into place only after the
//! producer succeeded, so a crashed writer never leaves a file that a later
//! run would mistake for a hit.

use crate::defaults::AUDIO_EXTENSION;
use crate::error::{Md2SpeechError, Result};
use crate::text::Language;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Deterministic identity of a synthesized fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: String,
    language: Language,
}

impl CacheKey {
    pub fn new(text: &str, language: Language) -> Self {
        let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
        Self { digest, language }
    }

    /// Hex digest of the fragment text.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Final file name of the artifact inside the cache directory.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.{}",
            self.digest,
            self.language.code(),
            AUDIO_EXTENSION
        )
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.digest, self.language.code())
    }
}

/// Persistent synthesis cache rooted at an injected directory.
///
/// Safe to share between worker threads. Disjoint keys never contend;
/// [`SynthesisCache::key_lock`] serializes work on a single key.
pub struct SynthesisCache {
    dir: PathBuf,
    locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl SynthesisCache {
    /// Creates a cache handle without touching the filesystem.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a cache handle and makes sure its directory exists.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let cache = Self::new(dir);
        cache.ensure_dir()?;
        Ok(cache)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Md2SpeechError::Cache {
            path: self.dir.clone(),
            source: e,
        })
    }

    /// Location of the published artifact for `key`, whether or not it exists.
    pub fn artifact_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Returns the artifact for `key` if it has been published.
    ///
    /// Zero-length files are misses.
    pub fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.artifact_path(key);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    /// Produces and publishes the artifact for `key`.
    ///
    /// `produce` receives a temporary path inside the cache directory and
    /// must write the complete artifact there. The file is renamed to its
    /// final name only if `produce` succeeds and wrote a non-empty file;
    /// otherwise the temporary file is removed and the error returned.
    pub fn store<F>(&self, key: &CacheKey, produce: F) -> Result<PathBuf>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        self.ensure_dir()?;

        let temp = tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(|e| Md2SpeechError::Cache {
                path: self.dir.clone(),
                source: e,
            })?
            .into_temp_path();

        produce(&temp)?;

        let written = fs::metadata(&temp).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(Md2SpeechError::Synthesis {
                message: format!("backend produced an empty artifact for {key}"),
            });
        }

        let dest = self.artifact_path(key);
        temp.persist(&dest).map_err(|e| Md2SpeechError::Cache {
            path: dest.clone(),
            source: e.error,
        })?;
        Ok(dest)
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<Mutex<()>>>> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Process-wide lock for one key.
    ///
    /// Holding it while checking and filling the cache collapses concurrent
    /// duplicate fragments into a single backend call. Drop the returned
    /// handle, then call [`SynthesisCache::release_key_lock`].
    pub fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        self.lock_table().entry(key.clone()).or_default().clone()
    }

    /// Forget the lock for `key` once no caller holds a handle to it.
    ///
    /// A caller that arrives later gets a fresh lock; by then the artifact is
    /// either published or the previous attempt failed.
    pub fn release_key_lock(&self, key: &CacheKey) {
        let mut locks = self.lock_table();
        if locks
            .get(key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(key);
        }
    }

    /// Number of keys with a live lock entry.
    pub fn tracked_locks(&self) -> usize {
        self.lock_table().len()
    }

    /// Number of published artifacts in the cache directory.
    pub fn len(&self) -> usize {
        let suffix = format!(".{AUDIO_EXTENSION}");
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| {
                        let name = entry.file_name();
                        let name = name.to_string_lossy();
                        !name.starts_with('.') && name.ends_with(&suffix)
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
