//! Reassembles per-fragment artifacts into the final audio file.

use crate::backend::AudioMuxer;
use crate::defaults::AUDIO_EXTENSION;
use crate::error::{Md2SpeechError, Result};
use crate::pipeline::types::SynthesisResult;
use std::fs;
use std::path::{Path, PathBuf};

/// Artifacts of the successful results in fragment order; failures are skipped.
pub fn ordered_artifacts(results: &[SynthesisResult]) -> Vec<PathBuf> {
    let mut present: Vec<&SynthesisResult> = results.iter().filter(|r| r.is_success()).collect();
    present.sort_by_key(|r| r.index);
    present
        .into_iter()
        .filter_map(|r| r.artifact().map(Path::to_path_buf))
        .collect()
}

fn output_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Join every present artifact into `output`, exactly once.
///
/// The muxer writes a temporary file next to `output`, which is renamed into
/// place only when it succeeded, so a failed run never leaves a truncated
/// file behind. Returns the number of artifacts joined.
pub fn concatenate(
    muxer: &dyn AudioMuxer,
    results: &[SynthesisResult],
    output: &Path,
) -> Result<usize> {
    let artifacts = ordered_artifacts(results);
    if artifacts.is_empty() {
        return Err(Md2SpeechError::NothingToConcatenate {
            total: results.len(),
        });
    }

    let dir = output_dir(output);
    fs::create_dir_all(&dir)?;

    // ffmpeg picks the container from the extension, so keep it.
    let extension = output
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_else(|| AUDIO_EXTENSION.to_string());
    let temp = tempfile::Builder::new()
        .prefix(".md2speech-out-")
        .suffix(&format!(".{extension}"))
        .tempfile_in(&dir)?
        .into_temp_path();

    log::debug!(
        "Concatenating {} artifact(s) into {}",
        artifacts.len(),
        output.display()
    );
    muxer.concatenate(&artifacts, &temp)?;

    let written = fs::metadata(&temp).map(|m| m.len()).unwrap_or(0);
    if written == 0 {
        return Err(Md2SpeechError::Concatenation {
            message: "muxer produced an empty file".to_string(),
        });
    }

    temp.persist(output).map_err(|e| e.error)?;
    Ok(artifacts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockMuxer;
    use crate::pipeline::types::SynthesisOutcome;

    fn artifact(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn gaps_are_skipped_in_index_order() {
        let results = vec![
            SynthesisResult::new(2, SynthesisOutcome::Synthesized(PathBuf::from("c"))),
            SynthesisResult::new(0, SynthesisOutcome::Cached(PathBuf::from("a"))),
            SynthesisResult::failed(1, "boom"),
        ];
        assert_eq!(
            ordered_artifacts(&results),
            vec![PathBuf::from("a"), PathBuf::from("c")]
        );
    }

    #[test]
    fn joins_present_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifact(dir.path(), "a", b"A");
        let c = artifact(dir.path(), "c", b"C");
        let results = vec![
            SynthesisResult::new(0, SynthesisOutcome::Synthesized(a)),
            SynthesisResult::failed(1, "boom"),
            SynthesisResult::new(2, SynthesisOutcome::Cached(c)),
        ];
        let out = dir.path().join("speech.mp3");
        let muxer = MockMuxer::new();

        let joined = concatenate(&muxer, &results, &out).unwrap();

        assert_eq!(joined, 2);
        assert_eq!(fs::read(&out).unwrap(), b"AC");
        assert_eq!(muxer.calls().len(), 1);
    }

    #[test]
    fn all_failed_is_nothing_to_concatenate() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("speech.mp3");
        let muxer = MockMuxer::new();
        let results = vec![
            SynthesisResult::failed(0, "a"),
            SynthesisResult::failed(1, "b"),
        ];

        let err = concatenate(&muxer, &results, &out).unwrap_err();

        assert!(matches!(err, Md2SpeechError::NothingToConcatenate { total: 2 }));
        assert!(!out.exists());
        assert!(muxer.calls().is_empty());
    }

    #[test]
    fn failed_muxer_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![SynthesisResult::new(
            0,
            SynthesisOutcome::Synthesized(artifact(dir.path(), "a", b"A")),
        )];
        let out = dir.path().join("speech.mp3");

        let err = concatenate(&MockMuxer::new().with_failure(), &results, &out).unwrap_err();

        assert!(matches!(err, Md2SpeechError::Concatenation { .. }));
        assert!(!out.exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .filter(|name| name.to_string_lossy().starts_with(".md2speech-out-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn replaces_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = artifact(dir.path(), "speech.mp3", b"old");
        let results = vec![SynthesisResult::new(
            0,
            SynthesisOutcome::Synthesized(artifact(dir.path(), "a", b"new")),
        )];

        concatenate(&MockMuxer::new(), &results, &out).unwrap();

        assert_eq!(fs::read(&out).unwrap(), b"new");
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("speech.mp3");
        let results = vec![SynthesisResult::new(
            0,
            SynthesisOutcome::Synthesized(artifact(dir.path(), "a", b"A")),
        )];

        concatenate(&MockMuxer::new(), &results, &out).unwrap();

        assert!(out.is_file());
    }
}
