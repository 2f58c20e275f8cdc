//! On-disk artifact store.
//!
//! Recordings, transcripts and analysis results live under the data dir,
//! keyed by meeting id. The retention policy decides what survives once a
//! meeting reaches a terminal state.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analysis::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep everything.
    KeepAll,
    /// Drop the (large) recording after processing, keep text artifacts.
    DiscardRecordings,
    /// Drop all per-meeting files once the outcome is recorded.
    DiscardAll,
}

impl RetentionPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "keep-all" => Ok(Self::KeepAll),
            "discard-recordings" => Ok(Self::DiscardRecordings),
            "discard-all" => Ok(Self::DiscardAll),
            _ => bail!(
                "unknown retention policy '{}'. Supported: keep-all, discard-recordings, discard-all",
                value
            ),
        }
    }
}

pub struct ArtifactStore {
    recordings_dir: PathBuf,
    transcripts_dir: PathBuf,
    analysis_dir: PathBuf,
    policy: RetentionPolicy,
}

impl ArtifactStore {
    pub fn new(
        recordings_dir: PathBuf,
        transcripts_dir: PathBuf,
        analysis_dir: PathBuf,
        policy: RetentionPolicy,
    ) -> Result<Self> {
        for dir in [&recordings_dir, &transcripts_dir, &analysis_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create artifact directory {:?}", dir))?;
        }

        Ok(Self {
            recordings_dir,
            transcripts_dir,
            analysis_dir,
            policy,
        })
    }

    pub fn at_default_paths(policy: RetentionPolicy) -> Result<Self> {
        Self::new(
            crate::global::recordings_dir()?,
            crate::global::transcripts_dir()?,
            crate::global::analysis_dir()?,
            policy,
        )
    }

    pub fn recording_path(&self, meeting_id: &str, extension: &str) -> PathBuf {
        self.recordings_dir
            .join(format!("{}.{}", sanitize_id(meeting_id), extension))
    }

    fn transcript_path(&self, meeting_id: &str) -> PathBuf {
        self.transcripts_dir
            .join(format!("{}.txt", sanitize_id(meeting_id)))
    }

    fn analysis_path(&self, meeting_id: &str) -> PathBuf {
        self.analysis_dir
            .join(format!("{}.json", sanitize_id(meeting_id)))
    }

    pub fn write_transcript(&self, meeting_id: &str, text: &str) -> Result<PathBuf> {
        let path = self.transcript_path(meeting_id);
        std::fs::write(&path, text).context("Failed to write transcript file")?;
        info!("Transcript saved: {:?}", path);
        Ok(path)
    }

    pub fn write_analysis(&self, meeting_id: &str, result: &AnalysisResult) -> Result<PathBuf> {
        let path = self.analysis_path(meeting_id);
        let json =
            serde_json::to_string_pretty(result).context("Failed to serialize analysis")?;
        std::fs::write(&path, json).context("Failed to write analysis file")?;
        info!("Analysis saved: {:?}", path);
        Ok(path)
    }

    /// Apply the retention policy for a meeting that reached a terminal
    /// state. Removal failures are logged, never fatal.
    pub fn apply_retention(&self, meeting_id: &str, recording: Option<&Path>) {
        let mut targets: Vec<PathBuf> = Vec::new();

        match self.policy {
            RetentionPolicy::KeepAll => return,
            RetentionPolicy::DiscardRecordings => {
                if let Some(path) = recording {
                    targets.push(path.to_path_buf());
                }
            }
            RetentionPolicy::DiscardAll => {
                if let Some(path) = recording {
                    targets.push(path.to_path_buf());
                }
                targets.push(self.transcript_path(meeting_id));
                targets.push(self.analysis_path(meeting_id));
            }
        }

        for path in targets {
            if !path.exists() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => info!("Removed artifact per retention policy: {:?}", path),
                Err(e) => warn!("Failed to remove artifact {:?}: {}", path, e),
            }
        }
    }
}

/// Meeting ids come from external systems; keep filenames boring.
fn sanitize_id(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisResult;

    fn store(policy: RetentionPolicy) -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(
            dir.path().join("recordings"),
            dir.path().join("transcripts"),
            dir.path().join("analysis"),
            policy,
        )
        .unwrap();
        (dir, store)
    }

    fn sample_analysis() -> AnalysisResult {
        AnalysisResult {
            summary: "S".to_string(),
            action_items: vec![],
            decisions: vec![],
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            RetentionPolicy::parse("keep-all").unwrap(),
            RetentionPolicy::KeepAll
        );
        assert_eq!(
            RetentionPolicy::parse("discard-recordings").unwrap(),
            RetentionPolicy::DiscardRecordings
        );
        assert!(RetentionPolicy::parse("burn-everything").is_err());
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("abc-123"), "abc-123");
        assert_eq!(sanitize_id("a/b c.d"), "a-b-c-d");
    }

    #[test]
    fn test_write_artifacts() {
        let (_dir, store) = store(RetentionPolicy::KeepAll);
        let transcript = store.write_transcript("m1", "hello").unwrap();
        let analysis = store.write_analysis("m1", &sample_analysis()).unwrap();

        assert_eq!(std::fs::read_to_string(transcript).unwrap(), "hello");
        assert!(std::fs::read_to_string(analysis).unwrap().contains("\"S\""));
    }

    #[test]
    fn test_discard_recordings_keeps_text() {
        let (_dir, store) = store(RetentionPolicy::DiscardRecordings);
        let recording = store.recording_path("m1", "wav");
        std::fs::write(&recording, b"audio").unwrap();
        let transcript = store.write_transcript("m1", "hello").unwrap();

        store.apply_retention("m1", Some(&recording));

        assert!(!recording.exists());
        assert!(transcript.exists());
    }

    #[test]
    fn test_discard_all_removes_everything() {
        let (_dir, store) = store(RetentionPolicy::DiscardAll);
        let recording = store.recording_path("m1", "wav");
        std::fs::write(&recording, b"audio").unwrap();
        let transcript = store.write_transcript("m1", "hello").unwrap();
        let analysis = store.write_analysis("m1", &sample_analysis()).unwrap();

        store.apply_retention("m1", Some(&recording));

        assert!(!recording.exists());
        assert!(!transcript.exists());
        assert!(!analysis.exists());
    }

    #[test]
    fn test_keep_all_removes_nothing() {
        let (_dir, store) = store(RetentionPolicy::KeepAll);
        let recording = store.recording_path("m1", "wav");
        std::fs::write(&recording, b"audio").unwrap();

        store.apply_retention("m1", Some(&recording));
        assert!(recording.exists());
    }
}
