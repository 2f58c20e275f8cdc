//! Recorder abstraction for the exclusive capture resource.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod capture;

pub use capture::CaptureRecorder;

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("failed to start capture: {reason}")]
    StartFailed { reason: String },
    #[error("capture start not confirmed: {reason}")]
    NotConfirmed { reason: String },
    #[error("failed to stop capture: {reason}")]
    StopFailed { reason: String },
    #[error("capture produced no artifact at {path}")]
    MissingArtifact { path: PathBuf },
    #[error("no capture session in progress")]
    NotRecording,
}

/// Exclusive capture resource controlled via start/stop.
///
/// Callers serialize access externally (the pipeline holds the recorder
/// behind a `tokio::sync::Mutex` for the whole Recording stage), so at most
/// one session exists at a time.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Start capturing to `output`. Fails if the start cannot be confirmed.
    async fn start(&mut self, output: &Path) -> Result<(), RecorderError>;

    /// Stop the active capture and return the artifact path.
    async fn stop(&mut self) -> Result<PathBuf, RecorderError>;
}
