//! Capture-process recorder.
//!
//! Spawns an external capture command (ffmpeg by default) and controls its
//! lifecycle: graceful stop via stdin `q`, kill fallback after a grace
//! period, artifact verification on stop.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::RecorderConfig;

use super::{Recorder, RecorderError};

const OUTPUT_PLACEHOLDER: &str = "{output}";

struct Session {
    child: Child,
    output: PathBuf,
}

pub struct CaptureRecorder {
    command: String,
    args: Vec<String>,
    stop_grace: Duration,
    session: Option<Session>,
}

impl CaptureRecorder {
    pub fn new(config: &RecorderConfig) -> Result<Self, RecorderError> {
        let command = resolve_command(&config.command)?;

        info!("Capture recorder uses command: {}", command);

        Ok(Self {
            command,
            args: config.args.clone(),
            stop_grace: Duration::from_secs(config.stop_grace_seconds),
            session: None,
        })
    }

    fn build_args(&self, output: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy()))
            .collect()
    }
}

fn resolve_command(command: &str) -> Result<String, RecorderError> {
    if Path::new(command).is_absolute() {
        return Ok(command.to_string());
    }
    which::which(command)
        .map(|p| p.to_string_lossy().into_owned())
        .map_err(|e| RecorderError::StartFailed {
            reason: format!("capture command '{}' not found: {}", command, e),
        })
}

#[async_trait]
impl Recorder for CaptureRecorder {
    async fn start(&mut self, output: &Path) -> Result<(), RecorderError> {
        if self.session.is_some() {
            return Err(RecorderError::StartFailed {
                reason: "a capture session is already active".to_string(),
            });
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RecorderError::StartFailed {
                reason: format!("cannot create output directory: {}", e),
            })?;
        }

        let args = self.build_args(output);
        debug!("Spawning capture process: {} {:?}", self.command, args);

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecorderError::StartFailed {
                reason: e.to_string(),
            })?;

        // A capture process that exits immediately never started recording.
        match child.try_wait() {
            Ok(Some(status)) => {
                return Err(RecorderError::NotConfirmed {
                    reason: format!("capture process exited immediately with {}", status),
                });
            }
            Ok(None) => {}
            Err(e) => {
                return Err(RecorderError::NotConfirmed {
                    reason: e.to_string(),
                });
            }
        }

        info!("Capture started: {:?}", output);
        self.session = Some(Session {
            child,
            output: output.to_path_buf(),
        });
        Ok(())
    }

    async fn stop(&mut self) -> Result<PathBuf, RecorderError> {
        let Some(mut session) = self.session.take() else {
            return Err(RecorderError::NotRecording);
        };

        // ffmpeg finalizes the container on `q`; fall back to kill if the
        // process does not exit within the grace period.
        if let Some(mut stdin) = session.child.stdin.take() {
            let _ = stdin.write_all(b"q\n").await;
        }

        match tokio::time::timeout(self.stop_grace, session.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("Capture process exited with {}", status);
            }
            Ok(Err(e)) => {
                return Err(RecorderError::StopFailed {
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    "Capture process did not stop within {}s, killing it",
                    self.stop_grace.as_secs()
                );
                session
                    .child
                    .kill()
                    .await
                    .map_err(|e| RecorderError::StopFailed {
                        reason: e.to_string(),
                    })?;
            }
        }

        let is_usable = session
            .output
            .metadata()
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !is_usable {
            return Err(RecorderError::MissingArtifact {
                path: session.output,
            });
        }

        info!("Capture stopped: {:?}", session.output);
        Ok(session.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(command: &str, args: &[&str]) -> RecorderConfig {
        RecorderConfig {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            extension: "wav".to_string(),
            stop_grace_seconds: 2,
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        let result = CaptureRecorder::new(&config("definitely-not-a-real-binary", &[]));
        assert!(matches!(result, Err(RecorderError::StartFailed { .. })));
    }

    #[test]
    fn test_output_placeholder_substitution() {
        let recorder =
            CaptureRecorder::new(&config("sh", &["-c", "cat > {output}"])).unwrap();
        let args = recorder.build_args(Path::new("/tmp/m1.wav"));
        assert_eq!(args, vec!["-c", "cat > /tmp/m1.wav"]);
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let mut recorder = CaptureRecorder::new(&config("sh", &[])).unwrap();
        assert!(matches!(
            recorder.stop().await,
            Err(RecorderError::NotRecording)
        ));
    }

    #[tokio::test]
    async fn test_start_stop_produces_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("m1.wav");

        // `cat > file` writes whatever arrives on stdin and exits on EOF or
        // the `q` we send on stop.
        let mut recorder =
            CaptureRecorder::new(&config("sh", &["-c", "cat > {output}"])).unwrap();

        recorder.start(&output).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let path = recorder.stop().await.unwrap();

        assert_eq!(path, output);
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_empty_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("m1.wav");

        // Process ignores stdin and writes nothing.
        let mut recorder =
            CaptureRecorder::new(&config("sh", &["-c", "touch {output}; cat > /dev/null"]))
                .unwrap();

        recorder.start(&output).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let result = recorder.stop().await;

        assert!(matches!(result, Err(RecorderError::MissingArtifact { .. })));
    }
}
