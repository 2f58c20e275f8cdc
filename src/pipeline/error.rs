//! Stage failure aggregation.

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::recorder::RecorderError;
use crate::sink::PublishError;
use crate::transcription::TranscriptionError;

use super::state::ProcessingState;

/// Failure of one meeting's pipeline, tagged with the stage it occurred in.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl StageError {
    /// The pipeline stage this error belongs to.
    pub fn stage(&self) -> ProcessingState {
        match self {
            Self::Recorder(_) => ProcessingState::Recording,
            Self::Transcription(_) => ProcessingState::Transcribing,
            Self::Analysis(_) => ProcessingState::Analyzing,
            Self::Publish(_) => ProcessingState::Publishing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tagging() {
        let err: StageError = RecorderError::NotRecording.into();
        assert_eq!(err.stage(), ProcessingState::Recording);

        let err: StageError = TranscriptionError::EmptyTranscript.into();
        assert_eq!(err.stage(), ProcessingState::Transcribing);

        let err: StageError = AnalysisError::Malformed {
            reason: "bad json".to_string(),
        }
        .into();
        assert_eq!(err.stage(), ProcessingState::Analyzing);

        let err: StageError = PublishError::Rejected {
            reason: "duplicate".to_string(),
        }
        .into();
        assert_eq!(err.stage(), ProcessingState::Publishing);
    }
}
