pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod state;

pub use error::StageError;
pub use orchestrator::{MeetingOutcome, PipelineOptions, PipelineOrchestrator};
pub use state::{MeetingProgress, ProcessingState, StatusTracker};
