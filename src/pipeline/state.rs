//! Per-meeting processing state and the shared status tracker.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Stage of the per-meeting processing sequence.
///
/// Transitions are strictly forward; `Completed`, `Failed` and `Cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Pending,
    Waiting,
    Recording,
    Transcribing,
    Analyzing,
    Publishing,
    Completed,
    Failed,
    Cancelled,
}

impl ProcessingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::Recording => "recording",
            Self::Transcribing => "transcribing",
            Self::Analyzing => "analyzing",
            Self::Publishing => "publishing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn allows(&self, next: ProcessingState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Pending => false,
            Self::Waiting => *self == Self::Pending,
            Self::Recording => *self == Self::Waiting,
            Self::Transcribing => *self == Self::Recording,
            Self::Analyzing => *self == Self::Transcribing,
            Self::Publishing => *self == Self::Analyzing,
            Self::Completed => *self == Self::Publishing,
            // Any active stage may fail. Cancellation only exists before
            // recording has started.
            Self::Failed => true,
            Self::Cancelled => matches!(self, Self::Pending | Self::Waiting),
        }
    }
}

/// Tracked progress of one meeting.
#[derive(Debug, Clone)]
pub struct MeetingProgress {
    pub state: ProcessingState,
    pub history: Vec<ProcessingState>,
    pub title: String,
    pub last_error: Option<String>,
    /// Cancels the meeting while it is still waiting for its start time.
    pub cancel: CancellationToken,
    /// Stops an active recording early (the session is still processed).
    pub stop_recording: CancellationToken,
}

impl MeetingProgress {
    fn new(title: String) -> Self {
        Self {
            state: ProcessingState::Pending,
            history: vec![ProcessingState::Pending],
            title,
            last_error: None,
            cancel: CancellationToken::new(),
            stop_recording: CancellationToken::new(),
        }
    }
}

/// Thread-safe map of per-meeting progress, shared between the scheduler
/// loop and the pipeline tasks it spawns.
#[derive(Clone, Default)]
pub struct StatusTracker {
    inner: Arc<Mutex<HashMap<String, MeetingProgress>>>,
}

impl StatusTracker {
    /// Register a meeting and return its cancel and stop tokens.
    ///
    /// A terminal entry left over from an earlier cycle is replaced: its
    /// tokens may already be fired, and the id reappearing means the
    /// meeting was rescheduled.
    pub async fn register(&self, id: &str, title: &str) -> (CancellationToken, CancellationToken) {
        let mut map = self.inner.lock().await;
        if map.get(id).is_some_and(|p| p.state.is_terminal()) {
            map.remove(id);
        }
        let progress = map
            .entry(id.to_string())
            .or_insert_with(|| MeetingProgress::new(title.to_string()));
        (progress.cancel.clone(), progress.stop_recording.clone())
    }

    /// Advance a meeting to `next`, logging one line per state change.
    pub async fn transition(&self, id: &str, next: ProcessingState) {
        let mut map = self.inner.lock().await;
        let Some(progress) = map.get_mut(id) else {
            warn!(meeting_id = %id, "Transition for unregistered meeting ignored");
            return;
        };

        if !progress.state.allows(next) {
            warn!(
                meeting_id = %id,
                from = progress.state.as_str(),
                to = next.as_str(),
                "Illegal state transition ignored"
            );
            return;
        }

        info!(
            meeting_id = %id,
            from = progress.state.as_str(),
            to = next.as_str(),
            "Meeting stage transition"
        );
        progress.state = next;
        progress.history.push(next);
    }

    pub async fn set_failed(&self, id: &str, error: String) {
        self.transition(id, ProcessingState::Failed).await;
        let mut map = self.inner.lock().await;
        if let Some(progress) = map.get_mut(id) {
            progress.last_error = Some(error);
        }
    }

    pub async fn get(&self, id: &str) -> Option<MeetingProgress> {
        self.inner.lock().await.get(id).cloned()
    }

    pub async fn history(&self, id: &str) -> Vec<ProcessingState> {
        self.inner
            .lock()
            .await
            .get(id)
            .map(|p| p.history.clone())
            .unwrap_or_default()
    }

    /// Cancel a meeting that has not started recording yet. Returns true if
    /// the cancel token was fired.
    pub async fn request_cancel(&self, id: &str) -> bool {
        let map = self.inner.lock().await;
        match map.get(id) {
            Some(p) if matches!(p.state, ProcessingState::Pending | ProcessingState::Waiting) => {
                p.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Fire stop tokens for active recordings and cancel tokens for meetings
    /// still waiting. Used on shutdown.
    pub async fn interrupt_all(&self) {
        let map = self.inner.lock().await;
        for (id, progress) in map.iter() {
            match progress.state {
                ProcessingState::Pending | ProcessingState::Waiting => {
                    info!(meeting_id = %id, "Cancelling waiting meeting");
                    progress.cancel.cancel();
                }
                ProcessingState::Recording => {
                    info!(meeting_id = %id, "Stopping active recording");
                    progress.stop_recording.cancel();
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_as_str() {
        assert_eq!(ProcessingState::Pending.as_str(), "pending");
        assert_eq!(ProcessingState::Waiting.as_str(), "waiting");
        assert_eq!(ProcessingState::Recording.as_str(), "recording");
        assert_eq!(ProcessingState::Transcribing.as_str(), "transcribing");
        assert_eq!(ProcessingState::Analyzing.as_str(), "analyzing");
        assert_eq!(ProcessingState::Publishing.as_str(), "publishing");
        assert_eq!(ProcessingState::Completed.as_str(), "completed");
        assert_eq!(ProcessingState::Failed.as_str(), "failed");
        assert_eq!(ProcessingState::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn test_forward_only_transitions() {
        use ProcessingState::*;
        assert!(Pending.allows(Waiting));
        assert!(Waiting.allows(Recording));
        assert!(Recording.allows(Transcribing));
        assert!(Transcribing.allows(Analyzing));
        assert!(Analyzing.allows(Publishing));
        assert!(Publishing.allows(Completed));

        // No revisits or skips backwards
        assert!(!Recording.allows(Waiting));
        assert!(!Analyzing.allows(Transcribing));
        assert!(!Waiting.allows(Transcribing));

        // Terminal states are dead ends
        assert!(!Completed.allows(Failed));
        assert!(!Failed.allows(Waiting));
        assert!(!Cancelled.allows(Recording));
    }

    #[test]
    fn test_cancellation_window() {
        use ProcessingState::*;
        assert!(Pending.allows(Cancelled));
        assert!(Waiting.allows(Cancelled));
        assert!(!Recording.allows(Cancelled));
        assert!(!Transcribing.allows(Cancelled));
    }

    #[tokio::test]
    async fn test_tracker_records_history() {
        let tracker = StatusTracker::default();
        tracker.register("m1", "Standup").await;
        tracker.transition("m1", ProcessingState::Waiting).await;
        tracker.transition("m1", ProcessingState::Recording).await;
        tracker.transition("m1", ProcessingState::Transcribing).await;

        let history = tracker.history("m1").await;
        assert_eq!(
            history,
            vec![
                ProcessingState::Pending,
                ProcessingState::Waiting,
                ProcessingState::Recording,
                ProcessingState::Transcribing,
            ]
        );
    }

    #[tokio::test]
    async fn test_tracker_rejects_illegal_transition() {
        let tracker = StatusTracker::default();
        tracker.register("m1", "Standup").await;
        tracker.transition("m1", ProcessingState::Waiting).await;
        // Skipping Recording is ignored
        tracker.transition("m1", ProcessingState::Analyzing).await;

        let progress = tracker.get("m1").await.unwrap();
        assert_eq!(progress.state, ProcessingState::Waiting);
    }

    #[tokio::test]
    async fn test_tracker_failure_keeps_error() {
        let tracker = StatusTracker::default();
        tracker.register("m1", "Standup").await;
        tracker.transition("m1", ProcessingState::Waiting).await;
        tracker.set_failed("m1", "recorder unreachable".to_string()).await;

        let progress = tracker.get("m1").await.unwrap();
        assert_eq!(progress.state, ProcessingState::Failed);
        assert_eq!(
            progress.last_error.as_deref(),
            Some("recorder unreachable")
        );
    }

    #[tokio::test]
    async fn test_register_replaces_terminal_entry() {
        let tracker = StatusTracker::default();
        let (cancel, _) = tracker.register("m1", "Standup").await;
        tracker.transition("m1", ProcessingState::Waiting).await;
        cancel.cancel();
        tracker.transition("m1", ProcessingState::Cancelled).await;

        // The same id rescheduled later must start over with live tokens.
        let (cancel, stop) = tracker.register("m1", "Standup").await;
        assert!(!cancel.is_cancelled());
        assert!(!stop.is_cancelled());

        let progress = tracker.get("m1").await.unwrap();
        assert_eq!(progress.state, ProcessingState::Pending);
        assert_eq!(progress.history, vec![ProcessingState::Pending]);
    }

    #[tokio::test]
    async fn test_request_cancel_only_before_recording() {
        let tracker = StatusTracker::default();
        tracker.register("m1", "Standup").await;
        tracker.transition("m1", ProcessingState::Waiting).await;
        assert!(tracker.request_cancel("m1").await);

        tracker.register("m2", "Retro").await;
        tracker.transition("m2", ProcessingState::Waiting).await;
        tracker.transition("m2", ProcessingState::Recording).await;
        assert!(!tracker.request_cancel("m2").await);
    }
}
