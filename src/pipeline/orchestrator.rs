//! The per-meeting pipeline.
//!
//! One `run()` call owns a meeting from dispatch to a terminal state:
//! wait for the start time, record through the exclusive capture device,
//! then transcribe, analyze and publish under a bounded concurrency cap.
//! Every stage failure lands the meeting in `Failed` without touching any
//! other meeting.

use chrono::{Local, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::analysis::Analyzer;
use crate::db::MeetingJournal;
use crate::recorder::Recorder;
use crate::schedule::Meeting;
use crate::sink::{DocumentSink, NotesPage};
use crate::store::ArtifactStore;
use crate::transcription::Transcriber;

use super::error::StageError;
use super::retry::retry_with_backoff;
use super::state::{ProcessingState, StatusTracker};

/// Tuning knobs for the pipeline, derived from config at startup.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// How long before the scheduled start the recorder is set up.
    pub lead_time: Duration,
    /// File extension of capture artifacts.
    pub recording_extension: String,
    pub transcription_max_attempts: u32,
    pub analysis_max_attempts: u32,
    pub publish_max_attempts: u32,
    /// Base delay for exponential backoff between stage retries.
    pub retry_base_delay: Duration,
    /// Cap on simultaneously in-flight transcribe/analyze/publish stages.
    pub max_concurrent_processing: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            lead_time: Duration::from_secs(30),
            recording_extension: "wav".to_string(),
            transcription_max_attempts: 3,
            analysis_max_attempts: 3,
            publish_max_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            max_concurrent_processing: 2,
        }
    }
}

/// Terminal result of one meeting's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingOutcome {
    Completed { page_url: String },
    Failed { stage: ProcessingState, reason: String },
    Cancelled,
}

pub struct PipelineOrchestrator {
    recorder: Arc<Mutex<Box<dyn Recorder>>>,
    transcriber: Arc<Transcriber>,
    analyzer: Arc<Analyzer>,
    sink: Arc<dyn DocumentSink>,
    store: Arc<ArtifactStore>,
    tracker: StatusTracker,
    journal: MeetingJournal,
    processing_slots: Arc<Semaphore>,
    options: PipelineOptions,
}

impl PipelineOrchestrator {
    pub fn new(
        recorder: Arc<Mutex<Box<dyn Recorder>>>,
        transcriber: Arc<Transcriber>,
        analyzer: Arc<Analyzer>,
        sink: Arc<dyn DocumentSink>,
        store: Arc<ArtifactStore>,
        journal: MeetingJournal,
        options: PipelineOptions,
    ) -> Self {
        let processing_slots = Arc::new(Semaphore::new(options.max_concurrent_processing.max(1)));
        Self {
            recorder,
            transcriber,
            analyzer,
            sink,
            store,
            tracker: StatusTracker::default(),
            journal,
            processing_slots,
            options,
        }
    }

    /// Shared progress map, also used by the scheduler for cancellation
    /// and shutdown.
    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Run one meeting to a terminal state. Never panics, never returns
    /// early with a non-terminal tracker state.
    pub async fn run(&self, meeting: Meeting) -> MeetingOutcome {
        let (cancel, stop_recording) =
            self.tracker.register(&meeting.id, &meeting.title).await;
        self.journal.insert(&meeting);
        self.transition(&meeting.id, ProcessingState::Waiting).await;

        if !self.wait_for_start(&meeting, &cancel).await {
            return self.cancelled(&meeting).await;
        }

        // Acquiring the capture device is still part of the waiting window:
        // a schedule removal can land while an earlier meeting holds it.
        // The mutex queue is FIFO, so meetings dispatched in start order
        // also record in start order.
        let mut session = tokio::select! {
            guard = self.recorder.lock() => guard,
            _ = cancel.cancelled() => return self.cancelled(&meeting).await,
        };

        self.transition(&meeting.id, ProcessingState::Recording).await;
        let output = self
            .store
            .recording_path(&meeting.id, &self.options.recording_extension);
        if let Err(e) = session.start(&output).await {
            drop(session);
            return self.failed(&meeting, e.into(), None).await;
        }
        self.journal
            .set_recording_path(&meeting.id, &output.to_string_lossy());

        let remaining = (meeting.end() - Utc::now()).to_std().unwrap_or_default();
        tokio::select! {
            _ = sleep(remaining) => {}
            _ = stop_recording.cancelled() => {
                info!(meeting_id = %meeting.id, "Recording stopped early");
            }
        }

        let recording = match session.stop().await {
            Ok(path) => path,
            Err(e) => {
                drop(session);
                return self.failed(&meeting, e.into(), Some(&output)).await;
            }
        };
        // Release the device before the network-bound stages.
        drop(session);

        self.process_recording(&meeting, &recording).await
    }

    /// Sleep until `start - lead_time`, or return false if cancelled first.
    async fn wait_for_start(&self, meeting: &Meeting, cancel: &CancellationToken) -> bool {
        let lead = chrono::Duration::from_std(self.options.lead_time)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let wait = (meeting.start - lead - Utc::now())
            .to_std()
            .unwrap_or_default();

        info!(
            meeting_id = %meeting.id,
            title = %meeting.title,
            "Waiting {:?} until recording setup",
            wait
        );

        tokio::select! {
            _ = sleep(wait) => true,
            _ = cancel.cancelled() => false,
        }
    }

    async fn process_recording(&self, meeting: &Meeting, recording: &Path) -> MeetingOutcome {
        // The semaphore is never closed, so acquisition cannot fail.
        let _permit = self.processing_slots.clone().acquire_owned().await.ok();

        self.transition(&meeting.id, ProcessingState::Transcribing)
            .await;
        let transcript = match retry_with_backoff(
            self.options.transcription_max_attempts,
            self.options.retry_base_delay,
            "Transcription",
            || self.transcriber.transcribe(recording),
        )
        .await
        {
            Ok(text) => text,
            Err(e) => return self.failed(meeting, e.into(), Some(recording)).await,
        };
        match self.store.write_transcript(&meeting.id, &transcript) {
            Ok(path) => self
                .journal
                .set_transcript_path(&meeting.id, &path.to_string_lossy()),
            Err(e) => error!(meeting_id = %meeting.id, "Failed to save transcript: {}", e),
        }

        self.transition(&meeting.id, ProcessingState::Analyzing).await;
        let analysis = match retry_with_backoff(
            self.options.analysis_max_attempts,
            self.options.retry_base_delay,
            "Analysis",
            || self.analyzer.analyze(&transcript),
        )
        .await
        {
            Ok(result) => result,
            Err(e) => return self.failed(meeting, e.into(), Some(recording)).await,
        };
        if let Err(e) = self.store.write_analysis(&meeting.id, &analysis) {
            error!(meeting_id = %meeting.id, "Failed to save analysis: {}", e);
        }

        self.transition(&meeting.id, ProcessingState::Publishing)
            .await;
        let page = NotesPage {
            title: meeting.title.clone(),
            date: meeting.start.with_timezone(&Local).date_naive(),
            analysis,
            transcript,
        };
        let page_url = match retry_with_backoff(
            self.options.publish_max_attempts,
            self.options.retry_base_delay,
            "Publish",
            || self.sink.publish(&page),
        )
        .await
        {
            Ok(url) => url,
            Err(e) => return self.failed(meeting, e.into(), Some(recording)).await,
        };

        self.tracker
            .transition(&meeting.id, ProcessingState::Completed)
            .await;
        self.journal.complete(&meeting.id, &page_url);
        self.store.apply_retention(&meeting.id, Some(recording));
        info!(meeting_id = %meeting.id, url = %page_url, "Meeting notes published");

        MeetingOutcome::Completed { page_url }
    }

    async fn transition(&self, meeting_id: &str, next: ProcessingState) {
        self.tracker.transition(meeting_id, next).await;
        self.journal.set_stage(meeting_id, next);
    }

    async fn cancelled(&self, meeting: &Meeting) -> MeetingOutcome {
        info!(meeting_id = %meeting.id, "Meeting cancelled before recording");
        self.tracker
            .transition(&meeting.id, ProcessingState::Cancelled)
            .await;
        self.journal.cancel(&meeting.id);
        MeetingOutcome::Cancelled
    }

    async fn failed(
        &self,
        meeting: &Meeting,
        err: StageError,
        recording: Option<&Path>,
    ) -> MeetingOutcome {
        let stage = err.stage();
        let reason = err.to_string();
        error!(
            meeting_id = %meeting.id,
            stage = stage.as_str(),
            "Meeting pipeline failed: {}",
            reason
        );
        self.tracker.set_failed(&meeting.id, reason.clone()).await;
        self.journal.fail(&meeting.id, stage, &reason);
        self.store.apply_retention(&meeting.id, recording);
        MeetingOutcome::Failed { stage, reason }
    }
}
