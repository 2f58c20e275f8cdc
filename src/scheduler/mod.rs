//! The scheduler loop.
//!
//! Polls the schedule source, dispatches each meeting's pipeline exactly
//! once per day, cancels meetings that disappear from the schedule, and
//! drains the day before sleeping until the next one.

use chrono::{Local, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::pipeline::{MeetingOutcome, PipelineOrchestrator};
use crate::schedule::ScheduleSource;

pub struct SchedulerLoop {
    source: Arc<dyn ScheduleSource>,
    orchestrator: Arc<PipelineOrchestrator>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl SchedulerLoop {
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        orchestrator: Arc<PipelineOrchestrator>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            orchestrator,
            poll_interval,
            shutdown,
        }
    }

    /// Run daily cycles until shutdown is requested.
    pub async fn run(&self) {
        loop {
            self.run_cycle().await;
            if self.shutdown.is_cancelled() {
                return;
            }

            let pause = until_next_local_midnight();
            info!("Daily schedule drained, sleeping {:?} until the next day", pause);
            tokio::select! {
                _ = sleep(pause) => {}
                _ = self.shutdown.cancelled() => return,
            }
        }
    }

    /// One daily cycle: poll and dispatch until every known meeting has
    /// reached a terminal state and a successful poll shows nothing new.
    pub async fn run_cycle(&self) {
        // Ids dispatched (or deliberately skipped) today. A meeting id is
        // dispatched at most once no matter how often polling returns it.
        let mut seen: HashSet<String> = HashSet::new();
        let mut tasks: JoinSet<(String, MeetingOutcome)> = JoinSet::new();

        loop {
            while let Some(finished) = tasks.try_join_next() {
                log_outcome(finished);
            }

            let poll_ok = match self.source.fetch_today().await {
                Ok(mut meetings) => {
                    meetings.sort_by_key(|m| m.start);
                    let current: HashSet<&str> =
                        meetings.iter().map(|m| m.id.as_str()).collect();

                    // A meeting that vanished from the schedule is cancelled
                    // unless it has already started recording.
                    for id in &seen {
                        if !current.contains(id.as_str())
                            && self.orchestrator.tracker().request_cancel(id).await
                        {
                            info!(meeting_id = %id, "Meeting removed from schedule, cancelled");
                        }
                    }

                    let now = Utc::now();
                    for meeting in meetings {
                        if seen.contains(&meeting.id) {
                            continue;
                        }
                        if meeting.end() <= now {
                            info!(
                                meeting_id = %meeting.id,
                                "Skipping meeting that already ended"
                            );
                            seen.insert(meeting.id);
                            continue;
                        }

                        info!(
                            meeting_id = %meeting.id,
                            title = %meeting.title,
                            start = %meeting.start,
                            "Dispatching meeting pipeline"
                        );
                        seen.insert(meeting.id.clone());
                        let orchestrator = self.orchestrator.clone();
                        tasks.spawn(async move {
                            let id = meeting.id.clone();
                            let outcome = orchestrator.run(meeting).await;
                            (id, outcome)
                        });
                    }
                    true
                }
                Err(e) => {
                    // Transient poll failures keep the known schedule; already
                    // dispatched meetings are unaffected.
                    warn!("Schedule poll failed: {}. Keeping known schedule", e);
                    false
                }
            };

            if poll_ok && tasks.is_empty() {
                return;
            }

            tokio::select! {
                _ = sleep(self.poll_interval) => {}
                _ = self.shutdown.cancelled() => {
                    self.drain_on_shutdown(tasks).await;
                    return;
                }
            }
        }
    }

    /// Stop active recordings and cancel waiting meetings, then let the
    /// in-flight pipelines finish processing what was captured.
    async fn drain_on_shutdown(&self, mut tasks: JoinSet<(String, MeetingOutcome)>) {
        info!("Shutdown requested, interrupting active meetings");
        self.orchestrator.tracker().interrupt_all().await;
        while let Some(finished) = tasks.join_next().await {
            log_outcome(finished);
        }
    }
}

fn log_outcome(result: Result<(String, MeetingOutcome), tokio::task::JoinError>) {
    match result {
        Ok((id, MeetingOutcome::Completed { page_url })) => {
            info!(meeting_id = %id, url = %page_url, "Meeting completed")
        }
        Ok((id, MeetingOutcome::Failed { stage, reason })) => {
            error!(
                meeting_id = %id,
                stage = stage.as_str(),
                "Meeting failed: {}",
                reason
            )
        }
        Ok((id, MeetingOutcome::Cancelled)) => {
            info!(meeting_id = %id, "Meeting cancelled")
        }
        Err(e) => error!("Meeting task panicked: {}", e),
    }
}

fn until_next_local_midnight() -> Duration {
    let now = Local::now();
    let midnight = (now.date_naive() + chrono::Days::new(1))
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest());

    match midnight {
        Some(midnight) => (midnight - now).to_std().unwrap_or(Duration::from_secs(60)),
        // DST edge where local midnight does not exist; a plain day is fine.
        None => Duration::from_secs(24 * 60 * 60),
    }
}
