use crate::analysis::Analyzer;
use crate::config::Config;
use crate::db::MeetingJournal;
use crate::global;
use crate::pipeline::{PipelineOptions, PipelineOrchestrator};
use crate::recorder::{CaptureRecorder, Recorder};
use crate::schedule::{NotionScheduleSource, ScheduleSource};
use crate::scheduler::SchedulerLoop;
use crate::sink::{DocumentSink, NotionSink};
use crate::store::{ArtifactStore, RetentionPolicy};
use crate::transcription::Transcriber;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run the meeting service: poll the schedule and pipeline every meeting
/// through record, transcribe, analyze and publish. With `once`, drain a
/// single daily cycle and exit instead of running forever.
pub async fn run_service(once: bool) -> Result<()> {
    info!("Starting Meetscribe service");

    let config = Config::load()?;

    let source = build_schedule_source(&config)?;
    let recorder: Arc<Mutex<Box<dyn Recorder>>> =
        Arc::new(Mutex::new(Box::new(CaptureRecorder::new(&config.recorder)?)));
    let transcriber = Arc::new(Transcriber::with_provider(
        &config.transcription.provider,
        &config.transcription,
    )?);
    let analyzer = Arc::new(Analyzer::with_provider(
        &config.analysis.provider,
        &config.analysis,
    )?);
    let sink = build_sink(&config)?;

    let policy = RetentionPolicy::parse(&config.retention.policy)?;
    let store = Arc::new(ArtifactStore::at_default_paths(policy)?);
    let journal = MeetingJournal::at(global::db_file()?);

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        recorder,
        transcriber,
        analyzer,
        sink,
        store,
        journal,
        pipeline_options(&config),
    ));

    let shutdown = CancellationToken::new();
    let scheduler = SchedulerLoop::new(
        source,
        orchestrator.clone(),
        Duration::from_secs(config.schedule.poll_interval_seconds.max(1)),
        shutdown.clone(),
    );

    spawn_signal_handler(shutdown);

    info!(
        "Meetscribe is ready, polling the schedule every {}s",
        config.schedule.poll_interval_seconds
    );

    if once {
        scheduler.run_cycle().await;
    } else {
        scheduler.run().await;
    }

    info!("Meetscribe service stopped");
    Ok(())
}

fn pipeline_options(config: &Config) -> PipelineOptions {
    PipelineOptions {
        lead_time: Duration::from_secs(config.schedule.lead_time_seconds),
        recording_extension: config.recorder.extension.clone(),
        transcription_max_attempts: config.transcription.max_attempts,
        analysis_max_attempts: config.analysis.max_attempts,
        publish_max_attempts: config.publish.max_attempts,
        retry_base_delay: Duration::from_millis(config.analysis.retry_base_delay_ms),
        max_concurrent_processing: config.limits.max_concurrent_processing,
    }
}

pub(crate) fn build_schedule_source(config: &Config) -> Result<Arc<dyn ScheduleSource>> {
    match config.schedule.provider.as_str() {
        "notion" => {
            let api_key = config
                .schedule
                .api_key
                .clone()
                .ok_or_else(|| anyhow!("schedule.api_key is required"))?;
            let database_id = config
                .schedule
                .database_id
                .clone()
                .ok_or_else(|| anyhow!("schedule.database_id is required"))?;
            Ok(Arc::new(NotionScheduleSource::new(
                api_key,
                database_id,
                config.schedule.api_endpoint.clone(),
                chrono::Duration::minutes(config.schedule.default_duration_minutes as i64),
            )))
        }
        other => Err(anyhow!(
            "unknown schedule provider '{}'. Supported providers: notion",
            other
        )),
    }
}

pub(crate) fn build_sink(config: &Config) -> Result<Arc<dyn DocumentSink>> {
    match config.publish.provider.as_str() {
        "notion" => {
            let api_key = config
                .publish
                .api_key
                .clone()
                .ok_or_else(|| anyhow!("publish.api_key is required"))?;
            let database_id = config
                .publish
                .database_id
                .clone()
                .ok_or_else(|| anyhow!("publish.database_id is required"))?;
            Ok(Arc::new(NotionSink::new(
                api_key,
                database_id,
                config.publish.api_endpoint.clone(),
            )))
        }
        other => Err(anyhow!(
            "unknown publish provider '{}'. Supported providers: notion",
            other
        )),
    }
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    });
}
