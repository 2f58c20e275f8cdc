//! One-shot processing of an existing audio file, without the scheduler.

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;
use std::time::Duration;

use crate::analysis::Analyzer;
use crate::app;
use crate::config::Config;
use crate::pipeline::retry::retry_with_backoff;
use crate::sink::NotesPage;
use crate::transcription::Transcriber;

use super::ProcessCliArgs;

pub async fn handle_process_command(args: ProcessCliArgs) -> Result<()> {
    let config = Config::load()?;

    let audio = PathBuf::from(&args.file);
    if !audio.exists() {
        return Err(anyhow!("Audio file {:?} not found", audio));
    }

    let title = match args.title {
        Some(title) => title,
        None => audio
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Meeting".to_string()),
    };
    let date = match args.date {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .context("Date must be in YYYY-MM-DD format")?,
        None => Local::now().date_naive(),
    };

    let transcriber = Transcriber::with_provider(
        &config.transcription.provider,
        &config.transcription,
    )?;
    let analyzer = Analyzer::with_provider(&config.analysis.provider, &config.analysis)?;
    let sink = app::build_sink(&config)?;

    let base_delay = Duration::from_millis(config.analysis.retry_base_delay_ms);

    println!("Transcribing {:?}...", audio);
    let transcript = retry_with_backoff(
        config.transcription.max_attempts,
        base_delay,
        "Transcription",
        || transcriber.transcribe(&audio),
    )
    .await?;
    println!("Transcript: {} chars", transcript.len());

    println!("Analyzing...");
    let analysis = retry_with_backoff(
        config.analysis.max_attempts,
        base_delay,
        "Analysis",
        || analyzer.analyze(&transcript),
    )
    .await?;
    println!("Summary: {}", analysis.summary);

    let page = NotesPage {
        title,
        date,
        analysis,
        transcript,
    };

    println!("Publishing...");
    let url = retry_with_backoff(
        config.publish.max_attempts,
        base_delay,
        "Publish",
        || sink.publish(&page),
    )
    .await?;

    println!("Published: {}", url);

    Ok(())
}
