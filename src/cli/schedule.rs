//! Print today's schedule as the service would see it.

use anyhow::Result;
use chrono::Local;

use crate::app;
use crate::config::Config;

pub async fn handle_schedule_command() -> Result<()> {
    let config = Config::load()?;
    let source = app::build_schedule_source(&config)?;

    let meetings = source.fetch_today().await?;

    if meetings.is_empty() {
        println!("No meetings scheduled today.");
        return Ok(());
    }

    println!("Found {} meeting(s) today:\n", meetings.len());

    for meeting in meetings {
        let start = meeting.start.with_timezone(&Local);
        let end = meeting.end().with_timezone(&Local);
        println!(
            "{} - {}  {}",
            start.format("%H:%M"),
            end.format("%H:%M"),
            meeting.title
        );
        println!("  ID: {}", meeting.id);
    }

    Ok(())
}
