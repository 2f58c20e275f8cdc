use crate::db::{self, MeetingRepository};
use anyhow::{anyhow, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};

pub mod process;
pub mod schedule;

pub use process::handle_process_command;
pub use schedule::handle_schedule_command;

#[derive(Parser, Debug)]
#[command(name = "meetscribe")]
#[command(about = "Automated meeting notes: record, transcribe, analyze, publish", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run a single daily cycle and exit instead of running as a service
    #[arg(long)]
    pub once: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Process an existing audio file: transcribe, analyze, publish
    Process(ProcessCliArgs),
    /// Show today's meeting schedule
    Schedule,
    /// List processed meetings and their outcomes
    Meetings(MeetingsCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct ProcessCliArgs {
    /// Path to the audio file
    pub file: String,
    /// Notes page title (defaults to the file name)
    #[arg(short, long)]
    pub title: Option<String>,
    /// Meeting date in YYYY-MM-DD format (defaults to today)
    #[arg(short, long)]
    pub date: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct MeetingsCliArgs {
    /// Maximum number of meetings to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
    /// Show full details and the stage journal for one meeting id
    #[arg(long)]
    pub id: Option<String>,
}

pub fn handle_meetings_command(args: MeetingsCliArgs) -> Result<()> {
    let conn = db::init_db()?;

    if let Some(id) = args.id {
        let Some(row) = MeetingRepository::get(&conn, &id)? else {
            return Err(anyhow!("Meeting '{}' not found", id));
        };

        println!("ID: {}", row.meeting_id);
        println!("Title: {}", row.title.as_deref().unwrap_or("(untitled)"));
        println!("Scheduled: {}", row.scheduled_start);
        println!("Stage: {}", row.stage);
        if let Some(url) = &row.page_url {
            println!("Notes: {}", url);
        }
        if let Some(error) = &row.error {
            println!("Error: {}", error);
        }

        let log = MeetingRepository::stage_log(&conn, &row.meeting_id)?;
        if !log.is_empty() {
            println!("\nStage journal:");
            for entry in log {
                println!("  {}  {}", entry.at, entry.stage);
            }
        }

        return Ok(());
    }

    let rows = MeetingRepository::list(&conn, args.limit)?;

    if rows.is_empty() {
        println!("No meetings recorded yet.");
        return Ok(());
    }

    println!("Found {} meeting(s):\n", rows.len());

    for row in rows {
        println!("ID: {}", row.meeting_id);
        println!("Title: {}", row.title.as_deref().unwrap_or("(untitled)"));
        println!("Scheduled: {}", row.scheduled_start);
        println!("Stage: {}", row.stage);
        match (&row.page_url, &row.error) {
            (Some(url), _) => println!("Notes: {}", url),
            (None, Some(error)) => println!("Error: {}", error),
            _ => {}
        }
        println!("---");
    }

    println!("\nFor one meeting's stage journal, use: meetscribe meetings --id <ID>");

    Ok(())
}
