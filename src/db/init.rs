use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meetings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id TEXT NOT NULL UNIQUE,
            title TEXT,
            scheduled_start TEXT NOT NULL,
            stage TEXT NOT NULL DEFAULT 'pending',
            recording_path TEXT,
            transcript_path TEXT,
            page_url TEXT,
            error TEXT,
            completed_at TIMESTAMP,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create meetings table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meetings_scheduled_start \
         ON meetings(scheduled_start DESC)",
        [],
    )
    .context("Failed to create meetings scheduled_start index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meetings_stage ON meetings(stage)",
        [],
    )
    .context("Failed to create meetings stage index")?;

    // One row per observed stage transition, for external observability.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meeting_stages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meeting_id TEXT NOT NULL,
            stage TEXT NOT NULL,
            at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create meeting_stages table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meeting_stages_meeting \
         ON meeting_stages(meeting_id, id)",
        [],
    )
    .context("Failed to create meeting_stages index")?;

    Ok(())
}
