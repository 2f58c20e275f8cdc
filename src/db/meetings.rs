//! Meeting outcome persistence.
//!
//! One row per meeting plus a stage journal with one row per state change.
//! Raw SQL with rusqlite, no ORM.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::pipeline::state::ProcessingState;

/// A meeting row from the database.
#[derive(Debug, Clone)]
pub struct MeetingRow {
    pub id: i64,
    pub meeting_id: String,
    pub title: Option<String>,
    pub scheduled_start: String,
    pub stage: String,
    pub recording_path: Option<String>,
    pub transcript_path: Option<String>,
    pub page_url: Option<String>,
    pub error: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

/// One entry of the stage journal.
#[derive(Debug, Clone)]
pub struct StageLogEntry {
    pub stage: String,
    pub at: String,
}

/// Repository for meeting rows and their stage journal.
pub struct MeetingRepository;

impl MeetingRepository {
    /// Insert a newly dispatched meeting (stage = pending). Returns the
    /// database row id.
    pub fn insert(
        conn: &Connection,
        meeting_id: &str,
        title: &str,
        scheduled_start: &str,
    ) -> Result<i64> {
        conn.execute(
            "INSERT INTO meetings (meeting_id, title, scheduled_start, stage) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                meeting_id,
                title,
                scheduled_start,
                ProcessingState::Pending.as_str()
            ],
        )
        .context("Failed to insert meeting")?;

        conn.execute(
            "INSERT INTO meeting_stages (meeting_id, stage) VALUES (?1, ?2)",
            params![meeting_id, ProcessingState::Pending.as_str()],
        )
        .context("Failed to journal initial stage")?;

        Ok(conn.last_insert_rowid())
    }

    /// Record a stage transition: updates the row and appends to the journal.
    pub fn set_stage(conn: &Connection, meeting_id: &str, stage: ProcessingState) -> Result<()> {
        conn.execute(
            "UPDATE meetings SET stage = ?1 WHERE meeting_id = ?2",
            params![stage.as_str(), meeting_id],
        )
        .context("Failed to update meeting stage")?;

        conn.execute(
            "INSERT INTO meeting_stages (meeting_id, stage) VALUES (?1, ?2)",
            params![meeting_id, stage.as_str()],
        )
        .context("Failed to journal stage transition")?;

        Ok(())
    }

    pub fn set_recording_path(conn: &Connection, meeting_id: &str, path: &str) -> Result<()> {
        conn.execute(
            "UPDATE meetings SET recording_path = ?1 WHERE meeting_id = ?2",
            params![path, meeting_id],
        )
        .context("Failed to set recording path")?;
        Ok(())
    }

    pub fn set_transcript_path(conn: &Connection, meeting_id: &str, path: &str) -> Result<()> {
        conn.execute(
            "UPDATE meetings SET transcript_path = ?1 WHERE meeting_id = ?2",
            params![path, meeting_id],
        )
        .context("Failed to set transcript path")?;
        Ok(())
    }

    /// Mark a meeting completed with its published page URL.
    pub fn complete(conn: &Connection, meeting_id: &str, page_url: &str) -> Result<()> {
        conn.execute(
            "UPDATE meetings SET stage = ?1, page_url = ?2, \
             completed_at = CURRENT_TIMESTAMP WHERE meeting_id = ?3",
            params![ProcessingState::Completed.as_str(), page_url, meeting_id],
        )
        .context("Failed to complete meeting")?;

        conn.execute(
            "INSERT INTO meeting_stages (meeting_id, stage) VALUES (?1, ?2)",
            params![meeting_id, ProcessingState::Completed.as_str()],
        )
        .context("Failed to journal completion")?;

        Ok(())
    }

    /// Mark a meeting failed with the stage it failed in and the reason.
    pub fn fail(
        conn: &Connection,
        meeting_id: &str,
        failed_stage: ProcessingState,
        error: &str,
    ) -> Result<()> {
        conn.execute(
            "UPDATE meetings SET stage = ?1, \
             error = ?2, completed_at = CURRENT_TIMESTAMP WHERE meeting_id = ?3",
            params![
                ProcessingState::Failed.as_str(),
                format!("{}: {}", failed_stage.as_str(), error),
                meeting_id
            ],
        )
        .context("Failed to mark meeting as failed")?;

        conn.execute(
            "INSERT INTO meeting_stages (meeting_id, stage) VALUES (?1, ?2)",
            params![meeting_id, ProcessingState::Failed.as_str()],
        )
        .context("Failed to journal failure")?;

        Ok(())
    }

    /// Mark a meeting cancelled (removed from the schedule before start).
    pub fn cancel(conn: &Connection, meeting_id: &str) -> Result<()> {
        conn.execute(
            "UPDATE meetings SET stage = ?1, completed_at = CURRENT_TIMESTAMP \
             WHERE meeting_id = ?2",
            params![ProcessingState::Cancelled.as_str(), meeting_id],
        )
        .context("Failed to cancel meeting")?;

        conn.execute(
            "INSERT INTO meeting_stages (meeting_id, stage) VALUES (?1, ?2)",
            params![meeting_id, ProcessingState::Cancelled.as_str()],
        )
        .context("Failed to journal cancellation")?;

        Ok(())
    }

    /// Get a meeting by its external id.
    pub fn get(conn: &Connection, meeting_id: &str) -> Result<Option<MeetingRow>> {
        conn.query_row(
            "SELECT id, meeting_id, title, scheduled_start, stage, recording_path, \
             transcript_path, page_url, error, completed_at, created_at \
             FROM meetings WHERE meeting_id = ?1",
            params![meeting_id],
            Self::map_row,
        )
        .optional()
        .context("Failed to query meeting")
    }

    /// List meetings, newest scheduled first.
    pub fn list(conn: &Connection, limit: usize) -> Result<Vec<MeetingRow>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, meeting_id, title, scheduled_start, stage, recording_path, \
                 transcript_path, page_url, error, completed_at, created_at \
                 FROM meetings ORDER BY scheduled_start DESC, id DESC LIMIT ?1",
            )
            .context("Failed to prepare meetings list query")?;

        let rows = stmt
            .query_map(params![limit as i64], Self::map_row)
            .context("Failed to list meetings")?;

        let mut meetings = Vec::new();
        for row in rows {
            meetings.push(row?);
        }

        Ok(meetings)
    }

    /// The stage journal for one meeting, in transition order.
    pub fn stage_log(conn: &Connection, meeting_id: &str) -> Result<Vec<StageLogEntry>> {
        let mut stmt = conn
            .prepare(
                "SELECT stage, at FROM meeting_stages WHERE meeting_id = ?1 ORDER BY id ASC",
            )
            .context("Failed to prepare stage log query")?;

        let rows = stmt
            .query_map(params![meeting_id], |row| {
                Ok(StageLogEntry {
                    stage: row.get(0)?,
                    at: row.get(1)?,
                })
            })
            .context("Failed to query stage log")?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }

        Ok(entries)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MeetingRow> {
        Ok(MeetingRow {
            id: row.get(0)?,
            meeting_id: row.get(1)?,
            title: row.get(2)?,
            scheduled_start: row.get(3)?,
            stage: row.get(4)?,
            recording_path: row.get(5)?,
            transcript_path: row.get(6)?,
            page_url: row.get(7)?,
            error: row.get(8)?,
            completed_at: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_get() {
        let conn = setup_db();
        MeetingRepository::insert(&conn, "m1", "Standup", "2025-06-07T10:00:00Z").unwrap();

        let row = MeetingRepository::get(&conn, "m1").unwrap().unwrap();
        assert_eq!(row.meeting_id, "m1");
        assert_eq!(row.title, Some("Standup".to_string()));
        assert_eq!(row.stage, "pending");
        assert!(row.page_url.is_none());
    }

    #[test]
    fn test_get_nonexistent() {
        let conn = setup_db();
        assert!(MeetingRepository::get(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_stage_journal() {
        let conn = setup_db();
        MeetingRepository::insert(&conn, "m1", "Standup", "2025-06-07T10:00:00Z").unwrap();
        MeetingRepository::set_stage(&conn, "m1", ProcessingState::Waiting).unwrap();
        MeetingRepository::set_stage(&conn, "m1", ProcessingState::Recording).unwrap();
        MeetingRepository::set_stage(&conn, "m1", ProcessingState::Transcribing).unwrap();

        let log = MeetingRepository::stage_log(&conn, "m1").unwrap();
        let stages: Vec<&str> = log.iter().map(|e| e.stage.as_str()).collect();
        assert_eq!(
            stages,
            vec!["pending", "waiting", "recording", "transcribing"]
        );
    }

    #[test]
    fn test_complete() {
        let conn = setup_db();
        MeetingRepository::insert(&conn, "m1", "Standup", "2025-06-07T10:00:00Z").unwrap();
        MeetingRepository::complete(&conn, "m1", "https://notion.so/page-1").unwrap();

        let row = MeetingRepository::get(&conn, "m1").unwrap().unwrap();
        assert_eq!(row.stage, "completed");
        assert_eq!(row.page_url, Some("https://notion.so/page-1".to_string()));
        assert!(row.completed_at.is_some());
    }

    #[test]
    fn test_fail_records_stage_and_reason() {
        let conn = setup_db();
        MeetingRepository::insert(&conn, "m1", "Standup", "2025-06-07T10:00:00Z").unwrap();
        MeetingRepository::fail(
            &conn,
            "m1",
            ProcessingState::Transcribing,
            "backend timeout",
        )
        .unwrap();

        let row = MeetingRepository::get(&conn, "m1").unwrap().unwrap();
        assert_eq!(row.stage, "failed");
        assert_eq!(
            row.error,
            Some("transcribing: backend timeout".to_string())
        );
    }

    #[test]
    fn test_cancel() {
        let conn = setup_db();
        MeetingRepository::insert(&conn, "m1", "Standup", "2025-06-07T10:00:00Z").unwrap();
        MeetingRepository::cancel(&conn, "m1").unwrap();

        let row = MeetingRepository::get(&conn, "m1").unwrap().unwrap();
        assert_eq!(row.stage, "cancelled");
    }

    #[test]
    fn test_duplicate_meeting_id_rejected() {
        let conn = setup_db();
        MeetingRepository::insert(&conn, "m1", "Standup", "2025-06-07T10:00:00Z").unwrap();
        assert!(
            MeetingRepository::insert(&conn, "m1", "Standup again", "2025-06-07T10:00:00Z")
                .is_err()
        );
    }

    #[test]
    fn test_list_newest_first() {
        let conn = setup_db();
        MeetingRepository::insert(&conn, "m1", "Early", "2025-06-07T09:00:00Z").unwrap();
        MeetingRepository::insert(&conn, "m2", "Late", "2025-06-07T15:00:00Z").unwrap();

        let rows = MeetingRepository::list(&conn, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].meeting_id, "m2");
    }
}
