//! Best-effort persistence facade for the pipeline.
//!
//! The pipeline journals every stage transition and outcome, but a broken
//! database must never fail a meeting, so every write degrades to a log
//! line. Tests run with the journal disabled.

use rusqlite::Connection;
use std::path::PathBuf;
use tracing::warn;

use crate::pipeline::state::ProcessingState;
use crate::schedule::Meeting;

use super::meetings::MeetingRepository;
use super::migrate;

#[derive(Clone, Default)]
pub struct MeetingJournal {
    db_path: Option<PathBuf>,
}

impl MeetingJournal {
    pub fn at(db_path: PathBuf) -> Self {
        Self {
            db_path: Some(db_path),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    fn conn(&self) -> Option<Connection> {
        let path = self.db_path.as_ref()?;
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Cannot create database directory: {}", e);
                return None;
            }
        }
        let conn = match Connection::open(path) {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Cannot open meeting database: {}", e);
                return None;
            }
        };
        if let Err(e) = migrate(&conn) {
            warn!("Cannot migrate meeting database: {}", e);
            return None;
        }
        Some(conn)
    }

    pub fn insert(&self, meeting: &Meeting) {
        let Some(conn) = self.conn() else { return };
        if let Err(e) =
            MeetingRepository::insert(&conn, &meeting.id, &meeting.title, &meeting.start.to_rfc3339())
        {
            warn!(meeting_id = %meeting.id, "Failed to persist meeting: {}", e);
        }
    }

    pub fn set_stage(&self, meeting_id: &str, stage: ProcessingState) {
        let Some(conn) = self.conn() else { return };
        if let Err(e) = MeetingRepository::set_stage(&conn, meeting_id, stage) {
            warn!(meeting_id = %meeting_id, "Failed to journal stage: {}", e);
        }
    }

    pub fn set_recording_path(&self, meeting_id: &str, path: &str) {
        let Some(conn) = self.conn() else { return };
        if let Err(e) = MeetingRepository::set_recording_path(&conn, meeting_id, path) {
            warn!(meeting_id = %meeting_id, "Failed to persist recording path: {}", e);
        }
    }

    pub fn set_transcript_path(&self, meeting_id: &str, path: &str) {
        let Some(conn) = self.conn() else { return };
        if let Err(e) = MeetingRepository::set_transcript_path(&conn, meeting_id, path) {
            warn!(meeting_id = %meeting_id, "Failed to persist transcript path: {}", e);
        }
    }

    pub fn complete(&self, meeting_id: &str, page_url: &str) {
        let Some(conn) = self.conn() else { return };
        if let Err(e) = MeetingRepository::complete(&conn, meeting_id, page_url) {
            warn!(meeting_id = %meeting_id, "Failed to persist completion: {}", e);
        }
    }

    pub fn fail(&self, meeting_id: &str, stage: ProcessingState, error: &str) {
        let Some(conn) = self.conn() else { return };
        if let Err(e) = MeetingRepository::fail(&conn, meeting_id, stage, error) {
            warn!(meeting_id = %meeting_id, "Failed to persist failure: {}", e);
        }
    }

    pub fn cancel(&self, meeting_id: &str) {
        let Some(conn) = self.conn() else { return };
        if let Err(e) = MeetingRepository::cancel(&conn, meeting_id) {
            warn!(meeting_id = %meeting_id, "Failed to persist cancellation: {}", e);
        }
    }
}
