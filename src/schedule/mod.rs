//! Schedule source abstraction and the meeting model.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub mod notion;

pub use notion::NotionScheduleSource;

/// One scheduled meeting, as fetched from the schedule backend.
#[derive(Debug, Clone)]
pub struct Meeting {
    /// Stable identity, unique per day.
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl Meeting {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule source unreachable: {reason}")]
    Unreachable { reason: String },
    #[error("schedule source rejected request: {reason}")]
    Rejected { reason: String },
    #[error("malformed schedule data: {reason}")]
    Malformed { reason: String },
}

/// Backend that yields the meetings expected today, ordered by start time.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_today(&self) -> Result<Vec<Meeting>, ScheduleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_end() {
        let meeting = Meeting {
            id: "m1".to_string(),
            title: "Standup".to_string(),
            start: "2025-06-07T10:00:00Z".parse().unwrap(),
            duration: Duration::minutes(30),
        };
        assert_eq!(
            meeting.end(),
            "2025-06-07T10:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }
}
