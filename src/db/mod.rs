pub mod init;
pub mod journal;
pub mod meetings;

pub use init::{init_db, migrate};
pub use journal::MeetingJournal;
pub use meetings::{MeetingRepository, MeetingRow, StageLogEntry};
