//! Document sink abstraction for publishing meeting notes.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::analysis::AnalysisResult;
use crate::pipeline::retry::Retryable;

pub mod notion;

pub use notion::NotionSink;

/// One finished notes page, ready to publish.
#[derive(Debug, Clone)]
pub struct NotesPage {
    pub title: String,
    /// The meeting's scheduled date, not the wall-clock completion time.
    pub date: NaiveDate,
    pub analysis: AnalysisResult,
    pub transcript: String,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish backend error: {reason}")]
    Backend { reason: String, retryable: bool },
    #[error("publish rejected: {reason}")]
    Rejected { reason: String },
    #[error("invalid publish configuration: {reason}")]
    Config { reason: String },
}

impl Retryable for PublishError {
    fn retryable(&self) -> bool {
        matches!(self, Self::Backend { retryable: true, .. })
    }
}

/// External workspace page creation. Returns the created page's URL.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn publish(&self, page: &NotesPage) -> Result<String, PublishError>;
}
