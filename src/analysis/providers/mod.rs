use async_trait::async_trait;

use super::{AnalysisError, AnalysisResult};

pub mod gemini;

pub use gemini::GeminiProvider;

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, transcript: &str) -> Result<AnalysisResult, AnalysisError>;
}
