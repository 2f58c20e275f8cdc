use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleConfig,
    pub recorder: RecorderConfig,
    pub transcription: TranscriptionConfig,
    pub analysis: AnalysisConfig,
    pub publish: PublishConfig,
    pub retention: RetentionConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Schedule backend. Currently only "notion".
    pub provider: String,
    pub api_key: Option<String>,
    pub database_id: Option<String>,
    pub api_endpoint: Option<String>,
    /// Seconds between schedule polls.
    pub poll_interval_seconds: u64,
    /// Seconds before the scheduled start at which recording setup begins.
    pub lead_time_seconds: u64,
    /// Assumed meeting length when the schedule has no end time.
    pub default_duration_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            provider: "notion".to_string(),
            api_key: None,
            database_id: None,
            api_endpoint: None,
            poll_interval_seconds: 300,
            lead_time_seconds: 30,
            default_duration_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Capture command. The binary must be on PATH or an absolute path.
    pub command: String,
    /// Arguments for the capture command. "{output}" is replaced with the
    /// artifact path.
    pub args: Vec<String>,
    /// File extension of the produced artifact.
    pub extension: String,
    /// Seconds to wait for a graceful stop before killing the process.
    pub stop_grace_seconds: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            command: "ffmpeg".to_string(),
            args: vec![
                "-y".to_string(),
                "-loglevel".to_string(),
                "error".to_string(),
                "-f".to_string(),
                "pulse".to_string(),
                "-i".to_string(),
                "default".to_string(),
                "{output}".to_string(),
            ],
            extension: "wav".to_string(),
            stop_grace_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Transcription provider: "openai-api" or "whisper-cli".
    pub provider: String,
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
    pub command_path: Option<String>,
    pub model_path: Option<String>,
    /// Attempts for transient backend failures.
    pub max_attempts: u32,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: "openai-api".to_string(),
            api_key: None,
            api_endpoint: None,
            model: Some("whisper-1".to_string()),
            language: Some("en".to_string()),
            command_path: None,
            model_path: None,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis provider. Currently only "gemini".
    pub provider: String,
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub model: String,
    /// Attempts for transient backend failures.
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key: None,
            api_endpoint: None,
            model: "gemini-1.5-flash-002".to_string(),
            max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Notes backend. Currently only "notion".
    pub provider: String,
    pub api_key: Option<String>,
    pub database_id: Option<String>,
    pub api_endpoint: Option<String>,
    /// Attempts for transient backend failures.
    pub max_attempts: u32,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            provider: "notion".to_string(),
            api_key: None,
            database_id: None,
            api_endpoint: None,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// What to keep on disk once a meeting reaches a terminal state:
    /// "keep-all", "discard-recordings" or "discard-all".
    pub policy: String,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            policy: "discard-recordings".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Cap on simultaneously in-flight transcribe/analyze/publish stages.
    pub max_concurrent_processing: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_processing: 2,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
