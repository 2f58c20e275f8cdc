pub mod analysis;
pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod global;
pub mod pipeline;
pub mod recorder;
pub mod schedule;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod transcription;
