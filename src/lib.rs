pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod metadata;
pub mod slack;
pub mod storage;
pub mod transcript;

pub use error::{Result, TranscriptError};
pub use export::{ExportSummary, Exporter};
