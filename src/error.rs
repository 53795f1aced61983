//! Error types for the transcription orchestrator.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating a transcription run.
#[derive(Error, Debug)]
pub enum Error {
    /// The input audio file could not be read.
    #[error("Invalid audio input: {0}")]
    InvalidAudio(String),

    /// The primary (whole-file) transcription pass failed. Fatal: the run cannot continue.
    #[error("Primary transcription failed: {0}")]
    PrimaryTranscriptionFailed(String),

    /// A single vendor provider call failed.
    #[error("Provider '{source}' failed: {message}")]
    Provider { source: String, message: String },

    /// The LLM judge backend could not be reached or returned an unusable response.
    #[error("Judge backend error: {0}")]
    Judge(String),

    /// A merge-time invariant was violated (decision span outside primary transcript range,
    /// or overlapping decisions). Per spec this is a bug, not a degraded-quality condition.
    #[error("Merge inconsistency: {0}")]
    MergeInconsistency(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Audio decode/encode error from the segment extractor.
    #[error("Audio processing error: {0}")]
    Audio(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error talking to a vendor or judge backend.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a provider-level error.
    pub fn provider(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            source: source.into(),
            message: message.into(),
        }
    }

    /// Create a judge-backend error.
    pub fn judge(msg: impl Into<String>) -> Self {
        Self::Judge(msg.into())
    }

    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an audio-processing error.
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Create a merge-inconsistency error.
    pub fn merge_inconsistency(msg: impl Into<String>) -> Self {
        Self::MergeInconsistency(msg.into())
    }
}
