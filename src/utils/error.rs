//! Error types for the image compressor.
//!
//! Provides a single error enum using `thiserror`, one variant per failure class the
//! transcoding core can produce.

use std::io;
use thiserror::Error;
use serde::Serialize;

/// Main error type for the compressor.
///
/// Worker-side failures are converted to this type before being turned into reply
/// messages; coordinator-side rejections surface to callers as this type directly.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum CompressorError {
    /// Source bytes could not be interpreted as an image
    #[error("Decode error: {0}")]
    Decode(String),

    /// The encoder rejected the chosen format or quality
    #[error("Encode error: {0}")]
    Encode(String),

    /// The host lacks a primitive the worker depends on
    #[error("Capability error: {0}")]
    Capability(String),

    /// The worker answered this request with a failure reply
    #[error("Worker error: {0}")]
    Worker(String),

    /// The worker raised an error event or stopped answering altogether
    #[error("Worker crashed: {0}")]
    WorkerCrashed(String),

    /// No reply arrived within the worker bound. Raised locally, never by the worker.
    #[error("Processing timed out after {0} ms")]
    Timeout(u64),

    /// Remote conversion failed (transport, HTTP status or `success: false`)
    #[error("Remote conversion failed: {0}")]
    Remote(String),

    /// Malformed data URI
    #[error("Data URI error: {0}")]
    DataUri(String),

    /// Unsupported or invalid image format
    #[error("Format error: {0}")]
    Format(String),

    /// File IO error
    #[error("IO error: {0}")]
    IO(String),

    /// Invalid configuration value
    #[error("Config error: {0}")]
    Config(String),
}

/// Convenience result type for compressor operations.
pub type CompressorResult<T> = Result<T, CompressorError>;

// Helper methods for error creation
impl CompressorError {
    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode<T: Into<String>>(msg: T) -> Self {
        Self::Encode(msg.into())
    }

    pub fn capability<T: Into<String>>(msg: T) -> Self {
        Self::Capability(msg.into())
    }

    pub fn worker<T: Into<String>>(msg: T) -> Self {
        Self::Worker(msg.into())
    }

    pub fn crashed<T: Into<String>>(msg: T) -> Self {
        Self::WorkerCrashed(msg.into())
    }

    pub fn remote<T: Into<String>>(msg: T) -> Self {
        Self::Remote(msg.into())
    }

    pub fn data_uri<T: Into<String>>(msg: T) -> Self {
        Self::DataUri(msg.into())
    }

    pub fn format<T: Into<String>>(msg: T) -> Self {
        Self::Format(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    /// True for rejections raised by the coordinator's own dead-man timer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

// Convert std::io::Error to CompressorError
impl From<io::Error> for CompressorError {
    fn from(err: io::Error) -> Self {
        Self::IO(err.to_string())
    }
}

impl From<base64::DecodeError> for CompressorError {
    fn from(err: base64::DecodeError) -> Self {
        Self::DataUri(format!("invalid base64 payload: {err}"))
    }
}

impl From<reqwest::Error> for CompressorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Remote("remote conversion timed out".to_string())
        } else {
            Self::Remote(err.to_string())
        }
    }
}
