//! Result types produced by the transcoding core.

use serde::Serialize;
use crate::utils::ImageFormat;

/// A successfully re-encoded image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImage {
    /// Encoded output as a data URI
    pub encoded_image: String,
    /// Encoded output size in bytes
    pub encoded_size: u64,
    /// Format actually produced; differs from the request after a capability fallback
    pub actual_format: ImageFormat,
    /// Bytes saved as a percentage of the original, two decimals ("0.00" when unknown)
    pub compression_ratio: String,
    /// Present iff `actual_format` differs from the requested format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downgrade_notice: Option<String>,
    /// Informational message that is not a downgrade (e.g. a remote conversion note)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

/// Success or failure of one unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    Success(EncodedImage),
    #[serde(rename_all = "camelCase")]
    Failure { error_message: String },
}

/// Result returned for each transcode request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeResult {
    /// Echoes the request's correlation id
    pub correlation_id: String,
    /// Batch item label, when the request came from a batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    /// Size of the pre-transform asset, carried for ratio reporting
    pub original_size: u64,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl TranscodeResult {
    pub fn success(correlation_id: impl Into<String>, original_size: u64, image: EncodedImage) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            source_name: None,
            original_size,
            outcome: Outcome::Success(image),
        }
    }

    pub fn failure(
        correlation_id: impl Into<String>,
        original_size: u64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            source_name: None,
            original_size,
            outcome: Outcome::Failure { error_message: error_message.into() },
        }
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn encoded(&self) -> Option<&EncodedImage> {
        match &self.outcome {
            Outcome::Success(image) => Some(image),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure { error_message } => Some(error_message),
        }
    }
}
