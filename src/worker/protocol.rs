//! Messages exchanged between the coordinator and its worker.
//!
//! Requests travel as [`WorkerCommand`]s. Everything the worker says comes back as a
//! [`WorkerEvent`], which serializes to the wire shapes:
//!
//! - success: `{ id, success: true, data, size, originalSize, format, compressionRatio, message? }`
//! - failure: `{ id, success: false, error }`
//! - init:    `{ type: "init", success, message | error }`
//! - test:    `{ type: "test", ...reply }`

use serde::{Deserialize, Serialize};
use crate::core::{EncodedImage, TranscodeRequest, TranscodeResult};
use crate::utils::{CompressorError, CompressorResult, ImageFormat};

/// Inbound messages, processed strictly in arrival order.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// Transcode and answer with a correlated reply.
    Transcode(TranscodeRequest),
    /// Transcode and answer with an out-of-band test echo.
    Test(TranscodeRequest),
    /// Finish the current request, then exit.
    Shutdown,
}

/// Reply to one transcode request.
///
/// `id` is `None` only for diagnostics raised outside any request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeReply {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ImageFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscodeReply {
    pub fn success(request: &TranscodeRequest, image: EncodedImage) -> Self {
        Self {
            id: Some(request.correlation_id.clone()),
            success: true,
            data: Some(image.encoded_image),
            size: Some(image.encoded_size),
            original_size: Some(request.original_size),
            format: Some(image.actual_format),
            compression_ratio: Some(image.compression_ratio),
            message: image.downgrade_notice,
            error: None,
        }
    }

    pub fn failure(id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            data: None,
            size: None,
            original_size: None,
            format: None,
            compression_ratio: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Converts the reply into a caller-facing result.
    ///
    /// Failure replies, and success replies missing required fields, become
    /// [`CompressorError::Worker`].
    pub fn into_result(self, original_size: u64) -> CompressorResult<TranscodeResult> {
        let id = self.id.unwrap_or_default();

        if !self.success {
            let error = self.error.unwrap_or_else(|| "Image processing failed".to_string());
            return Err(CompressorError::worker(error));
        }

        let (Some(data), Some(format)) = (self.data, self.format) else {
            return Err(CompressorError::worker(format!("Malformed success reply for {id}")));
        };

        let image = EncodedImage {
            encoded_image: data,
            encoded_size: self.size.unwrap_or(0),
            actual_format: format,
            compression_ratio: self.compression_ratio.unwrap_or_else(|| "0.00".to_string()),
            downgrade_notice: self.message,
            status_message: None,
        };

        Ok(TranscodeResult::success(id, original_size, image))
    }
}

/// Startup self-check outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitStatus {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitStatus {
    pub fn ready(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, message: None, error: Some(error.into()) }
    }
}

/// Out-of-band messages not tied to a pending call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Init(InitStatus),
    Test(TranscodeReply),
}

/// Everything the worker posts back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WorkerEvent {
    Reply(TranscodeReply),
    Control(ControlMessage),
}
