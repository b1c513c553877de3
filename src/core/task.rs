//! Transcode request definition and creation.

use serde::{Deserialize, Serialize};
use crate::utils::ImageFormat;

/// A 1x1 PNG used for worker self-tests.
pub const TEST_PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// One unit of work sent to the worker.
///
/// Serializes to the worker's request message:
/// `{ imageData, quality, format, id, originalSize, isMemeMode }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeRequest {
    /// Opaque token matching the reply to this request
    #[serde(rename = "id")]
    pub correlation_id: String,
    /// Encoded source image as a data URI
    #[serde(rename = "imageData")]
    pub source_image: String,
    /// Encoder quality 0-100, ignored for lossless targets
    pub quality: u8,
    /// Requested output format
    #[serde(rename = "format")]
    pub target_format: ImageFormat,
    /// Selects the destructive "meme" transform path
    #[serde(rename = "isMemeMode")]
    pub degrade: bool,
    /// Pre-transform size, only used for ratio reporting
    pub original_size: u64,
}

impl TranscodeRequest {
    /// Creates a request with a fresh correlation id.
    pub fn new(
        source_image: impl Into<String>,
        quality: u8,
        target_format: ImageFormat,
        original_size: u64,
        degrade: bool,
    ) -> Self {
        Self {
            correlation_id: new_correlation_id(),
            source_image: source_image.into(),
            quality: quality.min(100),
            target_format,
            degrade,
            original_size,
        }
    }

    /// Creates the self-test request: the bundled 1x1 PNG re-encoded as JPEG.
    pub fn create_test_request() -> Self {
        let mut request = Self::new(TEST_PIXEL_PNG, 80, ImageFormat::JPEG, 100, false);
        request.correlation_id = format!("test-{}", request.correlation_id);
        request
    }
}

/// An input to batch processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    /// Label reported back with the result (usually the file name)
    pub name: String,
    /// Encoded source image as a data URI
    pub data: String,
    /// Size of the source file in bytes
    pub original_size: u64,
}

impl BatchItem {
    pub fn new(name: impl Into<String>, data: impl Into<String>, original_size: u64) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            original_size,
        }
    }
}

/// Generates a fresh, opaque correlation id.
pub fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
