//! Client for the server-side AVIF conversion endpoint.
//!
//! Request: `{ imageData, quality, format: "avif" }`.
//! Success: `{ success: true, data, size, compressionRatio, message? }`.
//! Failure: HTTP 400 / 413 / 500 with `{ success: false, error }`.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{EncodedImage, RemoteConfig};
use crate::utils::{data_uri, CompressorError, CompressorResult, ImageFormat};

pub const REMOTE_SUCCESS_MESSAGE: &str = "server-side AVIF conversion succeeded";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConvertRequest<'a> {
    image_data: &'a str,
    quality: u8,
    format: ImageFormat,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertResponse {
    success: bool,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    size: Option<f64>,
    #[serde(default)]
    compression_ratio: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Converts images to AVIF on a remote service with a hard timeout.
#[derive(Debug, Clone)]
pub struct RemoteConverter {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl RemoteConverter {
    pub fn new(config: RemoteConfig) -> CompressorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CompressorError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Sends `image_data` for AVIF conversion.
    ///
    /// Every failure mode (oversize, transport, timeout, non-2xx, `success: false`) is a
    /// [`CompressorError::Remote`]; callers treat all of them as recoverable.
    pub async fn convert(&self, image_data: &str, quality: u8) -> CompressorResult<EncodedImage> {
        let estimated = data_uri::estimated_size(image_data);
        if estimated > self.config.max_payload_bytes {
            return Err(CompressorError::remote(format!(
                "Image too large for server-side processing ({estimated} bytes, limit {})",
                self.config.max_payload_bytes
            )));
        }

        debug!("POST {} ({} bytes estimated)", self.config.endpoint, estimated);
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&ConvertRequest {
                image_data,
                quality: quality.min(100),
                format: ImageFormat::AVIF,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(CompressorError::remote("Image too large for server-side processing (HTTP 413)"));
        }
        if !status.is_success() {
            return Err(CompressorError::remote(format!("Server error: {}", status.as_u16())));
        }

        let body: ConvertResponse = response.json().await?;
        if !body.success {
            return Err(CompressorError::remote(
                body.error.unwrap_or_else(|| "Server-side conversion failed".to_string()),
            ));
        }

        let data = body
            .data
            .ok_or_else(|| CompressorError::remote("Server reply is missing image data"))?;

        Ok(EncodedImage {
            encoded_image: data,
            encoded_size: body.size.map(|s| s.max(0.0).round() as u64).unwrap_or(0),
            actual_format: ImageFormat::AVIF,
            compression_ratio: body.compression_ratio.unwrap_or_else(|| "0.00".to_string()),
            downgrade_notice: None,
            status_message: Some(REMOTE_SUCCESS_MESSAGE.to_string()),
        })
    }
}
