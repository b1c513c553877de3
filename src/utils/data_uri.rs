//! Data URI encoding and decoding.
//!
//! Images cross every boundary of the core as `data:<mime>;base64,<payload>` strings.

use std::path::Path;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use crate::utils::{CompressorError, CompressorResult};
use crate::utils::formats::mime_from_path;

/// A decoded data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Parses a base64 data URI into its MIME type and raw bytes.
pub fn parse(uri: &str) -> CompressorResult<DataUri> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CompressorError::data_uri("missing 'data:' scheme"))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CompressorError::data_uri("missing ',' separator"))?;

    let mut parts = header.split(';');
    let mime = parts.next().unwrap_or_default().trim().to_lowercase();
    if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(CompressorError::data_uri("only base64 payloads are supported"));
    }

    let bytes = STANDARD.decode(payload.trim())?;
    let mime = if mime.is_empty() { "application/octet-stream".to_string() } else { mime };

    Ok(DataUri { mime, bytes })
}

/// Encodes raw bytes as a base64 data URI.
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decoded byte size estimated from a data URI's length, without decoding it.
pub fn estimated_size(uri: &str) -> u64 {
    (uri.len() as u64 * 3) / 4
}

/// Reads a file into a data URI, guessing the MIME type from its extension.
///
/// Returns the URI together with the file's byte length.
pub async fn from_file(path: impl AsRef<Path>) -> CompressorResult<(String, u64)> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CompressorError::IO(format!("Failed to read {}: {}", path.display(), e)))?;

    let size = bytes.len() as u64;
    Ok((encode(mime_from_path(path), &bytes), size))
}
