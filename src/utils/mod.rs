pub mod error;
pub mod formats;
pub mod data_uri;

pub use error::{CompressorError, CompressorResult};
pub use formats::{ImageFormat, mime_from_path};
pub use data_uri::DataUri;

/// Formats a compression ratio as a percentage with two decimals.
///
/// An unknown (zero) original size reports `0.00`.
pub fn compression_ratio(original_size: u64, encoded_size: u64) -> String {
    if original_size == 0 {
        return "0.00".to_string();
    }
    let saved = original_size as f64 - encoded_size as f64;
    format!("{:.2}", saved / original_size as f64 * 100.0)
}
