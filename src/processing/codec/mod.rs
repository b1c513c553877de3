//! Host imaging primitives.
//!
//! The transcoder never implements a codec itself. It drives whatever the host provides
//! through [`RasterCodec`]: decode a blob into a raster surface, encode a surface into a
//! blob of a requested MIME type. Like a browser canvas, an encoder asked for a type it
//! cannot produce answers with PNG, and capability probes detect that by comparing the
//! returned MIME type.

mod native;

use image::RgbaImage;
use crate::utils::CompressorResult;

pub use native::NativeCodec;

/// Offscreen raster surface creation.
pub const PRIMITIVE_RASTER_SURFACE: &str = "raster-surface";
/// Bitmap decode from a binary blob.
pub const PRIMITIVE_BITMAP_DECODE: &str = "bitmap-decode";
/// Blob to data URI conversion.
pub const PRIMITIVE_DATA_URI: &str = "data-uri";

/// Output of an encode call. `mime` is what the encoder actually produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlob {
    pub mime: String,
    pub bytes: Vec<u8>,
}

pub trait RasterCodec: Send + Sync {
    /// Primitives the host is missing. An empty list means the worker can start.
    fn missing_primitives(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Decodes an encoded image into an RGBA surface.
    fn decode(&self, blob: &[u8]) -> CompressorResult<RgbaImage>;

    /// Encodes `surface` as `mime`.
    ///
    /// `quality` is in `0.0..=1.0` and only meaningful for lossy types. Unknown or
    /// unsupported types fall back to PNG, reported through [`EncodedBlob::mime`].
    fn encode(&self, surface: &RgbaImage, mime: &str, quality: Option<f32>) -> CompressorResult<EncodedBlob>;
}
