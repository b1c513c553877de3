//! Native codec backed by the `image` crate.
//!
//! WebP (libwebp, lossy) and AVIF encoders are compiled in through the `webp` and `avif`
//! cargo features; without them the codec answers those requests with PNG.

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use tracing::debug;

use crate::utils::{CompressorError, CompressorResult, ImageFormat};
use super::{EncodedBlob, RasterCodec};

type Result<T> = CompressorResult<T>;

// ── Encoder defaults (canvas-style when no quality is given) ───────────────────────

const DEFAULT_JPEG_QUALITY: f32 = 0.92;
#[cfg(feature = "webp")]
const DEFAULT_WEBP_QUALITY: f32 = 0.8;
#[cfg(feature = "avif")]
const DEFAULT_AVIF_QUALITY: f32 = 0.8;
#[cfg(feature = "avif")]
const AVIF_SPEED: u8 = 8; // 1-10, 10 fastest

/// Codec using the pure-Rust encoders and decoders of the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCodec;

impl NativeCodec {
    pub fn new() -> Self {
        Self
    }
}

impl RasterCodec for NativeCodec {
    fn decode(&self, blob: &[u8]) -> Result<RgbaImage> {
        let image = image::load_from_memory(blob)
            .map_err(|e| CompressorError::decode(format!("Failed to decode image: {e}")))?;

        debug!("Decoded {}×{} bitmap", image.width(), image.height());
        Ok(image.to_rgba8())
    }

    fn encode(&self, surface: &RgbaImage, mime: &str, quality: Option<f32>) -> Result<EncodedBlob> {
        let mut bytes = Vec::new();

        let produced = match ImageFormat::from_mime(mime) {
            Some(ImageFormat::JPEG) => {
                save_jpeg(surface, &mut bytes, quality)?;
                ImageFormat::JPEG
            }
            Some(ImageFormat::WebP) if save_webp(surface, &mut bytes, quality)? => ImageFormat::WebP,
            Some(ImageFormat::AVIF) if save_avif(surface, &mut bytes, quality)? => ImageFormat::AVIF,
            _ => {
                bytes.clear();
                save_png(surface, &mut bytes)?;
                ImageFormat::PNG
            }
        };

        Ok(EncodedBlob {
            mime: produced.mime_type().to_string(),
            bytes,
        })
    }
}

/// Maps a `0.0..=1.0` quality onto the `1..=100` scale the encoders take.
fn quality_percent(quality: Option<f32>, default: f32) -> u8 {
    let q = quality.unwrap_or(default).clamp(0.0, 1.0);
    ((q * 100.0).round() as u8).max(1)
}

// ── Format save functions ──────────────────────────────────────────────────────────

/// Saves `surface` as baseline JPEG. Alpha is dropped.
fn save_jpeg(surface: &RgbaImage, out: &mut Vec<u8>, quality: Option<f32>) -> Result<()> {
    let rgb: RgbImage = surface.convert();
    let q = quality_percent(quality, DEFAULT_JPEG_QUALITY);

    JpegEncoder::new_with_quality(out, q)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| CompressorError::encode(format!("JPEG encode failed: {e}")))
}

/// Saves `surface` as PNG. Always lossless.
fn save_png(surface: &RgbaImage, out: &mut Vec<u8>) -> Result<()> {
    PngEncoder::new(out)
        .write_image(surface.as_raw(), surface.width(), surface.height(), ExtendedColorType::Rgba8)
        .map_err(|e| CompressorError::encode(format!("PNG encode failed: {e}")))
}

/// Saves `surface` as lossy WebP through libwebp.
#[cfg(feature = "webp")]
fn save_webp(surface: &RgbaImage, out: &mut Vec<u8>, quality: Option<f32>) -> Result<bool> {
    let q = quality_percent(quality, DEFAULT_WEBP_QUALITY);
    let encoded = webp::Encoder::from_rgba(surface.as_raw(), surface.width(), surface.height())
        .encode_simple(false, q as f32)
        .map_err(|e| CompressorError::encode(format!("WebP encode failed: {e:?}")))?;

    out.extend_from_slice(&encoded);
    Ok(true)
}

#[cfg(not(feature = "webp"))]
fn save_webp(_surface: &RgbaImage, _out: &mut Vec<u8>, _quality: Option<f32>) -> Result<bool> {
    Ok(false)
}

/// Saves `surface` as AVIF.
#[cfg(feature = "avif")]
fn save_avif(surface: &RgbaImage, out: &mut Vec<u8>, quality: Option<f32>) -> Result<bool> {
    use image::codecs::avif::AvifEncoder;

    let q = quality_percent(quality, DEFAULT_AVIF_QUALITY);
    AvifEncoder::new_with_speed_quality(out, AVIF_SPEED, q)
        .write_image(surface.as_raw(), surface.width(), surface.height(), ExtendedColorType::Rgba8)
        .map_err(|e| CompressorError::encode(format!("AVIF encode failed: {e}")))?;
    Ok(true)
}

#[cfg(not(feature = "avif"))]
fn save_avif(_surface: &RgbaImage, _out: &mut Vec<u8>, _quality: Option<f32>) -> Result<bool> {
    Ok(false)
}
