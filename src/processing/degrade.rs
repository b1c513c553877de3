//! Degrade ("meme") mode: pixelation, posterization and noise.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use rand::Rng;

/// Smallest side a degraded image is shrunk to (unless the source is smaller).
pub const MIN_DEGRADED_SIDE: u32 = 32;
/// Encoder quality ceiling applied in degrade mode.
pub const DEGRADE_QUALITY_CAP: f32 = 0.15;

const TARGET_LONG_SIDE: f64 = 200.0;
const MIN_SCALE: f64 = 0.1;
const MAX_SCALE: f64 = 0.3;
const QUANT_STEP: u8 = 32;
const NOISE_PROBABILITY: f64 = 0.1;
const NOISE_AMPLITUDE: i16 = 20;

/// Target dimensions for a degraded render of a `width`×`height` source.
///
/// Scale is `clamp(200 / longest side, 0.1, 0.3)`; each side is floored, raised to
/// [`MIN_DEGRADED_SIDE`], and never exceeds the source side.
pub fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    let longest = width.max(height).max(1) as f64;
    let scale = (TARGET_LONG_SIDE / longest).clamp(MIN_SCALE, MAX_SCALE);

    let side = |src: u32| {
        let scaled = (src as f64 * scale).floor() as u32;
        scaled.max(MIN_DEGRADED_SIDE).min(src.max(1))
    };

    (side(width), side(height))
}

/// Renders `source` at degraded dimensions without smoothing, then posterizes and adds noise.
pub fn degrade(source: &RgbaImage) -> RgbaImage {
    let (width, height) = target_dimensions(source.width(), source.height());
    let mut surface = imageops::resize(source, width, height, FilterType::Nearest);
    posterize_and_noise(&mut surface, &mut rand::rng());
    surface
}

/// Quantizes RGB to 32-level steps, then perturbs ~10% of pixels by up to ±20.
///
/// One noise value is drawn per affected pixel and added to all three color channels.
/// Alpha is left untouched.
pub fn posterize_and_noise<R: Rng + ?Sized>(surface: &mut RgbaImage, rng: &mut R) {
    for pixel in surface.pixels_mut() {
        let channels = &mut pixel.0[..3];
        for c in channels.iter_mut() {
            *c = (*c / QUANT_STEP) * QUANT_STEP;
        }

        if rng.random_bool(NOISE_PROBABILITY) {
            let noise: i16 = rng.random_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
            for c in channels.iter_mut() {
                *c = (*c as i16 + noise).clamp(0, 255) as u8;
            }
        }
    }
}
