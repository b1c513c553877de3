#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Mutex;

use image::{Rgba, RgbaImage};
use image_compressor::core::CoordinatorConfig;
use image_compressor::processing::{EncodedBlob, NativeCodec, RasterCodec};
use image_compressor::utils::{data_uri, CompressorResult, ImageFormat};

/// Width that makes [`ScriptedCodec`] panic while decoding.
pub const POISON_WIDTH: u32 = 13;

/// A PNG data URI of a `width`×`height` gradient, with its byte size.
pub fn png_uri(width: u32, height: u32) -> (String, u64) {
    let surface = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8, 255])
    });
    let blob = NativeCodec::new()
        .encode(&surface, "image/png", None)
        .expect("png encode");
    let size = blob.bytes.len() as u64;
    (data_uri::encode(&blob.mime, &blob.bytes), size)
}

/// Dimensions of the image inside a data URI.
pub fn dimensions_of(uri: &str) -> (u32, u32) {
    let parsed = data_uri::parse(uri).expect("valid data uri");
    let image = image::load_from_memory(&parsed.bytes).expect("decodable image");
    (image.width(), image.height())
}

pub fn fast_config(worker_timeout_ms: u64) -> CoordinatorConfig {
    CoordinatorConfig {
        worker_timeout_ms,
        ..CoordinatorConfig::default()
    }
}

/// Native codec with scripted host limitations and faults.
#[derive(Default)]
pub struct ScriptedCodec {
    unsupported: Vec<ImageFormat>,
    missing: Vec<&'static str>,
    hold_first_decode: Mutex<Option<mpsc::Receiver<()>>>,
    crash_on_start: AtomicBool,
    encodes: Mutex<Vec<(String, Option<f32>)>>,
}

impl ScriptedCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoders for `formats` answer with PNG, like a canvas that lacks them.
    pub fn without(mut self, formats: &[ImageFormat]) -> Self {
        self.unsupported.extend_from_slice(formats);
        self
    }

    /// The host lacks `primitive`, so the worker's self-check fails.
    pub fn missing(mut self, primitive: &'static str) -> Self {
        self.missing.push(primitive);
        self
    }

    /// The first decode blocks until the returned sender fires (or is dropped).
    pub fn hold_first_decode(self) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        *self.hold_first_decode.lock().unwrap() = Some(rx);
        (self, tx)
    }

    /// The first worker thread dies during its self-check; later ones start normally.
    pub fn crash_first_start(self) -> Self {
        self.crash_on_start.store(true, Ordering::SeqCst);
        self
    }

    /// MIME type and quality of every encode except the 1x1 capability checks.
    pub fn encodes(&self) -> Vec<(String, Option<f32>)> {
        self.encodes.lock().unwrap().clone()
    }
}

impl RasterCodec for ScriptedCodec {
    fn missing_primitives(&self) -> Vec<&'static str> {
        if self.crash_on_start.swap(false, Ordering::SeqCst) {
            panic!("scripted startup fault");
        }
        self.missing.clone()
    }

    fn decode(&self, blob: &[u8]) -> CompressorResult<RgbaImage> {
        let gate = self.hold_first_decode.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }

        let image = NativeCodec::new().decode(blob)?;
        if image.width() == POISON_WIDTH {
            panic!("scripted decoder fault");
        }
        Ok(image)
    }

    fn encode(&self, surface: &RgbaImage, mime: &str, quality: Option<f32>) -> CompressorResult<EncodedBlob> {
        let refused = ImageFormat::from_mime(mime).is_some_and(|f| self.unsupported.contains(&f));
        let mime = if refused { "image/png" } else { mime };
        if surface.width() * surface.height() > 1 {
            self.encodes.lock().unwrap().push((mime.to_string(), quality));
        }
        NativeCodec::new().encode(surface, mime, quality)
    }
}
