//! The re-encoding pipeline run inside the worker.
//!
//! decode → (degrade) → resolve format → encode → serialize. Everything here is
//! synchronous and CPU-bound; the worker thread owns one [`Transcoder`].

use std::sync::Arc;
use tracing::debug;

use crate::core::{EncodedImage, TranscodeRequest};
use crate::utils::{compression_ratio, data_uri, CompressorResult, ImageFormat};
use super::capability::FormatSupport;
use super::codec::RasterCodec;
use super::degrade::{self, DEGRADE_QUALITY_CAP};

/// Stateless apart from the memoised capability probes.
pub struct Transcoder {
    codec: Arc<dyn RasterCodec>,
    support: FormatSupport,
}

impl Transcoder {
    pub fn new(codec: Arc<dyn RasterCodec>) -> Self {
        Self {
            codec,
            support: FormatSupport::new(),
        }
    }

    pub fn support(&self) -> &FormatSupport {
        &self.support
    }

    /// Runs one request through the pipeline.
    pub fn transcode(&mut self, request: &TranscodeRequest) -> CompressorResult<EncodedImage> {
        let source = data_uri::parse(&request.source_image)?;
        let bitmap = self.codec.decode(&source.bytes)?;
        let (src_w, src_h) = bitmap.dimensions();

        let surface = if request.degrade {
            degrade::degrade(&bitmap)
        } else {
            bitmap
        };

        let resolved = self.support.resolve(self.codec.as_ref(), request.target_format);
        let quality = encode_quality(resolved, request.quality, request.degrade);
        let blob = self.codec.encode(&surface, resolved.mime_type(), quality)?;

        // Report what the encoder produced, not what was asked for
        let actual_format = ImageFormat::from_mime(&blob.mime).unwrap_or(resolved);
        let encoded_size = blob.bytes.len() as u64;

        debug!(
            "[{}] {}×{} → {}×{} {} ({} → {} bytes)",
            request.correlation_id,
            src_w,
            src_h,
            surface.width(),
            surface.height(),
            actual_format,
            request.original_size,
            encoded_size
        );

        Ok(EncodedImage {
            encoded_image: data_uri::encode(&blob.mime, &blob.bytes),
            encoded_size,
            actual_format,
            compression_ratio: compression_ratio(request.original_size, encoded_size),
            downgrade_notice: downgrade_notice(request.target_format, actual_format),
            status_message: None,
        })
    }
}

/// Encoder quality in `0.0..=1.0`, or `None` for lossless formats.
///
/// Degrade mode caps quality at [`DEGRADE_QUALITY_CAP`].
pub fn encode_quality(format: ImageFormat, quality: u8, degrade: bool) -> Option<f32> {
    if format.is_lossless() {
        return None;
    }
    let q = quality.min(100) as f32 / 100.0;
    Some(if degrade { q.min(DEGRADE_QUALITY_CAP) } else { q })
}

/// Notice naming the substituted format, present iff `actual != requested`.
pub fn downgrade_notice(requested: ImageFormat, actual: ImageFormat) -> Option<String> {
    (actual != requested).then(|| format!("Downgraded to {} format", actual.as_str().to_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::codec::NativeCodec;
    use image::{Rgba, RgbaImage};

    fn png_source(width: u32, height: u32) -> (String, u64) {
        let surface = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        });
        let blob = NativeCodec::new().encode(&surface, "image/png", None).unwrap();
        let size = blob.bytes.len() as u64;
        (data_uri::encode(&blob.mime, &blob.bytes), size)
    }

    fn decoded_dimensions(uri: &str) -> (u32, u32) {
        let parsed = data_uri::parse(uri).unwrap();
        NativeCodec::new().decode(&parsed.bytes).unwrap().dimensions()
    }

    #[test]
    fn quality_mapping() {
        assert_eq!(encode_quality(ImageFormat::PNG, 80, false), None);
        assert_eq!(encode_quality(ImageFormat::PNG, 80, true), None);
        assert_eq!(encode_quality(ImageFormat::JPEG, 80, false), Some(0.8));
        assert_eq!(encode_quality(ImageFormat::JPEG, 80, true), Some(DEGRADE_QUALITY_CAP));
        assert_eq!(encode_quality(ImageFormat::WebP, 10, true), Some(0.1));
    }

    #[test]
    fn notice_only_on_substitution() {
        assert_eq!(downgrade_notice(ImageFormat::WebP, ImageFormat::WebP), None);
        assert_eq!(
            downgrade_notice(ImageFormat::AVIF, ImageFormat::JPEG).as_deref(),
            Some("Downgraded to JPEG format")
        );
    }

    #[test]
    fn normal_mode_keeps_dimensions() {
        let (uri, size) = png_source(120, 80);
        let mut transcoder = Transcoder::new(Arc::new(NativeCodec::new()));
        let request = TranscodeRequest::new(uri, 75, ImageFormat::JPEG, size, false);

        let image = transcoder.transcode(&request).unwrap();
        assert_eq!(image.actual_format, ImageFormat::JPEG);
        assert!(image.downgrade_notice.is_none());
        assert!(image.encoded_image.starts_with("data:image/jpeg;base64,"));
        assert_eq!(decoded_dimensions(&image.encoded_image), (120, 80));
    }

    #[test]
    fn degrade_mode_shrinks_output() {
        let (uri, size) = png_source(640, 480);
        let mut transcoder = Transcoder::new(Arc::new(NativeCodec::new()));
        let request = TranscodeRequest::new(uri, 90, ImageFormat::JPEG, size, true);

        let image = transcoder.transcode(&request).unwrap();
        assert_eq!(decoded_dimensions(&image.encoded_image), (192, 144));
    }

    #[test]
    fn capability_answers_are_remembered() {
        let (uri, size) = png_source(16, 16);
        let mut transcoder = Transcoder::new(Arc::new(NativeCodec::new()));
        assert_eq!(transcoder.support().cached(ImageFormat::WebP), None);

        let image = transcoder
            .transcode(&TranscodeRequest::new(uri, 60, ImageFormat::WebP, size, false))
            .unwrap();

        let probed = transcoder.support().cached(ImageFormat::WebP);
        assert_eq!(probed, Some(image.actual_format == ImageFormat::WebP));
        // JPEG is never probed
        assert_eq!(transcoder.support().cached(ImageFormat::JPEG), None);
    }

    #[test]
    fn png_ignores_quality() {
        let (uri, size) = png_source(32, 32);
        let mut transcoder = Transcoder::new(Arc::new(NativeCodec::new()));

        let low = transcoder
            .transcode(&TranscodeRequest::new(uri.clone(), 1, ImageFormat::PNG, size, false))
            .unwrap();
        let high = transcoder
            .transcode(&TranscodeRequest::new(uri, 100, ImageFormat::PNG, size, false))
            .unwrap();

        assert_eq!(low.actual_format, ImageFormat::PNG);
        assert_eq!(low.encoded_size, high.encoded_size);
    }

    #[test]
    fn unknown_original_size_reports_zero_ratio() {
        let (uri, _) = png_source(8, 8);
        let mut transcoder = Transcoder::new(Arc::new(NativeCodec::new()));
        let image = transcoder
            .transcode(&TranscodeRequest::new(uri, 50, ImageFormat::JPEG, 0, false))
            .unwrap();
        assert_eq!(image.compression_ratio, "0.00");
    }

    #[test]
    fn decode_failure_is_reported() {
        let mut transcoder = Transcoder::new(Arc::new(NativeCodec::new()));
        let uri = data_uri::encode("image/png", b"not a png at all");
        let err = transcoder
            .transcode(&TranscodeRequest::new(uri, 50, ImageFormat::JPEG, 16, false))
            .unwrap_err();
        assert!(matches!(err, crate::utils::CompressorError::Decode(_)));
    }
}
