//! Encoder capability probes and the format fallback chain.

use std::collections::HashMap;
use image::RgbaImage;
use tracing::debug;

use crate::utils::ImageFormat;
use super::codec::RasterCodec;

/// Formats tried, in order, when `requested` is the target.
///
/// Every chain ends in a format the host always supports.
pub fn fallback_chain(requested: ImageFormat) -> &'static [ImageFormat] {
    match requested {
        ImageFormat::JPEG => &[ImageFormat::JPEG],
        ImageFormat::PNG => &[ImageFormat::PNG],
        ImageFormat::WebP => &[ImageFormat::WebP, ImageFormat::JPEG],
        ImageFormat::AVIF => &[ImageFormat::AVIF, ImageFormat::WebP, ImageFormat::JPEG],
    }
}

/// Memoised answers to "does the host encoder really produce this format?".
///
/// Probes run at most once per format for the life of the owner.
#[derive(Debug, Default)]
pub struct FormatSupport {
    probed: HashMap<ImageFormat, bool>,
}

impl FormatSupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached probe result, if `format` has been probed.
    pub fn cached(&self, format: ImageFormat) -> Option<bool> {
        self.probed.get(&format).copied()
    }

    pub fn is_supported(&mut self, codec: &dyn RasterCodec, format: ImageFormat) -> bool {
        if format.always_supported() {
            return true;
        }
        *self
            .probed
            .entry(format)
            .or_insert_with(|| probe(codec, format))
    }

    /// Walks the fallback chain for `requested` and returns the first supported format.
    pub fn resolve(&mut self, codec: &dyn RasterCodec, requested: ImageFormat) -> ImageFormat {
        let chain = fallback_chain(requested);
        let resolved = chain
            .iter()
            .copied()
            .find(|format| self.is_supported(codec, *format))
            .unwrap_or(ImageFormat::JPEG);

        if resolved != requested {
            debug!("{} unsupported by host encoder, using {}", requested, resolved);
        }
        resolved
    }
}

/// Encodes a 1x1 surface as `format` and checks the encoder did not substitute another type.
fn probe(codec: &dyn RasterCodec, format: ImageFormat) -> bool {
    let pixel = RgbaImage::new(1, 1);
    let supported = match codec.encode(&pixel, format.mime_type(), None) {
        Ok(blob) => blob.mime.eq_ignore_ascii_case(format.mime_type()),
        Err(e) => {
            debug!("Capability probe for {} failed: {}", format, e);
            false
        }
    };

    debug!("Capability probe: {} supported = {}", format, supported);
    supported
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use crate::processing::codec::EncodedBlob;
    use crate::utils::{CompressorError, CompressorResult};

    /// Encoder that only produces the listed formats and counts encode calls.
    struct LimitedCodec {
        supported: Vec<ImageFormat>,
        encodes: AtomicUsize,
        fail: bool,
    }

    impl LimitedCodec {
        fn new(supported: &[ImageFormat]) -> Self {
            Self { supported: supported.to_vec(), encodes: AtomicUsize::new(0), fail: false }
        }
    }

    impl RasterCodec for LimitedCodec {
        fn decode(&self, _blob: &[u8]) -> CompressorResult<RgbaImage> {
            Ok(RgbaImage::new(1, 1))
        }

        fn encode(&self, _surface: &RgbaImage, mime: &str, _quality: Option<f32>) -> CompressorResult<EncodedBlob> {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CompressorError::encode("encoder exploded"));
            }
            let produced = ImageFormat::from_mime(mime)
                .filter(|f| self.supported.contains(f))
                .unwrap_or(ImageFormat::PNG);
            Ok(EncodedBlob { mime: produced.mime_type().into(), bytes: vec![0] })
        }
    }

    #[test]
    fn chains_end_in_always_supported_formats() {
        for format in ImageFormat::ALL {
            let chain = fallback_chain(format);
            assert_eq!(chain[0], format);
            assert!(chain.last().unwrap().always_supported());
        }
    }

    #[test]
    fn full_support_honours_request() {
        let codec = LimitedCodec::new(&ImageFormat::ALL);
        let mut support = FormatSupport::new();
        for format in ImageFormat::ALL {
            assert_eq!(support.resolve(&codec, format), format);
        }
    }

    #[test]
    fn avif_falls_back_to_webp_then_jpeg() {
        let webp_only = LimitedCodec::new(&[ImageFormat::JPEG, ImageFormat::PNG, ImageFormat::WebP]);
        assert_eq!(FormatSupport::new().resolve(&webp_only, ImageFormat::AVIF), ImageFormat::WebP);

        let baseline = LimitedCodec::new(&[ImageFormat::JPEG, ImageFormat::PNG]);
        let mut support = FormatSupport::new();
        assert_eq!(support.resolve(&baseline, ImageFormat::AVIF), ImageFormat::JPEG);
        assert_eq!(support.resolve(&baseline, ImageFormat::WebP), ImageFormat::JPEG);
    }

    #[test]
    fn probes_are_cached() {
        let codec = LimitedCodec::new(&[ImageFormat::JPEG, ImageFormat::PNG, ImageFormat::WebP]);
        let mut support = FormatSupport::new();

        for _ in 0..5 {
            support.resolve(&codec, ImageFormat::AVIF);
        }

        // one probe for AVIF, one for WebP
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 2);
        assert_eq!(support.cached(ImageFormat::AVIF), Some(false));
        assert_eq!(support.cached(ImageFormat::WebP), Some(true));
    }

    #[test]
    fn always_supported_formats_skip_probing() {
        let codec = LimitedCodec::new(&[]);
        let mut support = FormatSupport::new();
        assert_eq!(support.resolve(&codec, ImageFormat::PNG), ImageFormat::PNG);
        assert_eq!(support.resolve(&codec, ImageFormat::JPEG), ImageFormat::JPEG);
        assert_eq!(codec.encodes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_probe_counts_as_unsupported() {
        let mut codec = LimitedCodec::new(&ImageFormat::ALL);
        codec.fail = true;
        assert_eq!(FormatSupport::new().resolve(&codec, ImageFormat::WebP), ImageFormat::JPEG);
    }
}
