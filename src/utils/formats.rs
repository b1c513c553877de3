use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::utils::CompressorError;

/// Output formats the transcoder can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    JPEG,
    PNG,
    WebP,
    AVIF,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [Self::JPEG, Self::PNG, Self::WebP, Self::AVIF];

    /// MIME type handed to the encoder for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::JPEG => "image/jpeg",
            Self::PNG => "image/png",
            Self::WebP => "image/webp",
            Self::AVIF => "image/avif",
        }
    }

    /// Lossless formats ignore the quality parameter entirely
    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::PNG)
    }

    /// Formats that are honoured without probing the encoder first
    pub fn always_supported(&self) -> bool {
        matches!(self, Self::JPEG | Self::PNG)
    }

    /// Lowercase name as used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JPEG => "jpeg",
            Self::PNG => "png",
            Self::WebP => "webp",
            Self::AVIF => "avif",
        }
    }

    /// Get file extensions associated with this format
    pub fn extensions(&self) -> &[&str] {
        match self {
            Self::JPEG => &["jpg", "jpeg"],
            Self::PNG => &["png"],
            Self::WebP => &["webp"],
            Self::AVIF => &["avif"],
        }
    }

    /// Get the primary extension for this format
    pub fn primary_extension(&self) -> &str {
        self.extensions()[0]
    }

    /// Look up a format by MIME type (`image/jpg` is accepted as an alias)
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::JPEG),
            "image/png" => Some(Self::PNG),
            "image/webp" => Some(Self::WebP),
            "image/avif" => Some(Self::AVIF),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = CompressorError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let name = name.to_lowercase();
        match name.as_str() {
            "jpg" | "jpeg" => Ok(Self::JPEG),
            "png" => Ok(Self::PNG),
            "webp" => Ok(Self::WebP),
            "avif" => Ok(Self::AVIF),
            _ => Err(CompressorError::format(format!(
                "Unsupported image format: {}", name
            ))),
        }
    }
}

/// Guess a MIME type from a file path's extension.
///
/// Falls back to `application/octet-stream` so the decoder can still sniff the bytes.
pub fn mime_from_path(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "gif" => "image/gif",
        other => ImageFormat::from_str(other)
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("JPG".parse::<ImageFormat>().unwrap(), ImageFormat::JPEG);
        assert_eq!("webp".parse::<ImageFormat>().unwrap(), ImageFormat::WebP);
        assert!("tiff".parse::<ImageFormat>().is_err());
    }

    #[test]
    fn mime_lookup_is_symmetric() {
        for format in ImageFormat::ALL {
            assert_eq!(ImageFormat::from_mime(format.mime_type()), Some(format));
        }
        assert_eq!(ImageFormat::from_mime("image/jpg"), Some(ImageFormat::JPEG));
        assert_eq!(ImageFormat::from_mime("image/tiff"), None);
    }

    #[test]
    fn only_png_is_lossless() {
        let lossless: Vec<_> = ImageFormat::ALL.iter().filter(|f| f.is_lossless()).collect();
        assert_eq!(lossless, vec![&ImageFormat::PNG]);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ImageFormat::AVIF).unwrap(), "\"avif\"");
        let parsed: ImageFormat = serde_json::from_str("\"webp\"").unwrap();
        assert_eq!(parsed, ImageFormat::WebP);
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_from_path(Path::new("a/b/photo.JPG")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("anim.gif")), "image/gif");
        assert_eq!(mime_from_path(Path::new("README")), "application/octet-stream");
    }
}
