//! Output encoding: working image → bytes in the requested format.
//!
//! The format decides whether the quality knob means anything: JPEG maps
//! quality 0.0–1.0 onto its 1–100 encoder scale; PNG is lossless and
//! ignores it; WebP is encoded losslessly by the `image` crate, so it
//! ignores the knob too. JPEG cannot carry alpha, so the image is
//! converted to RGB before encoding — flatten transparency upstream if
//! the background matters.

use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::TaskError;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Canonical file extension (no dot).
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    /// Whether [`encode_image`]'s quality parameter affects this format.
    pub fn quality_applies(self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            other => Err(format!("unsupported output format '{other}' (jpeg, png, webp)")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encode `img` as `format`. `quality` is clamped to 0.0–1.0 and applied
/// only where [`OutputFormat::quality_applies`].
pub fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
    quality: f32,
    name: &str,
) -> Result<Vec<u8>, TaskError> {
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Jpeg => {
            let q = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, q);
            encoder.encode_image(&img.to_rgb8())
        }
        OutputFormat::Png => img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png),
        OutputFormat::WebP => {
            // The webp encoder accepts RGB8/RGBA8 only.
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)
        }
    };

    result.map_err(|e| TaskError::EncodeFailed {
        name: name.to_string(),
        format: format.extension().to_string(),
        detail: e.to_string(),
    })?;

    debug!("encoded {name} as {format}: {} bytes", buf.len());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn img() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 4, Rgba([120, 50, 30, 255])))
    }

    #[test]
    fn format_parsing_normalises_jpg() {
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("webp".parse::<OutputFormat>().unwrap(), OutputFormat::WebP);
        assert!("tiff".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn quality_policy() {
        assert!(OutputFormat::Jpeg.quality_applies());
        assert!(!OutputFormat::Png.quality_applies());
        assert!(!OutputFormat::WebP.quality_applies());
    }

    #[test]
    fn jpeg_roundtrip_decodes() {
        let bytes = encode_image(&img(), OutputFormat::Jpeg, 0.9, "t").unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
    }

    #[test]
    fn jpeg_quality_changes_size() {
        // A noisy image compresses differently at different qualities.
        let mut noisy = RgbaImage::new(64, 64);
        for (x, y, px) in noisy.enumerate_pixels_mut() {
            let v = ((x * 37 + y * 101) % 251) as u8;
            *px = Rgba([v, v.wrapping_mul(3), v.wrapping_add(17), 255]);
        }
        let noisy = DynamicImage::ImageRgba8(noisy);
        let high = encode_image(&noisy, OutputFormat::Jpeg, 0.95, "t").unwrap();
        let low = encode_image(&noisy, OutputFormat::Jpeg, 0.2, "t").unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn png_and_webp_encode() {
        let png = encode_image(&img(), OutputFormat::Png, 0.0, "t").unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let webp = encode_image(&img(), OutputFormat::WebP, 0.0, "t").unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
    }
}
