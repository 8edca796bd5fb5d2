//! Input decoding with a fail-fast pixel ceiling.
//!
//! ## Why check dimensions before decoding?
//!
//! A decoded image costs `width × height × 4` bytes of memory and every
//! downstream stage scans all of it. The image header alone tells us the
//! dimensions, so oversized inputs are rejected *before* the allocation
//! and decode work happens, with an error naming the actual and maximum
//! pixel counts instead of an opaque allocation failure mid-pipeline.

use std::io::Cursor;

use image::{DynamicImage, ImageReader};
use tracing::debug;

use crate::error::TaskError;

/// Upper bound on `width × height` for any input image.
pub const MAX_PIXELS: u64 = 80_000_000;

/// Decode `bytes` (format sniffed from content), enforcing [`MAX_PIXELS`].
pub fn decode(name: &str, bytes: &[u8]) -> Result<DynamicImage, TaskError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(name, &e.to_string()))?
        .into_dimensions()
        .map_err(|e| decode_error(name, &e.to_string()))?;

    check_pixel_ceiling(width, height)?;

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_error(name, &e.to_string()))?
        .decode()
        .map_err(|e| decode_error(name, &e.to_string()))?;

    debug!("decoded {name}: {width}x{height}");
    Ok(img)
}

/// Reject dimensions whose product exceeds [`MAX_PIXELS`].
pub fn check_pixel_ceiling(width: u32, height: u32) -> Result<(), TaskError> {
    let actual = u64::from(width) * u64::from(height);
    if actual > MAX_PIXELS {
        return Err(TaskError::PixelLimitExceeded {
            width,
            height,
            actual,
            max: MAX_PIXELS,
        });
    }
    Ok(())
}

fn decode_error(name: &str, detail: &str) -> TaskError {
    TaskError::DecodeFailed {
        name: name.to_string(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn decodes_valid_png() {
        let img = decode("t.png", &png_bytes(4, 3)).unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = decode("junk.bin", &[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        assert!(matches!(err, TaskError::DecodeFailed { .. }));
    }

    #[test]
    fn pixel_ceiling_names_actual_and_max() {
        assert!(check_pixel_ceiling(8_000, 10_000).is_ok());

        let err = check_pixel_ceiling(20_000, 20_000).unwrap_err();
        match err {
            TaskError::PixelLimitExceeded { actual, max, .. } => {
                assert_eq!(actual, 400_000_000);
                assert_eq!(max, MAX_PIXELS);
            }
            other => panic!("expected PixelLimitExceeded, got {other:?}"),
        }
    }
}
