//! Background flattening and margin trimming.
//!
//! Both stages exist for product photos and screenshots: flatten turns
//! transparency into a solid background so lossy formats don't render it
//! black, and trim removes the uniform border around the content so
//! downstream aspect/padding stages work on the content box rather than
//! whatever margins the source happened to ship with.
//!
//! ## Trim heuristic
//!
//! The background color is estimated as the average of the four corner
//! pixels (ignoring corners more transparent than `alpha_threshold`).
//! A pixel counts as content when the sum of its per-channel differences
//! from that estimate exceeds `tolerance`. The crop is the bounding box
//! of all content pixels. Images that are fully transparent, or whose
//! every pixel matches the background, pass through unchanged.

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use tracing::debug;

/// Parameters for [`trim_margins`].
#[derive(Debug, Clone)]
pub struct TrimOptions {
    /// Summed RGB difference threshold for "content" (0–765). Default: 15.
    pub tolerance: u32,
    /// Pixels at or below this alpha are treated as empty. Default: 10.
    pub alpha_threshold: u8,
}

impl Default for TrimOptions {
    fn default() -> Self {
        Self {
            tolerance: 15,
            alpha_threshold: 10,
        }
    }
}

/// Composite the image over an opaque background color.
///
/// Transparent regions take the background; opaque pixels are unchanged.
pub fn flatten_background(img: &DynamicImage, background: [u8; 3]) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
    imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(canvas)
}

/// Crop uniform margins around the content bounding box.
pub fn trim_margins(img: &DynamicImage, options: &TrimOptions) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    // Estimate the background from the four corners.
    let corners = [
        (0, 0),
        (width - 1, 0),
        (0, height - 1),
        (width - 1, height - 1),
    ];
    let mut bg = [0u32; 3];
    let mut valid_corners = 0u32;
    for (x, y) in corners {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        if a > options.alpha_threshold {
            bg[0] += u32::from(r);
            bg[1] += u32::from(g);
            bg[2] += u32::from(b);
            valid_corners += 1;
        }
    }
    if valid_corners == 0 {
        // Fully transparent corners: nothing to key the trim on.
        return img.clone();
    }
    let bg = bg.map(|c| c / valid_corners);

    // Bounding box of everything that differs from the background.
    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut has_content = false;

    for (x, y, &Rgba([r, g, b, a])) in rgba.enumerate_pixels() {
        if a <= options.alpha_threshold {
            continue;
        }
        let diff = u32::from(r).abs_diff(bg[0])
            + u32::from(g).abs_diff(bg[1])
            + u32::from(b).abs_diff(bg[2]);
        if diff > options.tolerance {
            has_content = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !has_content || min_x > max_x || min_y > max_y {
        return img.clone();
    }

    let crop_width = max_x - min_x + 1;
    let crop_height = max_y - min_y + 1;
    debug!(
        "trim: {}x{} -> {}x{} at ({}, {})",
        width, height, crop_width, crop_height, min_x, min_y
    );
    img.crop_imm(min_x, min_y, crop_width, crop_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(width: u32, height: u32, pixel: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(pixel))
    }

    #[test]
    fn flatten_fills_transparency() {
        let img = DynamicImage::ImageRgba8(canvas(2, 2, [0, 0, 0, 0]));
        let flat = flatten_background(&img, [255, 255, 255]).to_rgba8();
        assert_eq!(*flat.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn flatten_keeps_opaque_pixels() {
        let img = DynamicImage::ImageRgba8(canvas(2, 2, [10, 20, 30, 255]));
        let flat = flatten_background(&img, [255, 255, 255]).to_rgba8();
        assert_eq!(*flat.get_pixel(1, 1), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn trim_crops_to_content_box() {
        // 10x10 white canvas with a 2x3 black block at (4, 5).
        let mut buf = canvas(10, 10, [255, 255, 255, 255]);
        for y in 5..8 {
            for x in 4..6 {
                buf.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
        let trimmed = trim_margins(&DynamicImage::ImageRgba8(buf), &TrimOptions::default());
        assert_eq!((trimmed.width(), trimmed.height()), (2, 3));
    }

    #[test]
    fn trim_passes_uniform_image_through() {
        let img = DynamicImage::ImageRgba8(canvas(6, 6, [200, 200, 200, 255]));
        let trimmed = trim_margins(&img, &TrimOptions::default());
        assert_eq!((trimmed.width(), trimmed.height()), (6, 6));
    }

    #[test]
    fn trim_passes_fully_transparent_image_through() {
        let img = DynamicImage::ImageRgba8(canvas(5, 4, [0, 0, 0, 0]));
        let trimmed = trim_margins(&img, &TrimOptions::default());
        assert_eq!((trimmed.width(), trimmed.height()), (5, 4));
    }

    #[test]
    fn trim_respects_tolerance() {
        // Content barely differs from background: below tolerance, so no crop.
        let mut buf = canvas(8, 8, [100, 100, 100, 255]);
        buf.put_pixel(3, 3, Rgba([102, 101, 100, 255]));
        let trimmed = trim_margins(
            &DynamicImage::ImageRgba8(buf),
            &TrimOptions {
                tolerance: 15,
                alpha_threshold: 10,
            },
        );
        assert_eq!((trimmed.width(), trimmed.height()), (8, 8));
    }

    #[test]
    fn trim_ignores_transparent_content() {
        // A "block" that is fully transparent must not count as content.
        let mut buf = canvas(8, 8, [255, 255, 255, 255]);
        buf.put_pixel(2, 2, Rgba([0, 0, 0, 5]));
        let trimmed = trim_margins(&DynamicImage::ImageRgba8(buf), &TrimOptions::default());
        assert_eq!((trimmed.width(), trimmed.height()), (8, 8));
    }
}
