//! Aspect-ratio normalisation, padding, and downscaling.
//!
//! Social and storefront targets want fixed aspect ratios; these stages
//! either extend the canvas (pad, content centered over the background
//! color) or cut it down (center crop). Padding adds a uniform border;
//! resize targets a width and never upscales — a small image stays small
//! rather than getting interpolation blur.

use std::str::FromStr;

use image::imageops::FilterType;
use image::{imageops, DynamicImage, Rgba, RgbaImage};

/// A target aspect ratio (width : height).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    /// 1:1
    Square,
    /// 4:5 (portrait)
    FourFive,
    /// 16:9 (landscape)
    SixteenNine,
}

impl AspectRatio {
    /// width / height as a float.
    pub fn ratio(self) -> f64 {
        match self {
            AspectRatio::Square => 1.0,
            AspectRatio::FourFive => 4.0 / 5.0,
            AspectRatio::SixteenNine => 16.0 / 9.0,
        }
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1:1" => Ok(AspectRatio::Square),
            "4:5" => Ok(AspectRatio::FourFive),
            "16:9" => Ok(AspectRatio::SixteenNine),
            other => Err(format!("unsupported aspect ratio '{other}' (1:1, 4:5, 16:9)")),
        }
    }
}

/// Whether and how to normalise the aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AspectMode {
    /// Keep the image as-is.
    #[default]
    Original,
    /// Extend the shorter dimension, content centered over the background.
    Pad(AspectRatio),
    /// Center-crop the longer dimension.
    Crop(AspectRatio),
}

/// Extend the canvas to `ratio`, centering the image over `background`.
pub fn pad_to_aspect(img: &DynamicImage, ratio: AspectRatio, background: [u8; 3]) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let current = f64::from(width) / f64::from(height);
    let target = ratio.ratio();

    let (target_width, target_height) = if current < target {
        ((f64::from(height) * target).ceil() as u32, height)
    } else {
        (width, (f64::from(width) / target).ceil() as u32)
    };

    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(target_width, target_height, Rgba([r, g, b, 255]));
    let offset_x = i64::from((target_width - width) / 2);
    let offset_y = i64::from((target_height - height) / 2);
    imageops::overlay(&mut canvas, &img.to_rgba8(), offset_x, offset_y);
    DynamicImage::ImageRgba8(canvas)
}

/// Center-crop the canvas to `ratio`.
pub fn crop_to_aspect(img: &DynamicImage, ratio: AspectRatio) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let current = f64::from(width) / f64::from(height);
    let target = ratio.ratio();

    let (crop_width, crop_height, sx, sy) = if current > target {
        let cw = ((f64::from(height) * target).floor() as u32).max(1);
        (cw, height, (width - cw) / 2, 0)
    } else {
        let ch = ((f64::from(width) / target).floor() as u32).max(1);
        (width, ch, 0, (height - ch) / 2)
    };

    img.crop_imm(sx, sy, crop_width, crop_height)
}

/// Add a uniform `padding`-pixel border filled with `background`.
pub fn add_padding(img: &DynamicImage, padding: u32, background: [u8; 3]) -> DynamicImage {
    if padding == 0 {
        return img.clone();
    }
    let (width, height) = (img.width(), img.height());
    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(
        width + 2 * padding,
        height + 2 * padding,
        Rgba([r, g, b, 255]),
    );
    imageops::overlay(&mut canvas, &img.to_rgba8(), i64::from(padding), i64::from(padding));
    DynamicImage::ImageRgba8(canvas)
}

/// Downscale to `target_width`, height following proportionally.
///
/// Targets at or above the current width are ignored — upscaling is
/// never performed.
pub fn resize_to_width(img: &DynamicImage, target_width: u32) -> DynamicImage {
    let width = img.width();
    if target_width == 0 || width <= target_width {
        return img.clone();
    }
    let scale = f64::from(target_width) / f64::from(width);
    let target_height = ((f64::from(img.height()) * scale).round() as u32).max(1);
    img.resize_exact(target_width, target_height, FilterType::Lanczos3)
}
