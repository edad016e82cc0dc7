//! Shared test utilities for the image-chain test suite.
//!
//! Writes small synthetic images to disk so tests exercise the real codecs
//! without checking binary fixtures into the repository.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let image = Image::open(tmp.path().join(LANDSCAPE)).unwrap();
//! assert_eq!(image.dimensions(), Dimensions::new(200, 90));
//! ```

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::path::Path;
use tempfile::TempDir;

/// 200x90 PNG written by [`setup_fixtures`].
pub const LANDSCAPE: &str = "image.png";
/// 90x200 PNG written by [`setup_fixtures`].
pub const PORTRAIT: &str = "image2.png";

// =========================================================================
// Fixture setup
// =========================================================================

/// Temp directory holding the landscape and portrait fixture images.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_png(&tmp.path().join(LANDSCAPE), 200, 90);
    write_png(&tmp.path().join(PORTRAIT), 90, 200);
    tmp
}

// =========================================================================
// Image writers, format is explicit and independent of the file name
// =========================================================================

/// Diagonal gradient, so resampled output is not trivially uniform.
fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

/// PNG whose pixels come from `pixel(x, y)`.
pub fn write_png_with<F>(path: &Path, width: u32, height: u32, pixel: F)
where
    F: Fn(u32, u32) -> Rgba<u8>,
{
    RgbaImage::from_fn(width, height, pixel)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    DynamicImage::ImageRgba8(gradient(width, height))
        .into_rgb8()
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

pub fn write_gif(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, ImageFormat::Gif)
        .unwrap();
}
