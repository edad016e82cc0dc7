//! Pure Rust raster backend built on the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::guess_format` on the file header |
//! | Decode (JPEG, PNG, GIF) | `image::ImageReader::with_format` |
//! | Resample copy | region extraction + `image::imageops::resize` + `imageops::replace` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` (lossless RGBA) |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (quantizes to ≤256 colours) |
//!
//! Every buffer is held as RGBA8 regardless of the source format; the
//! [`ColorMode`] tag records how the alpha channel is meant to be written out.

use super::backend::{BackendError, Dimensions, Format, RasterBackend};
use super::params::{CopyRegion, Quality};
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, Frame, ImageEncoder, ImageFormat, ImageReader};
use image::{Rgb, Rgba, RgbaImage};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Bytes read from the start of a file to detect its format.
const SNIFF_LEN: u64 = 32;

/// Fresh canvases start opaque black, like a true-colour canvas in most raster libraries.
const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Fill for PNG canvases and for source pixels outside a copy window.
const TRANSPARENT_WHITE: Rgba<u8> = Rgba([255, 255, 255, 0]);
const TRANSPARENT_BLACK: Rgba<u8> = Rgba([0, 0, 0, 0]);

const CANDIDATES: &[(&str, Format)] = &[
    ("jpg", Format::Jpeg),
    ("jpeg", Format::Jpeg),
    ("png", Format::Png),
    ("gif", Format::Gif),
];

/// File extensions worth opening when scanning a directory.
///
/// Only used for discovery: the format of a file is always taken from its
/// content, never from its name.
pub fn supported_extensions() -> Vec<&'static str> {
    CANDIDATES.iter().map(|(ext, _)| *ext).collect()
}

/// How a canvas's alpha channel is written out on encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// Opaque; alpha is dropped on encode.
    TrueColor,
    /// Full alpha channel is saved.
    Alpha,
    /// Palette output where every pixel matching `transparent` is written as transparent.
    Indexed { transparent: Rgb<u8> },
}

/// Working buffer of the [`RustBackend`].
#[derive(Debug, Clone)]
pub struct Canvas {
    pub pixels: RgbaImage,
    pub mode: ColorMode,
}

impl Canvas {
    pub fn new(pixels: RgbaImage, mode: ColorMode) -> Self {
        Self { pixels, mode }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.pixels.width(), self.pixels.height())
    }
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy)]
pub struct RustBackend {
    filter: FilterType,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::with_filter(FilterType::Lanczos3)
    }

    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn image_format(format: Format) -> ImageFormat {
    match format {
        Format::Jpeg => ImageFormat::Jpeg,
        Format::Png => ImageFormat::Png,
        Format::Gif => ImageFormat::Gif,
    }
}

fn decoded_mode(format: Format) -> ColorMode {
    match format {
        Format::Jpeg => ColorMode::TrueColor,
        Format::Png | Format::Gif => ColorMode::Alpha,
    }
}

/// Copy a `width × height` window at `(x, y)` out of `src`.
///
/// Parts of the window that fall outside `src` come back fully transparent.
fn extract_region(src: &RgbaImage, x: i64, y: i64, width: u32, height: u32) -> RgbaImage {
    let inside = x >= 0
        && y >= 0
        && x + width as i64 <= src.width() as i64
        && y + height as i64 <= src.height() as i64;
    if inside {
        return imageops::crop_imm(src, x as u32, y as u32, width, height).to_image();
    }

    RgbaImage::from_fn(width, height, |px, py| {
        let sx = x + px as i64;
        let sy = y + py as i64;
        if sx >= 0 && sy >= 0 && sx < src.width() as i64 && sy < src.height() as i64 {
            *src.get_pixel(sx as u32, sy as u32)
        } else {
            TRANSPARENT_BLACK
        }
    })
}

/// Pixels to hand to an encoder, with the colour mode applied.
fn output_pixels(canvas: &Canvas) -> RgbaImage {
    match canvas.mode {
        ColorMode::Indexed { transparent } => {
            let mut pixels = canvas.pixels.clone();
            for p in pixels.pixels_mut() {
                if p.0[..3] == transparent.0 {
                    p.0[3] = 0;
                }
            }
            pixels
        }
        ColorMode::TrueColor | ColorMode::Alpha => canvas.pixels.clone(),
    }
}

fn encode_failed(format: Format, e: image::ImageError) -> BackendError {
    BackendError::ProcessingFailed(format!("{} encode failed: {}", format.extension(), e))
}

impl RasterBackend for RustBackend {
    type Buffer = Canvas;

    fn sniff_format(&self, path: &Path) -> Result<Option<Format>, BackendError> {
        let mut header = Vec::with_capacity(SNIFF_LEN as usize);
        File::open(path)?.take(SNIFF_LEN).read_to_end(&mut header)?;

        let format = match image::guess_format(&header) {
            Ok(ImageFormat::Jpeg) => Some(Format::Jpeg),
            Ok(ImageFormat::Png) => Some(Format::Png),
            Ok(ImageFormat::Gif) => Some(Format::Gif),
            Ok(_) | Err(_) => None,
        };
        Ok(format)
    }

    fn decode(&self, path: &Path, format: Format) -> Result<Canvas, BackendError> {
        let file = File::open(path)?;
        let decoded = ImageReader::with_format(BufReader::new(file), image_format(format))
            .decode()
            .map_err(|e| BackendError::Decode {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Canvas::new(decoded.into_rgba8(), decoded_mode(format)))
    }

    fn dimensions(&self, buffer: &Canvas) -> Dimensions {
        buffer.dimensions()
    }

    fn allocate_canvas(&self, size: Dimensions) -> Result<Canvas, BackendError> {
        if size.width == 0 || size.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot allocate a {size} canvas"
            )));
        }
        Ok(Canvas::new(
            RgbaImage::from_pixel(size.width, size.height, OPAQUE_BLACK),
            ColorMode::TrueColor,
        ))
    }

    fn resample_copy(
        &self,
        dst: &mut Canvas,
        src: &Canvas,
        region: &CopyRegion,
    ) -> Result<(), BackendError> {
        if region.src_width == 0
            || region.src_height == 0
            || region.dst_width == 0
            || region.dst_height == 0
        {
            return Err(BackendError::ProcessingFailed(format!(
                "empty copy region {region:?}"
            )));
        }

        let patch = extract_region(
            &src.pixels,
            region.src_x,
            region.src_y,
            region.src_width,
            region.src_height,
        );
        let patch = if region.is_unscaled() {
            patch
        } else {
            imageops::resize(&patch, region.dst_width, region.dst_height, self.filter)
        };

        imageops::replace(&mut dst.pixels, &patch, region.dst_x, region.dst_y);
        Ok(())
    }

    fn apply_transparency_policy(&self, canvas: &mut Canvas, format: Format) {
        match format {
            Format::Png => {
                for p in canvas.pixels.pixels_mut() {
                    *p = TRANSPARENT_WHITE;
                }
                canvas.mode = ColorMode::Alpha;
            }
            Format::Gif => {
                // The canvas is still black, so black becomes the transparent key
                canvas.mode = ColorMode::Indexed {
                    transparent: Rgb([0, 0, 0]),
                };
            }
            Format::Jpeg => {}
        }
    }

    fn encode(
        &self,
        buffer: &Canvas,
        path: &Path,
        format: Format,
        quality: Quality,
    ) -> Result<(), BackendError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let (width, height) = buffer.pixels.dimensions();

        match format {
            Format::Jpeg => {
                let rgb = DynamicImage::ImageRgba8(buffer.pixels.clone()).into_rgb8();
                JpegEncoder::new_with_quality(&mut writer, quality.value() as u8)
                    .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                    .map_err(|e| encode_failed(format, e))?;
            }
            Format::Png => {
                let pixels = output_pixels(buffer);
                PngEncoder::new(&mut writer)
                    .write_image(pixels.as_raw(), width, height, ExtendedColorType::Rgba8)
                    .map_err(|e| encode_failed(format, e))?;
            }
            Format::Gif => {
                let mut encoder = GifEncoder::new(&mut writer);
                encoder
                    .encode_frame(Frame::new(output_pixels(buffer)))
                    .map_err(|e| encode_failed(format, e))?;
                // Dropping the encoder writes the GIF trailer
                drop(encoder);
            }
        }

        writer.flush()?;
        Ok(())
    }
}
