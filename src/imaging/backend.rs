//! Raster backend trait and shared types.
//!
//! The [`RasterBackend`] trait is the only way the pipeline touches pixels.
//! It covers format sniffing, decoding, canvas allocation, the
//! resample-copy primitive, the per-format transparency policy, and encoding.
//!
//! Buffers are owned values of the backend's associated `Buffer` type. There is
//! no explicit release call: dropping a buffer frees it, so a pipeline that
//! replaces its working buffer releases the previous one exactly once.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image` crate.

use super::params::{CopyRegion, Quality};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Width and height of a buffer, in pixels. Both are positive for any live buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Aspect ratio as width / height.
    pub fn ratio(self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Image container formats the pipeline can read and write.
///
/// The format is sniffed from file content when a pipeline is opened and
/// stays fixed for its lifetime: a PNG is saved as a PNG whatever the
/// destination file name says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Jpeg,
    Png,
    Gif,
}

impl Format {
    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Jpeg => "image/jpeg",
            Format::Png => "image/png",
            Format::Gif => "image/gif",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Jpeg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
        }
    }

    /// Whether the format can carry transparency.
    pub fn has_transparency(self) -> bool {
        !matches!(self, Format::Jpeg)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Pixel-level capability the pipeline depends on.
///
/// The pipeline does all geometry itself and only asks the backend for the
/// primitive steps. A mock implementation can therefore verify every region
/// the pipeline computes without decoding a single pixel.
pub trait RasterBackend: Sync {
    /// Opaque pixel buffer. Dropping it releases it.
    type Buffer;

    /// Detect the format from file content. `Ok(None)` means the content is
    /// readable but not one of the supported formats.
    fn sniff_format(&self, path: &Path) -> Result<Option<Format>, BackendError>;

    /// Decode a file of a known format.
    fn decode(&self, path: &Path, format: Format) -> Result<Self::Buffer, BackendError>;

    /// True pixel extents of a buffer.
    fn dimensions(&self, buffer: &Self::Buffer) -> Dimensions;

    /// Allocate a blank canvas.
    fn allocate_canvas(&self, size: Dimensions) -> Result<Self::Buffer, BackendError>;

    /// Resample `region` of `src` into `dst`, overwriting (not blending) the destination pixels.
    fn resample_copy(
        &self,
        dst: &mut Self::Buffer,
        src: &Self::Buffer,
        region: &CopyRegion,
    ) -> Result<(), BackendError>;

    /// Prepare a fresh canvas so that copied content keeps its transparency in `format`.
    fn apply_transparency_policy(&self, canvas: &mut Self::Buffer, format: Format);

    /// Encode a buffer to `path`. `quality` only affects lossy formats.
    fn encode(
        &self,
        buffer: &Self::Buffer,
        path: &Path,
        format: Format,
        quality: Quality,
    ) -> Result<(), BackendError>;
}
