//! The transform pipeline: one image, one working buffer, chained operations.
//!
//! An [`Image`] owns exactly one buffer at a time together with the buffer's
//! dimensions and the format sniffed when the file was opened. Every transform
//! follows the same shape:
//!
//! 1. compute target geometry from the *current* dimensions ([`calculations`](super::calculations))
//! 2. allocate a canvas and apply the format's transparency policy
//! 3. resample-copy from the current buffer into the canvas
//! 4. swap the canvas in; the old buffer is dropped, and the dimensions are
//!    re-read from the new buffer in the same step
//!
//! Operations return `Result<&mut Self, _>` so they chain with `?`:
//!
//! ```no_run
//! # use image_chain::imaging::{Gravity, Image};
//! # fn main() -> Result<(), image_chain::imaging::PipelineError> {
//! Image::open("photo.jpg")?
//!     .resize(Some(800), None)?
//!     .crop(400, 400, Gravity::TopCenter)?
//!     .save("thumb.jpg")?;
//! # Ok(())
//! # }
//! ```

use super::backend::{BackendError, Dimensions, Format, RasterBackend};
use super::calculations::{GeometryError, adaptive_size, constrained_size, crop_offset};
use super::params::{CopyRegion, Gravity, Quality};
use super::rust_backend::RustBackend;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unsupported image format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("File is not writable: {}", path.display())]
    PermissionDenied { path: PathBuf },
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<GeometryError> for PipelineError {
    fn from(e: GeometryError) -> Self {
        PipelineError::InvalidArgument(e.to_string())
    }
}

/// An image being transformed.
///
/// The cached dimensions always match the true extent of the working buffer:
/// there is no way to set width or height on their own.
pub struct Image<B: RasterBackend = RustBackend> {
    backend: B,
    source: PathBuf,
    format: Format,
    buffer: B::Buffer,
    dimensions: Dimensions,
    jpeg_quality: Quality,
}

impl Image<RustBackend> {
    /// Open a file with the default [`RustBackend`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        Self::open_with(RustBackend::new(), path)
    }
}

impl<B: RasterBackend> Image<B> {
    /// Open a file with a specific backend.
    ///
    /// Fails with [`PipelineError::UnsupportedFormat`] when the content is not
    /// JPEG, PNG or GIF. Nothing is allocated before the format is known, and a
    /// failed decode leaves nothing behind.
    pub fn open_with(backend: B, path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let source = path.as_ref().to_path_buf();
        let format =
            backend
                .sniff_format(&source)?
                .ok_or_else(|| PipelineError::UnsupportedFormat {
                    path: source.clone(),
                })?;
        let buffer = backend.decode(&source, format)?;
        let dimensions = backend.dimensions(&buffer);

        debug!(path = %source.display(), %format, %dimensions, "opened image");

        Ok(Self {
            backend,
            source,
            format,
            buffer,
            dimensions,
            jpeg_quality: Quality::maximum(),
        })
    }

    /// Set the quality used when saving JPEG output.
    pub fn with_jpeg_quality(mut self, quality: Quality) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn source_path(&self) -> &Path {
        &self.source
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn jpeg_quality(&self) -> Quality {
        self.jpeg_quality
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The current working buffer.
    pub fn buffer(&self) -> &B::Buffer {
        &self.buffer
    }

    /// Allocate a canvas prepared with this image's transparency policy.
    pub fn new_canvas(&self, size: Dimensions) -> Result<B::Buffer, PipelineError> {
        let mut canvas = self.backend.allocate_canvas(size)?;
        self.backend
            .apply_transparency_policy(&mut canvas, self.format);
        Ok(canvas)
    }

    /// Swap in a new working buffer, dropping the old one.
    ///
    /// Dimensions are taken from the new buffer itself.
    pub fn replace_buffer(&mut self, buffer: B::Buffer) -> &mut Self {
        self.dimensions = self.backend.dimensions(&buffer);
        self.buffer = buffer;
        self
    }

    /// Resample the current buffer into a fresh `size` canvas via `region`.
    fn transform(&mut self, size: Dimensions, region: CopyRegion) -> Result<(), PipelineError> {
        let mut canvas = self.new_canvas(size)?;
        self.backend
            .resample_copy(&mut canvas, &self.buffer, &region)?;
        self.replace_buffer(canvas);
        Ok(())
    }

    /// Resize while keeping the aspect ratio.
    ///
    /// See [`constrained_size`] for how the two optional bounds combine: this is
    /// a ratio-driven resize, not a fit-inside-box.
    pub fn resize(
        &mut self,
        max_width: Option<u32>,
        max_height: Option<u32>,
    ) -> Result<&mut Self, PipelineError> {
        let from = self.dimensions;
        let target = constrained_size(from, max_width, max_height)?;
        self.resize_to(target)?;

        debug!(%from, to = %self.dimensions, ?max_width, ?max_height, "resize");
        Ok(self)
    }

    /// Scale the whole image to exactly `target`.
    fn resize_to(&mut self, target: Dimensions) -> Result<(), PipelineError> {
        let from = self.dimensions;
        self.transform(target, CopyRegion::scale(from, target))
    }

    /// Crop to exactly `width × height`, anchored by `gravity`.
    ///
    /// A crop box larger than the image is not an error: the uncovered part of
    /// the canvas stays blank.
    pub fn crop(
        &mut self,
        width: u32,
        height: u32,
        gravity: Gravity,
    ) -> Result<&mut Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidArgument(format!(
                "crop size must be positive, got {width}x{height}"
            )));
        }

        let from = self.dimensions;
        let target = Dimensions::new(width, height);
        let offset = crop_offset(from, target, gravity);

        self.transform(target, CopyRegion::window(offset, target))?;

        debug!(%from, to = %self.dimensions, %gravity, x = offset.x, y = offset.y, "crop");
        Ok(self)
    }

    /// Resize then crop so the result is exactly `width × height`.
    ///
    /// The intermediate size comes from [`adaptive_size`]. It never collapses
    /// to zero, so any positive `width × height` is reached.
    pub fn adaptive_resize(
        &mut self,
        width: u32,
        height: u32,
        gravity: Gravity,
    ) -> Result<&mut Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidArgument(format!(
                "adaptive resize size must be positive, got {width}x{height}"
            )));
        }

        let from = self.dimensions;
        let intermediate = adaptive_size(from, Dimensions::new(width, height))?;
        self.resize_to(intermediate)?;
        debug!(%from, to = %intermediate, "adaptive resize");

        self.crop(width, height, gravity)
    }

    /// Encode the current buffer to `path` in the image's own format.
    ///
    /// The destination directory must exist and be writable.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, PipelineError> {
        let path = path.as_ref();
        ensure_writable_dir(path)?;

        let quality = match self.format {
            Format::Jpeg => self.jpeg_quality,
            Format::Png | Format::Gif => Quality::maximum(),
        };

        self.backend
            .encode(&self.buffer, path, self.format, quality)
            .map_err(|e| match e {
                BackendError::Io(io) if io.kind() == ErrorKind::PermissionDenied => {
                    PipelineError::PermissionDenied {
                        path: path.to_path_buf(),
                    }
                }
                other => PipelineError::Backend(other),
            })?;

        debug!(path = %path.display(), format = %self.format, dimensions = %self.dimensions, "saved");
        Ok(self)
    }
}

/// The parent directory of `path` must exist, be a directory and not be read-only.
fn ensure_writable_dir(path: &Path) -> Result<(), PipelineError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let denied = || PipelineError::PermissionDenied {
        path: path.to_path_buf(),
    };

    let meta = std::fs::metadata(dir).map_err(|_| denied())?;
    if !meta.is_dir() || meta.permissions().readonly() {
        return Err(denied());
    }
    Ok(())
}

impl<B: RasterBackend> std::fmt::Debug for Image<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("source", &self.source)
            .field("format", &self.format)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}
