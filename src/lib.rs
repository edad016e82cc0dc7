//! # image-chain
//!
//! A chainable image transformation pipeline: load a JPEG, PNG or GIF, resize
//! it keeping its ratio, crop it around a gravity anchor, run plugin effects,
//! and save it back in the format it came in.
//!
//! ```no_run
//! use image_chain::imaging::{Gravity, Image};
//!
//! # fn main() -> Result<(), image_chain::imaging::PipelineError> {
//! Image::open("photo.jpg")?
//!     .resize(Some(800), None)?
//!     .adaptive_resize(200, 200, Gravity::TopCenter)?
//!     .save("thumb.jpg")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! recipe::Step ──► Image (pipeline) ──► RasterBackend ──► pixels
//!                    │      ▲
//!                    ▼      │
//!              PluginRegistry ──► Plugin::execute(&mut Image)
//! ```
//!
//! Geometry is pure arithmetic in [`imaging`] and never touches pixels; the
//! [`RasterBackend`](imaging::RasterBackend) trait is the only door to pixel
//! work, so the arithmetic is tested against a recording mock.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Geometry, the raster backend trait and its `image` crate implementation, the [`Image`](imaging::Image) pipeline |
//! | [`plugin`] | Plugin trait, registry and dispatch; the built-in reflection effect |
//! | [`recipe`] | Pipeline steps as data, with a TOML form and a compact text form |
//! | [`config`] | `image-chain.toml` loading, merging over stock defaults, validation |
//! | [`process`] | Applying a recipe to one file or, in parallel, to a directory tree |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Format Follows Content
//!
//! The format is sniffed from file bytes when an image is opened and fixed
//! for its lifetime. Saving `photo.png` as `out.jpg` still writes a PNG. File
//! extensions are only used to discover candidates in a directory.
//!
//! ## Plugins Get the Caller
//!
//! A plugin never holds on to an image. [`Image::dispatch`](imaging::Image::dispatch)
//! hands the calling image to [`Plugin::execute`](plugin::Plugin::execute), so
//! one registered plugin instance serves every image. The registry is an
//! ordinary value built at startup and shared read-only, including across
//! the rayon workers of a batch.
//!
//! ## Dimensions Come From the Buffer
//!
//! An image's width and height are re-read from its buffer every time the
//! buffer is replaced. Plugins swap buffers through
//! [`Image::replace_buffer`](imaging::Image::replace_buffer) and cannot set
//! a size that disagrees with the pixels.

pub mod config;
pub mod imaging;
pub mod output;
pub mod plugin;
pub mod process;
pub mod recipe;

#[cfg(test)]
pub(crate) mod test_helpers;
