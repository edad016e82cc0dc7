//! Image geometry and the transform pipeline.
//!
//! | Operation | Where |
//! |---|---|
//! | **Resize** (ratio-driven) | [`constrained_size`] + [`Image::resize`] |
//! | **Crop** (gravity-anchored) | [`crop_offset`] + [`Image::crop`] |
//! | **Adaptive resize** | [`Image::adaptive_resize`] (resize, then crop) |
//! | **Pixels** | [`RasterBackend`], implemented by [`RustBackend`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and offset math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`RasterBackend`] trait + [`RustBackend`]
//! - **Pipeline**: [`Image`], which combines calculations + backend

pub mod backend;
mod calculations;
mod params;
pub mod pipeline;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, Format, RasterBackend};
pub use calculations::{GeometryError, adaptive_size, constrained_size, crop_offset};
pub use params::{CopyRegion, Gravity, Horizontal, Offset, Quality, Vertical};
pub use pipeline::{Image, PipelineError};
pub use rust_backend::{Canvas, ColorMode, RustBackend};
