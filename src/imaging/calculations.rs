//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! ## Ratio-driven resize
//!
//! [`constrained_size`] does **not** fit an image inside a `max_width ×
//! max_height` box. When both bounds are given, the source aspect ratio picks
//! a single governing bound: landscape images (`ratio > 1`) follow the width
//! bound, everything else follows the height bound, and the other bound is
//! ignored. A 200×90 image resized with `(100, 100)` therefore becomes
//! 100×45, and a 90×200 image resized with `(100, 100)` becomes 45×100.

use super::backend::Dimensions;
use super::params::{Gravity, Horizontal, Offset, Vertical};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("resize needs a max width or a max height")]
    MissingBound,
    #[error("resize bounds must be positive")]
    ZeroBound,
    #[error("resizing {from} with bounds {bounds} collapses an edge to zero pixels")]
    Collapsed { from: Dimensions, bounds: String },
}

/// Calculate the size of a ratio-preserving resize.
///
/// # Arguments
/// * `current` - Current image dimensions
/// * `max_width` - Optional width bound
/// * `max_height` - Optional height bound
///
/// # Returns
/// * Target dimensions, each edge floored independently
///
/// # Examples
/// ```
/// # use image_chain::imaging::{Dimensions, constrained_size};
/// let landscape = Dimensions { width: 200, height: 90 };
/// // Both bounds: landscape follows the width bound only
/// assert_eq!(
///     constrained_size(landscape, Some(100), Some(100)).unwrap(),
///     Dimensions { width: 100, height: 45 }
/// );
/// // Height bound only
/// assert_eq!(
///     constrained_size(landscape, None, Some(90)).unwrap(),
///     Dimensions { width: 200, height: 90 }
/// );
/// ```
pub fn constrained_size(
    current: Dimensions,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Result<Dimensions, GeometryError> {
    if max_width == Some(0) || max_height == Some(0) {
        return Err(GeometryError::ZeroBound);
    }

    let target = floored_size(current, max_width, max_height)?;
    if target.width == 0 || target.height == 0 {
        return Err(GeometryError::Collapsed {
            from: current,
            bounds: format_bounds(max_width, max_height),
        });
    }

    Ok(target)
}

/// Calculate the intermediate resize of an adaptive resize to `target`.
///
/// A target box relatively taller than the image is driven by its height
/// alone; otherwise both bounds go through the ratio rule of
/// [`constrained_size`]. Unlike a plain resize, an edge that floors to zero
/// is kept at one pixel, so extreme aspect ratios still reach the crop.
///
/// ```
/// # use image_chain::imaging::{Dimensions, adaptive_size};
/// let tall = Dimensions { width: 2, height: 1000 };
/// assert_eq!(
///     adaptive_size(tall, Dimensions { width: 100, height: 1 }).unwrap(),
///     Dimensions { width: 1, height: 1 }
/// );
/// ```
pub fn adaptive_size(current: Dimensions, target: Dimensions) -> Result<Dimensions, GeometryError> {
    if target.width == 0 || target.height == 0 {
        return Err(GeometryError::ZeroBound);
    }

    let size = if target.ratio() < current.ratio() {
        floored_size(current, None, Some(target.height))?
    } else {
        floored_size(current, Some(target.width), Some(target.height))?
    };

    Ok(Dimensions {
        width: size.width.max(1),
        height: size.height.max(1),
    })
}

/// Ratio rule with each edge floored, before any collapse check.
fn floored_size(
    current: Dimensions,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Result<Dimensions, GeometryError> {
    let ratio = current.ratio();

    let (width, height) = match (max_width, max_height) {
        (Some(w), Some(h)) => {
            if ratio > 1.0 {
                // Landscape: width governs, height bound ignored
                (w as f64, w as f64 / ratio)
            } else {
                // Portrait or square: height governs, width bound ignored
                (h as f64 * ratio, h as f64)
            }
        }
        (Some(w), None) => (w as f64, w as f64 / ratio),
        (None, Some(h)) => (h as f64 * ratio, h as f64),
        (None, None) => return Err(GeometryError::MissingBound),
    };

    Ok(Dimensions {
        width: width.floor() as u32,
        height: height.floor() as u32,
    })
}

fn format_bounds(max_width: Option<u32>, max_height: Option<u32>) -> String {
    let show = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_else(|| "_".into());
    format!("{}x{}", show(max_width), show(max_height))
}

/// Calculate where a `target`-sized crop window sits inside `current`.
///
/// Offsets are not clamped: a target larger than the image produces negative
/// offsets, and it is up to the caller to decide what to do with the
/// uncovered area. Centered axes use integer division, truncating toward zero.
///
/// ```
/// # use image_chain::imaging::{Dimensions, Gravity, Offset, crop_offset};
/// let image = Dimensions { width: 200, height: 90 };
/// let window = Dimensions { width: 100, height: 50 };
/// assert_eq!(
///     crop_offset(image, window, Gravity::MiddleCenter),
///     Offset { x: 50, y: 20 }
/// );
/// ```
pub fn crop_offset(current: Dimensions, target: Dimensions, gravity: Gravity) -> Offset {
    let spare_x = current.width as i64 - target.width as i64;
    let spare_y = current.height as i64 - target.height as i64;

    let x = match gravity.horizontal() {
        Horizontal::Left => 0,
        Horizontal::Center => spare_x / 2,
        Horizontal::Right => spare_x,
    };
    let y = match gravity.vertical() {
        Vertical::Top => 0,
        Vertical::Middle => spare_y / 2,
        Vertical::Bottom => spare_y,
    };

    Offset { x, y }
}
