//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the [`pipeline`](super::pipeline) (which decides what
//! canvas to build and which region to copy) and the
//! [`backend`](super::backend) (which does the actual pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`Gravity`]: One of nine anchor positions used when cropping.
//! - [`Offset`]: Signed pixel offset of a crop window inside the current image.
//! - [`CopyRegion`]: Full description of a resample-copy between two buffers.

use super::backend::Dimensions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    /// Best quality. JPEG output is written at this setting unless configured otherwise.
    pub fn maximum() -> Self {
        Self(100)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::maximum()
    }
}

/// Horizontal component of a [`Gravity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizontal {
    Left,
    Center,
    Right,
}

/// Vertical component of a [`Gravity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    Top,
    Middle,
    Bottom,
}

/// Anchor that decides which part of a larger image survives a crop.
///
/// The nine values are the product of {top, middle, bottom} × {left, center, right}.
/// Parses from the short codes (`tl`, `mc`, `br`, …) and from kebab-case names
/// (`top-left`, `middle-center`, `bottom-right`, …). `center` is accepted as
/// an alias for `middle-center`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Gravity {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    #[default]
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Gravity {
    pub const ALL: [Gravity; 9] = [
        Gravity::TopLeft,
        Gravity::TopCenter,
        Gravity::TopRight,
        Gravity::MiddleLeft,
        Gravity::MiddleCenter,
        Gravity::MiddleRight,
        Gravity::BottomLeft,
        Gravity::BottomCenter,
        Gravity::BottomRight,
    ];

    pub fn horizontal(self) -> Horizontal {
        match self {
            Gravity::TopLeft | Gravity::MiddleLeft | Gravity::BottomLeft => Horizontal::Left,
            Gravity::TopCenter | Gravity::MiddleCenter | Gravity::BottomCenter => {
                Horizontal::Center
            }
            Gravity::TopRight | Gravity::MiddleRight | Gravity::BottomRight => Horizontal::Right,
        }
    }

    pub fn vertical(self) -> Vertical {
        match self {
            Gravity::TopLeft | Gravity::TopCenter | Gravity::TopRight => Vertical::Top,
            Gravity::MiddleLeft | Gravity::MiddleCenter | Gravity::MiddleRight => Vertical::Middle,
            Gravity::BottomLeft | Gravity::BottomCenter | Gravity::BottomRight => Vertical::Bottom,
        }
    }

    /// Two-letter code, e.g. `"tl"` or `"mc"`.
    pub fn code(self) -> &'static str {
        match self {
            Gravity::TopLeft => "tl",
            Gravity::TopCenter => "tc",
            Gravity::TopRight => "tr",
            Gravity::MiddleLeft => "ml",
            Gravity::MiddleCenter => "mc",
            Gravity::MiddleRight => "mr",
            Gravity::BottomLeft => "bl",
            Gravity::BottomCenter => "bc",
            Gravity::BottomRight => "br",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Gravity::TopLeft => "top-left",
            Gravity::TopCenter => "top-center",
            Gravity::TopRight => "top-right",
            Gravity::MiddleLeft => "middle-left",
            Gravity::MiddleCenter => "middle-center",
            Gravity::MiddleRight => "middle-right",
            Gravity::BottomLeft => "bottom-left",
            Gravity::BottomCenter => "bottom-center",
            Gravity::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Gravity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "center" {
            return Ok(Gravity::MiddleCenter);
        }
        Gravity::ALL
            .into_iter()
            .find(|g| g.code() == wanted || g.name() == wanted)
            .ok_or_else(|| {
                format!("unknown gravity '{s}' (expected tl, tc, tr, ml, mc, mr, bl, bc, br)")
            })
    }
}

impl TryFrom<String> for Gravity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Gravity> for String {
    fn from(g: Gravity) -> Self {
        g.name().to_string()
    }
}

/// Signed position of a crop window inside the current image.
///
/// Negative values are legal: they mean the target box is larger than the
/// image on that axis, and the uncovered part of the canvas stays blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
}

/// A resample-copy from a source buffer into a destination buffer.
///
/// The source rectangle `(src_x, src_y, src_width, src_height)` is scaled to
/// `dst_width × dst_height` and written at `(dst_x, dst_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRegion {
    pub dst_x: i64,
    pub dst_y: i64,
    pub src_x: i64,
    pub src_y: i64,
    pub dst_width: u32,
    pub dst_height: u32,
    pub src_width: u32,
    pub src_height: u32,
}

impl CopyRegion {
    /// Scale the whole of `source` onto the whole of a `target`-sized canvas.
    pub fn scale(source: Dimensions, target: Dimensions) -> Self {
        Self {
            dst_x: 0,
            dst_y: 0,
            src_x: 0,
            src_y: 0,
            dst_width: target.width,
            dst_height: target.height,
            src_width: source.width,
            src_height: source.height,
        }
    }

    /// Copy a `size` window located at `offset` in the source, unscaled, to the canvas origin.
    pub fn window(offset: Offset, size: Dimensions) -> Self {
        Self {
            dst_x: 0,
            dst_y: 0,
            src_x: offset.x,
            src_y: offset.y,
            dst_width: size.width,
            dst_height: size.height,
            src_width: size.width,
            src_height: size.height,
        }
    }

    /// True when no scaling happens (pure copy).
    pub fn is_unscaled(&self) -> bool {
        self.dst_width == self.src_width && self.dst_height == self.src_height
    }
}
