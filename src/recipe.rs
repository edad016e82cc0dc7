//! Recipe steps: pipeline operations as data.
//!
//! A [`Step`] names one operation and its arguments. Steps come from the
//! `[[steps]]` array of the config file or from `--step` on the command line,
//! and are replayed in order against an [`Image`].
//!
//! ## Text form
//!
//! | Text | Step |
//! |---|---|
//! | `resize=100x45` | resize with both bounds |
//! | `resize=200x` / `resize=x90` | resize with one bound |
//! | `crop=100x100@tl` | crop, gravity code optional (default `mc`) |
//! | `adaptive-resize=200x200@bc` | adaptive resize, gravity optional |
//! | `reflection=40,40,80` | any other name is a plugin; args are comma separated |
//!
//! ## TOML form
//!
//! ```toml
//! [[steps]]
//! op = "adaptive-resize"
//! width = 200
//! height = 200
//! gravity = "top-center"
//!
//! [[steps]]
//! op = "plugin"
//! name = "reflection"
//! args = [40, 40, 80]
//! ```

use crate::imaging::{Gravity, Image, PipelineError, RasterBackend};
use crate::plugin::{PluginArg, PluginRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid step {input:?}: {reason}")]
pub struct StepParseError {
    pub input: String,
    pub reason: String,
}

/// One operation of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Step {
    Resize {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_width: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_height: Option<u32>,
    },
    Crop {
        width: u32,
        height: u32,
        #[serde(default)]
        gravity: Gravity,
    },
    AdaptiveResize {
        width: u32,
        height: u32,
        #[serde(default)]
        gravity: Gravity,
    },
    Plugin {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<PluginArg>,
    },
}

impl Step {
    /// Run this step against `image`. Plugin steps are looked up in `registry`.
    pub fn apply<B: RasterBackend>(
        &self,
        image: &mut Image<B>,
        registry: &PluginRegistry<B>,
    ) -> Result<(), PipelineError> {
        match self {
            Step::Resize {
                max_width,
                max_height,
            } => image.resize(*max_width, *max_height)?,
            Step::Crop {
                width,
                height,
                gravity,
            } => image.crop(*width, *height, *gravity)?,
            Step::AdaptiveResize {
                width,
                height,
                gravity,
            } => image.adaptive_resize(*width, *height, *gravity)?,
            Step::Plugin { name, args } => image.dispatch(registry, name, args)?,
        };
        Ok(())
    }
}

/// Run `steps` in order, stopping at the first failure.
pub fn apply_all<B: RasterBackend>(
    steps: &[Step],
    image: &mut Image<B>,
    registry: &PluginRegistry<B>,
) -> Result<(), PipelineError> {
    steps.iter().try_for_each(|step| step.apply(image, registry))
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |v: &Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();
        match self {
            Step::Resize {
                max_width,
                max_height,
            } => write!(f, "resize={}x{}", bound(max_width), bound(max_height)),
            Step::Crop {
                width,
                height,
                gravity,
            } => write!(f, "crop={width}x{height}@{}", gravity.code()),
            Step::AdaptiveResize {
                width,
                height,
                gravity,
            } => write!(f, "adaptive-resize={width}x{height}@{}", gravity.code()),
            Step::Plugin { name, args } if args.is_empty() => f.write_str(name),
            Step::Plugin { name, args } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{name}={}", args.join(","))
            }
        }
    }
}

impl FromStr for Step {
    type Err = StepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| StepParseError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (name, value) = match s.trim().split_once('=') {
            Some((n, v)) => (n.trim(), Some(v.trim())),
            None => (s.trim(), None),
        };
        if name.is_empty() {
            return Err(fail("missing operation name"));
        }

        match name {
            "resize" => {
                let (w, h) = parse_size(value.ok_or_else(|| fail("expected WxH"))?)
                    .map_err(|r| fail(r.as_str()))?;
                if w.is_none() && h.is_none() {
                    return Err(fail("resize needs a width or a height"));
                }
                Ok(Step::Resize {
                    max_width: w,
                    max_height: h,
                })
            }
            "crop" | "adaptive-resize" => {
                let value = value.ok_or_else(|| fail("expected WxH[@gravity]"))?;
                let (size, gravity) = match value.split_once('@') {
                    Some((size, g)) => (size, g.parse::<Gravity>().map_err(|r| fail(r.as_str()))?),
                    None => (value, Gravity::default()),
                };
                let (width, height) = match parse_size(size).map_err(|r| fail(r.as_str()))? {
                    (Some(w), Some(h)) => (w, h),
                    _ => return Err(fail("both width and height are required")),
                };
                Ok(if name == "crop" {
                    Step::Crop {
                        width,
                        height,
                        gravity,
                    }
                } else {
                    Step::AdaptiveResize {
                        width,
                        height,
                        gravity,
                    }
                })
            }
            plugin => {
                let args = match value {
                    Some(v) if !v.is_empty() => v
                        .split(',')
                        .map(|a| match a.parse::<PluginArg>() {
                            Ok(arg) => arg,
                            Err(never) => match never {},
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                Ok(Step::Plugin {
                    name: plugin.to_string(),
                    args,
                })
            }
        }
    }
}

/// Parse `WxH` where either side may be empty.
fn parse_size(text: &str) -> Result<(Option<u32>, Option<u32>), String> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got {text:?}"))?;
    let side = |v: &str| -> Result<Option<u32>, String> {
        let v = v.trim();
        if v.is_empty() {
            return Ok(None);
        }
        v.parse::<u32>()
            .map(Some)
            .map_err(|_| format!("{v:?} is not a pixel count"))
    };
    Ok((side(w)?, side(h)?))
}
