//! Recipe and runtime configuration.
//!
//! Handles loading, validating, and merging `image-chain.toml`. Stock defaults
//! are overridden by the user file, which is read from the working directory
//! or from the path given with `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [resample]
//! filter = "lanczos3"       # nearest | triangle | catmull-rom | gaussian | lanczos3
//!
//! [output]
//! jpeg_quality = 100        # JPEG encoding quality (1-100)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [[steps]]                 # Operations applied in order
//! op = "adaptive-resize"
//! width = 200
//! height = 200
//! gravity = "middle-center"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [output]
//! jpeg_quality = 85
//! ```
//!
//! Tables merge key by key. Arrays, `steps` included, replace the stock value
//! wholesale. Unknown keys are rejected to catch typos early.

use crate::imaging::{Quality, RustBackend};
use crate::recipe::Step;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE: &str = "image-chain.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `image-chain.toml`.
///
/// All fields have defaults. User files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Resampling used by every scaled copy.
    pub resample: ResampleConfig,
    /// Encoder settings.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Operations applied to every image, in order.
    pub steps: Vec<Step>,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::Validation(
                "output.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        for (i, step) in self.steps.iter().enumerate() {
            validate_step(step).map_err(|reason| {
                ConfigError::Validation(format!("steps[{i}] ({step}): {reason}"))
            })?;
        }
        Ok(())
    }

    /// Backend configured with the chosen resampling filter.
    pub fn backend(&self) -> RustBackend {
        RustBackend::with_filter(self.resample.filter.filter_type())
    }

    pub fn jpeg_quality(&self) -> Quality {
        Quality::new(self.output.jpeg_quality)
    }
}

fn validate_step(step: &Step) -> Result<(), &'static str> {
    match step {
        Step::Resize {
            max_width: None,
            max_height: None,
        } => Err("resize needs max_width or max_height"),
        Step::Resize {
            max_width,
            max_height,
        } if *max_width == Some(0) || *max_height == Some(0) => Err("bounds must be positive"),
        Step::Crop { width, height, .. } | Step::AdaptiveResize { width, height, .. }
            if *width == 0 || *height == 0 =>
        {
            Err("width and height must be positive")
        }
        Step::Plugin { name, .. } if name.trim().is_empty() => Err("plugin name is empty"),
        _ => Ok(()),
    }
}

/// Resampling filter names accepted in `[resample]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl ResampleFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResampleConfig {
    pub filter: ResampleFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// JPEG encoding quality (1 = worst, 100 = best). PNG and GIF are lossless.
    pub jpeg_quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: Quality::maximum().value(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer that user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `image-chain.toml` from the given directory.
///
/// A missing file yields the stock defaults.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let overlay = load_raw_config(&dir.join(CONFIG_FILE))?;
    resolve_config(stock_defaults_value()?, overlay)
}

/// Load an explicitly named config file. Unlike [`load_config`], the file must exist.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value()?, Some(overlay))
}

/// Returns a fully-commented stock `image-chain.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-chain Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from ./image-chain.toml, or from the path given with
# --config. Only the keys you want to override need to be present.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Resampling
# ---------------------------------------------------------------------------
[resample]
# Filter used whenever pixels are scaled.
# One of: nearest, triangle, catmull-rom, gaussian, lanczos3.
filter = "lanczos3"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# JPEG encoding quality (1 = worst, 100 = best).
# PNG and GIF output is lossless and ignores this.
# Images are always saved in the format they were read in.
jpeg_quality = 100

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers for `batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Steps
# ---------------------------------------------------------------------------
# Operations applied to every image, in order. Steps given with --step on
# the command line replace this list.
#
# Gravity is one of: top-left, top-center, top-right, middle-left,
# middle-center (or center), middle-right, bottom-left, bottom-center,
# bottom-right. The short codes tl, tc, tr, ml, mc, mr, bl, bc, br also work.
#
# Resize keeping the aspect ratio. Give max_width, max_height, or both:
# [[steps]]
# op = "resize"
# max_width = 800
#
# Crop to an exact size:
# [[steps]]
# op = "crop"
# width = 400
# height = 400
# gravity = "middle-center"
#
# Resize then crop to an exact size:
# [[steps]]
# op = "adaptive-resize"
# width = 200
# height = 200
# gravity = "top-center"
#
# Run a plugin (see `image-chain plugins`) with positional arguments:
# [[steps]]
# op = "plugin"
# name = "reflection"
# args = [40, 40, 80, true, "#a4a4a4"]
"##
}
