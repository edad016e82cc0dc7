//! Plugins: named transformations that run as if they were native operations.
//!
//! A [`Plugin`] receives the calling [`Image`] and a positional argument list
//! whose meaning is entirely up to the plugin. Plugins live in a
//! [`PluginRegistry`], and [`Image::dispatch`] looks an operation up by name
//! and runs it, returning the image so the chain can continue.
//!
//! ```no_run
//! # use image_chain::imaging::{Gravity, Image};
//! # use image_chain::plugin::{PluginArg, PluginRegistry};
//! # fn main() -> Result<(), image_chain::imaging::PipelineError> {
//! let registry = PluginRegistry::with_builtins();
//! let args = [40, 40, 80].map(PluginArg::Int);
//! Image::open("photo.png")?
//!     .adaptive_resize(200, 200, Gravity::MiddleCenter)?
//!     .dispatch(&registry, "reflection", &args)?
//!     .save("reflected.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Registry lifecycle
//!
//! The registry is a plain value, not a process-wide global. Build it once at
//! startup, register everything, then share it by reference. After startup it
//! is only read, so `&PluginRegistry` can be handed to parallel workers.
//! Registering a name twice replaces the first plugin.
//!
//! ## Binding
//!
//! A plugin does not remember an image between calls: every dispatch hands it
//! the image that made the call. The same registered instance can therefore
//! serve any number of images, one call at a time.

pub mod reflection;

use crate::imaging::{Image, PipelineError, RasterBackend, RustBackend};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub use reflection::Reflection;

/// A named transformation that can be attached to the pipeline.
pub trait Plugin<B: RasterBackend = RustBackend>: Send + Sync {
    /// Dispatch key. Must be unique within a registry.
    fn name(&self) -> &str;

    /// Apply the effect to `image`, replacing its buffer as needed.
    fn execute(&self, image: &mut Image<B>, args: &[PluginArg]) -> Result<(), PipelineError>;
}

/// A dynamically-typed positional plugin argument.
///
/// Deserializes from any TOML/JSON scalar. Parsing from text (the CLI form)
/// tries bool, then integer, then float, and falls back to text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginArg {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PluginArg {
    /// Numeric value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PluginArg::Int(n) => Some(*n as f64),
            PluginArg::Float(f) => Some(*f),
            PluginArg::Bool(_) | PluginArg::Text(_) => None,
        }
    }

    /// Truthiness: booleans as-is, numbers are true when non-zero.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PluginArg::Bool(b) => Some(*b),
            PluginArg::Int(n) => Some(*n != 0),
            PluginArg::Float(f) => Some(*f != 0.0),
            PluginArg::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PluginArg::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PluginArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginArg::Bool(b) => write!(f, "{b}"),
            PluginArg::Int(n) => write!(f, "{n}"),
            PluginArg::Float(x) => write!(f, "{x:?}"),
            PluginArg::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for PluginArg {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(b) = s.parse::<bool>() {
            return Ok(PluginArg::Bool(b));
        }
        if let Ok(n) = s.parse::<i64>() {
            return Ok(PluginArg::Int(n));
        }
        if let Ok(x) = s.parse::<f64>() {
            return Ok(PluginArg::Float(x));
        }
        Ok(PluginArg::Text(s.to_string()))
    }
}

fn bad_arg(plugin: &str, index: usize, wanted: &str, got: Option<&PluginArg>) -> PipelineError {
    let got = got.map_or_else(|| "nothing".to_string(), |a| format!("{a:?}"));
    PipelineError::InvalidArgument(format!(
        "{plugin}: argument {} must be {wanted}, got {got}",
        index + 1
    ))
}

/// Numeric argument at `index`.
pub fn arg_f64(plugin: &str, args: &[PluginArg], index: usize) -> Result<f64, PipelineError> {
    let arg = args.get(index);
    arg.and_then(PluginArg::as_f64)
        .ok_or_else(|| bad_arg(plugin, index, "a number", arg))
}

/// Boolean argument at `index`.
pub fn arg_bool(plugin: &str, args: &[PluginArg], index: usize) -> Result<bool, PipelineError> {
    let arg = args.get(index);
    arg.and_then(PluginArg::as_bool)
        .ok_or_else(|| bad_arg(plugin, index, "a boolean", arg))
}

/// Text argument at `index`.
pub fn arg_str<'a>(
    plugin: &str,
    args: &'a [PluginArg],
    index: usize,
) -> Result<&'a str, PipelineError> {
    let arg = args.get(index);
    arg.and_then(PluginArg::as_str)
        .ok_or_else(|| bad_arg(plugin, index, "text", arg))
}

/// Name → plugin map consulted by [`Image::dispatch`].
pub struct PluginRegistry<B: RasterBackend = RustBackend> {
    plugins: HashMap<String, Arc<dyn Plugin<B>>>,
}

impl<B: RasterBackend> PluginRegistry<B> {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin under its own name. Returns the plugin it replaced, if any.
    pub fn register<P>(&mut self, plugin: P) -> Option<Arc<dyn Plugin<B>>>
    where
        P: Plugin<B> + 'static,
    {
        let name = plugin.name().to_string();
        debug!(plugin = %name, "registering plugin");
        self.plugins.insert(name, Arc::new(plugin))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin<B>>> {
        self.plugins.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginRegistry<RustBackend> {
    /// Registry with the plugins shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Reflection);
        registry
    }
}

impl<B: RasterBackend> Default for PluginRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: RasterBackend> fmt::Debug for PluginRegistry<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}

impl<B: RasterBackend> Image<B> {
    /// Run the plugin registered as `name` on this image.
    ///
    /// Argument count and types are not checked here; that is the plugin's job.
    pub fn dispatch(
        &mut self,
        registry: &PluginRegistry<B>,
        name: &str,
        args: &[PluginArg],
    ) -> Result<&mut Self, PipelineError> {
        let plugin = registry
            .get(name)
            .ok_or_else(|| PipelineError::MethodNotFound(name.to_string()))?;

        let from = self.dimensions();
        plugin.execute(self, args)?;

        debug!(plugin = name, %from, to = %self.dimensions(), "dispatch");
        Ok(self)
    }
}
