//! Applying a recipe to files on disk.
//!
//! Three entry points, one per CLI command that touches pixels:
//!
//! - [`identify`]: open a file and report its format and size
//! - [`process_file`]: open, run every step, save
//! - [`process_dir`]: [`process_file`] for every image under a directory
//!
//! ## Batch Layout
//!
//! ```text
//! photos/                      out/
//! ├── a.jpg          ──────►   ├── a.jpg
//! ├── notes.txt                │
//! └── 2024/                    └── 2024/
//!     └── b.png      ──────►       └── b.png
//! ```
//!
//! Files are discovered by extension (jpg, jpeg, png, gif) but their format
//! is always sniffed from content, and output keeps the source format.
//! Relative paths are mirrored into the output directory.
//!
//! ## Parallel Processing
//!
//! Files are processed in parallel using [rayon](https://docs.rs/rayon). A
//! failing file does not stop the batch: it is reported through a
//! [`ProcessEvent::Failed`] event and listed in the [`BatchSummary`].

use crate::config::Config;
use crate::imaging::rust_backend::supported_extensions;
use crate::imaging::{
    BackendError, Dimensions, Format, Image, PipelineError, Quality, RasterBackend, RustBackend,
};
use crate::plugin::PluginRegistry;
use crate::recipe::{Step, apply_all};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

/// Everything needed to turn one input file into one output file.
pub struct Recipe<'a, B: RasterBackend = RustBackend> {
    pub steps: &'a [Step],
    pub registry: &'a PluginRegistry<B>,
    pub backend: B,
    pub jpeg_quality: Quality,
}

impl<'a> Recipe<'a> {
    /// Recipe using the config's backend settings and the given steps.
    pub fn from_config(config: &Config, steps: &'a [Step], registry: &'a PluginRegistry) -> Self {
        Self {
            steps,
            registry,
            backend: config.backend(),
            jpeg_quality: config.jpeg_quality(),
        }
    }
}

/// Format and size of an image file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub format: Format,
    pub mime_type: &'static str,
    pub dimensions: Dimensions,
}

/// Result of processing one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: Format,
    pub original: Dimensions,
    pub result: Dimensions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedFile {
    pub source: PathBuf,
    pub error: String,
}

/// Outcome of a whole batch, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub processed: Vec<FileReport>,
    pub failed: Vec<FailedFile>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}

/// Progress events sent while a batch runs.
///
/// Events from parallel workers arrive in completion order; `index` is the
/// 1-based position of the file in discovery order.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    Started {
        total: usize,
    },
    Processed {
        index: usize,
        relative: PathBuf,
        report: FileReport,
    },
    Failed {
        index: usize,
        relative: PathBuf,
        error: String,
    },
}

/// Open `path` and report what it is.
pub fn identify<B: RasterBackend>(backend: B, path: &Path) -> Result<ImageInfo, PipelineError> {
    let image = Image::open_with(backend, path)?;
    Ok(ImageInfo {
        path: path.to_path_buf(),
        format: image.format(),
        mime_type: image.format().mime_type(),
        dimensions: image.dimensions(),
    })
}

/// Open `input`, apply every step of the recipe, and save to `output`.
pub fn process_file<B: RasterBackend + Clone>(
    input: &Path,
    output: &Path,
    recipe: &Recipe<'_, B>,
) -> Result<FileReport, PipelineError> {
    let mut image =
        Image::open_with(recipe.backend.clone(), input)?.with_jpeg_quality(recipe.jpeg_quality);
    let original = image.dimensions();

    apply_all(recipe.steps, &mut image, recipe.registry)?;
    image.save(output)?;

    debug!(
        input = %input.display(),
        output = %output.display(),
        %original,
        result = %image.dimensions(),
        "processed"
    );
    Ok(FileReport {
        source: input.to_path_buf(),
        output: output.to_path_buf(),
        format: image.format(),
        original,
        result: image.dimensions(),
    })
}

/// Files under `source` with an image extension, relative to `source`, sorted.
///
/// Anything inside `skip` is ignored, so an output directory nested in the
/// source tree is not picked up on the next run.
pub fn discover_images(source: &Path, skip: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    let extensions = supported_extensions();
    let mut found = Vec::new();

    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(skip));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e.to_ascii_lowercase().as_str()));
        if matches && let Ok(relative) = entry.path().strip_prefix(source) {
            found.push(relative.to_path_buf());
        }
    }
    Ok(found)
}

/// Process every image under `source` into `output_dir`, in parallel.
///
/// Setup problems (missing source, unreadable tree, uncreatable output
/// directory) are errors. Per-file failures are not: they are collected in
/// the summary.
pub fn process_dir<B: RasterBackend + Clone>(
    source: &Path,
    output_dir: &Path,
    recipe: &Recipe<'_, B>,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<BatchSummary, ProcessError> {
    if !source.is_dir() {
        return Err(ProcessError::SourceNotFound(source.to_path_buf()));
    }
    std::fs::create_dir_all(output_dir)?;

    let files = discover_images(source, output_dir)?;
    info!(source = %source.display(), total = files.len(), "batch started");

    let send = |event: ProcessEvent| {
        if let Some(tx) = &progress {
            // A gone receiver only means nobody is watching
            let _ = tx.send(event);
        }
    };
    send(ProcessEvent::Started { total: files.len() });

    let results: Vec<(PathBuf, Result<FileReport, String>)> = files
        .par_iter()
        .enumerate()
        .map(|(i, relative)| {
            let input = source.join(relative);
            let output = output_dir.join(relative);
            let result = prepare_parent(&output)
                .and_then(|()| process_file(&input, &output, recipe))
                .map_err(|e| e.to_string());

            match &result {
                Ok(report) => send(ProcessEvent::Processed {
                    index: i + 1,
                    relative: relative.clone(),
                    report: report.clone(),
                }),
                Err(error) => {
                    warn!(file = %input.display(), %error, "failed to process image");
                    send(ProcessEvent::Failed {
                        index: i + 1,
                        relative: relative.clone(),
                        error: error.clone(),
                    });
                }
            }
            (input, result)
        })
        .collect();

    let mut summary = BatchSummary::default();
    for (source, result) in results {
        match result {
            Ok(report) => summary.processed.push(report),
            Err(error) => summary.failed.push(FailedFile { source, error }),
        }
    }

    info!(
        processed = summary.processed.len(),
        failed = summary.failed.len(),
        "batch finished"
    );
    Ok(summary)
}

fn prepare_parent(output: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| PipelineError::Backend(BackendError::Io(e)))?;
    }
    Ok(())
}
