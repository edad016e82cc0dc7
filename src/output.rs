//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Identify
//!
//! ```text
//! photos/image.png
//!     Format: image/png
//!     Size: 200x90
//! ```
//!
//! ## Apply
//!
//! ```text
//! photos/image.png → out/image.png
//!     200x90 → 100x45 (image/png)
//! ```
//!
//! ## Batch
//!
//! ```text
//! Processing 3 images
//! 002 2024/b.jpg
//!     90x200 → 50x50
//! 001 a.png
//!     200x90 → 50x50
//! 003 notes.gif
//!     Error: Unsupported image format: photos/notes.gif
//!
//! Processed 2 images, 1 failed
//! ```
//!
//! Batch lines arrive in completion order, so the index (discovery order) is
//! what ties a line to its file.
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::process::{BatchSummary, FileReport, ImageInfo, ProcessEvent};
use crate::recipe::Step;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// identify
// ============================================================================

pub fn format_identify(info: &ImageInfo) -> Vec<String> {
    vec![
        info.path.display().to_string(),
        format!("{}Format: {}", indent(1), info.mime_type),
        format!("{}Size: {}", indent(1), info.dimensions),
    ]
}

pub fn print_identify(info: &ImageInfo) {
    for line in format_identify(info) {
        println!("{}", line);
    }
}

// ============================================================================
// apply
// ============================================================================

/// Source and destination, then the size change.
pub fn format_apply(report: &FileReport, steps: &[Step]) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} \u{2192} {}",
            report.source.display(),
            report.output.display()
        ),
        format!(
            "{}{} \u{2192} {} ({})",
            indent(1),
            report.original,
            report.result,
            report.format.mime_type()
        ),
    ];
    for step in steps {
        lines.push(format!("{}{}", indent(2), step));
    }
    lines
}

pub fn print_apply(report: &FileReport, steps: &[Step]) {
    for line in format_apply(report, steps) {
        println!("{}", line);
    }
}

// ============================================================================
// batch
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started { total } => {
            vec![format!("Processing {}", plural(*total, "image"))]
        }
        ProcessEvent::Processed {
            index,
            relative,
            report,
        } => vec![
            format!("{} {}", format_index(*index), relative.display()),
            format!(
                "{}{} \u{2192} {}",
                indent(1),
                report.original,
                report.result
            ),
        ],
        ProcessEvent::Failed {
            index,
            relative,
            error,
        } => vec![
            format!("{} {}", format_index(*index), relative.display()),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

/// Totals, then every failure again so they are not lost in the progress stream.
pub fn format_batch_summary(summary: &BatchSummary) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "Processed {}, {} failed",
            plural(summary.processed.len(), "image"),
            summary.failed.len()
        ),
    ];
    for failed in &summary.failed {
        lines.push(format!("{}{}", indent(1), failed.source.display()));
        lines.push(format!("{}{}", indent(2), failed.error));
    }
    lines
}

pub fn print_batch_summary(summary: &BatchSummary) {
    for line in format_batch_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// plugins
// ============================================================================

pub fn format_plugins(names: &[&str]) -> Vec<String> {
    if names.is_empty() {
        return vec!["No plugins registered".to_string()];
    }
    let mut lines = vec!["Plugins".to_string()];
    lines.extend(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} {}", format_index(i + 1), name)),
    );
    lines
}

pub fn print_plugins(names: &[&str]) {
    for line in format_plugins(names) {
        println!("{}", line);
    }
}
