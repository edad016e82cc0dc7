//! End-to-end tests through the public API with the `image`-crate backend.
//!
//! Every test writes its own source images into a temp directory, runs a
//! chain, saves, and re-opens the result from disk.

use image::{ImageFormat, Rgba, RgbaImage, imageops};
use image_chain::imaging::{Canvas, Dimensions, Format, Gravity, Image, PipelineError};
use image_chain::plugin::{Plugin, PluginArg, PluginRegistry};
use image_chain::recipe::{Step, apply_all};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const YELLOW: Rgba<u8> = Rgba([255, 255, 0, 255]);

/// Four solid quadrants: red top-left, green top-right, blue bottom-left, yellow bottom-right.
fn write_quadrants(path: &Path, width: u32, height: u32, format: ImageFormat) {
    let pixels = RgbaImage::from_fn(width, height, |x, y| {
        match (x < width / 2, y < height / 2) {
            (true, true) => RED,
            (false, true) => GREEN,
            (true, false) => BLUE,
            (false, false) => YELLOW,
        }
    });
    match format {
        ImageFormat::Jpeg => image::DynamicImage::ImageRgba8(pixels)
            .into_rgb8()
            .save_with_format(path, format)
            .unwrap(),
        _ => pixels.save_with_format(path, format).unwrap(),
    }
}

fn fixture(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.path().join(name);
    write_quadrants(&path, width, height, ImageFormat::Png);
    path
}

fn reopen(path: &Path) -> Image {
    Image::open(path).unwrap()
}

// =========================================================================
// Resize
// =========================================================================

#[test]
fn resize_table_landscape_fixture() {
    let tmp = TempDir::new().unwrap();
    let source = fixture(&tmp, "image.png", 200, 90);

    let cases: &[(Option<u32>, Option<u32>, (u32, u32))] = &[
        (Some(100), Some(45), (100, 45)),
        (Some(200), Some(90), (200, 90)),
        (Some(50), Some(22), (50, 22)),
        (Some(200), None, (200, 90)),
        (None, Some(90), (200, 90)),
        (Some(100), Some(100), (100, 45)),
    ];
    for (i, &(w, h, (ew, eh))) in cases.iter().enumerate() {
        let out = tmp.path().join(format!("out-{i}.png"));
        Image::open(&source)
            .unwrap()
            .resize(w, h)
            .unwrap()
            .save(&out)
            .unwrap();
        assert_eq!(
            reopen(&out).dimensions(),
            Dimensions::new(ew, eh),
            "resize({w:?}, {h:?})"
        );
    }
}

#[test]
fn resize_table_portrait_fixture() {
    let tmp = TempDir::new().unwrap();
    let source = fixture(&tmp, "image2.png", 90, 200);

    let cases: &[(Option<u32>, Option<u32>, (u32, u32))] = &[
        (Some(45), Some(100), (45, 100)),
        (Some(90), Some(200), (90, 200)),
        (Some(22), Some(50), (22, 50)),
        (None, Some(200), (90, 200)),
        (Some(90), None, (90, 200)),
        (Some(100), Some(100), (45, 100)),
    ];
    for &(w, h, (ew, eh)) in cases {
        let mut image = Image::open(&source).unwrap();
        image.resize(w, h).unwrap();
        assert_eq!(image.dimensions(), Dimensions::new(ew, eh), "resize({w:?}, {h:?})");
    }
}

#[test]
fn resize_without_bounds_is_invalid_argument() {
    let tmp = TempDir::new().unwrap();
    let mut image = Image::open(fixture(&tmp, "image.png", 200, 90)).unwrap();
    let err = image.resize(None, None).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidArgument(_)));
    assert_eq!(image.dimensions(), Dimensions::new(200, 90));
}

// =========================================================================
// Crop
// =========================================================================

#[test]
fn crop_gravity_selects_the_matching_quadrant() {
    let tmp = TempDir::new().unwrap();
    let source = fixture(&tmp, "quad.png", 40, 20);

    for (gravity, expected) in [
        (Gravity::TopLeft, RED),
        (Gravity::TopRight, GREEN),
        (Gravity::BottomLeft, BLUE),
        (Gravity::BottomRight, YELLOW),
    ] {
        let mut image = Image::open(&source).unwrap();
        image.crop(10, 5, gravity).unwrap();

        let pixels = &image.buffer().pixels;
        assert_eq!(image.dimensions(), Dimensions::new(10, 5));
        assert_eq!(*pixels.get_pixel(0, 0), expected, "{gravity}");
        assert_eq!(*pixels.get_pixel(9, 4), expected, "{gravity}");
    }
}

#[test]
fn crop_larger_than_png_leaves_transparent_margin() {
    let tmp = TempDir::new().unwrap();
    let source = fixture(&tmp, "small.png", 10, 10);
    let out = tmp.path().join("padded.png");

    Image::open(&source)
        .unwrap()
        .crop(30, 10, Gravity::MiddleCenter)
        .unwrap()
        .save(&out)
        .unwrap();

    let saved = reopen(&out);
    assert_eq!(saved.dimensions(), Dimensions::new(30, 10));
    let pixels = &saved.buffer().pixels;
    assert_eq!(pixels.get_pixel(0, 5).0[3], 0);
    assert_eq!(pixels.get_pixel(29, 5).0[3], 0);
    assert_eq!(*pixels.get_pixel(10, 0), RED);
}

// =========================================================================
// Adaptive resize
// =========================================================================

#[test]
fn adaptive_resize_produces_exact_box_for_both_orientations() {
    let tmp = TempDir::new().unwrap();
    let landscape = fixture(&tmp, "image.png", 200, 90);
    let portrait = fixture(&tmp, "image2.png", 90, 200);

    for source in [&landscape, &portrait] {
        for (w, h) in [(50, 50), (120, 40), (40, 120)] {
            let out = tmp.path().join(format!("adaptive-{w}x{h}.png"));
            Image::open(source)
                .unwrap()
                .adaptive_resize(w, h, Gravity::MiddleCenter)
                .unwrap()
                .save(&out)
                .unwrap();
            assert_eq!(reopen(&out).dimensions(), Dimensions::new(w, h));
        }
    }
}

// =========================================================================
// Formats
// =========================================================================

#[test]
fn output_keeps_source_format_regardless_of_name() {
    let tmp = TempDir::new().unwrap();
    let source = fixture(&tmp, "image.png", 200, 90);
    let out = tmp.path().join("looks-like.jpg");

    Image::open(&source)
        .unwrap()
        .resize(Some(100), None)
        .unwrap()
        .save(&out)
        .unwrap();

    let saved = reopen(&out);
    assert_eq!(saved.format(), Format::Png);
    assert_eq!(saved.format().mime_type(), "image/png");
}

#[test]
fn jpeg_and_gif_chains_round_trip() {
    let tmp = TempDir::new().unwrap();
    for (name, format, expected) in [
        ("in.jpg", ImageFormat::Jpeg, Format::Jpeg),
        ("in.gif", ImageFormat::Gif, Format::Gif),
    ] {
        let source = tmp.path().join(name);
        write_quadrants(&source, 200, 90, format);
        let out = tmp.path().join(format!("out-{name}"));

        let mut image = Image::open(&source).unwrap();
        assert_eq!(image.format(), expected);
        image
            .adaptive_resize(64, 64, Gravity::TopCenter)
            .unwrap()
            .save(&out)
            .unwrap();

        let saved = reopen(&out);
        assert_eq!(saved.format(), expected);
        assert_eq!(saved.dimensions(), Dimensions::new(64, 64));
    }
}

#[test]
fn non_image_content_is_unsupported_format() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("fake.png");
    std::fs::write(&path, "plain text pretending to be a png").unwrap();

    let err = Image::open(&path).unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
}

#[test]
fn save_into_missing_directory_is_permission_denied() {
    let tmp = TempDir::new().unwrap();
    let mut image = Image::open(fixture(&tmp, "image.png", 20, 10)).unwrap();

    let err = image
        .save(tmp.path().join("missing").join("out.png"))
        .unwrap_err();
    assert!(matches!(err, PipelineError::PermissionDenied { .. }));
}

// =========================================================================
// Plugins
// =========================================================================

/// An effect defined outside the crate, using only the public API.
struct Mirror;

impl Plugin for Mirror {
    fn name(&self) -> &str {
        "mirror"
    }

    fn execute(&self, image: &mut Image, _args: &[PluginArg]) -> Result<(), PipelineError> {
        let current = image.buffer();
        let flipped = Canvas::new(imageops::flip_horizontal(&current.pixels), current.mode);
        image.replace_buffer(flipped);
        Ok(())
    }
}

#[test]
fn external_plugin_chains_with_native_operations() {
    let tmp = TempDir::new().unwrap();
    let source = fixture(&tmp, "quad.png", 40, 20);
    let mut registry = PluginRegistry::with_builtins();
    registry.register(Mirror);

    let mut image = Image::open(&source).unwrap();
    image
        .dispatch(&registry, "mirror", &[])
        .unwrap()
        .crop(10, 5, Gravity::TopLeft)
        .unwrap();

    // After mirroring, the top-left corner holds what was top-right
    assert_eq!(*image.buffer().pixels.get_pixel(0, 0), GREEN);
}

#[test]
fn unknown_plugin_is_method_not_found() {
    let tmp = TempDir::new().unwrap();
    let registry = PluginRegistry::with_builtins();
    let mut image = Image::open(fixture(&tmp, "image.png", 20, 10)).unwrap();

    let err = image.dispatch(&registry, "sparkle", &[]).unwrap_err();
    assert_eq!(err.to_string(), "Method not found: sparkle");
}

#[test]
fn recipe_with_reflection_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let source = fixture(&tmp, "image.png", 200, 90);
    let out = tmp.path().join("reflected.png");
    let registry = PluginRegistry::with_builtins();
    let steps: Vec<Step> = ["adaptive-resize=100x100@mc", "reflection=40,40,80,true,#a4a4a4"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();

    let mut image = Image::open(&source).unwrap();
    apply_all(&steps, &mut image, &registry).unwrap();
    image.save(&out).unwrap();

    assert_eq!(reopen(&out).dimensions(), Dimensions::new(100, 140));
}
