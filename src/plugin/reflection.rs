//! Mirror-reflection effect.
//!
//! The image grows downward by `height * reflection / 100` rows. Those rows
//! hold the part of the image from `height * percent / 100` down to the bottom,
//! squeezed to fit and flipped upside down, then faded toward white row by
//! row. An optional one pixel border frames the original area.
//!
//! Arguments, in order:
//!
//! | # | Name | Meaning |
//! |---|---|---|
//! | 1 | `percent` | Where the mirrored part starts, in percent of the height (`0 ≤ p < 100`) |
//! | 2 | `reflection` | Reflection height, in percent of the image height (`0 ≤ r ≤ 1000`) |
//! | 3 | `white` | Transparency of the white overlay on the first reflected row, `0..=127`; it fades to opaque at the last row |
//! | 4 | `border` | Draw a border (optional, default `false`) |
//! | 5 | `border_color` | `#rrggbb`, `#rgb` or `&Hrrggbb`; required when `border` is true |
//!
//! Transparency is measured on the 0 (opaque) to 127 (transparent) scale
//! common to palette-era raster libraries, so `white = 127` leaves the top of
//! the reflection untouched and `white = 0` paints the whole reflection white.

use super::{Plugin, PluginArg, arg_bool, arg_f64, arg_str};
use crate::imaging::{Canvas, ColorMode, Image, PipelineError};
use image::imageops;
use image::{Rgb, Rgba, RgbaImage};

const NAME: &str = "reflection";

/// Largest overlay transparency value.
const MAX_ALPHA: f64 = 127.0;

/// Largest reflection height, in percent of the image height.
const MAX_REFLECTION: f64 = 1000.0;

const OPAQUE_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// The `reflection` plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reflection;

struct Settings {
    percent: f64,
    reflection: f64,
    white: f64,
    border: Option<Rgb<u8>>,
}

impl Settings {
    fn from_args(args: &[PluginArg]) -> Result<Self, PipelineError> {
        let percent = arg_f64(NAME, args, 0)?;
        let reflection = arg_f64(NAME, args, 1)?;
        let white = arg_f64(NAME, args, 2)?;
        let border = if args.len() > 3 && arg_bool(NAME, args, 3)? {
            let text = arg_str(NAME, args, 4)?;
            let color = parse_hex_color(text).ok_or_else(|| {
                PipelineError::InvalidArgument(format!("{NAME}: bad border color {text:?}"))
            })?;
            Some(color)
        } else {
            None
        };

        if !(0.0..100.0).contains(&percent) {
            return Err(PipelineError::InvalidArgument(format!(
                "{NAME}: percent must be in [0, 100), got {percent}"
            )));
        }
        if !(0.0..=MAX_REFLECTION).contains(&reflection) {
            return Err(PipelineError::InvalidArgument(format!(
                "{NAME}: reflection must be in [0, 1000], got {reflection}"
            )));
        }
        if !(0.0..=MAX_ALPHA).contains(&white) {
            return Err(PipelineError::InvalidArgument(format!(
                "{NAME}: white must be in [0, 127], got {white}"
            )));
        }

        Ok(Self {
            percent,
            reflection,
            white,
            border,
        })
    }
}

impl Plugin for Reflection {
    fn name(&self) -> &str {
        NAME
    }

    fn execute(&self, image: &mut Image, args: &[PluginArg]) -> Result<(), PipelineError> {
        let settings = Settings::from_args(args)?;
        let filter = image.backend().filter();
        let source = &image.buffer().pixels;
        let (width, height) = source.dimensions();

        let reflection_height = (height as f64 * settings.reflection / 100.0) as u32;
        let total = height.checked_add(reflection_height).ok_or_else(|| {
            PipelineError::InvalidArgument(format!(
                "{NAME}: reflecting {width}x{height} by {}% overflows the height",
                settings.reflection
            ))
        })?;
        let mut pixels = RgbaImage::from_pixel(width, total, OPAQUE_WHITE);

        if reflection_height > 0 {
            let skipped = (height as f64 * settings.percent / 100.0) as u32;
            let mirrored = imageops::crop_imm(source, 0, skipped, width, height - skipped).to_image();
            let mirrored = if mirrored.dimensions() == (width, reflection_height) {
                mirrored
            } else {
                imageops::resize(&mirrored, width, reflection_height, filter)
            };
            imageops::overlay(&mut pixels, &mirrored, 0, 0);
            imageops::flip_vertical_in_place(&mut pixels);
        }

        imageops::overlay(&mut pixels, source, 0, 0);

        for i in 0..reflection_height {
            let alpha = ((1.0 - i as f64 / reflection_height as f64) * settings.white).trunc();
            let opacity = (MAX_ALPHA - alpha) / MAX_ALPHA;
            for x in 0..width {
                fade_to_white(pixels.get_pixel_mut(x, height + i), opacity);
            }
        }

        if let Some(color) = settings.border {
            draw_border(&mut pixels, height, color);
        }

        let mode = if image.format().has_transparency() {
            ColorMode::Alpha
        } else {
            ColorMode::TrueColor
        };
        image.replace_buffer(Canvas::new(pixels, mode));
        Ok(())
    }
}

fn fade_to_white(pixel: &mut Rgba<u8>, opacity: f64) {
    for channel in &mut pixel.0[..3] {
        let c = *channel as f64;
        *channel = (c + (255.0 - c) * opacity).round() as u8;
    }
}

/// Lines along the top, the original bottom edge (row `height`), and both sides.
fn draw_border(pixels: &mut RgbaImage, height: u32, color: Rgb<u8>) {
    let paint = Rgba([color.0[0], color.0[1], color.0[2], 255]);
    let (width, total) = pixels.dimensions();

    for x in 0..width {
        pixels.put_pixel(x, 0, paint);
        if height < total {
            pixels.put_pixel(x, height, paint);
        }
    }
    for y in 0..=height.min(total - 1) {
        pixels.put_pixel(0, y, paint);
        pixels.put_pixel(width - 1, y, paint);
    }
}

/// Parse `#rrggbb`, `#rgb`, `&Hrrggbb` or the bare digits.
///
/// Short forms double each digit, so `#fa0` is `#ffaa00`.
pub fn parse_hex_color(text: &str) -> Option<Rgb<u8>> {
    let hex = text
        .strip_prefix('#')
        .or_else(|| text.strip_prefix("&H"))
        .unwrap_or(text);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Rgb([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        ])),
        3 => {
            let doubled: String = hex.chars().flat_map(|c| [c, c]).collect();
            parse_hex_color(&doubled)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Dimensions;
    use crate::plugin::PluginRegistry;
    use crate::test_helpers::write_png_with;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// 4x4 PNG: rows 0-1 blue, rows 2-3 green.
    fn two_band_image(dir: &tempfile::TempDir) -> Image {
        let path = dir.path().join("bands.png");
        write_png_with(&path, 4, 4, |_, y| if y < 2 { BLUE } else { GREEN });
        Image::open(&path).unwrap()
    }

    fn args(values: &[&str]) -> Vec<PluginArg> {
        values.iter().map(|v| v.parse().unwrap()).collect()
    }

    #[test]
    fn extends_height_by_reflection_percentage() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("src.png");
        write_png_with(&path, 20, 10, |_, _| RED);
        let mut image = Image::open(&path).unwrap();

        Reflection
            .execute(&mut image, &args(&["0", "55", "127"]))
            .unwrap();
        // floor(10 * 0.55) = 5
        assert_eq!(image.dimensions(), Dimensions::new(20, 15));
    }

    #[test]
    fn reflection_is_flipped_and_fades_to_white() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut image = two_band_image(&tmp);

        Reflection
            .execute(&mut image, &args(&["0", "100", "127"]))
            .unwrap();
        let pixels = &image.buffer().pixels;

        // Original stays on top
        assert_eq!(*pixels.get_pixel(1, 0), BLUE);
        assert_eq!(*pixels.get_pixel(1, 3), GREEN);
        // First reflected row mirrors the bottom row and is not faded
        assert_eq!(*pixels.get_pixel(1, 4), GREEN);
        // Last reflected row mirrors the top row, partly whitened
        let last = pixels.get_pixel(1, 7);
        assert_eq!(last.0[2], 255);
        assert!(last.0[0] > 0 && last.0[0] < 255, "{last:?}");
    }

    #[test]
    fn zero_white_paints_reflection_white() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut image = two_band_image(&tmp);

        Reflection
            .execute(&mut image, &args(&["0", "50", "0"]))
            .unwrap();
        let pixels = &image.buffer().pixels;
        for y in 4..6 {
            assert_eq!(*pixels.get_pixel(2, y), OPAQUE_WHITE);
        }
    }

    #[test]
    fn percent_skips_top_of_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut image = two_band_image(&tmp);

        // Start mirroring half way down: only green rows are reflected
        Reflection
            .execute(&mut image, &args(&["50", "50", "127"]))
            .unwrap();
        assert_eq!(image.height(), 6);
        assert_eq!(*image.buffer().pixels.get_pixel(0, 4), GREEN);
    }

    #[test]
    fn border_frames_original_area() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut image = two_band_image(&tmp);

        Reflection
            .execute(&mut image, &args(&["0", "100", "127", "true", "#f00"]))
            .unwrap();
        let pixels = &image.buffer().pixels;
        assert_eq!(*pixels.get_pixel(2, 0), RED);
        assert_eq!(*pixels.get_pixel(2, 4), RED);
        assert_eq!(*pixels.get_pixel(0, 2), RED);
        assert_eq!(*pixels.get_pixel(3, 2), RED);
        assert_ne!(*pixels.get_pixel(2, 2), RED);
        assert_ne!(*pixels.get_pixel(0, 6), RED);
    }

    #[test]
    fn border_without_reflection_stays_in_bounds() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut image = two_band_image(&tmp);

        Reflection
            .execute(&mut image, &args(&["0", "0", "127", "1", "&H0000FF"]))
            .unwrap();
        assert_eq!(image.dimensions(), Dimensions::new(4, 4));
        assert_eq!(*image.buffer().pixels.get_pixel(0, 3), BLUE);
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut image = two_band_image(&tmp);

        for bad in [
            vec!["100", "50", "10"],
            vec!["0", "-5", "10"],
            vec!["0", "inf", "10"],
            vec!["0", "1e9", "10"],
            vec!["NaN", "50", "10"],
            vec!["0", "NaN", "10"],
            vec!["0", "50", "NaN"],
            vec!["0", "50", "200"],
            vec!["0", "50"],
            vec!["0", "50", "10", "true"],
            vec!["0", "50", "10", "true", "#zzzzzz"],
        ] {
            let err = Reflection.execute(&mut image, &args(&bad)).unwrap_err();
            assert!(
                matches!(err, PipelineError::InvalidArgument(_)),
                "{bad:?}: {err}"
            );
        }
        assert_eq!(image.dimensions(), Dimensions::new(4, 4));
    }

    #[test]
    fn runs_through_registry_dispatch() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut image = two_band_image(&tmp);
        let registry = PluginRegistry::with_builtins();

        image
            .dispatch(&registry, "reflection", &args(&["0", "50", "60"]))
            .unwrap()
            .resize(Some(2), None)
            .unwrap();
        assert_eq!(image.dimensions(), Dimensions::new(2, 3));
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#a4a4a4"), Some(Rgb([0xa4, 0xa4, 0xa4])));
        assert_eq!(parse_hex_color("&HFF8000"), Some(Rgb([255, 128, 0])));
        assert_eq!(parse_hex_color("fa0"), Some(Rgb([255, 170, 0])));
        assert_eq!(parse_hex_color("#ff00"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(parse_hex_color(""), None);
    }
}
