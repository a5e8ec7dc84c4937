/*
 *  display/pipeline/mod.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Image pipeline - geometry, enhancement, color reduction, dithering
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

pub mod dither;
pub mod enhance;
pub mod geometry;
pub mod quantize;

use image::{DynamicImage, Rgb};
use log::{debug, error};

use crate::config::{ConfigError, Settings, IMAGE_DISPLAY, IMAGE_ENHANCEMENTS};
use crate::display::capabilities::DisplayMode;
use crate::display::error::DisplayError;

pub use dither::{DitherError, DitherMethod, DitherSpec};
pub use quantize::Diffusion;

/// What the `dither` option asks for
#[derive(Debug, Clone, PartialEq)]
pub enum DitherChoice {
    /// Option absent: Floyd-Steinberg during color reduction
    Default,

    /// `dither = none`: nearest color, no diffusion
    Disabled,

    /// Anything else goes to the external dither executable
    External(DitherSpec),
}

/// Pipeline stages selected by the `ImageDisplay` and `ImageEnhancements` sections
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub rotate: Option<f64>,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub contrast: Option<f64>,
    pub brightness: Option<f64>,
    pub sharpness: Option<f64>,
    pub dither: DitherChoice,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            rotate: None,
            flip_horizontal: false,
            flip_vertical: false,
            contrast: None,
            brightness: None,
            sharpness: None,
            dither: DitherChoice::Default,
        }
    }
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let dither = match settings.get(IMAGE_DISPLAY, "dither").map(str::trim) {
            None | Some("") => DitherChoice::Default,
            Some(name) if name.eq_ignore_ascii_case("none") => DitherChoice::Disabled,
            Some(name) => {
                let mut spec = DitherSpec::new(name);
                spec.strength = settings.get_float(IMAGE_DISPLAY, "dither_strength")?;
                spec.args = settings
                    .get_str(IMAGE_DISPLAY, "dither_args")
                    .filter(|a| !a.trim().is_empty());
                spec.serpentine = settings
                    .get_bool(IMAGE_DISPLAY, "dither_serpentine")?
                    .unwrap_or(false);
                if let Some(command) = settings.get_str(IMAGE_DISPLAY, "dither_command") {
                    spec.command = command;
                }
                DitherChoice::External(spec)
            }
        };

        Ok(Self {
            rotate: settings.get_float(IMAGE_DISPLAY, "rotate")?,
            flip_horizontal: settings.get_bool(IMAGE_DISPLAY, "flip_horizontal")?.unwrap_or(false),
            flip_vertical: settings.get_bool(IMAGE_DISPLAY, "flip_vertical")?.unwrap_or(false),
            contrast: settings.get_float(IMAGE_ENHANCEMENTS, "contrast")?,
            brightness: settings.get_float(IMAGE_ENHANCEMENTS, "brightness")?,
            sharpness: settings.get_float(IMAGE_ENHANCEMENTS, "sharpness")?,
            dither,
        })
    }

    fn enhances(&self) -> bool {
        self.contrast.is_some() || self.brightness.is_some() || self.sharpness.is_some()
    }
}

/// Per-device context the pipeline runs against
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub device_id: &'a str,
    pub mode: DisplayMode,
    pub palette: &'a [Rgb<u8>],
    pub max_colors: usize,
}

/// Run every configured stage in order.
///
/// Fails only when the palette holds more colors than the device can show.
/// External dither failures are logged and the image reduced without it.
pub fn apply(
    image: &DynamicImage,
    target: &Target<'_>,
    options: &PipelineOptions,
) -> Result<DynamicImage, DisplayError> {
    let mut image = image.clone();

    if let Some(angle) = options.rotate {
        debug!("Rotating image {} degrees", angle);
        image = geometry::rotate(&image, angle);
    }
    if options.flip_horizontal {
        debug!("Flipping image horizontally");
        image = geometry::flip_horizontal(&image);
    }
    if options.flip_vertical {
        debug!("Flipping image vertically");
        image = geometry::flip_vertical(&image);
    }

    if options.enhances() {
        let mut rgb = image.to_rgb8();
        if let Some(factor) = options.contrast {
            debug!("Applying contrast: {}", factor);
            rgb = enhance::contrast(&rgb, factor);
        }
        if let Some(factor) = options.brightness {
            debug!("Applying brightness: {}", factor);
            rgb = enhance::brightness(&rgb, factor);
        }
        if let Some(factor) = options.sharpness {
            debug!("Applying sharpness: {}", factor);
            rgb = enhance::sharpness(&rgb, factor);
        }
        image = DynamicImage::ImageRgb8(rgb);
    }

    if target.palette.len() > target.max_colors {
        return Err(DisplayError::configuration(
            target.device_id,
            "palette_filter",
            format!("{} colors", target.palette.len()),
        ));
    }

    let out = match &options.dither {
        DitherChoice::Default => reduce(&image, target, Diffusion::FloydSteinberg),
        DitherChoice::Disabled => reduce(&image, target, Diffusion::None),
        DitherChoice::External(spec) => match spec.run(&image, target.palette) {
            // snap whatever came back onto the palette
            Ok(dithered) => reduce(&dithered, target, Diffusion::None),
            Err(e) => {
                error!("Dithering with '{}' failed: {}", spec.name, e);
                reduce(&image, target, Diffusion::FloydSteinberg)
            }
        },
    };

    Ok(out)
}

fn reduce(image: &DynamicImage, target: &Target<'_>, diffusion: Diffusion) -> DynamicImage {
    if target.mode.is_monochrome() {
        debug!("Reducing to 1-bit ({:?})", diffusion);
    } else {
        debug!("Quantizing to {} colors ({:?})", target.palette.len(), diffusion);
    }
    quantize::reduce(image, target.mode, target.palette, diffusion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::capabilities::{BLACK, RED, WHITE};
    use image::{GenericImageView, RgbImage};

    fn photo() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(12, 6, |x, y| {
            Rgb([(x * 20) as u8, (y * 40) as u8, 128])
        }))
    }

    fn target<'a>(mode: DisplayMode, palette: &'a [Rgb<u8>]) -> Target<'a> {
        Target { device_id: "test.panel", mode, palette, max_colors: 3 }
    }

    #[test]
    fn test_options_from_settings() {
        let settings = Settings::new()
            .with(IMAGE_DISPLAY, "rotate", 90)
            .with(IMAGE_DISPLAY, "flip_vertical", "yes")
            .with(IMAGE_DISPLAY, "dither", "Atkinson")
            .with(IMAGE_DISPLAY, "dither_strength", 0.8)
            .with(IMAGE_DISPLAY, "dither_command", "/opt/didder")
            .with(IMAGE_ENHANCEMENTS, "contrast", 1.2);

        let opts = PipelineOptions::from_settings(&settings).unwrap();
        assert_eq!(opts.rotate, Some(90.0));
        assert!(opts.flip_vertical && !opts.flip_horizontal);
        assert_eq!(opts.contrast, Some(1.2));
        match opts.dither {
            DitherChoice::External(spec) => {
                assert_eq!(spec.name, "Atkinson");
                assert_eq!(spec.strength, Some(0.8));
                assert_eq!(spec.command, "/opt/didder");
            }
            other => panic!("unexpected dither {:?}", other),
        }
    }

    #[test]
    fn test_dither_none_and_absent() {
        let none = Settings::new().with(IMAGE_DISPLAY, "dither", "None");
        assert_eq!(PipelineOptions::from_settings(&none).unwrap().dither, DitherChoice::Disabled);
        assert_eq!(PipelineOptions::from_settings(&Settings::new()).unwrap(), PipelineOptions::default());
    }

    #[test]
    fn test_malformed_option_is_error() {
        let bad = Settings::new().with(IMAGE_DISPLAY, "rotate", "sideways");
        assert!(PipelineOptions::from_settings(&bad).is_err());
    }

    #[test]
    fn test_oversized_palette_rejected() {
        let palette = [BLACK, WHITE, RED, Rgb([0, 0, 255])];
        let err = apply(&photo(), &target(DisplayMode::Red, &palette), &PipelineOptions::default())
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("4 colors") && msg.contains("test.panel"));
    }

    #[test]
    fn test_pipeline_idempotent_without_dither() {
        let palette = [BLACK, WHITE, RED];
        for mode in [DisplayMode::Bw, DisplayMode::Red] {
            for dither in [DitherChoice::Default, DitherChoice::Disabled] {
                let opts = PipelineOptions { dither, ..Default::default() };
                let once = apply(&photo(), &target(mode, &palette), &opts).unwrap();
                let twice = apply(&once, &target(mode, &palette), &opts).unwrap();
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn test_rotation_feeds_reduction() {
        let palette = [BLACK, WHITE];
        let opts = PipelineOptions { rotate: Some(90.0), ..Default::default() };
        let out = apply(&photo(), &target(DisplayMode::Bw, &palette), &opts).unwrap();
        assert_eq!(out.dimensions(), (6, 12));
        assert!(out.as_luma8().is_some());
    }

    #[test]
    fn test_failed_dither_keeps_reduced_image() {
        let palette = [BLACK, WHITE, RED];
        let mut spec = DitherSpec::new("FloydSteinberg");
        spec.command = "/nonexistent/epdkit-dither".into();
        let opts = PipelineOptions { dither: DitherChoice::External(spec), ..Default::default() };

        let out = apply(&photo(), &target(DisplayMode::Red, &palette), &opts).unwrap();
        let plain = apply(&photo(), &target(DisplayMode::Red, &palette), &PipelineOptions::default()).unwrap();
        assert_eq!(out, plain);
    }
}
