/*
 *  display/epd.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display instance - resolved mode, palette and settings around a driver
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

use image::{DynamicImage, Rgb};
use log::{debug, info};

use crate::config::{ConfigError, Settings};
use crate::display::capabilities::{CapabilityDescriptor, DisplayMode};
use crate::display::error::DisplayError;
use crate::display::options::DeviceOptions;
use crate::display::palette::parse_palette;
use crate::display::pipeline::{self, PipelineOptions, Target};
use crate::display::registry::BoxedDriver;
use crate::display::traits::{DisplayDriver, Frame};

/// A configured display, as returned by the registry.
///
/// Owns its settings snapshot, its palette and the driver. Call order is
/// `prepare`, `display`, then any mix of `sleep`/`clear`, and `close` once
/// done. Using the display after `close` is up to the vendor library.
pub struct EpdDisplay {
    device_id: String,
    width: u32,
    height: u32,
    mode: DisplayMode,
    palette_filter: Vec<Rgb<u8>>,
    settings: Settings,
    descriptor: CapabilityDescriptor,
    driver: BoxedDriver,
}

impl EpdDisplay {
    /// Wrap `driver`, resolving size, mode and palette from `settings`.
    ///
    /// Fails with a configuration error when the mode is unknown or not
    /// offered by the driver, or the palette cannot be parsed. The palette
    /// size is only checked when an image is processed.
    pub fn new(device_id: &str, settings: Settings, driver: BoxedDriver) -> Result<Self, DisplayError> {
        let descriptor = driver.capabilities().clone();
        let options = DeviceOptions::new(device_id, &settings);

        let (native_w, native_h) = driver.dimensions();
        let width = dimension(&options, "width", native_w)?;
        let height = dimension(&options, "height", native_h)?;

        let mode = if options.has_device_option("mode") {
            let raw = options.get_device_option("mode", "");
            raw.parse::<DisplayMode>()
                .map_err(|bad| DisplayError::configuration(device_id, "mode", bad))?
        } else {
            descriptor.default_mode()
        };

        if !descriptor.supports_mode(mode) {
            return Err(DisplayError::configuration(device_id, "mode", mode));
        }

        let palette_filter = if options.has_device_option("palette_filter") {
            let raw = options.get_device_option("palette_filter", "");
            parse_palette(&raw)
                .map_err(|_| DisplayError::configuration(device_id, "palette_filter", &raw))?
        } else {
            descriptor.palette_for(mode)
        };

        info!("{} ready: {}x{}, mode {}, {} palette colors", device_id, width, height, mode, palette_filter.len());

        Ok(Self {
            device_id: device_id.to_string(),
            width,
            height,
            mode,
            palette_filter,
            settings,
            descriptor,
            driver,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn modes_available(&self) -> &[DisplayMode] {
        &self.descriptor.modes_available
    }

    pub fn max_colors(&self) -> usize {
        self.descriptor.max_colors
    }

    pub fn palette_filter(&self) -> &[Rgb<u8>] {
        &self.palette_filter
    }

    /// Replace the working palette. Its size is checked on the next `display`.
    pub fn set_palette_filter(&mut self, palette: Vec<Rgb<u8>>) {
        self.palette_filter = palette;
    }

    pub fn capabilities(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn driver(&self) -> &dyn DisplayDriver {
        self.driver.as_ref()
    }

    pub fn options(&self) -> DeviceOptions<'_> {
        DeviceOptions::new(&self.device_id, &self.settings)
    }

    pub fn has_device_option(&self, name: &str) -> bool {
        self.options().has_device_option(name)
    }

    pub fn get_device_option(&self, name: &str, fallback: &str) -> String {
        self.options().get_device_option(name, fallback)
    }

    pub fn getint_device_option(&self, name: &str, fallback: i64) -> Result<i64, ConfigError> {
        self.options().getint_device_option(name, fallback)
    }

    pub fn getfloat_device_option(&self, name: &str, fallback: f64) -> Result<f64, ConfigError> {
        self.options().getfloat_device_option(name, fallback)
    }

    pub fn getboolean_device_option(&self, name: &str, fallback: bool) -> Result<bool, ConfigError> {
        self.options().getboolean_device_option(name, fallback)
    }

    /// Get the panel ready for an update
    pub fn prepare(&mut self) -> Result<(), DisplayError> {
        debug!("{}: prepare ({})", self.device_id, self.mode);
        self.driver.prepare(self.mode)
    }

    /// Run the image pipeline without touching the panel
    pub fn apply_pipeline(&self, image: &DynamicImage) -> Result<DynamicImage, DisplayError> {
        let options = PipelineOptions::from_settings(&self.settings)?;
        let target = Target {
            device_id: &self.device_id,
            mode: self.mode,
            palette: &self.palette_filter,
            max_colors: self.descriptor.max_colors,
        };
        pipeline::apply(image, &target, &options)
    }

    /// Process `image` and write it to the panel
    pub fn display(&mut self, image: &DynamicImage) -> Result<(), DisplayError> {
        let processed = self.apply_pipeline(image)?;
        let frame = Frame {
            image: &processed,
            mode: self.mode,
            palette: &self.palette_filter,
        };
        self.driver.write_frame(&frame)
    }

    pub fn sleep(&mut self) -> Result<(), DisplayError> {
        debug!("{}: sleep", self.device_id);
        self.driver.sleep()
    }

    pub fn clear(&mut self) -> Result<(), DisplayError> {
        debug!("{}: clear", self.device_id);
        self.driver.clear()
    }

    pub fn close(&mut self) -> Result<(), DisplayError> {
        info!("{}: close", self.device_id);
        self.driver.close()
    }
}

impl std::fmt::Debug for EpdDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpdDisplay")
            .field("device_id", &self.device_id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mode", &self.mode)
            .field("palette_filter", &self.palette_filter)
            .finish_non_exhaustive()
    }
}

fn dimension(options: &DeviceOptions<'_>, name: &str, native: u32) -> Result<u32, DisplayError> {
    let value = options.getint_device_option(name, native as i64)?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| DisplayError::configuration(options.device_id(), name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EPD_SECTION, IMAGE_DISPLAY};
    use crate::display::capabilities::{BLACK, RED, WHITE};
    use crate::display::drivers::mock::{MockDriver, DEVICE_ID};

    fn mock(settings: Settings) -> Result<EpdDisplay, DisplayError> {
        EpdDisplay::new(DEVICE_ID, settings, Box::new(MockDriver::in_memory()))
    }

    #[test]
    fn test_defaults_from_descriptor() {
        let d = mock(Settings::new()).unwrap();
        assert_eq!((d.width(), d.height()), (400, 200));
        assert_eq!(d.mode(), DisplayMode::Bw);
        assert_eq!(d.palette_filter(), &[BLACK, WHITE]);
    }

    #[test]
    fn test_size_and_mode_overrides() {
        let settings = Settings::new()
            .with(EPD_SECTION, "mode", "bw")
            .with(DEVICE_ID, "mode", "color")
            .with(DEVICE_ID, "width", 640)
            .with(DEVICE_ID, "height", 384);
        let d = mock(settings).unwrap();

        assert_eq!((d.width(), d.height()), (640, 384));
        assert_eq!(d.mode(), DisplayMode::Color);
        assert_eq!(d.palette_filter().len(), 7);
    }

    #[test]
    fn test_bad_modes_rejected() {
        let unknown = Settings::new().with(EPD_SECTION, "mode", "sepia");
        let err = mock(unknown).unwrap_err();
        assert!(matches!(&err, DisplayError::Configuration { option, value, .. } if option == "mode" && value == "sepia"));

        // valid name, not offered by the mock
        let unsupported = Settings::new().with(DEVICE_ID, "mode", "red");
        assert!(matches!(mock(unsupported), Err(DisplayError::Configuration { .. })));
    }

    #[test]
    fn test_palette_checked_lazily() {
        let mut d = mock(Settings::new().with(DEVICE_ID, "mode", "palette")).unwrap();
        let big: Vec<Rgb<u8>> = (0..=256u32).map(|i| Rgb([i as u8, (i / 2) as u8, 0])).collect();
        d.set_palette_filter(big);

        let err = d.display(&DynamicImage::new_rgb8(4, 4)).unwrap_err();
        assert!(err.to_string().contains("257 colors"));
    }

    #[test]
    fn test_palette_option_parsed() {
        let settings = Settings::new()
            .with(DEVICE_ID, "mode", "palette")
            .with(DEVICE_ID, "palette_filter", "#000000 white [255,0,0]");
        let d = mock(settings).unwrap();
        assert_eq!(d.palette_filter(), &[BLACK, WHITE, RED]);

        let broken = Settings::new().with(DEVICE_ID, "palette_filter", "chartreuse-ish");
        assert!(matches!(mock(broken), Err(DisplayError::Configuration { .. })));
    }

    #[test]
    fn test_display_reaches_driver() {
        let settings = Settings::new().with(IMAGE_DISPLAY, "flip_horizontal", true);
        let mut d = mock(settings).unwrap();
        d.prepare().unwrap();
        d.display(&DynamicImage::new_rgb8(8, 8)).unwrap();

        let driver = d.driver().as_any().downcast_ref::<MockDriver>().unwrap();
        let state = driver.state();
        let s = state.lock().unwrap();
        assert_eq!((s.prepare_count, s.display_count), (1, 1));
        assert!(s.last_frame.as_ref().unwrap().as_luma8().is_some());
    }
}
