/*
 *  display/drivers/mock.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock display - writes frames to a PNG file instead of a panel
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

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::{DynamicImage, ImageFormat};
use log::{debug, info};

use crate::display::capabilities::{palette_from_table, CapabilityDescriptor, DisplayMode};
use crate::display::error::DisplayError;
use crate::display::options::DeviceOptions;
use crate::display::registry::DriverRegistration;
use crate::display::traits::{DisplayDriver, Frame};

pub const PACKAGE: &str = "epdkit";
pub const DEVICE_ID: &str = "epdkit.mock";

pub const MOCK_WIDTH: u32 = 400;
pub const MOCK_HEIGHT: u32 = 200;
pub const MOCK_MAX_COLORS: usize = 256;

/// Output file used when the `file` option is not set
pub const DEFAULT_OUTPUT_FILE: &str = "mock_output.png";

const MOCK_PALETTE: &[[u8; 3]] = &[
    [0, 0, 0],
    [255, 255, 255],
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [255, 255, 0],
    [255, 128, 0],
];

/// Mock display driver
///
/// Behaves like a panel without needing one: every processed frame is
/// written as PNG to the configured `file` (unless `write_file` is false)
/// and kept in shared state so tests can inspect what reached the "panel".
#[derive(Debug)]
pub struct MockDriver {
    capabilities: CapabilityDescriptor,

    /// Where frames go, None when file output is disabled
    output: Option<PathBuf>,

    /// Shared state for testing
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    pub prepare_count: usize,
    pub display_count: usize,
    pub sleep_count: usize,
    pub clear_count: usize,
    pub close_count: usize,

    /// Mode prepare() was last called with
    pub last_mode: Option<DisplayMode>,

    /// Last frame handed to write_frame
    pub last_frame: Option<DynamicImage>,

    /// Simulate failures (for error testing)
    pub simulate_write_failure: bool,
}

impl MockDriver {
    /// Create the mock from its device options (`file`, `write_file`)
    pub fn new(options: &DeviceOptions<'_>) -> Result<Self, DisplayError> {
        let output = if options.getboolean_device_option("write_file", true)? {
            let file = options.get_device_option("file", "");
            Some(if file.is_empty() {
                std::env::current_dir()?.join(DEFAULT_OUTPUT_FILE)
            } else {
                PathBuf::from(file)
            })
        } else {
            None
        };

        Ok(Self::with_output(output))
    }

    /// Mock that keeps frames in memory only
    pub fn in_memory() -> Self {
        Self::with_output(None)
    }

    fn with_output(output: Option<PathBuf>) -> Self {
        Self {
            capabilities: descriptor(),
            output,
            state: Arc::new(Mutex::new(MockDriverState::default())),
        }
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    /// Reset state counters
    pub fn reset_state(&mut self) {
        *self.lock() = MockDriverState::default();
    }

    fn lock(&self) -> MutexGuard<'_, MockDriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn descriptor() -> CapabilityDescriptor {
    CapabilityDescriptor {
        package_name: PACKAGE.to_string(),
        supported_devices: vec![DEVICE_ID.to_string()],
        modes_available: vec![DisplayMode::Bw, DisplayMode::Color, DisplayMode::Palette],
        max_colors: MOCK_MAX_COLORS,
        default_palette: palette_from_table(MOCK_PALETTE),
    }
}

pub fn registration() -> DriverRegistration {
    DriverRegistration {
        package: PACKAGE,
        family: "mock",
        supported_devices: || vec![DEVICE_ID.to_string()],
        create: |device, options| {
            if device != "mock" {
                return Err(DisplayError::DeviceNotFound(options.device_id().to_string()));
            }
            Ok(Box::new(MockDriver::new(options)?))
        },
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &CapabilityDescriptor {
        &self.capabilities
    }

    fn dimensions(&self) -> (u32, u32) {
        (MOCK_WIDTH, MOCK_HEIGHT)
    }

    fn prepare(&mut self, mode: DisplayMode) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.prepare_count += 1;
        state.last_mode = Some(mode);
        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame<'_>) -> Result<(), DisplayError> {
        {
            let mut state = self.lock();
            if state.simulate_write_failure {
                return Err(DisplayError::Driver("Simulated write failure".to_string()));
            }
            state.display_count += 1;
            state.last_frame = Some(frame.image.clone());
        } // release lock before touching the file system

        match &self.output {
            Some(path) => {
                frame.image.save_with_format(path, ImageFormat::Png)?;
                info!("Mock display wrote {} frame to {}", frame.mode, path.display());
            }
            None => debug!("Mock display kept {} frame in memory", frame.mode),
        }
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        self.lock().sleep_count += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.clear_count += 1;
        state.last_frame = None;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        self.lock().close_count += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use image::GenericImageView;

    fn frame_image() -> DynamicImage {
        DynamicImage::new_rgb8(MOCK_WIDTH, MOCK_HEIGHT)
    }

    #[test]
    fn test_mock_driver_creation() {
        let driver = MockDriver::in_memory();
        assert_eq!(driver.dimensions(), (400, 200));
        assert_eq!(driver.capabilities().max_colors, 256);
        assert!(driver.capabilities().default_palette.len() <= 256);
        assert!(driver.output_path().is_none());
    }

    #[test]
    fn test_output_options() {
        let settings = Settings::new().with(DEVICE_ID, "file", "/tmp/frame.png");
        let driver = MockDriver::new(&DeviceOptions::new(DEVICE_ID, &settings)).unwrap();
        assert_eq!(driver.output_path(), Some(Path::new("/tmp/frame.png")));

        let settings = Settings::new().with(DEVICE_ID, "write_file", false);
        let driver = MockDriver::new(&DeviceOptions::new(DEVICE_ID, &settings)).unwrap();
        assert!(driver.output_path().is_none());

        let driver = MockDriver::new(&DeviceOptions::new(DEVICE_ID, &Settings::new())).unwrap();
        assert!(driver.output_path().unwrap().ends_with(DEFAULT_OUTPUT_FILE));
    }

    #[test]
    fn test_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut driver = MockDriver::with_output(Some(path.clone()));
        let img = frame_image();

        driver.write_frame(&Frame { image: &img, mode: DisplayMode::Bw, palette: &[] }).unwrap();

        let written = image::open(&path).unwrap();
        assert_eq!(written.dimensions(), (MOCK_WIDTH, MOCK_HEIGHT));
        assert_eq!(driver.state().lock().unwrap().display_count, 1);
    }

    #[test]
    fn test_lifecycle_counters() {
        let mut driver = MockDriver::in_memory();
        let state = driver.state();

        driver.prepare(DisplayMode::Color).unwrap();
        driver.sleep().unwrap();
        driver.clear().unwrap();
        driver.close().unwrap();

        let s = state.lock().unwrap();
        assert_eq!((s.prepare_count, s.sleep_count, s.clear_count, s.close_count), (1, 1, 1, 1));
        assert_eq!(s.last_mode, Some(DisplayMode::Color));
    }

    #[test]
    fn test_simulated_failure() {
        let mut driver = MockDriver::in_memory();
        driver.state().lock().unwrap().simulate_write_failure = true;
        let img = frame_image();

        let result = driver.write_frame(&Frame { image: &img, mode: DisplayMode::Bw, palette: &[] });
        assert!(matches!(result, Err(DisplayError::Driver(_))));

        driver.reset_state();
        assert!(!driver.state().lock().unwrap().simulate_write_failure);
    }
}
