/*
 *  display/registry.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Device registry - discovery and configuration driven loading
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

use std::fmt;

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{ConfigLoader, Settings, EPD_SECTION};
use crate::display::drivers::builtin_drivers;
use crate::display::epd::EpdDisplay;
use crate::display::error::DisplayError;
use crate::display::options::DeviceOptions;
use crate::display::traits::DisplayDriver;

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// One entry of the registration table.
///
/// `supported_devices` is asked on every lookup, so an implementation whose
/// vendor library is missing simply reports nothing.
#[derive(Clone, Copy)]
pub struct DriverRegistration {
    pub package: &'static str,
    pub family: &'static str,
    pub supported_devices: fn() -> Vec<String>,
    /// Called with the device part of the identifier (after the first `.`)
    pub create: fn(&str, &DeviceOptions<'_>) -> Result<BoxedDriver, DisplayError>,
}

impl fmt::Debug for DriverRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistration")
            .field("package", &self.package)
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

/// Detailed listing entry, one per registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverListing {
    pub package: String,
    pub family: String,
    pub devices: Vec<String>,
}

/// Registry of display implementations
#[derive(Debug)]
pub struct DisplayRegistry {
    registrations: Vec<DriverRegistration>,
    loader: ConfigLoader,
}

impl Default for DisplayRegistry {
    /// Built-in implementations, configuration from the default search path
    fn default() -> Self {
        Self::new(ConfigLoader::default())
    }
}

impl DisplayRegistry {
    pub fn new(loader: ConfigLoader) -> Self {
        Self { registrations: builtin_drivers(), loader }
    }

    /// Add an implementation. Meant for process start, before any lookup.
    pub fn register(&mut self, registration: DriverRegistration) {
        debug!("Registering {} ({} family)", registration.package, registration.family);
        self.registrations.push(registration);
    }

    pub fn registrations(&self) -> &[DriverRegistration] {
        &self.registrations
    }

    pub fn loader(&self) -> &ConfigLoader {
        &self.loader
    }

    /// Every loadable device identifier, sorted
    pub fn list_supported_displays(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .registrations
            .iter()
            .flat_map(|r| (r.supported_devices)())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Identifiers grouped by the implementation that provides them
    pub fn list_supported_displays_detailed(&self) -> Vec<DriverListing> {
        self.registrations
            .iter()
            .map(|r| DriverListing {
                package: r.package.to_string(),
                family: r.family.to_string(),
                devices: (r.supported_devices)(),
            })
            .collect()
    }

    /// Resolve, configure and construct a display.
    ///
    /// `name` falls back to `EPD.type`. Layers are merged as global file,
    /// per-device file, then `overrides`. Nothing is sent to the panel here.
    pub fn load_display_driver(&self, name: Option<&str>, overrides: &Settings) -> Result<EpdDisplay, DisplayError> {
        let mut settings = self.loader.load_global()?;

        let mut device_name = name
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| settings.get_str(EPD_SECTION, "type"))
            .unwrap_or_default();

        if !device_name.is_empty() {
            settings.merge(&self.loader.load_device(&device_name)?);
        }
        settings.merge(overrides);

        if device_name.is_empty() {
            device_name = settings.get_str(EPD_SECTION, "type").unwrap_or_default();
        }
        if device_name.is_empty() {
            return Err(DisplayError::DeviceNotFound(device_name));
        }

        let registration = self.resolve(&device_name)?;
        let device = device_name
            .split_once('.')
            .map(|(_, device)| device)
            .unwrap_or_default();

        info!("Loading {} from {} ({} family)", device_name, registration.package, registration.family);
        let driver = (registration.create)(device, &DeviceOptions::new(&device_name, &settings))?;

        EpdDisplay::new(&device_name, settings, driver)
    }

    /// Exactly one registration must claim `device_name`
    fn resolve(&self, device_name: &str) -> Result<&DriverRegistration, DisplayError> {
        let matches: Vec<&DriverRegistration> = self
            .registrations
            .iter()
            .filter(|r| (r.supported_devices)().iter().any(|id| id == device_name))
            .collect();

        match matches.as_slice() {
            [only] => Ok(*only),
            [] => {
                debug!("No implementation claims {}", device_name);
                Err(DisplayError::DeviceNotFound(device_name.to_string()))
            }
            many => {
                let families: Vec<&str> = many.iter().map(|r| r.family).collect();
                warn!("{} is claimed by {} implementations ({}), refusing to guess",
                    device_name, many.len(), families.join(", "));
                Err(DisplayError::DeviceNotFound(device_name.to_string()))
            }
        }
    }
}

/// [`DisplayRegistry::list_supported_displays`] on the default registry
pub fn list_supported_displays() -> Vec<String> {
    DisplayRegistry::default().list_supported_displays()
}

/// [`DisplayRegistry::list_supported_displays_detailed`] on the default registry
pub fn list_supported_displays_detailed() -> Vec<DriverListing> {
    DisplayRegistry::default().list_supported_displays_detailed()
}

/// [`DisplayRegistry::load_display_driver`] on the default registry
pub fn load_display_driver(name: Option<&str>, overrides: &Settings) -> Result<EpdDisplay, DisplayError> {
    DisplayRegistry::default().load_display_driver(name, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::capabilities::DisplayMode;
    use crate::display::drivers::mock::{self, MockDriver, DEVICE_ID};
    use std::fs;
    use tempfile::tempdir;

    fn in_memory() -> Settings {
        Settings::new().with(DEVICE_ID, "write_file", false)
    }

    fn duplicate_mock() -> DriverRegistration {
        DriverRegistration {
            family: "mock-copy",
            create: |_, _| Ok(Box::new(MockDriver::in_memory())),
            ..mock::registration()
        }
    }

    #[test]
    fn test_listing_is_sorted_and_unique() {
        let dir = tempdir().unwrap();
        let mut registry = DisplayRegistry::new(ConfigLoader::in_dir(dir.path()));
        registry.register(duplicate_mock());

        let ids = registry.list_supported_displays();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids.iter().filter(|id| *id == DEVICE_ID).count(), 1);
    }

    #[test]
    fn test_detailed_listing() {
        let dir = tempdir().unwrap();
        let registry = DisplayRegistry::new(ConfigLoader::in_dir(dir.path()));
        let listing = registry.list_supported_displays_detailed();

        let mock = listing.iter().find(|l| l.family == "mock").unwrap();
        assert_eq!(mock.package, "epdkit");
        assert_eq!(mock.devices, vec![DEVICE_ID.to_string()]);

        let json = serde_json::to_string(mock).unwrap();
        assert!(json.contains("\"devices\":[\"epdkit.mock\"]"));
    }

    #[test]
    fn test_load_by_name() {
        let dir = tempdir().unwrap();
        let registry = DisplayRegistry::new(ConfigLoader::in_dir(dir.path()));
        let display = registry.load_display_driver(Some(DEVICE_ID), &in_memory()).unwrap();
        assert_eq!(display.device_id(), DEVICE_ID);
        assert_eq!(display.mode(), DisplayMode::Bw);
    }

    #[test]
    fn test_type_from_global_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("epdkit.yaml"), "EPD:\n  type: epdkit.mock\n  mode: color\n").unwrap();
        fs::write(dir.path().join("epdkit.mock.yaml"), "epdkit.mock:\n  width: 300\n").unwrap();

        let registry = DisplayRegistry::new(ConfigLoader::in_dir(dir.path()));
        let display = registry.load_display_driver(None, &in_memory()).unwrap();
        assert_eq!(display.mode(), DisplayMode::Color);
        assert_eq!(display.width(), 300);
    }

    #[test]
    fn test_type_from_overrides() {
        let dir = tempdir().unwrap();
        let registry = DisplayRegistry::new(ConfigLoader::in_dir(dir.path()));
        let overrides = in_memory().with(EPD_SECTION, "type", DEVICE_ID);
        assert!(registry.load_display_driver(Some(""), &overrides).is_ok());
    }

    #[test]
    fn test_missing_name() {
        let dir = tempdir().unwrap();
        let registry = DisplayRegistry::new(ConfigLoader::in_dir(dir.path()));
        let err = registry.load_display_driver(None, &Settings::new()).unwrap_err();
        assert!(matches!(err, DisplayError::DeviceNotFound(ref n) if n.is_empty()));
    }

    #[test]
    fn test_unknown_and_ambiguous() {
        let dir = tempdir().unwrap();
        let mut registry = DisplayRegistry::new(ConfigLoader::in_dir(dir.path()));

        let err = registry.load_display_driver(Some("nothing.here"), &Settings::new()).unwrap_err();
        assert!(matches!(err, DisplayError::DeviceNotFound(ref n) if n == "nothing.here"));

        registry.register(duplicate_mock());
        let err = registry.load_display_driver(Some(DEVICE_ID), &in_memory()).unwrap_err();
        assert!(matches!(err, DisplayError::DeviceNotFound(_)));
    }

    #[test]
    fn test_invalid_mode_fails_load() {
        let dir = tempdir().unwrap();
        let registry = DisplayRegistry::new(ConfigLoader::in_dir(dir.path()));
        let overrides = in_memory().with(DEVICE_ID, "mode", "gray4");
        let err = registry.load_display_driver(Some(DEVICE_ID), &overrides).unwrap_err();
        assert!(matches!(err, DisplayError::Configuration { ref option, .. } if option == "mode"));
    }
}
