/*
 *  display/options.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Device option resolution - device section, then global section, then fallback
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

use std::collections::BTreeMap;

use crate::config::{ConfigError, Settings, EPD_SECTION};

/// Read-only view of the merged settings for one device.
///
/// Every lookup checks the section named after the device identifier first,
/// then the global `EPD` section, and only then returns the caller's fallback.
#[derive(Debug, Clone, Copy)]
pub struct DeviceOptions<'a> {
    device_id: &'a str,
    settings: &'a Settings,
}

impl<'a> DeviceOptions<'a> {
    pub fn new(device_id: &'a str, settings: &'a Settings) -> Self {
        Self { device_id, settings }
    }

    pub fn device_id(&self) -> &'a str {
        self.device_id
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    /// Section the option resolves from, if any
    fn scope(&self, name: &str) -> Option<&'a str> {
        if self.settings.has_option(self.device_id, name) {
            Some(self.device_id)
        } else if self.settings.has_option(EPD_SECTION, name) {
            Some(EPD_SECTION)
        } else {
            None
        }
    }

    pub fn has_device_option(&self, name: &str) -> bool {
        self.scope(name).is_some()
    }

    pub fn get_device_option(&self, name: &str, fallback: &str) -> String {
        self.scope(name)
            .and_then(|section| self.settings.get_str(section, name))
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn getint_device_option(&self, name: &str, fallback: i64) -> Result<i64, ConfigError> {
        match self.scope(name) {
            Some(section) => Ok(self.settings.get_int(section, name)?.unwrap_or(fallback)),
            None => Ok(fallback),
        }
    }

    pub fn getfloat_device_option(&self, name: &str, fallback: f64) -> Result<f64, ConfigError> {
        match self.scope(name) {
            Some(section) => Ok(self.settings.get_float(section, name)?.unwrap_or(fallback)),
            None => Ok(fallback),
        }
    }

    pub fn getboolean_device_option(&self, name: &str, fallback: bool) -> Result<bool, ConfigError> {
        match self.scope(name) {
            Some(section) => Ok(self.settings.get_bool(section, name)?.unwrap_or(fallback)),
            None => Ok(fallback),
        }
    }

    /// All keys of the device section, handed through to vendor libraries
    pub fn device_settings(&self) -> BTreeMap<String, String> {
        self.settings.section(self.device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV: &str = "epdkit.mock";

    fn layered() -> Settings {
        Settings::new()
            .with(EPD_SECTION, "mode", "bw")
            .with(EPD_SECTION, "spi_hz", 1_000_000)
            .with(EPD_SECTION, "vcom", 1.5)
            .with(EPD_SECTION, "border", false)
            .with(DEV, "mode", "color")
            .with(DEV, "spi_hz", 4_000_000)
            .with(DEV, "vcom", -2.0)
            .with(DEV, "border", true)
    }

    #[test]
    fn test_device_scope_wins_for_all_types() {
        let settings = layered();
        let opts = DeviceOptions::new(DEV, &settings);

        assert_eq!(opts.get_device_option("mode", "x"), "color");
        assert_eq!(opts.getint_device_option("spi_hz", 0).unwrap(), 4_000_000);
        assert_eq!(opts.getfloat_device_option("vcom", 0.0).unwrap(), -2.0);
        assert!(opts.getboolean_device_option("border", false).unwrap());
    }

    #[test]
    fn test_global_scope_then_fallback() {
        let settings = layered();
        let opts = DeviceOptions::new("epdkit.other", &settings);

        assert_eq!(opts.get_device_option("mode", "x"), "bw");
        assert_eq!(opts.getint_device_option("spi_hz", 0).unwrap(), 1_000_000);
        assert_eq!(opts.getfloat_device_option("vcom", 0.0).unwrap(), 1.5);
        assert!(!opts.getboolean_device_option("border", true).unwrap());

        assert_eq!(opts.get_device_option("file", "out.png"), "out.png");
        assert_eq!(opts.getint_device_option("width", 400).unwrap(), 400);
        assert!(!opts.has_device_option("width"));
    }

    #[test]
    fn test_malformed_value_propagates() {
        let settings = Settings::new().with(DEV, "width", "wide");
        let opts = DeviceOptions::new(DEV, &settings);

        assert!(opts.getint_device_option("width", 400).is_err());
    }
}
