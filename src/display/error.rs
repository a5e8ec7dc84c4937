/*
 *  display/error.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for display subsystem
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
use std::error::Error;

use crate::config::ConfigError;

/// Unified error type for all display operations
#[derive(Debug)]
pub enum DisplayError {
    /// No single implementation claims the requested device identifier
    DeviceNotFound(String),

    /// A resolved value violates the capabilities of the device
    Configuration {
        device: String,
        option: String,
        value: String,
    },

    /// Malformed configuration value or file
    Config(ConfigError),

    /// Image encoding/decoding failure
    Image(image::ImageError),

    /// File system error (mock output, matrix files)
    Io(std::io::Error),

    /// Vendor library failed to bring the panel up
    InitializationFailed(String),

    /// Vendor library reported a failure while talking to the panel
    Driver(String),

    /// Unsupported operation for this display
    UnsupportedOperation,
}

impl DisplayError {
    /// Shorthand for [`DisplayError::Configuration`]
    pub fn configuration(device: &str, option: &str, value: impl ToString) -> Self {
        DisplayError::Configuration {
            device: device.to_string(),
            option: option.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::DeviceNotFound(name) =>
                write!(f, "A display device for device name {} cannot be loaded", name),
            DisplayError::Configuration { device, option, value } =>
                write!(f, "'{}' for '{}' is not a valid configuration value for {}", value, option, device),
            DisplayError::Config(err) =>
                write!(f, "Configuration error: {}", err),
            DisplayError::Image(err) =>
                write!(f, "Image error: {}", err),
            DisplayError::Io(err) =>
                write!(f, "I/O error: {}", err),
            DisplayError::InitializationFailed(msg) =>
                write!(f, "Display initialization failed: {}", msg),
            DisplayError::Driver(msg) =>
                write!(f, "Display driver error: {}", msg),
            DisplayError::UnsupportedOperation =>
                write!(f, "Operation not supported by this display"),
        }
    }
}

impl Error for DisplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::Config(err) => Some(err),
            DisplayError::Image(err) => Some(err),
            DisplayError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for DisplayError {
    fn from(err: ConfigError) -> Self {
        DisplayError::Config(err)
    }
}

impl From<image::ImageError> for DisplayError {
    fn from(err: image::ImageError) -> Self {
        DisplayError::Image(err)
    }
}

impl From<std::io::Error> for DisplayError {
    fn from(err: std::io::Error) -> Self {
        DisplayError::Io(err)
    }
}
