/*
 *  lib.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
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

//! Uniform access to e-paper panels from several vendors.
//!
//! Pick a device by identifier (`package.devicename`) or through the `EPD.type`
//! configuration key, then drive it through [`EpdDisplay`]:
//!
//! ```ignore
//! let mut epd = epdkit::load_display_driver(Some("waveshare_epd.epd2in13_V2"), &Settings::new())?;
//! epd.prepare()?;
//! epd.display(&image::open("frame.png")?)?;
//! epd.sleep()?;
//! epd.close()?;
//! ```

pub mod config;
pub mod display;

pub use config::{ConfigError, ConfigLoader, Settings};
pub use display::{
    list_supported_displays, list_supported_displays_detailed, load_display_driver,
    CapabilityDescriptor, DisplayError, DisplayMode, DisplayRegistry, EpdDisplay,
};
