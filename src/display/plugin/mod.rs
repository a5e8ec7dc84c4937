/*
 *  display/plugin/mod.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Vendor library plugin system
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

//! Vendor panel libraries loaded at runtime
//!
//! The SPI/GPIO side of every vendor family lives in a separate shared
//! library. epdkit only needs to know whether the library is there (to list
//! the family's devices) and how to drive it through a small C vtable.
//!
//! ## Architecture
//!
//! 1. **FFI Layer** (`ffi.rs`) - C ABI types for the vendor interface
//! 2. **Loader** (`loader.rs`) - Discovers and loads .so/.dylib/.dll files
//! 3. **Adapter** (`adapter.rs`) - Wraps an opened panel as a `VendorPanel`
//!
//! ## Library Discovery
//!
//! Libraries are searched in the following locations (in priority order):
//!
//! 1. `$EPDKIT_VENDOR_PATH` (environment variable)
//! 2. `./target/release/vendors/` (development)
//! 3. `~/.local/lib/epdkit/vendors/` (user-local)
//! 4. `/usr/local/lib/epdkit/vendors/` (system)
//! 5. `/usr/lib/epdkit/vendors/` (system)
//!
//! ## Naming Convention
//!
//! - Linux: `libepdkit_waveshare_epd.so`
//! - macOS: `libepdkit_waveshare_epd.dylib`
//! - Windows: `epdkit_waveshare_epd.dll`

pub mod ffi;
pub mod loader;
pub mod adapter;

use log::error;

use crate::display::drivers::family::VendorPanel;
use crate::display::error::DisplayError;
use crate::display::options::DeviceOptions;

pub use ffi::{
    EpdkitVendorVTable,
    EpdkitPanelHandle,
    EpdkitErrorCode,
    EpdkitError,
    EpdkitPlane,
    EpdkitPlaneFormat,
    EpdkitInitKind,
};
pub use loader::{PluginLoader, LoadedPlugin, PluginMetadata};
pub use adapter::PluginPanel;

/// Exit status used when a listed vendor library cannot be loaded
pub const VENDOR_LOAD_EXIT_CODE: i32 = 2;

/// Open `module` from the `package` vendor library.
///
/// A library that was found during discovery but cannot be loaded now
/// leaves the process unable to drive any display of the family, so this
/// logs and terminates with exit status 2.
pub fn open_panel(
    package: &str,
    module: &str,
    options: &DeviceOptions<'_>,
) -> Result<Box<dyn VendorPanel>, DisplayError> {
    let plugin = match PluginLoader::load_by_package(package) {
        Ok(plugin) => plugin,
        Err(e) => {
            error!("Vendor library for {} could not be loaded: {}", package, e);
            std::process::exit(VENDOR_LOAD_EXIT_CODE);
        }
    };

    let panel = PluginPanel::open(plugin, module, &options.device_settings())?;
    Ok(Box::new(panel))
}
