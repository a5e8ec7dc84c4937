/*
 *  display/mod.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - registry, capability model, image pipeline
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod capabilities;
pub mod options;
pub mod palette;

// Display instance and the processing it applies
pub mod epd;
pub mod pipeline;

// Discovery and construction
pub mod registry;

// Display implementations (vendor families are feature gated inside)
pub mod drivers;

// Plugin system (conditionally compiled with plugin-system feature)
#[cfg(feature = "plugin-system")]
pub mod plugin;

// Re-exports for convenience
pub use traits::{DisplayDriver, Frame};
pub use error::DisplayError;
pub use capabilities::{CapabilityDescriptor, DisplayMode};
pub use options::DeviceOptions;
pub use palette::{parse_palette, PaletteError};
pub use epd::EpdDisplay;
pub use pipeline::{DitherChoice, PipelineOptions};
pub use registry::{
    list_supported_displays, list_supported_displays_detailed, load_display_driver,
    BoxedDriver, DisplayRegistry, DriverListing, DriverRegistration,
};
