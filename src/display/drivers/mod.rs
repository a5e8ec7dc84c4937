/*
 *  display/drivers/mod.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display implementations
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

// Reference implementation, always available
pub mod mock;

// Shared device family implementation
pub mod family;

// Vendor families (conditionally compiled based on feature flags)
#[cfg(feature = "driver-waveshare")]
pub mod waveshare;

#[cfg(feature = "driver-inky")]
pub mod inky;

use crate::display::registry::DriverRegistration;

/// Registration table of every implementation compiled in
pub fn builtin_drivers() -> Vec<DriverRegistration> {
    #[allow(unused_mut)]
    let mut drivers = vec![mock::registration()];

    #[cfg(feature = "driver-waveshare")]
    drivers.extend(waveshare::registrations());

    #[cfg(feature = "driver-inky")]
    drivers.extend(inky::registrations());

    drivers
}
