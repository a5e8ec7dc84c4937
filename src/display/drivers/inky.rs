/*
 *  display/drivers/inky.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pimoroni Inky families
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

use crate::display::capabilities::DisplayMode;
use crate::display::registry::DriverRegistration;
use super::family::{DeviceFamily, FamilyMember, InitStyle, PlaneLayout};

pub const PACKAGE: &str = "inky";

const BLACK: &[DisplayMode] = &[DisplayMode::Black];
const BLACK_RED: &[DisplayMode] = &[DisplayMode::Black, DisplayMode::Red];
const BLACK_YELLOW: &[DisplayMode] = &[DisplayMode::Black, DisplayMode::Yellow];

/// Inky UC8159 desaturated palette, the trailing white stands in for "clean"
pub const IMPRESSION_PALETTE: &[[u8; 3]] = &[
    [0, 0, 0],
    [255, 255, 255],
    [0, 255, 0],
    [0, 0, 255],
    [255, 0, 0],
    [255, 255, 0],
    [255, 140, 0],
    [255, 255, 255],
];

// the Inky library redraws on show, no separate init
const fn hat(name: &'static str, modes: &'static [DisplayMode], max_colors: usize) -> FamilyMember {
    FamilyMember::new(name, modes, max_colors, InitStyle::None, PlaneLayout::InkIndices)
}

/// pHAT, pHAT (SSD1608) and wHAT boards, each in black, red or yellow
pub static HATS: DeviceFamily = DeviceFamily {
    package: PACKAGE,
    name: "phat/what",
    members: &[
        hat("phat_black", BLACK, 2),
        hat("phat_red", BLACK_RED, 3),
        hat("phat_yellow", BLACK_YELLOW, 3),
        hat("phat1608_black", BLACK, 2),
        hat("phat1608_red", BLACK_RED, 3),
        hat("phat1608_yellow", BLACK_YELLOW, 3),
        hat("what_black", BLACK, 2),
        hat("what_red", BLACK_RED, 3),
        hat("what_yellow", BLACK_YELLOW, 3),
    ],
};

pub static IMPRESSION: DeviceFamily = DeviceFamily {
    package: PACKAGE,
    name: "impression",
    members: &[
        FamilyMember::new(
            "impression",
            &[DisplayMode::Color, DisplayMode::Bw],
            8,
            InitStyle::None,
            PlaneLayout::Single,
        )
        .module("inky_uc8159")
        .palette(IMPRESSION_PALETTE),
    ],
};

pub fn registrations() -> Vec<DriverRegistration> {
    vec![
        DriverRegistration {
            package: PACKAGE,
            family: HATS.name,
            supported_devices: || HATS.device_ids(),
            create: |device, options| HATS.create(device, options),
        },
        DriverRegistration {
            package: PACKAGE,
            family: IMPRESSION.name,
            supported_devices: || IMPRESSION.device_ids(),
            create: |device, options| IMPRESSION.create(device, options),
        },
    ]
}
