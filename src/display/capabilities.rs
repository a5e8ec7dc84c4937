/*
 *  display/capabilities.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display modes and static capability descriptors
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
use std::str::FromStr;

use image::Rgb;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

/// Rendering capability level a display can be driven in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// Black and white
    Bw,

    /// Black and white (Inky naming)
    Black,

    /// Black, white and red
    Red,

    /// Black, white and yellow
    Yellow,

    /// Four shade grayscale
    Gray4,

    /// Full panel color set
    Color,

    /// User supplied palette
    Palette,
}

impl DisplayMode {
    /// Monochrome modes are reduced to 1-bit instead of palette quantized
    pub fn is_monochrome(&self) -> bool {
        matches!(self, DisplayMode::Bw | DisplayMode::Black)
    }

    /// Extra ink color of tri-color modes
    pub fn accent(&self) -> Option<Rgb<u8>> {
        match self {
            DisplayMode::Red => Some(RED),
            DisplayMode::Yellow => Some(YELLOW),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Bw => "bw",
            DisplayMode::Black => "black",
            DisplayMode::Red => "red",
            DisplayMode::Yellow => "yellow",
            DisplayMode::Gray4 => "gray4",
            DisplayMode::Color => "color",
            DisplayMode::Palette => "palette",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bw" => Ok(DisplayMode::Bw),
            "black" => Ok(DisplayMode::Black),
            "red" => Ok(DisplayMode::Red),
            "yellow" => Ok(DisplayMode::Yellow),
            "gray4" => Ok(DisplayMode::Gray4),
            "color" => Ok(DisplayMode::Color),
            "palette" => Ok(DisplayMode::Palette),
            other => Err(other.to_string()),
        }
    }
}

/// Static metadata describing what an implementation supports.
///
/// Descriptors are immutable values; every display instance takes its own
/// copy of the palette at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDescriptor {
    /// Vendor namespace, first half of every device identifier
    pub package_name: String,

    /// Device identifiers this implementation can instantiate
    pub supported_devices: Vec<String>,

    /// Ordered modes, the first entry is the default
    pub modes_available: Vec<DisplayMode>,

    /// Upper bound on simultaneous palette entries
    pub max_colors: usize,

    /// Palette used by the `color` and `palette` modes
    pub default_palette: Vec<Rgb<u8>>,
}

impl CapabilityDescriptor {
    pub fn default_mode(&self) -> DisplayMode {
        self.modes_available.first().copied().unwrap_or(DisplayMode::Bw)
    }

    pub fn supports_mode(&self, mode: DisplayMode) -> bool {
        self.modes_available.contains(&mode)
    }

    /// Working palette for a mode, before any configured override
    pub fn palette_for(&self, mode: DisplayMode) -> Vec<Rgb<u8>> {
        match mode {
            DisplayMode::Bw | DisplayMode::Black => vec![BLACK, WHITE],
            DisplayMode::Red | DisplayMode::Yellow => {
                let mut palette = vec![BLACK, WHITE];
                palette.extend(mode.accent());
                palette
            }
            DisplayMode::Gray4 => [0u8, 85, 170, 255].iter().map(|&v| Rgb([v, v, v])).collect(),
            DisplayMode::Color | DisplayMode::Palette => self.default_palette.clone(),
        }
    }
}

/// Convert a static palette table into pixel values
pub fn palette_from_table(table: &[[u8; 3]]) -> Vec<Rgb<u8>> {
    table.iter().map(|&c| Rgb(c)).collect()
}
