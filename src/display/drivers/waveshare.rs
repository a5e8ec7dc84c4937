/*
 *  display/drivers/waveshare.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Waveshare e-Paper families
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
use super::family::{DeviceFamily, FamilyMember, InitStyle, PlaneLayout, SEVEN_COLOR_PALETTE};

pub const PACKAGE: &str = "waveshare_epd";

const BW: &[DisplayMode] = &[DisplayMode::Bw];
const BW_RED: &[DisplayMode] = &[DisplayMode::Bw, DisplayMode::Red];
const BW_YELLOW: &[DisplayMode] = &[DisplayMode::Bw, DisplayMode::Yellow];
const BW_GRAY4: &[DisplayMode] = &[DisplayMode::Bw, DisplayMode::Gray4];
const BW_COLOR: &[DisplayMode] = &[DisplayMode::Bw, DisplayMode::Color];
const BW_COLOR_PALETTE: &[DisplayMode] = &[DisplayMode::Bw, DisplayMode::Color, DisplayMode::Palette];

/// Sixteen gray levels driven by the IT8951 controller
pub const IT8951_PALETTE: &[[u8; 3]] = &[
    [0, 0, 0], [17, 17, 17], [34, 34, 34], [51, 51, 51],
    [68, 68, 68], [85, 85, 85], [102, 102, 102], [119, 119, 119],
    [136, 136, 136], [153, 153, 153], [170, 170, 170], [187, 187, 187],
    [204, 204, 204], [221, 221, 221], [238, 238, 238], [255, 255, 255],
];

const fn mono(name: &'static str, init: InitStyle) -> FamilyMember {
    FamilyMember::new(name, BW, 2, init, PlaneLayout::Single)
}

const fn tri(name: &'static str, modes: &'static [DisplayMode]) -> FamilyMember {
    FamilyMember::new(name, modes, 3, InitStyle::Plain, PlaneLayout::BlackAndAccent)
}

const fn gray(name: &'static str, init: InitStyle) -> FamilyMember {
    FamilyMember::new(name, BW_GRAY4, 4, init, PlaneLayout::Single)
}

/// Black and white panels. Older panels take a LUT or update mode in `init`.
pub static MONOCHROME: DeviceFamily = DeviceFamily {
    package: PACKAGE,
    name: "monochrome",
    members: &[
        mono("epd2in9", InitStyle::FullUpdateLut),
        mono("epd2in13", InitStyle::FullUpdateLut),
        mono("epd1in54", InitStyle::FullUpdateLut),
        mono("epd2in66", InitStyle::FullUpdateMode),
        mono("epd2in13_V2", InitStyle::FullUpdateMode),
        mono("epd1in54_V2", InitStyle::Plain),
        mono("epd2in13d", InitStyle::Plain),
        mono("epd2in9_V2", InitStyle::Plain),
        mono("epd2in9d", InitStyle::Plain),
        mono("epd5in83", InitStyle::Plain),
        mono("epd5in83_V2", InitStyle::Plain),
        mono("epd7in5", InitStyle::Plain),
        mono("epd7in5_HD", InitStyle::Plain),
        mono("epd7in5_V2", InitStyle::Plain),
    ],
};

/// Black/white plus red or yellow. Several b/c pairs share one driver module.
pub static TRI_COLOR: DeviceFamily = DeviceFamily {
    package: PACKAGE,
    name: "tri-color",
    members: &[
        tri("epd1in54b", BW_RED),
        tri("epd1in54b_V2", BW_RED),
        tri("epd1in54c", BW_YELLOW),
        tri("epd2in13b", BW_RED).module("epd2in13bc"),
        tri("epd2in13b_V3", BW_RED),
        tri("epd2in13c", BW_YELLOW).module("epd2in13bc"),
        tri("epd2in66b", BW_RED),
        tri("epd2in7b", BW_RED),
        tri("epd2in7b_V2", BW_RED),
        tri("epd2in9b", BW_RED).module("epd2in9bc"),
        tri("epd2in9b_V3", BW_RED),
        tri("epd2in9c", BW_YELLOW).module("epd2in9bc"),
        tri("epd4in2bc", BW_RED),
        tri("epd4in2c", BW_YELLOW).module("epd4in2bc"),
        tri("epd4in2b_V2", BW_RED),
        tri("epd5in83b", BW_RED).module("epd5in83bc"),
        tri("epd5in83c", BW_YELLOW).module("epd5in83bc"),
        tri("epd5in83b_V2", BW_RED),
        tri("epd7in5b", BW_RED).module("epd7in5bc"),
        tri("epd7in5c", BW_YELLOW).module("epd7in5bc"),
        tri("epd7in5b_V2", BW_RED),
        tri("epd7in5b_HD", BW_RED),
    ],
};

/// Four shade panels, the 3.7" one picks its init sequence by number
pub static GRAYSCALE: DeviceFamily = DeviceFamily {
    package: PACKAGE,
    name: "grayscale",
    members: &[
        gray("epd2in7", InitStyle::FourGray),
        gray("epd3in7", InitStyle::ByMode { gray: 0, other: 1 }),
        gray("epd4in2", InitStyle::FourGray),
    ],
};

/// The 1.02" panel speaks a capitalised API (`Init`, `Display`, `Sleep`)
pub static EPD1IN02: DeviceFamily = DeviceFamily {
    package: PACKAGE,
    name: "1in02",
    members: &[mono("epd1in02", InitStyle::Capitalized)],
};

/// IT8951 controller boards, any palette up to 256 entries
pub static IT8951: DeviceFamily = DeviceFamily {
    package: PACKAGE,
    name: "it8951",
    members: &[
        FamilyMember::new("it8951", BW_COLOR_PALETTE, 256, InitStyle::Plain, PlaneLayout::Single)
            .palette(IT8951_PALETTE),
    ],
};

pub static SEVEN_COLOR: DeviceFamily = DeviceFamily {
    package: PACKAGE,
    name: "7-color",
    members: &[
        FamilyMember::new("epd5in65f", BW_COLOR, 7, InitStyle::Plain, PlaneLayout::Single)
            .palette(SEVEN_COLOR_PALETTE),
        FamilyMember::new("epd4in01f", BW_COLOR, 7, InitStyle::Plain, PlaneLayout::Single)
            .palette(SEVEN_COLOR_PALETTE),
    ],
};

pub fn registrations() -> Vec<DriverRegistration> {
    vec![
        DriverRegistration {
            package: PACKAGE,
            family: MONOCHROME.name,
            supported_devices: || MONOCHROME.device_ids(),
            create: |device, options| MONOCHROME.create(device, options),
        },
        DriverRegistration {
            package: PACKAGE,
            family: TRI_COLOR.name,
            supported_devices: || TRI_COLOR.device_ids(),
            create: |device, options| TRI_COLOR.create(device, options),
        },
        DriverRegistration {
            package: PACKAGE,
            family: GRAYSCALE.name,
            supported_devices: || GRAYSCALE.device_ids(),
            create: |device, options| GRAYSCALE.create(device, options),
        },
        DriverRegistration {
            package: PACKAGE,
            family: EPD1IN02.name,
            supported_devices: || EPD1IN02.device_ids(),
            create: |device, options| EPD1IN02.create(device, options),
        },
        DriverRegistration {
            package: PACKAGE,
            family: SEVEN_COLOR.name,
            supported_devices: || SEVEN_COLOR.device_ids(),
            create: |device, options| SEVEN_COLOR.create(device, options),
        },
        DriverRegistration {
            package: PACKAGE,
            family: IT8951.name,
            supported_devices: || IT8951.device_ids(),
            create: |device, options| IT8951.create(device, options),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::capabilities::{RED, YELLOW};
    use crate::display::drivers::family::PanelInit;

    #[test]
    fn test_shared_driver_modules() {
        let b = TRI_COLOR.member("epd2in13b").unwrap();
        let c = TRI_COLOR.member("epd2in13c").unwrap();
        assert_eq!(b.module, "epd2in13bc");
        assert_eq!(c.module, "epd2in13bc");
        assert_eq!(c.modes, BW_YELLOW);
        assert_eq!(TRI_COLOR.member("epd2in7b").unwrap().module, "epd2in7b");
    }

    #[test]
    fn test_tri_color_palettes() {
        let b = TRI_COLOR.member("epd4in2bc").unwrap();
        let desc = TRI_COLOR.descriptor(b);
        assert_eq!(desc.max_colors, 3);
        assert_eq!(desc.palette_for(DisplayMode::Red).last(), Some(&RED));

        let c = TRI_COLOR.member("epd4in2c").unwrap();
        assert_eq!(TRI_COLOR.descriptor(c).palette_for(DisplayMode::Yellow).last(), Some(&YELLOW));
    }

    #[test]
    fn test_init_sequences() {
        let lut = MONOCHROME.member("epd2in13").unwrap();
        assert_eq!(lut.init.for_mode(DisplayMode::Bw), Some(PanelInit::FullUpdateLut));

        let mode = MONOCHROME.member("epd2in13_V2").unwrap();
        assert_eq!(mode.init.for_mode(DisplayMode::Bw), Some(PanelInit::FullUpdateMode));

        let g37 = GRAYSCALE.member("epd3in7").unwrap();
        assert_eq!(g37.init.for_mode(DisplayMode::Gray4), Some(PanelInit::Numbered(0)));
        assert_eq!(g37.init.for_mode(DisplayMode::Bw), Some(PanelInit::Numbered(1)));

        let g42 = GRAYSCALE.member("epd4in2").unwrap();
        assert_eq!(g42.init.for_mode(DisplayMode::Gray4), Some(PanelInit::Gray4));
    }

    #[test]
    fn test_seven_color_palette() {
        let desc = SEVEN_COLOR.descriptor(SEVEN_COLOR.member("epd5in65f").unwrap());
        assert_eq!(desc.default_palette.len(), 7);
        assert!(desc.default_palette.len() <= desc.max_colors);
    }

    #[test]
    fn test_it8951_descriptor() {
        let member = IT8951.member("it8951").unwrap();
        let desc = IT8951.descriptor(member);
        assert_eq!(desc.supported_devices, vec!["waveshare_epd.it8951".to_string()]);
        assert_eq!(desc.modes_available, BW_COLOR_PALETTE);
        assert_eq!(desc.max_colors, 256);
        assert_eq!(desc.default_mode(), DisplayMode::Bw);
        assert_eq!(desc.palette_for(DisplayMode::Palette).len(), 16);
        assert_eq!(member.module, "it8951");
        assert_eq!(member.layout, PlaneLayout::Single);
    }

    #[test]
    fn test_1in02_has_own_init() {
        let member = EPD1IN02.member("epd1in02").unwrap();
        assert_eq!(member.init.for_mode(DisplayMode::Bw), Some(PanelInit::Capitalized));
        assert_ne!(member.init, MONOCHROME.member("epd1in54_V2").unwrap().init);
    }

    #[test]
    fn test_every_family_listed() {
        let regs = registrations();
        assert_eq!(regs.len(), 6);
        assert!(regs.iter().all(|r| r.package == PACKAGE));
    }
}
