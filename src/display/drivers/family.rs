/*
 *  display/drivers/family.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Device families - one display type parameterised by a member record
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

//! Vendor families such as "Waveshare tri-color" share one implementation.
//! Each panel of a family is a [`FamilyMember`] row naming its vendor driver
//! module, the modes it supports and how it wants to be initialised and fed.
//! [`FamilyDisplay`] picks the row at construction and talks to the panel
//! through a [`VendorPanel`].

use std::any::Any;

use image::{GrayImage, Luma, Rgb};
use log::{debug, info};

use crate::display::capabilities::{palette_from_table, CapabilityDescriptor, DisplayMode, BLACK, WHITE};
use crate::display::error::DisplayError;
use crate::display::options::DeviceOptions;
use crate::display::pipeline::quantize::nearest_index;
use crate::display::registry::BoxedDriver;
use crate::display::traits::{DisplayDriver, Frame};

/// Initialisation sequence sent to the panel before an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelInit {
    /// `init()`
    Plain,

    /// `init(lut_full_update)`
    FullUpdateLut,

    /// `init(FULL_UPDATE)`
    FullUpdateMode,

    /// `Init_4Gray()`
    Gray4,

    /// `init(n)`
    Numbered(i32),

    /// `Init()`, for panels whose whole API is capitalised (`Display`,
    /// `Sleep`, `Clear`)
    Capitalized,
}

/// How a family member gets initialised in `prepare`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStyle {
    /// No init call, the vendor library handles it on show
    None,
    Plain,
    FullUpdateLut,
    FullUpdateMode,
    /// `Init_4Gray()` for gray4, `init()` otherwise
    FourGray,
    /// Numbered init, one number for gray4 and one for everything else
    ByMode { gray: i32, other: i32 },
    /// `Init()` of the capitalised API
    Capitalized,
}

impl InitStyle {
    pub fn for_mode(&self, mode: DisplayMode) -> Option<PanelInit> {
        match *self {
            InitStyle::None => None,
            InitStyle::Plain => Some(PanelInit::Plain),
            InitStyle::FullUpdateLut => Some(PanelInit::FullUpdateLut),
            InitStyle::FullUpdateMode => Some(PanelInit::FullUpdateMode),
            InitStyle::FourGray if mode == DisplayMode::Gray4 => Some(PanelInit::Gray4),
            InitStyle::FourGray => Some(PanelInit::Plain),
            InitStyle::ByMode { gray, .. } if mode == DisplayMode::Gray4 => Some(PanelInit::Numbered(gray)),
            InitStyle::ByMode { other, .. } => Some(PanelInit::Numbered(other)),
            InitStyle::Capitalized => Some(PanelInit::Capitalized),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneFormat {
    Luma8,
    Rgb8,
}

/// One buffer handed to the vendor library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub format: PlaneFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Plane {
    fn luma(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self { format: PlaneFormat::Luma8, width, height, data: image.into_raw() }
    }
}

/// How a processed frame is split into planes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneLayout {
    /// One plane: L8 for monochrome and gray modes, RGB8 otherwise
    Single,

    /// Black plane plus accent plane, 0 = ink. The accent plane is blank in
    /// monochrome modes.
    BlackAndAccent,

    /// One L8 plane of ink indices in vendor order: white 0, black 1,
    /// accent 2 (red/yellow modes only)
    InkIndices,
}

/// Ink order of the index plane
fn vendor_inks(mode: DisplayMode) -> Vec<Rgb<u8>> {
    let mut inks = vec![WHITE, BLACK];
    inks.extend(mode.accent());
    inks
}

impl PlaneLayout {
    pub fn planes(&self, frame: &Frame<'_>) -> Vec<Plane> {
        match self {
            PlaneLayout::Single => {
                if frame.mode.is_monochrome() || frame.mode == DisplayMode::Gray4 {
                    vec![Plane::luma(frame.image.to_luma8())]
                } else {
                    let rgb = frame.image.to_rgb8();
                    let (width, height) = rgb.dimensions();
                    vec![Plane { format: PlaneFormat::Rgb8, width, height, data: rgb.into_raw() }]
                }
            }
            PlaneLayout::BlackAndAccent => {
                let rgb = frame.image.to_rgb8();
                let accent = frame.mode.accent();
                let ink = |hit: bool| Luma([if hit { 0u8 } else { 255 }]);

                let black = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                    ink(*rgb.get_pixel(x, y) == BLACK)
                });
                let colored = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                    ink(accent.is_some_and(|a| *rgb.get_pixel(x, y) == a))
                });
                vec![Plane::luma(black), Plane::luma(colored)]
            }
            PlaneLayout::InkIndices => {
                let rgb = frame.image.to_rgb8();
                let inks = vendor_inks(frame.mode);
                let indexed = GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                    let p = rgb.get_pixel(x, y);
                    Luma([nearest_index(&inks, [p[0] as f32, p[1] as f32, p[2] as f32]) as u8])
                });
                vec![Plane::luma(indexed)]
            }
        }
    }
}

/// Interface of an opened vendor panel
pub trait VendorPanel: Send {
    /// Native (width, height)
    fn dimensions(&self) -> (u32, u32);

    fn init(&mut self, init: PanelInit) -> Result<(), DisplayError>;

    fn show(&mut self, planes: &[Plane]) -> Result<(), DisplayError>;

    fn sleep(&mut self) -> Result<(), DisplayError>;

    fn clear(&mut self) -> Result<(), DisplayError>;

    fn close(&mut self) -> Result<(), DisplayError>;
}

/// One panel of a family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyMember {
    /// Device suffix, `epd2in13b` in `waveshare_epd.epd2in13b`
    pub name: &'static str,

    /// Vendor driver module the panel is opened with
    pub module: &'static str,

    pub modes: &'static [DisplayMode],
    pub max_colors: usize,
    pub palette: &'static [[u8; 3]],
    pub init: InitStyle,
    pub layout: PlaneLayout,
}

impl FamilyMember {
    /// Member whose driver module matches its name
    pub const fn new(
        name: &'static str,
        modes: &'static [DisplayMode],
        max_colors: usize,
        init: InitStyle,
        layout: PlaneLayout,
    ) -> Self {
        Self { name, module: name, modes, max_colors, palette: &[], init, layout }
    }

    pub const fn module(mut self, module: &'static str) -> Self {
        self.module = module;
        self
    }

    pub const fn palette(mut self, palette: &'static [[u8; 3]]) -> Self {
        self.palette = palette;
        self
    }
}

/// A static table of panels served by one vendor library
#[derive(Debug)]
pub struct DeviceFamily {
    /// Vendor package, also the vendor library name
    pub package: &'static str,
    pub name: &'static str,
    pub members: &'static [FamilyMember],
}

impl DeviceFamily {
    /// Every identifier of the family, none when the vendor library is missing
    pub fn device_ids(&self) -> Vec<String> {
        if !vendor_installed(self.package) {
            debug!("{} library not installed, skipping {} family", self.package, self.name);
            return Vec::new();
        }
        self.all_ids()
    }

    fn all_ids(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|m| format!("{}.{}", self.package, m.name))
            .collect()
    }

    pub fn member(&self, name: &str) -> Option<&'static FamilyMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn descriptor(&self, member: &FamilyMember) -> CapabilityDescriptor {
        CapabilityDescriptor {
            package_name: self.package.to_string(),
            supported_devices: self.all_ids(),
            modes_available: member.modes.to_vec(),
            max_colors: member.max_colors,
            default_palette: palette_from_table(member.palette),
        }
    }

    /// Open the vendor panel for `device` and wrap it
    pub fn create(&self, device: &str, options: &DeviceOptions<'_>) -> Result<BoxedDriver, DisplayError> {
        let member = self
            .member(device)
            .ok_or_else(|| DisplayError::DeviceNotFound(options.device_id().to_string()))?;

        let panel = open_panel(self.package, member.module, options).map_err(|e| match e {
            DisplayError::DeviceNotFound(_) => DisplayError::DeviceNotFound(options.device_id().to_string()),
            other => other,
        })?;

        info!("Opened {} ({} family, module {})", options.device_id(), self.name, member.module);
        Ok(Box::new(FamilyDisplay::with_panel(self.descriptor(member), *member, panel)))
    }
}

#[cfg(feature = "plugin-system")]
fn vendor_installed(package: &str) -> bool {
    crate::display::plugin::PluginLoader::is_installed(package)
}

#[cfg(not(feature = "plugin-system"))]
fn vendor_installed(_package: &str) -> bool {
    false
}

#[cfg(feature = "plugin-system")]
fn open_panel(package: &str, module: &str, options: &DeviceOptions<'_>) -> Result<Box<dyn VendorPanel>, DisplayError> {
    crate::display::plugin::open_panel(package, module, options)
}

#[cfg(not(feature = "plugin-system"))]
fn open_panel(package: &str, _module: &str, _options: &DeviceOptions<'_>) -> Result<Box<dyn VendorPanel>, DisplayError> {
    Err(DisplayError::InitializationFailed(format!(
        "{} needs the plugin-system feature", package
    )))
}

/// Display implementation shared by every family
pub struct FamilyDisplay {
    descriptor: CapabilityDescriptor,
    member: FamilyMember,
    panel: Box<dyn VendorPanel>,
}

impl FamilyDisplay {
    pub fn with_panel(descriptor: CapabilityDescriptor, member: FamilyMember, panel: Box<dyn VendorPanel>) -> Self {
        Self { descriptor, member, panel }
    }

    pub fn member(&self) -> &FamilyMember {
        &self.member
    }
}

impl DisplayDriver for FamilyDisplay {
    fn capabilities(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    fn dimensions(&self) -> (u32, u32) {
        self.panel.dimensions()
    }

    fn prepare(&mut self, mode: DisplayMode) -> Result<(), DisplayError> {
        match self.member.init.for_mode(mode) {
            Some(init) => {
                debug!("{}: init {:?}", self.member.name, init);
                self.panel.init(init)
            }
            None => Ok(()),
        }
    }

    fn write_frame(&mut self, frame: &Frame<'_>) -> Result<(), DisplayError> {
        let planes = self.member.layout.planes(frame);
        debug!("{}: showing {} plane(s)", self.member.name, planes.len());
        self.panel.show(&planes)
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        self.panel.sleep()
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.panel.clear()
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        self.panel.close()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shared palette table for the 7-color panels
pub const SEVEN_COLOR_PALETTE: &[[u8; 3]] = &[
    [0, 0, 0],
    [255, 255, 255],
    [0, 255, 0],
    [0, 0, 255],
    [255, 0, 0],
    [255, 255, 0],
    [255, 128, 0],
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::capabilities::{RED, WHITE};
    use image::{DynamicImage, RgbImage};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        inits: Vec<PanelInit>,
        shown: Vec<Vec<Plane>>,
    }

    struct RecordingPanel(Arc<Mutex<Calls>>);

    impl VendorPanel for RecordingPanel {
        fn dimensions(&self) -> (u32, u32) { (4, 2) }
        fn init(&mut self, init: PanelInit) -> Result<(), DisplayError> {
            self.0.lock().unwrap().inits.push(init);
            Ok(())
        }
        fn show(&mut self, planes: &[Plane]) -> Result<(), DisplayError> {
            self.0.lock().unwrap().shown.push(planes.to_vec());
            Ok(())
        }
        fn sleep(&mut self) -> Result<(), DisplayError> { Ok(()) }
        fn clear(&mut self) -> Result<(), DisplayError> { Ok(()) }
        fn close(&mut self) -> Result<(), DisplayError> { Ok(()) }
    }

    const TRI: FamilyMember = FamilyMember::new(
        "epd2in13b",
        &[DisplayMode::Bw, DisplayMode::Red],
        3,
        InitStyle::Plain,
        PlaneLayout::BlackAndAccent,
    ).module("epd2in13bc");

    static TEST_FAMILY: DeviceFamily = DeviceFamily {
        package: "test_vendor_not_installed",
        name: "test",
        members: &[TRI],
    };

    fn display(member: FamilyMember) -> (FamilyDisplay, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let panel = RecordingPanel(Arc::clone(&calls));
        (FamilyDisplay::with_panel(TEST_FAMILY.descriptor(&member), member, Box::new(panel)), calls)
    }

    fn tri_image() -> DynamicImage {
        // black, white, red, white
        let mut img = RgbImage::from_pixel(4, 1, WHITE);
        img.put_pixel(0, 0, BLACK);
        img.put_pixel(2, 0, RED);
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_init_styles() {
        let by_mode = InitStyle::ByMode { gray: 0, other: 1 };
        assert_eq!(by_mode.for_mode(DisplayMode::Gray4), Some(PanelInit::Numbered(0)));
        assert_eq!(by_mode.for_mode(DisplayMode::Bw), Some(PanelInit::Numbered(1)));
        assert_eq!(InitStyle::FourGray.for_mode(DisplayMode::Gray4), Some(PanelInit::Gray4));
        assert_eq!(InitStyle::FourGray.for_mode(DisplayMode::Bw), Some(PanelInit::Plain));
        assert_eq!(InitStyle::None.for_mode(DisplayMode::Color), None);
        assert_eq!(InitStyle::Capitalized.for_mode(DisplayMode::Bw), Some(PanelInit::Capitalized));
    }

    #[test]
    fn test_tri_color_planes() {
        let (mut d, calls) = display(TRI);
        let img = tri_image();
        let palette = [BLACK, WHITE, RED];

        d.prepare(DisplayMode::Red).unwrap();
        d.write_frame(&Frame { image: &img, mode: DisplayMode::Red, palette: &palette }).unwrap();
        d.write_frame(&Frame { image: &img, mode: DisplayMode::Bw, palette: &palette }).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.inits, vec![PanelInit::Plain]);

        let red = &calls.shown[0];
        assert_eq!(red[0].data, vec![0, 255, 255, 255]);
        assert_eq!(red[1].data, vec![255, 255, 0, 255]);

        // accent plane is blank in bw mode
        let bw = &calls.shown[1];
        assert!(bw[1].data.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_ink_index_plane() {
        let member = FamilyMember::new("what_red", &[DisplayMode::Black, DisplayMode::Red], 3, InitStyle::None, PlaneLayout::InkIndices);
        let (mut d, calls) = display(member);
        let palette = [BLACK, WHITE, RED];

        // white, black, red
        let mut img = RgbImage::from_pixel(3, 1, WHITE);
        img.put_pixel(1, 0, BLACK);
        img.put_pixel(2, 0, RED);
        let img = DynamicImage::ImageRgb8(img);

        d.write_frame(&Frame { image: &img, mode: DisplayMode::Red, palette: &palette }).unwrap();
        d.write_frame(&Frame { image: &tri_image(), mode: DisplayMode::Red, palette: &palette }).unwrap();
        d.write_frame(&Frame { image: &img, mode: DisplayMode::Black, palette: &palette[..2] }).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.shown[0][0].data, vec![0, 1, 2]);
        assert_eq!(calls.shown[1][0].data, vec![1, 0, 2, 0]);
        // no accent ink in black mode
        assert!(calls.shown[2][0].data.iter().all(|&i| i < 2));
    }

    #[test]
    fn test_descriptor_and_discovery() {
        let desc = TEST_FAMILY.descriptor(&TRI);
        assert_eq!(desc.supported_devices, vec!["test_vendor_not_installed.epd2in13b".to_string()]);
        assert_eq!(desc.max_colors, 3);
        assert_eq!(desc.default_mode(), DisplayMode::Bw);

        // no vendor library, no devices
        assert!(TEST_FAMILY.device_ids().is_empty());
        assert_eq!(TEST_FAMILY.member("epd2in13b").map(|m| m.module), Some("epd2in13bc"));
    }
}
