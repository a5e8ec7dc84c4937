/*
 *  display/traits.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for display driver abstraction
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

use std::any::Any;

use image::{DynamicImage, Rgb};

use crate::display::capabilities::{CapabilityDescriptor, DisplayMode};
use crate::display::error::DisplayError;

/// A fully processed image, ready for the vendor write
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Output of the image pipeline
    pub image: &'a DynamicImage,

    /// Mode the pipeline reduced the image for
    pub mode: DisplayMode,

    /// Palette the image was quantized against
    pub palette: &'a [Rgb<u8>],
}

/// Minimal hardware abstraction - every display implementation must implement this trait
///
/// Implementations only provide the write hook and whichever lifecycle hooks
/// their hardware supports. Image processing is never their concern: the
/// owning [`EpdDisplay`](crate::display::EpdDisplay) runs the pipeline before
/// calling [`DisplayDriver::write_frame`], and there is no way to reach the
/// write hook around it.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &CapabilityDescriptor;

    /// Returns the panel dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32);

    /// Write a processed frame to the panel
    fn write_frame(&mut self, frame: &Frame<'_>) -> Result<(), DisplayError>;

    /// Run before each update to leave the panel ready to draw
    fn prepare(&mut self, _mode: DisplayMode) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Put the panel into low power state
    fn sleep(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Clear the panel to its blank state
    fn clear(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Release the panel, called when the program is done with it
    fn close(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Downcasting hook, mostly for inspection in tests
    fn as_any(&self) -> &dyn Any;
}
