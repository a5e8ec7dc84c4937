/*
 *  display/pipeline/quantize.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Color reduction - 1-bit conversion and palette quantization
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

use image::imageops::{self, BiLevel, ColorMap};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::display::capabilities::DisplayMode;

/// Error distribution used while reducing colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diffusion {
    /// Floyd-Steinberg error diffusion
    FloydSteinberg,

    /// Plain nearest color, no diffusion
    None,
}

/// ITU-R 601-2 luma, fixed point
#[inline]
pub fn luma(p: &Rgb<u8>) -> u8 {
    ((p[0] as u32 * 19595 + p[1] as u32 * 38470 + p[2] as u32 * 7471 + 0x8000) >> 16) as u8
}

/// A display palette as an `imageops` color map
#[derive(Debug, Clone, Copy)]
pub struct PaletteMap<'a>(pub &'a [Rgb<u8>]);

impl ColorMap for PaletteMap<'_> {
    type Color = Rgb<u8>;

    fn index_of(&self, color: &Rgb<u8>) -> usize {
        nearest_index(self.0, [color[0] as f32, color[1] as f32, color[2] as f32])
    }

    fn lookup(&self, index: usize) -> Option<Rgb<u8>> {
        self.0.get(index).copied()
    }

    fn has_lookup(&self) -> bool {
        true
    }

    fn map_color(&self, color: &mut Rgb<u8>) {
        if let Some(chosen) = self.lookup(self.index_of(color)) {
            *color = chosen;
        }
    }
}

/// Reduce an image for the given mode.
///
/// Monochrome modes produce an L8 image holding only 0 and 255, every other
/// mode produces an RGB8 image holding only palette colors.
pub fn reduce(
    image: &DynamicImage,
    mode: DisplayMode,
    palette: &[Rgb<u8>],
    diffusion: Diffusion,
) -> DynamicImage {
    if mode.is_monochrome() {
        DynamicImage::ImageLuma8(to_monochrome(&image.to_rgb8(), diffusion))
    } else {
        DynamicImage::ImageRgb8(to_palette(&image.to_rgb8(), palette, diffusion))
    }
}

/// Threshold at 128 on the luma channel
pub fn to_monochrome(image: &RgbImage, diffusion: Diffusion) -> GrayImage {
    let mut gray = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([luma(image.get_pixel(x, y))])
    });
    match diffusion {
        Diffusion::FloydSteinberg => imageops::dither(&mut gray, &BiLevel),
        Diffusion::None => gray.pixels_mut().for_each(|p| BiLevel.map_color(p)),
    }
    gray
}

pub fn to_palette(image: &RgbImage, palette: &[Rgb<u8>], diffusion: Diffusion) -> RgbImage {
    let mut out = image.clone();
    if palette.is_empty() {
        return out;
    }

    let map = PaletteMap(palette);
    match diffusion {
        Diffusion::FloydSteinberg => imageops::dither(&mut out, &map),
        Diffusion::None => out.pixels_mut().for_each(|p| map.map_color(p)),
    }
    out
}

/// Index of the closest palette entry (squared RGB distance, first wins on ties)
pub fn nearest_index(palette: &[Rgb<u8>], color: [f32; 3]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::MAX;
    for (i, p) in palette.iter().enumerate() {
        let dist: f32 = (0..3)
            .map(|ch| {
                let d = color[ch] - p[ch] as f32;
                d * d
            })
            .sum();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}
