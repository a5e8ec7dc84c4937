/*
 *  display/pipeline/enhance.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Contrast, brightness and sharpness enhancement
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

//! Every enhancement blends the image against a degenerate version of
//! itself: `out = degenerate + factor * (image - degenerate)`. A factor of
//! 1.0 returns the image unchanged, 0.0 returns the degenerate image and
//! anything above 1.0 extrapolates away from it.

use image::{Rgb, RgbImage};

use super::quantize::luma;

/// Blend against a flat image of the mean gray level
pub fn contrast(image: &RgbImage, factor: f64) -> RgbImage {
    let pixels = (image.width() as u64 * image.height() as u64).max(1);
    let total: u64 = image.pixels().map(|p| luma(p) as u64).sum();
    let mean = (total as f64 / pixels as f64 + 0.5).floor();

    let mut out = image.clone();
    for p in out.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = blend(mean, *c as f64, factor);
        }
    }
    out
}

/// Blend against black
pub fn brightness(image: &RgbImage, factor: f64) -> RgbImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = blend(0.0, *c as f64, factor);
        }
    }
    out
}

/// Blend against a smoothed copy
pub fn sharpness(image: &RgbImage, factor: f64) -> RgbImage {
    let smoothed = smooth(image);
    let mut out = image.clone();
    for (x, y, p) in out.enumerate_pixels_mut() {
        let s = smoothed.get_pixel(x, y);
        for ch in 0..3 {
            p[ch] = blend(s[ch] as f64, p[ch] as f64, factor);
        }
    }
    out
}

fn blend(degenerate: f64, value: f64, factor: f64) -> u8 {
    (degenerate + factor * (value - degenerate)).round().clamp(0.0, 255.0) as u8
}

/// 3x3 smoothing kernel (centre weight 5, neighbours 1). Edge pixels are
/// copied through untouched.
fn smooth(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut out = image.clone();
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = [0u32; 3];
            for ky in 0..3 {
                for kx in 0..3 {
                    let weight = if kx == 1 && ky == 1 { 5 } else { 1 };
                    let p = image.get_pixel(x + kx - 1, y + ky - 1);
                    for ch in 0..3 {
                        acc[ch] += p[ch] as u32 * weight;
                    }
                }
            }
            out.put_pixel(x, y, Rgb(acc.map(|v| ((v as f64) / 13.0).round() as u8)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> RgbImage {
        RgbImage::from_fn(8, 8, |x, y| {
            let v = (x * 30 + y * 2) as u8;
            Rgb([v, v, v])
        })
    }

    #[test]
    fn test_unit_factor_is_identity() {
        let img = gradient();
        assert_eq!(contrast(&img, 1.0), img);
        assert_eq!(brightness(&img, 1.0), img);
        assert_eq!(sharpness(&img, 1.0), img);
    }

    #[test]
    fn test_brightness_scales_and_clamps() {
        let img = RgbImage::from_pixel(2, 2, Rgb([100, 200, 50]));
        let out = brightness(&img, 1.5);
        assert_eq!(out.get_pixel(0, 0), &Rgb([150, 255, 75]));
        assert_eq!(brightness(&img, 0.0).get_pixel(1, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_zero_contrast_is_flat_mean() {
        let mut img = RgbImage::from_pixel(2, 1, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let out = contrast(&img, 0.0);
        assert_eq!(out.get_pixel(0, 0), out.get_pixel(1, 0));
        assert_eq!(out.get_pixel(0, 0)[0], 128);
    }

    #[test]
    fn test_sharpness_keeps_edges() {
        let img = gradient();
        let out = sharpness(&img, 2.0);
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(0, 0));
        assert_eq!(out.get_pixel(7, 7), img.get_pixel(7, 7));
    }
}
