/*
 *  display/pipeline/geometry.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Rotation and mirroring
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

use image::{DynamicImage, Rgb, RgbImage};

const ANGLE_EPSILON: f64 = 1e-9;

/// Rotate counter-clockwise by `degrees`, growing the canvas to fit.
///
/// Quarter turns are exact pixel permutations; any other angle is resampled
/// (nearest neighbour) onto the rotated bounding box with a black fill.
pub fn rotate(image: &DynamicImage, degrees: f64) -> DynamicImage {
    let angle = degrees.rem_euclid(360.0);

    let quarter = |target: f64| (angle - target).abs() < ANGLE_EPSILON;
    if quarter(0.0) || quarter(360.0) {
        return image.clone();
    }
    if quarter(90.0) {
        return image.rotate270();
    }
    if quarter(180.0) {
        return image.rotate180();
    }
    if quarter(270.0) {
        return image.rotate90();
    }

    DynamicImage::ImageRgb8(rotate_any(&image.to_rgb8(), angle))
}

fn rotate_any(src: &RgbImage, degrees: f64) -> RgbImage {
    let (w, h) = (src.width() as f64, src.height() as f64);
    let (sin, cos) = degrees.to_radians().sin_cos();

    let out_w = (w * cos.abs() + h * sin.abs() - ANGLE_EPSILON).ceil().max(1.0) as u32;
    let out_h = (w * sin.abs() + h * cos.abs() - ANGLE_EPSILON).ceil().max(1.0) as u32;

    let mut out = RgbImage::from_pixel(out_w, out_h, Rgb([0, 0, 0]));
    let (cx, cy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        // inverse mapping: destination centre back into the source
        let dx = x as f64 + 0.5 - cx;
        let dy = y as f64 + 0.5 - cy;
        let sx = (dx * cos - dy * sin + w / 2.0).floor();
        let sy = (dx * sin + dy * cos + h / 2.0).floor();

        if sx >= 0.0 && sy >= 0.0 && sx < w && sy < h {
            *pixel = *src.get_pixel(sx as u32, sy as u32);
        }
    }

    out
}

pub fn flip_horizontal(image: &DynamicImage) -> DynamicImage {
    image.fliph()
}

pub fn flip_vertical(image: &DynamicImage) -> DynamicImage {
    image.flipv()
}
