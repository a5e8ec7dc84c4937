/*
 *  display/palette.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Palette specification parsing
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

//! Palette strings accept any mixture of
//!
//! - hex colors: `#FF0000`, `#f00`
//! - named colors: `black`, `white`, `orange`, ...
//! - RGB triples, bracketed or not: `[255,0,0]`, `255,0,0`
//!
//! so `"#ffffff black [255, 0, 0] 0,0,255"` and `[[0,0,0],[255,255,255]]`
//! are both valid.

use image::Rgb;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("unrecognised color '{0}'")]
    InvalidToken(String),
    #[error("RGB triple has {0} components")]
    IncompleteTriple(usize),
    #[error("palette is empty")]
    Empty,
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("lime", [0, 255, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("navy", [0, 0, 128]),
    ("purple", [128, 0, 128]),
    ("teal", [0, 128, 128]),
    ("aqua", [0, 255, 255]),
    ("cyan", [0, 255, 255]),
    ("fuchsia", [255, 0, 255]),
    ("magenta", [255, 0, 255]),
];

/// Parse a palette specification into a flat color list
pub fn parse_palette(spec: &str) -> Result<Vec<Rgb<u8>>, PaletteError> {
    let mut parser = PaletteParser::default();

    for c in spec.chars() {
        match c {
            '[' => parser.flush_token()?,
            ']' => {
                parser.flush_token()?;
                parser.close_group()?;
            }
            c if c.is_whitespace() || matches!(c, ',' | ';' | '"' | '\'') => parser.flush_token()?,
            c => parser.token.push(c),
        }
    }
    parser.flush_token()?;
    parser.close_group()?;

    if parser.colors.is_empty() {
        return Err(PaletteError::Empty);
    }
    Ok(parser.colors)
}

/// Parse a single `#hex` or named color
pub fn parse_color(token: &str) -> Result<Rgb<u8>, PaletteError> {
    if let Some(hex) = token.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| PaletteError::InvalidToken(token.to_string()));
    }

    let lower = token.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, rgb)| Rgb(*rgb))
        .ok_or_else(|| PaletteError::InvalidToken(token.to_string()))
}

fn parse_hex(hex: &str) -> Option<Rgb<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            Some(Rgb([(v >> 16) as u8, (v >> 8) as u8, v as u8]))
        }
        3 => {
            let v = u32::from_str_radix(hex, 16).ok()?;
            let expand = |n: u32| ((n & 0xF) * 17) as u8;
            Some(Rgb([expand(v >> 8), expand(v >> 4), expand(v)]))
        }
        _ => None,
    }
}

/// Format a palette the way the dither tool expects it (`R,G,B` tokens)
pub fn format_palette(palette: &[Rgb<u8>]) -> String {
    palette
        .iter()
        .map(|c| format!("{},{},{}", c[0], c[1], c[2]))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Default)]
struct PaletteParser {
    token: String,
    pending: Vec<u8>,
    colors: Vec<Rgb<u8>>,
}

impl PaletteParser {
    fn flush_token(&mut self) -> Result<(), PaletteError> {
        if self.token.is_empty() {
            return Ok(());
        }
        let token = std::mem::take(&mut self.token);

        if token.chars().all(|c| c.is_ascii_digit()) {
            let value: u8 = token.parse().map_err(|_| PaletteError::InvalidToken(token.clone()))?;
            self.pending.push(value);
            if self.pending.len() == 3 {
                self.colors.push(Rgb([self.pending[0], self.pending[1], self.pending[2]]));
                self.pending.clear();
            }
            return Ok(());
        }

        // a name in the middle of a triple
        if !self.pending.is_empty() {
            return Err(PaletteError::IncompleteTriple(self.pending.len()));
        }
        self.colors.push(parse_color(&token)?);
        Ok(())
    }

    fn close_group(&mut self) -> Result<(), PaletteError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(PaletteError::IncompleteTriple(self.pending.len()))
        }
    }
}
