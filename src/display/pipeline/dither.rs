/*
 *  display/pipeline/dither.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  External dithering through the didder executable
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

use std::io::{self, Cursor, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use image::{DynamicImage, ImageFormat, Rgb};
use log::debug;
use thiserror::Error;

use crate::display::palette::format_palette;

/// Executable used unless `dither_command` says otherwise
pub const DEFAULT_DITHER_COMMAND: &str = "didder";

const DEFAULT_BAYER_SIZE: &str = "4x4";
const DEFAULT_RANDOM_RANGE: &str = "-0.5,0.5";

pub const ORDERED_MATRICES: &[&str] = &[
    "ClusteredDot4x4",
    "ClusteredDot6x6",
    "ClusteredDot6x6_2",
    "ClusteredDot6x6_3",
    "ClusteredDot8x8",
    "ClusteredDotDiagonal16x16",
    "ClusteredDotDiagonal6x6",
    "ClusteredDotDiagonal8x8",
    "ClusteredDotDiagonal8x8_2",
    "ClusteredDotDiagonal8x8_3",
    "ClusteredDotHorizontalLine",
    "ClusteredDotSpiral5x5",
    "ClusteredDotVerticalLine",
    "Horizontal3x5",
    "Vertical5x3",
];

pub const DIFFUSION_MATRICES: &[&str] = &[
    "Simple2D",
    "FloydSteinberg",
    "FalseFloydSteinberg",
    "JarvisJudiceNinke",
    "Atkinson",
    "Stucki",
    "Burkes",
    "Sierra",
    "Sierra3",
    "TwoRowSierra",
    "Sierra2",
    "SierraLite",
    "Sierra2_4A",
    "StevenPigeon",
];

#[derive(Debug, Error)]
pub enum DitherError {
    #[error("Unknown dither '{0}'")]
    Unknown(String),

    #[error("Invalid custom dither matrix: {0}")]
    Matrix(String),

    #[error("Failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Exit {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Dither pipe error: {0}")]
    Io(#[from] io::Error),

    #[error("Dither image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Dither family, mapped onto a didder sub-command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DitherMethod {
    /// Built-in ordered matrix (`odm NAME`)
    Ordered(String),

    /// Built-in error diffusion matrix (`edm NAME`)
    Diffusion(String),

    /// Bayer matrix (`bayer WxH`)
    Bayer,

    /// Random threshold (`random min,max`)
    Random,

    /// User matrix shaped as a JSON object, inline or in a file
    CustomOrdered(String),

    /// User matrix shaped as a JSON array, inline or in a file
    CustomDiffusion(String),
}

impl DitherMethod {
    /// Resolve a configured `dither` value. Built-in names match case-insensitively.
    pub fn resolve(name: &str) -> Result<Self, DitherError> {
        let name = name.trim();
        if let Some(m) = find_name(ORDERED_MATRICES, name) {
            return Ok(DitherMethod::Ordered(m.to_string()));
        }
        if let Some(m) = find_name(DIFFUSION_MATRICES, name) {
            return Ok(DitherMethod::Diffusion(m.to_string()));
        }
        if name.eq_ignore_ascii_case("bayer") {
            return Ok(DitherMethod::Bayer);
        }
        if name.eq_ignore_ascii_case("random") {
            return Ok(DitherMethod::Random);
        }

        let json = if name.starts_with('{') || name.starts_with('[') {
            name.to_string()
        } else if Path::new(name).is_file() {
            std::fs::read_to_string(name)?
        } else {
            return Err(DitherError::Unknown(name.to_string()));
        };

        match serde_json::from_str::<serde_json::Value>(&json) {
            Ok(serde_json::Value::Object(_)) => Ok(DitherMethod::CustomOrdered(name.to_string())),
            Ok(serde_json::Value::Array(_)) => Ok(DitherMethod::CustomDiffusion(name.to_string())),
            Ok(_) => Err(DitherError::Matrix(format!("{} is neither an object nor an array", name))),
            Err(e) => Err(DitherError::Matrix(e.to_string())),
        }
    }
}

fn find_name(table: &[&'static str], name: &str) -> Option<&'static str> {
    table.iter().copied().find(|m| m.eq_ignore_ascii_case(name))
}

/// Everything needed to run one external dither
#[derive(Debug, Clone, PartialEq)]
pub struct DitherSpec {
    /// Configured `dither` value, resolved when the dither runs
    pub name: String,
    pub strength: Option<f64>,
    pub args: Option<String>,
    pub serpentine: bool,
    pub command: String,
}

impl DitherSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            strength: None,
            args: None,
            serpentine: false,
            command: DEFAULT_DITHER_COMMAND.to_string(),
        }
    }

    /// Command line arguments, without the executable
    pub fn command_args(&self, palette: &[Rgb<u8>]) -> Result<Vec<String>, DitherError> {
        let method = DitherMethod::resolve(&self.name)?;

        let mut args: Vec<String> = vec![
            "--palette".into(),
            format_palette(palette),
            "-i".into(),
            "-".into(),
            "-o".into(),
            "-".into(),
        ];
        if let Some(strength) = self.strength {
            args.push("--strength".into());
            args.push(strength.to_string());
        }

        match method {
            DitherMethod::Ordered(m) | DitherMethod::CustomOrdered(m) => {
                args.push("odm".into());
                args.push(m);
            }
            DitherMethod::Diffusion(m) | DitherMethod::CustomDiffusion(m) => {
                args.push("edm".into());
                if self.serpentine {
                    args.push("--serpentine".into());
                }
                args.push(m);
            }
            DitherMethod::Bayer => {
                args.push("bayer".into());
                args.push(self.args.clone().unwrap_or_else(|| DEFAULT_BAYER_SIZE.into()));
            }
            DitherMethod::Random => {
                let range = self.args.clone().unwrap_or_else(|| DEFAULT_RANDOM_RANGE.into());
                args.push("random".into());
                // negative bounds would otherwise parse as flags
                if range.starts_with('-') {
                    args.push("--".into());
                }
                args.push(range);
            }
        }

        Ok(args)
    }

    /// Pipe `image` through the dither executable and decode its output.
    ///
    /// The image travels as PNG over stdin/stdout. Stdin is fed from a scoped
    /// thread while this thread drains stdout and stderr, so neither side can
    /// stall on a full pipe. Every pipe is closed before this returns.
    pub fn run(&self, image: &DynamicImage, palette: &[Rgb<u8>]) -> Result<DynamicImage, DitherError> {
        let args = self.command_args(palette)?;

        let mut encoded = Vec::new();
        image.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)?;

        debug!("Dithering: {} {}", self.command, args.join(" "));

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DitherError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let (output, written) = thread::scope(|s| {
            let writer = s.spawn(|| match stdin {
                Some(mut pipe) => pipe.write_all(&encoded),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (output, written)
        });

        let output = output?;
        if !output.status.success() {
            return Err(DitherError::Exit {
                command: self.command.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;

        Ok(image::load_from_memory(&output.stdout)?)
    }
}
