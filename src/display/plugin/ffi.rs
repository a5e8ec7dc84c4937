/*
 *  display/plugin/ffi.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  C ABI types for vendor panel libraries
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

//! FFI types for vendor panel libraries
//!
//! These types form the stable ABI between epdkit and a vendor library.
//! Everything is `#[repr(C)]` so either side can be built separately.

use std::ffi::c_char;

use crate::display::drivers::family::{PanelInit, Plane, PlaneFormat};
use crate::display::error::DisplayError;

/// Vendor ABI version
pub const EPDKIT_VENDOR_ABI_VERSION_MAJOR: u32 = 1;
pub const EPDKIT_VENDOR_ABI_VERSION_MINOR: u32 = 0;
pub const EPDKIT_VENDOR_ABI_VERSION_PATCH: u32 = 0;

/// Maximum length for error messages
pub const EPDKIT_ERROR_MESSAGE_SIZE: usize = 256;

/// Maximum length for vendor metadata strings
pub const EPDKIT_VENDOR_NAME_SIZE: usize = 64;
pub const EPDKIT_VENDOR_VERSION_SIZE: usize = 32;
pub const EPDKIT_VENDOR_PACKAGE_SIZE: usize = 32;

/// Opaque handle to one panel instance inside a vendor library
#[repr(C)]
pub struct EpdkitPanelHandle {
    _private: [u8; 0],
}

/// Error codes returned by vendor functions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpdkitErrorCode {
    /// Operation completed successfully
    Success = 0,

    /// Generic error
    ErrorGeneric = 1,

    /// Invalid argument passed to function
    ErrorInvalidArgument = 2,

    /// Unsupported operation for this panel
    ErrorUnsupportedOperation = 3,

    /// SPI/GPIO communication error
    ErrorCommunication = 4,

    /// Panel failed to come up
    ErrorInitialization = 5,

    /// Null pointer passed where non-null expected
    ErrorNullPointer = 6,

    /// Panic occurred in vendor code
    ErrorPanic = 7,

    /// Library does not provide the requested driver module
    ErrorModuleNotFound = 8,
}

/// Error information structure
#[repr(C)]
pub struct EpdkitError {
    pub code: EpdkitErrorCode,

    /// Human-readable error message (null-terminated)
    pub message: [c_char; EPDKIT_ERROR_MESSAGE_SIZE],
}

impl EpdkitError {
    pub fn new(code: EpdkitErrorCode, message: &str) -> Self {
        let mut error = Self {
            code,
            message: [0; EPDKIT_ERROR_MESSAGE_SIZE],
        };

        let bytes = message.as_bytes();
        let len = bytes.len().min(EPDKIT_ERROR_MESSAGE_SIZE - 1);
        for (i, &byte) in bytes.iter().take(len).enumerate() {
            error.message[i] = byte as c_char;
        }

        error
    }

    pub fn success() -> Self {
        Self::new(EpdkitErrorCode::Success, "")
    }

    /// Extract error message as Rust string
    pub fn message_str(&self) -> String {
        c_buffer_to_string(&self.message)
    }
}

impl Default for EpdkitError {
    fn default() -> Self {
        Self::success()
    }
}

impl From<EpdkitError> for DisplayError {
    fn from(error: EpdkitError) -> Self {
        let message = error.message_str();

        match error.code {
            EpdkitErrorCode::Success => DisplayError::Driver("no error".to_string()),
            EpdkitErrorCode::ErrorUnsupportedOperation => DisplayError::UnsupportedOperation,
            EpdkitErrorCode::ErrorInitialization => DisplayError::InitializationFailed(message),
            EpdkitErrorCode::ErrorModuleNotFound => DisplayError::DeviceNotFound(message),
            _ => DisplayError::Driver(message),
        }
    }
}

/// One `key = value` device option, both null-terminated
#[repr(C)]
pub struct EpdkitOption {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// Initialisation sequence requested from the panel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpdkitInitKind {
    /// `init()`
    Plain = 0,

    /// `init(lut_full_update)`
    FullUpdateLut = 1,

    /// `init(FULL_UPDATE)`
    FullUpdateMode = 2,

    /// `Init_4Gray()`
    Gray4 = 3,

    /// `init(param)`
    Numbered = 4,

    /// `Init()`, capitalised API (`Display`, `Sleep`, `Clear`)
    Capitalized = 5,
}

/// Convert a panel init request to its (kind, param) pair
pub fn init_to_ffi(init: PanelInit) -> (EpdkitInitKind, i32) {
    match init {
        PanelInit::Plain => (EpdkitInitKind::Plain, 0),
        PanelInit::FullUpdateLut => (EpdkitInitKind::FullUpdateLut, 0),
        PanelInit::FullUpdateMode => (EpdkitInitKind::FullUpdateMode, 0),
        PanelInit::Gray4 => (EpdkitInitKind::Gray4, 0),
        PanelInit::Numbered(n) => (EpdkitInitKind::Numbered, n),
        PanelInit::Capitalized => (EpdkitInitKind::Capitalized, 0),
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpdkitPlaneFormat {
    /// One byte per pixel
    Luma8 = 0,

    /// Three bytes per pixel
    Rgb8 = 1,
}

impl From<PlaneFormat> for EpdkitPlaneFormat {
    fn from(format: PlaneFormat) -> Self {
        match format {
            PlaneFormat::Luma8 => EpdkitPlaneFormat::Luma8,
            PlaneFormat::Rgb8 => EpdkitPlaneFormat::Rgb8,
        }
    }
}

/// Borrowed view of one image plane, valid for the duration of the call
#[repr(C)]
pub struct EpdkitPlane {
    pub format: EpdkitPlaneFormat,
    pub width: u32,
    pub height: u32,
    pub data: *const u8,
    pub length: usize,
}

impl From<&Plane> for EpdkitPlane {
    fn from(plane: &Plane) -> Self {
        Self {
            format: plane.format.into(),
            width: plane.width,
            height: plane.height,
            data: plane.data.as_ptr(),
            length: plane.data.len(),
        }
    }
}

/// Vendor vtable - function pointers for all panel operations
#[repr(C)]
pub struct EpdkitVendorVTable {
    /// Get vendor ABI version (major, minor, patch)
    pub abi_version: extern "C" fn(
        major: *mut u32,
        minor: *mut u32,
        patch: *mut u32
    ),

    /// Get vendor metadata (name, version, package)
    pub plugin_info: extern "C" fn(
        name: *mut c_char,
        version: *mut c_char,
        package: *mut c_char
    ),

    /// Open the panel driven by `module`, e.g. "epd2in13bc"
    pub create: extern "C" fn(
        module: *const c_char,
        options: *const EpdkitOption,
        option_count: usize,
        handle: *mut *mut EpdkitPanelHandle,
        error: *mut EpdkitError
    ) -> EpdkitErrorCode,

    /// Release a panel instance
    pub destroy: extern "C" fn(
        handle: *mut EpdkitPanelHandle
    ),

    /// Native panel size
    pub dimensions: extern "C" fn(
        handle: *const EpdkitPanelHandle,
        width: *mut u32,
        height: *mut u32,
        error: *mut EpdkitError
    ) -> EpdkitErrorCode,

    pub init: extern "C" fn(
        handle: *mut EpdkitPanelHandle,
        kind: EpdkitInitKind,
        param: i32,
        error: *mut EpdkitError
    ) -> EpdkitErrorCode,

    /// Push one frame (one or two planes)
    pub show: extern "C" fn(
        handle: *mut EpdkitPanelHandle,
        planes: *const EpdkitPlane,
        count: usize,
        error: *mut EpdkitError
    ) -> EpdkitErrorCode,

    pub sleep: extern "C" fn(
        handle: *mut EpdkitPanelHandle,
        error: *mut EpdkitError
    ) -> EpdkitErrorCode,

    pub clear: extern "C" fn(
        handle: *mut EpdkitPanelHandle,
        error: *mut EpdkitError
    ) -> EpdkitErrorCode,

    /// Shut the panel down and release GPIO/SPI
    pub close: extern "C" fn(
        handle: *mut EpdkitPanelHandle,
        error: *mut EpdkitError
    ) -> EpdkitErrorCode,
}

/// Registration function type
///
/// Each vendor library must export a function with this signature:
/// ```c
/// #[no_mangle]
/// pub extern "C" fn epdkit_vendor_register() -> *const EpdkitVendorVTable
/// ```
pub type VendorRegisterFn = extern "C" fn() -> *const EpdkitVendorVTable;

/// Symbol every vendor library exports
pub const VENDOR_REGISTER_SYMBOL: &[u8] = b"epdkit_vendor_register\0";

/// Extract a null-terminated string from a C buffer
pub fn c_buffer_to_string(buffer: &[c_char]) -> String {
    let len = buffer.iter()
        .position(|&c| c == 0)
        .unwrap_or(buffer.len());

    let bytes: Vec<u8> = buffer[..len]
        .iter()
        .map(|&c| c as u8)
        .collect();

    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_truncated() {
        let long = "x".repeat(EPDKIT_ERROR_MESSAGE_SIZE * 2);
        let err = EpdkitError::new(EpdkitErrorCode::ErrorGeneric, &long);
        assert_eq!(err.message_str().len(), EPDKIT_ERROR_MESSAGE_SIZE - 1);
    }

    #[test]
    fn test_error_code_mapping() {
        let missing = EpdkitError::new(EpdkitErrorCode::ErrorModuleNotFound, "epd9in99");
        assert!(matches!(DisplayError::from(missing), DisplayError::DeviceNotFound(m) if m == "epd9in99"));

        let init = EpdkitError::new(EpdkitErrorCode::ErrorInitialization, "busy pin stuck");
        assert!(matches!(DisplayError::from(init), DisplayError::InitializationFailed(_)));

        let comms = EpdkitError::new(EpdkitErrorCode::ErrorCommunication, "spi");
        assert!(matches!(DisplayError::from(comms), DisplayError::Driver(_)));
    }

    #[test]
    fn test_init_kinds() {
        assert_eq!(init_to_ffi(PanelInit::Numbered(1)), (EpdkitInitKind::Numbered, 1));
        assert_eq!(init_to_ffi(PanelInit::Gray4).0, EpdkitInitKind::Gray4);
        assert_eq!(init_to_ffi(PanelInit::Capitalized), (EpdkitInitKind::Capitalized, 0));
    }
}
