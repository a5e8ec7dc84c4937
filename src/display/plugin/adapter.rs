/*
 *  display/plugin/adapter.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Adapter exposing a vendor library panel as a VendorPanel
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

use std::collections::BTreeMap;
use std::ffi::CString;
use std::panic::{self, AssertUnwindSafe};
use log::{debug, error};

use crate::display::drivers::family::{PanelInit, Plane, VendorPanel};
use crate::display::error::DisplayError;
use super::ffi::{
    init_to_ffi,
    EpdkitError,
    EpdkitErrorCode,
    EpdkitOption,
    EpdkitPanelHandle,
    EpdkitPlane,
};
use super::loader::LoadedPlugin;

/// One panel opened through a vendor library
///
/// Every vtable call is wrapped so a panic inside the library becomes an
/// error instead of unwinding across the FFI boundary. The handle is
/// destroyed on drop.
pub struct PluginPanel {
    /// The loaded library (kept alive for vtable access)
    plugin: LoadedPlugin,

    handle: *mut EpdkitPanelHandle,

    /// Vendor driver module the panel was opened with
    module: String,
}

impl PluginPanel {
    /// Open `module` (e.g. "epd2in13bc") with the device section options
    pub fn open(
        plugin: LoadedPlugin,
        module: &str,
        options: &BTreeMap<String, String>,
    ) -> Result<Self, DisplayError> {
        let vtable = plugin.vtable();

        let c_module = to_cstring(module)?;
        let pairs = options
            .iter()
            .map(|(k, v)| Ok((to_cstring(k)?, to_cstring(v)?)))
            .collect::<Result<Vec<_>, DisplayError>>()?;
        let ffi_options: Vec<EpdkitOption> = pairs
            .iter()
            .map(|(k, v)| EpdkitOption { key: k.as_ptr(), value: v.as_ptr() })
            .collect();

        let mut handle: *mut EpdkitPanelHandle = std::ptr::null_mut();
        let mut error = EpdkitError::default();

        let (result, panic_error) = catch_ffi_call(|| {
            (vtable.create)(
                c_module.as_ptr(),
                ffi_options.as_ptr(),
                ffi_options.len(),
                &mut handle,
                &mut error
            )
        });

        if let Some(e) = panic_error {
            return Err(e.into());
        }

        if result != EpdkitErrorCode::Success || handle.is_null() {
            return Err(error.into());
        }

        debug!("Opened {} panel {} at {:p}", plugin.metadata().package, module, handle);

        Ok(Self {
            plugin,
            handle,
            module: module.to_string(),
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn plugin_version(&self) -> &str {
        &self.plugin.metadata().version
    }

    /// Run one vtable call that only reports an error code
    fn call<F>(&mut self, f: F) -> Result<(), DisplayError>
    where
        F: FnOnce(*mut EpdkitPanelHandle, &mut EpdkitError) -> EpdkitErrorCode,
    {
        let handle = self.handle;
        let mut error = EpdkitError::default();

        let (result, panic_error) = catch_ffi_call(|| f(handle, &mut error));

        if let Some(e) = panic_error {
            return Err(e.into());
        }

        if result != EpdkitErrorCode::Success {
            return Err(error.into());
        }

        Ok(())
    }
}

impl VendorPanel for PluginPanel {
    fn dimensions(&self) -> (u32, u32) {
        let vtable = self.plugin.vtable();
        let mut width = 0u32;
        let mut height = 0u32;
        let mut error = EpdkitError::default();

        let (result, panic_error) = catch_ffi_call(|| {
            (vtable.dimensions)(self.handle, &mut width, &mut height, &mut error)
        });

        if panic_error.is_some() || result != EpdkitErrorCode::Success {
            error!("{}: could not read panel size: {}", self.module, error.message_str());
            return (0, 0);
        }

        (width, height)
    }

    fn init(&mut self, init: PanelInit) -> Result<(), DisplayError> {
        let vtable = self.plugin.vtable();
        let (kind, param) = init_to_ffi(init);
        self.call(|handle, error| (vtable.init)(handle, kind, param, error))
    }

    fn show(&mut self, planes: &[Plane]) -> Result<(), DisplayError> {
        let vtable = self.plugin.vtable();
        let ffi_planes: Vec<EpdkitPlane> = planes.iter().map(EpdkitPlane::from).collect();
        self.call(|handle, error| (vtable.show)(handle, ffi_planes.as_ptr(), ffi_planes.len(), error))
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        let vtable = self.plugin.vtable();
        self.call(|handle, error| (vtable.sleep)(handle, error))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let vtable = self.plugin.vtable();
        self.call(|handle, error| (vtable.clear)(handle, error))
    }

    fn close(&mut self) -> Result<(), DisplayError> {
        let vtable = self.plugin.vtable();
        self.call(|handle, error| (vtable.close)(handle, error))
    }
}

impl Drop for PluginPanel {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            debug!("Destroying panel instance: {:p}", self.handle);

            let vtable = self.plugin.vtable();
            let handle = self.handle;
            let _ = catch_ffi_call(|| {
                (vtable.destroy)(handle);
                EpdkitErrorCode::Success
            });

            self.handle = std::ptr::null_mut();
        }
    }
}

// Safety: the handle is only touched through the vtable and a panel is
// owned by exactly one display, so moving it between threads is fine.
unsafe impl Send for PluginPanel {}

fn to_cstring(s: &str) -> Result<CString, DisplayError> {
    CString::new(s).map_err(|_| DisplayError::Driver(format!("'{}' contains a NUL byte", s)))
}

/// Wrap an FFI call with panic safety
///
/// Returns (error_code, error_info)
fn catch_ffi_call<F>(f: F) -> (EpdkitErrorCode, Option<EpdkitError>)
where
    F: FnOnce() -> EpdkitErrorCode,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(code) => (code, None),
        Err(panic_info) => {
            let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                format!("Vendor panic: {}", s)
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                format!("Vendor panic: {}", s)
            } else {
                "Vendor panic: unknown error".to_string()
            };

            error!("Caught panic in vendor FFI call: {}", message);
            let panic_error = EpdkitError::new(EpdkitErrorCode::ErrorPanic, &message);
            (EpdkitErrorCode::ErrorPanic, Some(panic_error))
        }
    }
}
