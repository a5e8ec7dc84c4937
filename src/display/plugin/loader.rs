/*
 *  display/plugin/loader.rs
 *
 *  epdkit - e-paper display abstraction
 *  (c) 2020-26 Stuart Hunter
 *
 *  Vendor library discovery and loading
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

use std::ffi::{c_char, OsString};
use std::path::{Path, PathBuf};
use libloading::{Library, Symbol};
use log::{debug, info, warn};

use crate::display::error::DisplayError;
use super::ffi::{
    c_buffer_to_string,
    EpdkitVendorVTable,
    VendorRegisterFn,
    VENDOR_REGISTER_SYMBOL,
    EPDKIT_VENDOR_ABI_VERSION_MAJOR,
    EPDKIT_VENDOR_ABI_VERSION_MINOR,
    EPDKIT_VENDOR_ABI_VERSION_PATCH,
    EPDKIT_VENDOR_NAME_SIZE,
    EPDKIT_VENDOR_VERSION_SIZE,
    EPDKIT_VENDOR_PACKAGE_SIZE,
};

/// Environment variable that puts an extra directory first in the search order
pub const VENDOR_PATH_ENV: &str = "EPDKIT_VENDOR_PATH";

/// Vendor metadata read from the library
#[derive(Debug, Clone)]
pub struct PluginMetadata {
    /// Library name (e.g., "Waveshare e-Paper")
    pub name: String,

    /// Library version (e.g., "1.0.0")
    pub version: String,

    /// Package it serves (e.g., "waveshare_epd")
    pub package: String,

    /// ABI version (major, minor, patch)
    pub abi_version: (u32, u32, u32),
}

/// A loaded vendor library with its vtable
pub struct LoadedPlugin {
    /// The loaded shared library (must be kept alive)
    #[allow(dead_code)]
    library: Library,

    vtable: &'static EpdkitVendorVTable,

    metadata: PluginMetadata,
}

impl LoadedPlugin {
    pub fn vtable(&self) -> &'static EpdkitVendorVTable {
        self.vtable
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }
}

/// Fixed vendor library directories, after `$EPDKIT_VENDOR_PATH`.
/// `None` marks the per-user directory under the home directory.
const VENDOR_DIRS: &[Option<&str>] = &[
    Some("./target/release/vendors"),
    None,
    Some("/usr/local/lib/epdkit/vendors"),
    Some("/usr/lib/epdkit/vendors"),
];

const USER_VENDOR_DIR: &str = ".local/lib/epdkit/vendors";

/// Finds and opens `libepdkit_<package>` vendor libraries
pub struct PluginLoader;

impl PluginLoader {
    /// Directories searched, first hit wins
    pub fn search_paths() -> Vec<PathBuf> {
        let env_dir = std::env::var_os(VENDOR_PATH_ENV).map(PathBuf::from);
        let home = dirs_next::home_dir();

        env_dir
            .into_iter()
            .chain(VENDOR_DIRS.iter().filter_map(|dir| match dir {
                Some(dir) => Some(PathBuf::from(dir)),
                None => home.as_ref().map(|h| h.join(USER_VENDOR_DIR)),
            }))
            .collect()
    }

    /// Platform file name of a package's library, `libepdkit_waveshare_epd.so` on Linux
    pub fn library_filename(package: &str) -> OsString {
        libloading::library_filename(format!("epdkit_{}", package))
    }

    pub fn find_library(package: &str) -> Option<PathBuf> {
        let filename = Self::library_filename(package);
        let found = Self::search_paths()
            .into_iter()
            .map(|dir| dir.join(&filename))
            .find(|path| path.is_file());

        match &found {
            Some(path) => debug!("{} vendor library: {}", package, path.display()),
            None => debug!("No vendor library for {}", package),
        }
        found
    }

    /// Whether a library for `package` is present. Never loads it.
    pub fn is_installed(package: &str) -> bool {
        Self::find_library(package).is_some()
    }

    /// Open a vendor library, check its ABI and read its metadata
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LoadedPlugin, DisplayError> {
        let path = path.as_ref();
        info!("Loading vendor library {}", path.display());

        let library = unsafe { Library::new(path) }.map_err(|e| {
            DisplayError::InitializationFailed(format!("Failed to load {}: {}", path.display(), e))
        })?;

        let register: Symbol<VendorRegisterFn> = unsafe { library.get(VENDOR_REGISTER_SYMBOL) }
            .map_err(|e| DisplayError::InitializationFailed(format!(
                "{} has no vendor registration: {}", path.display(), e
            )))?;

        let vtable_ptr = register();
        if vtable_ptr.is_null() {
            return Err(DisplayError::InitializationFailed(format!(
                "{} registered no panel interface", path.display()
            )));
        }
        let vtable: &'static EpdkitVendorVTable = unsafe { &*vtable_ptr };

        let (mut major, mut minor, mut patch) = (0u32, 0u32, 0u32);
        (vtable.abi_version)(&mut major, &mut minor, &mut patch);
        check_abi((major, minor, patch))?;

        let metadata = read_metadata(vtable, (major, minor, patch));
        info!("Loaded {} v{} for {}", metadata.name, metadata.version, metadata.package);

        Ok(LoadedPlugin { library, vtable, metadata })
    }

    /// Find and open the library serving `package`
    pub fn load_by_package(package: &str) -> Result<LoadedPlugin, DisplayError> {
        let path = Self::find_library(package).ok_or_else(|| {
            DisplayError::InitializationFailed(format!("No vendor library for {}", package))
        })?;
        Self::load(path)
    }
}

/// Same major version required, a newer minor only warns
fn check_abi((major, minor, patch): (u32, u32, u32)) -> Result<(), DisplayError> {
    let host = format!(
        "{}.{}.{}",
        EPDKIT_VENDOR_ABI_VERSION_MAJOR, EPDKIT_VENDOR_ABI_VERSION_MINOR, EPDKIT_VENDOR_ABI_VERSION_PATCH
    );
    if major != EPDKIT_VENDOR_ABI_VERSION_MAJOR {
        return Err(DisplayError::InitializationFailed(format!(
            "vendor ABI {}.{}.{} is incompatible with {}", major, minor, patch, host
        )));
    }
    if minor > EPDKIT_VENDOR_ABI_VERSION_MINOR {
        warn!("vendor ABI {}.{}.{} is newer than {}", major, minor, patch, host);
    }
    Ok(())
}

fn read_metadata(vtable: &EpdkitVendorVTable, abi_version: (u32, u32, u32)) -> PluginMetadata {
    let mut name = vec![0 as c_char; EPDKIT_VENDOR_NAME_SIZE];
    let mut version = vec![0 as c_char; EPDKIT_VENDOR_VERSION_SIZE];
    let mut package = vec![0 as c_char; EPDKIT_VENDOR_PACKAGE_SIZE];

    (vtable.plugin_info)(name.as_mut_ptr(), version.as_mut_ptr(), package.as_mut_ptr());

    PluginMetadata {
        name: c_buffer_to_string(&name),
        version: c_buffer_to_string(&version),
        package: c_buffer_to_string(&package),
        abi_version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_paths() {
        let paths = PluginLoader::search_paths();
        assert!(paths.iter().any(|p| p.ends_with("target/release/vendors")));
        assert_eq!(paths.last().map(PathBuf::as_path), Some(Path::new("/usr/lib/epdkit/vendors")));
    }

    #[test]
    fn test_library_filename() {
        let name = PluginLoader::library_filename("waveshare_epd");

        #[cfg(target_os = "linux")]
        assert_eq!(name, OsString::from("libepdkit_waveshare_epd.so"));

        #[cfg(target_os = "windows")]
        assert_eq!(name, OsString::from("epdkit_waveshare_epd.dll"));
    }

    #[test]
    fn test_missing_package_not_installed() {
        assert!(!PluginLoader::is_installed("no_such_vendor_package"));
        assert!(PluginLoader::load_by_package("no_such_vendor_package").is_err());
    }

    #[test]
    fn test_abi_versions() {
        assert!(check_abi((EPDKIT_VENDOR_ABI_VERSION_MAJOR, EPDKIT_VENDOR_ABI_VERSION_MINOR, 7)).is_ok());
        assert!(check_abi((EPDKIT_VENDOR_ABI_VERSION_MAJOR, EPDKIT_VENDOR_ABI_VERSION_MINOR + 1, 0)).is_ok());
        assert!(matches!(
            check_abi((EPDKIT_VENDOR_ABI_VERSION_MAJOR + 1, 0, 0)),
            Err(DisplayError::InitializationFailed(_))
        ));
    }

    #[test]
    fn test_garbage_library_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PluginLoader::library_filename("broken"));
        std::fs::write(&path, b"not a shared object").unwrap();

        assert!(matches!(PluginLoader::load(&path), Err(DisplayError::InitializationFailed(_))));
    }
}
