//! Hosting library loader: binds the four hostfxr entry points exactly once
//! per process.

use crate::ffi::{
    HostfxrCloseFn, HostfxrErrorWriterFn, HostfxrGetRuntimeDelegateFn,
    HostfxrInitializeForRuntimeConfigFn, HostfxrSetErrorWriterFn,
};
use crate::{locator, HostError};
use libloading::{Library, Symbol};
use log::info;
use once_cell::sync::OnceCell;
use std::mem;
use std::path::Path;

/// The four hostfxr exports this bridge needs. A value of this type only
/// exists fully bound; there is no partially usable state.
#[derive(Debug)]
pub struct HostingApi {
    pub(crate) initialize_for_runtime_config: HostfxrInitializeForRuntimeConfigFn,
    pub(crate) get_runtime_delegate: HostfxrGetRuntimeDelegateFn,
    pub(crate) close: HostfxrCloseFn,
    pub(crate) set_error_writer: HostfxrSetErrorWriterFn,
}

impl HostingApi {
    pub fn install_error_writer(&self, writer: Option<HostfxrErrorWriterFn>) {
        unsafe { (self.set_error_writer)(writer) };
    }
}

static HOSTING: OnceCell<HostingApi> = OnceCell::new();

/// Locates, loads and binds hostfxr on first use; later calls return the
/// cached entry points without touching the loader again. Concurrent first
/// calls are serialized by the cell, and a failed attempt leaves it unset.
pub fn ensure_loaded(host_dir: Option<&Path>) -> Result<&'static HostingApi, HostError> {
    HOSTING.get_or_try_init(|| load(host_dir))
}

fn load(host_dir: Option<&Path>) -> Result<HostingApi, HostError> {
    let path = locator::hostfxr_path(host_dir)?;
    let lib = unsafe { Library::new(&path) }.map_err(|source| HostError::HostingLoad {
        path: path.clone(),
        source,
    })?;

    let api = bind_all(&lib)?;
    // Only a fully bound library is kept for the life of the process; a
    // failed bind above drops the handle instead.
    mem::forget(lib);
    info!("hostfxr loaded from {:?}", path);
    Ok(api)
}

fn bind_all(lib: &Library) -> Result<HostingApi, HostError> {
    Ok(HostingApi {
        initialize_for_runtime_config: *bind(lib, "hostfxr_initialize_for_runtime_config")?,
        get_runtime_delegate: *bind(lib, "hostfxr_get_runtime_delegate")?,
        close: *bind(lib, "hostfxr_close")?,
        set_error_writer: *bind(lib, "hostfxr_set_error_writer")?,
    })
}

fn bind<'lib, T>(lib: &'lib Library, symbol: &'static str) -> Result<Symbol<'lib, T>, HostError> {
    unsafe { lib.get(symbol.as_bytes()) }
        .map_err(|source| HostError::HostingExport { symbol, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    // The test binary itself is a loadable module without hostfxr exports.
    #[test]
    fn missing_export_aborts_binding_and_releases_the_library() {
        #[cfg(unix)]
        let lib: Library = libloading::os::unix::Library::this().into();
        #[cfg(windows)]
        let lib: Library = libloading::os::windows::Library::this().unwrap().into();

        let err = bind_all(&lib).unwrap_err();
        assert!(matches!(
            err,
            HostError::HostingExport {
                symbol: "hostfxr_initialize_for_runtime_config",
                ..
            }
        ));
        // `lib` is still owned here and dropped normally on the way out.
    }
}
