//! Runtime bootstrap: initializes the managed runtime from a configuration
//! file and acquires the load-assembly delegate, once per process.

use crate::ffi::{self, wide, HostfxrHandle, LoadAssemblyAndGetFunctionPointerFn};
use crate::hosting::HostingApi;
use crate::HostError;
use log::{debug, warn};
use once_cell::sync::OnceCell;
use std::ffi::{c_void, OsStr};
use std::mem;
use std::path::Path;
use std::ptr;

static LOAD_ASSEMBLY: OnceCell<LoadAssemblyAndGetFunctionPointerFn> = OnceCell::new();

/// Returns the process-wide load-assembly delegate, bootstrapping the runtime
/// on first use. Once populated the delegate is never reassigned; a failed
/// bootstrap leaves the cell unset so a later activation may try again.
pub fn load_assembly_delegate(
    api: &HostingApi,
    host_path: &Path,
    config_path: Option<&Path>,
) -> Result<LoadAssemblyAndGetFunctionPointerFn, HostError> {
    LOAD_ASSEMBLY
        .get_or_try_init(|| acquire(api, host_path, config_path))
        .copied()
}

fn acquire(
    api: &HostingApi,
    host_path: &Path,
    config_path: Option<&Path>,
) -> Result<LoadAssemblyAndGetFunctionPointerFn, HostError> {
    let host = wide(host_path.as_os_str());
    // An unresolved config goes through as an empty path; hostfxr is the
    // authority on whether that is acceptable.
    let config = wide(config_path.map(Path::as_os_str).unwrap_or(OsStr::new("")));

    let parameters = ffi::HostfxrInitializeParameters {
        size: mem::size_of::<ffi::HostfxrInitializeParameters>(),
        host_path: host.as_ptr(),
        dotnet_root: ptr::null(),
    };

    let mut context: HostfxrHandle = ptr::null_mut();
    let rc = unsafe {
        (api.initialize_for_runtime_config)(config.as_ptr(), &parameters, &mut context)
    };

    let delegate = fetch_delegate(api, rc, context);

    // The context is closed on every path, success or not.
    if !context.is_null() {
        unsafe { (api.close)(context) };
    }

    let delegate = delegate?;
    Ok(unsafe { mem::transmute::<*mut c_void, LoadAssemblyAndGetFunctionPointerFn>(delegate) })
}

fn fetch_delegate(
    api: &HostingApi,
    rc: i32,
    context: HostfxrHandle,
) -> Result<*mut c_void, HostError> {
    match rc {
        ffi::status::SUCCESS => {}
        // A prior activation already initialized a compatible runtime in
        // this process; the context is still usable for delegate acquisition.
        ffi::status::SUCCESS_HOST_ALREADY_INITIALIZED
        | ffi::status::SUCCESS_DIFFERENT_RUNTIME_PROPERTIES => {
            debug!("runtime already initialized in this process ({:#010x})", rc);
        }
        rc => {
            warn!("hostfxr_initialize_for_runtime_config failed: {:#010x}", rc);
            return Err(HostError::RuntimeInit(rc));
        }
    }
    if context.is_null() {
        return Err(HostError::RuntimeInit(ffi::status::HOST_INVALID_STATE));
    }

    let mut delegate: *mut c_void = ptr::null_mut();
    let rc = unsafe {
        (api.get_runtime_delegate)(
            context,
            ffi::HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER,
            &mut delegate,
        )
    };
    if rc != ffi::status::SUCCESS {
        return Err(HostError::DelegateAcquisition(rc));
    }
    if delegate.is_null() {
        // Success status without a delegate is an inconsistent hosting state.
        return Err(HostError::DelegateAcquisition(ffi::status::SUCCESS));
    }
    Ok(delegate)
}
