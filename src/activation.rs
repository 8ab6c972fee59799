//! Activation forwarder: the externally callable COM surface. Orchestrates
//! locator, hosting loader, resolver and bootstrap, then tail-delegates to
//! the managed shim.

use crate::ffi::{self, wide, LoadAssemblyAndGetFunctionPointerFn};
use crate::{bootstrap, diagnostics, hosting, marshaling, resolver, HostError};
use log::{debug, warn};
use std::ffi::{c_void, OsStr, OsString};
use std::mem::{self, ManuallyDrop};
use std::os::windows::ffi::OsStringExt;
use std::path::PathBuf;
use std::ptr;
use windows::core::{HRESULT, HSTRING, PCWSTR};
use windows::Win32::Foundation::{HMODULE, S_FALSE};
use windows::Win32::System::LibraryLoader::{
    GetModuleFileNameW, GetModuleHandleExW, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
    GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
};

// The shim contract is fixed; none of these derive from the class identifier.
const SHIM_MODULE: &str = "WinRT.Host.Shim.dll";
const SHIM_TYPE: &str = "WinRT.Module, WinRT.Host.Shim";
const SHIM_METHOD: &str = "GetActivationFactory";
const SHIM_DELEGATE_TYPE: &str = "WinRT.Module+GetActivationFactoryDelegate, WinRT.Host.Shim";

/// Shim export performing the actual activation for a resolved target.
type GetActivationFactoryFn = unsafe extern "system" fn(
    target: ManuallyDrop<HSTRING>,
    class_id: ManuallyDrop<HSTRING>,
    factory: *mut *mut c_void,
) -> HRESULT;

/// COM entry point: resolves and activates the factory for `class_id`.
/// The caller retains ownership of the class identifier; `factory` is only
/// written by the shim on its own success path.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "system" fn DllGetActivationFactory(
    class_id: ManuallyDrop<HSTRING>,
    factory: *mut *mut c_void,
) -> HRESULT {
    diagnostics::init();
    match activate(&class_id, factory) {
        Ok(hr) => hr,
        Err(err) => {
            warn!("activation failed: {err}");
            HRESULT(err.status_code())
        }
    }
}

/// The bridge never permits unload once loaded.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn DllCanUnloadNow() -> HRESULT {
    S_FALSE
}

unsafe fn activate(
    class_id: &HSTRING,
    factory: *mut *mut c_void,
) -> Result<HRESULT, HostError> {
    let host_module = host_module_path()?;
    let api = hosting::ensure_loaded(host_module.parent())?;
    api.install_error_writer(Some(diagnostics::error_writer));

    let class_name = class_id.to_string_lossy();
    debug!("activation requested for {:?} (host {:?})", class_name, host_module);

    let target = resolver::resolve(&host_module, &class_name).into_target(&class_name)?;

    let load_assembly =
        bootstrap::load_assembly_delegate(api, &host_module, target.config.as_deref())?;
    let get_activation_factory = resolve_shim_entry_point(load_assembly)?;

    // The shim identifies the target by the assembly path, extension stripped.
    let target_name = HSTRING::from(target.assembly.with_extension("").as_os_str());
    let hr = get_activation_factory(
        marshaling::borrow_abi(&target_name),
        marshaling::borrow_abi(class_id),
        factory,
    );
    Ok(hr)
}

unsafe fn resolve_shim_entry_point(
    load_assembly: LoadAssemblyAndGetFunctionPointerFn,
) -> Result<GetActivationFactoryFn, HostError> {
    let module = wide(OsStr::new(SHIM_MODULE));
    let type_name = wide(OsStr::new(SHIM_TYPE));
    let method = wide(OsStr::new(SHIM_METHOD));
    let delegate_type = wide(OsStr::new(SHIM_DELEGATE_TYPE));

    let mut entry: *mut c_void = ptr::null_mut();
    let rc = load_assembly(
        module.as_ptr(),
        type_name.as_ptr(),
        method.as_ptr(),
        delegate_type.as_ptr(),
        ptr::null_mut(),
        &mut entry,
    );
    if rc != ffi::status::SUCCESS {
        warn!("shim entry point resolution failed: {:#010x}", rc);
        return Err(HostError::ShimResolution(rc));
    }
    if entry.is_null() {
        return Err(HostError::ShimResolution(ffi::status::SUCCESS));
    }
    Ok(mem::transmute::<*mut c_void, GetActivationFactoryFn>(entry))
}

/// Path of the executing host module, from the address of this module's own
/// entry point.
fn host_module_path() -> Result<PathBuf, HostError> {
    let anchor: unsafe extern "system" fn(ManuallyDrop<HSTRING>, *mut *mut c_void) -> HRESULT =
        DllGetActivationFactory;
    let mut module = HMODULE(0);
    unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            PCWSTR(anchor as *const () as *const u16),
            &mut module,
        )
        .map_err(HostError::HostModule)?;
    }

    let mut buffer = vec![0u16; 260];
    loop {
        let len = unsafe { GetModuleFileNameW(module, &mut buffer) } as usize;
        if len == 0 {
            return Err(HostError::HostModule(windows::core::Error::from_win32()));
        }
        if len < buffer.len() {
            buffer.truncate(len);
            break;
        }
        let grown = buffer.len() * 2;
        buffer = vec![0u16; grown];
    }
    Ok(PathBuf::from(OsString::from_wide(&buffer)))
}
