//! ABI surface shared with the hosting collaborators (nethost, hostfxr) and
//! the managed shim. Every dynamically resolved symbol gets a typed alias
//! here; an untyped pointer never travels further than the call that
//! resolves it.

use std::ffi::c_void;

/// Host character type. The hosting ABI this bridge targets is UTF-16.
pub type CharT = u16;

/// Opaque hostfxr context handle.
pub type HostfxrHandle = *mut c_void;

/// `hostfxr_initialize_parameters`.
#[repr(C)]
pub struct HostfxrInitializeParameters {
    pub size: usize,
    pub host_path: *const CharT,
    pub dotnet_root: *const CharT,
}

// hostfxr and nethost exports use the C calling convention; delegates handed
// back by the runtime use `extern "system"`.

pub type HostfxrInitializeForRuntimeConfigFn = unsafe extern "C" fn(
    runtime_config_path: *const CharT,
    parameters: *const HostfxrInitializeParameters,
    host_context_handle: *mut HostfxrHandle,
) -> i32;

pub type HostfxrGetRuntimeDelegateFn = unsafe extern "C" fn(
    host_context_handle: HostfxrHandle,
    delegate_type: i32,
    delegate: *mut *mut c_void,
) -> i32;

pub type HostfxrCloseFn = unsafe extern "C" fn(host_context_handle: HostfxrHandle) -> i32;

pub type HostfxrErrorWriterFn = unsafe extern "C" fn(message: *const CharT);

pub type HostfxrSetErrorWriterFn =
    unsafe extern "C" fn(error_writer: Option<HostfxrErrorWriterFn>) -> Option<HostfxrErrorWriterFn>;

pub type GetHostfxrPathFn = unsafe extern "C" fn(
    buffer: *mut CharT,
    buffer_size: *mut usize,
    parameters: *const c_void,
) -> i32;

/// `hostfxr_delegate_type::hdt_load_assembly_and_get_function_pointer`.
pub const HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER: i32 = 5;

/// Runtime delegate that loads a managed assembly and resolves a static
/// method in it as a native function pointer.
pub type LoadAssemblyAndGetFunctionPointerFn = unsafe extern "system" fn(
    assembly_path: *const CharT,
    type_name: *const CharT,
    method_name: *const CharT,
    delegate_type_name: *const CharT,
    reserved: *mut c_void,
    delegate: *mut *mut c_void,
) -> i32;

/// Status codes crossing the COM boundary. The `0x8000_80xx` values are the
/// documented dotnet host error codes; `CLASS_E_CLASSNOTAVAILABLE` is the
/// standard COM status for a class this module cannot serve.
pub mod status {
    pub const SUCCESS: i32 = 0;
    pub const SUCCESS_HOST_ALREADY_INITIALIZED: i32 = 1;
    pub const SUCCESS_DIFFERENT_RUNTIME_PROPERTIES: i32 = 2;

    pub const CORE_HOST_LIB_LOAD_FAILURE: i32 = 0x8000_8082_u32 as i32;
    pub const CORE_HOST_LIB_MISSING_FAILURE: i32 = 0x8000_8083_u32 as i32;
    pub const CORE_HOST_ENTRY_POINT_FAILURE: i32 = 0x8000_8084_u32 as i32;
    pub const CORE_HOST_CUR_HOST_FIND_FAILURE: i32 = 0x8000_8085_u32 as i32;
    pub const HOST_API_FAILED: i32 = 0x8000_8097_u32 as i32;
    pub const HOST_API_BUFFER_TOO_SMALL: i32 = 0x8000_8098_u32 as i32;
    pub const HOST_INVALID_STATE: i32 = 0x8000_80a3_u32 as i32;

    pub const CLASS_E_CLASSNOTAVAILABLE: i32 = 0x8004_0111_u32 as i32;
}

/// Nul-terminated wide copy of an OS string, for handing to the host ABI.
#[cfg(windows)]
pub fn wide(s: &std::ffi::OsStr) -> Vec<CharT> {
    use std::os::windows::ffi::OsStrExt;
    s.encode_wide().chain(std::iter::once(0)).collect()
}

#[cfg(not(windows))]
pub fn wide(s: &std::ffi::OsStr) -> Vec<CharT> {
    s.to_string_lossy().encode_utf16().chain(std::iter::once(0)).collect()
}

#[cfg(windows)]
pub fn path_from_wide(buffer: &[CharT]) -> std::path::PathBuf {
    use std::os::windows::ffi::OsStringExt;
    std::ffi::OsString::from_wide(buffer).into()
}

#[cfg(not(windows))]
pub fn path_from_wide(buffer: &[CharT]) -> std::path::PathBuf {
    String::from_utf16_lossy(buffer).into()
}
