//! Runtime locator adapter: asks nethost where hostfxr lives.

use crate::ffi::{self, GetHostfxrPathFn};
use crate::HostError;
use libloading::{Library, Symbol};
use log::debug;
use std::path::{Path, PathBuf};
use std::ptr;

#[cfg(target_os = "windows")]
const NETHOST_LIBRARY: &str = "nethost.dll";
#[cfg(target_os = "macos")]
const NETHOST_LIBRARY: &str = "libnethost.dylib";
#[cfg(all(unix, not(target_os = "macos")))]
const NETHOST_LIBRARY: &str = "libnethost.so";

/// Resolves the hostfxr path via `get_hostfxr_path`, preferring a nethost
/// copy shipped next to the host module over the loader's default search.
pub fn hostfxr_path(host_dir: Option<&Path>) -> Result<PathBuf, HostError> {
    let nethost = open_nethost(host_dir)?;
    let get_hostfxr_path: Symbol<GetHostfxrPathFn> =
        unsafe { nethost.get(b"get_hostfxr_path") }.map_err(HostError::NethostUnavailable)?;
    query_hostfxr_path(*get_hostfxr_path)
}

/// Queries with a stack-sized buffer and resizes exactly once to the size
/// nethost reported. nethost promises the reported size is sufficient, so a
/// second buffer-too-small status is a nethost defect and surfaces as-is
/// instead of looping.
fn query_hostfxr_path(get_hostfxr_path: GetHostfxrPathFn) -> Result<PathBuf, HostError> {
    let mut buffer = vec![0u16; 260];
    let mut size = buffer.len();
    let mut rc = unsafe { get_hostfxr_path(buffer.as_mut_ptr(), &mut size, ptr::null()) };
    if rc == ffi::status::HOST_API_BUFFER_TOO_SMALL {
        buffer.resize(size, 0);
        rc = unsafe { get_hostfxr_path(buffer.as_mut_ptr(), &mut size, ptr::null()) };
    }
    if rc != ffi::status::SUCCESS {
        return Err(HostError::HostfxrNotFound(rc));
    }

    // The reported size counts the terminating nul.
    buffer.truncate(size.saturating_sub(1));
    let path = ffi::path_from_wide(&buffer);
    debug!("hostfxr located at {:?}", path);
    Ok(path)
}

fn open_nethost(host_dir: Option<&Path>) -> Result<Library, HostError> {
    if let Some(dir) = host_dir {
        let colocated = dir.join(NETHOST_LIBRARY);
        if colocated.is_file() {
            debug!("using colocated nethost at {:?}", colocated);
            return unsafe { Library::new(&colocated) }.map_err(HostError::NethostUnavailable);
        }
    }
    unsafe { Library::new(NETHOST_LIBRARY) }.map_err(HostError::NethostUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::status;
    use std::cell::Cell;
    use std::ffi::c_void;

    thread_local! {
        static CALLS: Cell<usize> = Cell::new(0);
    }

    fn calls() -> usize {
        CALLS.with(|c| c.get())
    }

    unsafe fn answer(buffer: *mut u16, size: *mut usize, path: &[u16]) -> i32 {
        CALLS.with(|c| c.set(c.get() + 1));
        if *size < path.len() {
            *size = path.len();
            return status::HOST_API_BUFFER_TOO_SMALL;
        }
        ptr::copy_nonoverlapping(path.as_ptr(), buffer, path.len());
        *size = path.len();
        status::SUCCESS
    }

    fn wide_path(len: usize) -> Vec<u16> {
        let name: String = "x".repeat(len);
        format!("fxr/{name}").encode_utf16().chain(std::iter::once(0)).collect()
    }

    unsafe extern "C" fn short_path(buffer: *mut u16, size: *mut usize, _: *const c_void) -> i32 {
        answer(buffer, size, &wide_path(8))
    }

    unsafe extern "C" fn long_path(buffer: *mut u16, size: *mut usize, _: *const c_void) -> i32 {
        answer(buffer, size, &wide_path(400))
    }

    unsafe extern "C" fn never_enough(_: *mut u16, size: *mut usize, _: *const c_void) -> i32 {
        CALLS.with(|c| c.set(c.get() + 1));
        *size *= 2;
        status::HOST_API_BUFFER_TOO_SMALL
    }

    unsafe extern "C" fn no_runtime(_: *mut u16, _: *mut usize, _: *const c_void) -> i32 {
        status::CORE_HOST_LIB_MISSING_FAILURE
    }

    #[test]
    fn short_path_is_answered_on_the_first_query() {
        let path = query_hostfxr_path(short_path).unwrap();
        assert_eq!(path, PathBuf::from("fxr/xxxxxxxx"));
        assert_eq!(calls(), 1);
    }

    #[test]
    fn long_path_resizes_once_to_the_reported_size() {
        let path = query_hostfxr_path(long_path).unwrap();
        assert_eq!(path.as_os_str().len(), 4 + 400);
        assert_eq!(calls(), 2);
    }

    #[test]
    fn repeated_buffer_too_small_is_surfaced_after_one_retry() {
        let err = query_hostfxr_path(never_enough).unwrap_err();
        assert!(matches!(
            err,
            HostError::HostfxrNotFound(status::HOST_API_BUFFER_TOO_SMALL)
        ));
        assert_eq!(calls(), 2);
    }

    #[test]
    fn locator_statuses_travel_verbatim() {
        let err = query_hostfxr_path(no_runtime).unwrap_err();
        assert!(matches!(
            err,
            HostError::HostfxrNotFound(status::CORE_HOST_LIB_MISSING_FAILURE)
        ));
    }
}
