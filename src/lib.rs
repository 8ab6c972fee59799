//! Native activation bridge for managed WinRT components.
//!
//! Given a runtime class identifier, the bridge locates the managed assembly
//! implementing it next to the host module, bootstraps the .NET runtime via
//! hostfxr, and forwards the activation request to the managed shim. The
//! external surface is the COM pair `DllGetActivationFactory` /
//! `DllCanUnloadNow`; everything else is resolution and bootstrap plumbing.

mod bootstrap;
pub mod ffi;
mod hosting;
mod locator;
mod resolver;

#[cfg(windows)]
mod activation;
#[cfg(windows)]
mod diagnostics;
#[cfg(windows)]
mod marshaling;

pub use bootstrap::load_assembly_delegate;
pub use hosting::{ensure_loaded, HostingApi};
pub use resolver::{resolve, Resolution, Target, DEFAULT_HOST_FILE};

use std::path::PathBuf;

/// Failures crossing the native/managed boundary. Each class maps to a
/// distinct HRESULT-shaped status via [`HostError::status_code`].
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("nethost library unavailable")]
    NethostUnavailable(#[source] libloading::Error),

    #[error("get_hostfxr_path failed with status {0:#010x}")]
    HostfxrNotFound(i32),

    #[error("failed to load hostfxr from {path:?}")]
    HostingLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("hostfxr export `{symbol}` could not be resolved")]
    HostingExport {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[cfg(windows)]
    #[error("host module path could not be determined")]
    HostModule(#[source] windows::core::Error),

    #[error("runtime initialization failed with status {0:#010x}")]
    RuntimeInit(i32),

    #[error("runtime initialized but no load-assembly delegate was obtained (status {0:#010x})")]
    DelegateAcquisition(i32),

    #[error("shim entry point could not be resolved (status {0:#010x})")]
    ShimResolution(i32),

    #[error("no managed assembly found for class `{0}`")]
    AssemblyNotFound(String),
}

impl HostError {
    /// Status returned to the COM caller. Hosting statuses travel verbatim;
    /// the bridge's own failure classes each get a distinct code so callers
    /// can tell root causes apart.
    pub fn status_code(&self) -> i32 {
        use crate::ffi::status::*;
        match self {
            HostError::NethostUnavailable(_) | HostError::HostfxrNotFound(_) => {
                CORE_HOST_LIB_MISSING_FAILURE
            }
            HostError::HostingLoad { .. } => CORE_HOST_LIB_LOAD_FAILURE,
            HostError::HostingExport { .. } => CORE_HOST_ENTRY_POINT_FAILURE,
            #[cfg(windows)]
            HostError::HostModule(_) => CORE_HOST_CUR_HOST_FIND_FAILURE,
            HostError::RuntimeInit(rc) => *rc,
            HostError::DelegateAcquisition(rc) | HostError::ShimResolution(rc)
                if *rc != SUCCESS =>
            {
                *rc
            }
            HostError::DelegateAcquisition(_) | HostError::ShimResolution(_) => HOST_API_FAILED,
            HostError::AssemblyNotFound(_) => CLASS_E_CLASSNOTAVAILABLE,
        }
    }
}
