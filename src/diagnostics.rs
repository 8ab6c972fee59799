//! Diagnostics stay on the OS debug-output channel; this core never logs to
//! a persistent sink.

use crate::ffi::CharT;
use log::{debug, Level, LevelFilter, Log, Metadata, Record};
use windows::core::PCWSTR;
use windows::Win32::System::Diagnostics::Debug::OutputDebugStringW;

/// Error writer handed to hostfxr so hosting-layer diagnostics remain
/// observable on failure paths.
pub unsafe extern "C" fn error_writer(message: *const CharT) {
    if message.is_null() {
        return;
    }
    OutputDebugStringW(PCWSTR(message));
    debug!(target: "winrt_host::hostfxr", "{}", wide_cstr_lossy(message));
}

unsafe fn wide_cstr_lossy(ptr: *const CharT) -> String {
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
}

struct DebugOutputLogger;

static LOGGER: DebugOutputLogger = DebugOutputLogger;

impl Log for DebugOutputLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("{} [{}] {}\r\n", record.target(), record.level(), record.args());
        let wide: Vec<u16> = line.encode_utf16().chain(std::iter::once(0)).collect();
        unsafe { OutputDebugStringW(PCWSTR(wide.as_ptr())) };
    }

    fn flush(&self) {}
}

/// Installs the debug-channel logger once; a host process that already owns
/// the global logger wins.
pub fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}
