//! HSTRING handles at the COM boundary: callers keep ownership of the
//! strings they pass in, and strings built here are released exactly once,
//! when their owner goes out of scope.

use std::mem::ManuallyDrop;
use std::ptr;
use windows::core::HSTRING;

/// Reborrows an HSTRING as an ABI parameter. The bitwise copy is wrapped in
/// `ManuallyDrop`, so the callee sees the same handle and the reference
/// count is untouched.
pub fn borrow_abi(s: &HSTRING) -> ManuallyDrop<HSTRING> {
    ManuallyDrop::new(unsafe { ptr::read(s) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrow_shares_the_underlying_buffer() {
        let owned = HSTRING::from("Acme.Widgets.Gizmo");
        let borrowed = borrow_abi(&owned);
        assert_eq!(owned.as_ptr(), borrowed.as_ptr());
        assert_eq!(borrowed.to_string_lossy(), "Acme.Widgets.Gizmo");
    }
}
