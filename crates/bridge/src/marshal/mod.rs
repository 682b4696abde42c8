//! Conversions between host values and engine-side buffers.
//!
//! Two ownership directions exist. Transient buffers ([`CStringArray`],
//! [`SliceArg`], [`HandleArray`]) are built by the host for a single call and
//! dropped by the host. Returned buffers ([`ReturnedArray`], [`ReturnedMap`],
//! [`ReturnedString`], [`EngineBox`]) are allocated by the engine and handed
//! back to it through its own release entry point.

use std::{
    borrow::Cow,
    ffi::{CStr, CString, c_char, c_int},
};

use crate::error::{Error, Result};

mod returned;
mod transient;

pub use returned::{
    ArrayKind, Bytes, ComponentResults, Doubles, EngineBox, EngineFree, Ints, ReturnedArray,
    ReturnedMap, ReturnedString, Strings,
};
pub use transient::{CStringArray, HandleArray, SliceArg};

/// # Errors
/// Returns [`Error::InvalidArgument`] if `s` contains a NUL byte.
pub fn c_string(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::invalid_argument(format!("string contains NUL: {s:?}")))
}

/// # Errors
/// Returns [`Error::InvalidArgument`] if `len` does not fit a C `int`.
pub fn c_len(len: usize) -> Result<c_int> {
    c_int::try_from(len)
        .map_err(|_| Error::invalid_argument(format!("{len} elements exceed the engine limit")))
}

/// Reads an engine string without taking ownership. Null reads as empty.
///
/// # Safety
/// `ptr` is null or points to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn borrow_str<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy()
    }
}

/// Copies an engine string. Null reads as empty.
///
/// # Safety
/// See [`borrow_str`].
pub(crate) unsafe fn copy_str(ptr: *const c_char) -> String {
    unsafe { borrow_str(ptr) }.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reads_as_empty() {
        assert_eq!(unsafe { borrow_str(std::ptr::null()) }, "");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let raw = CString::new(vec![b'a', 0xff, b'b']).expect("no NUL");
        assert_eq!(unsafe { copy_str(raw.as_ptr()) }, "a\u{fffd}b");
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(matches!(c_string("a\0b"), Err(Error::InvalidArgument(_))));
        assert_eq!(c_string("FR").expect("valid").as_bytes(), b"FR");
    }

    #[test]
    fn length_must_fit_c_int() {
        assert_eq!(c_len(3).expect("small"), 3);
        assert!(c_len(usize::MAX).is_err());
    }
}
