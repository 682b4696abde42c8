use std::{
    ffi::{CString, c_char, c_int},
    marker::PhantomData,
};

use powsybl_sys::ObjectHandle;

use super::{c_len, c_string};
use crate::{error::Result, handle::Handle};

/// NUL-terminated copies of a string sequence plus the pointer table the
/// engine reads. Lives for one call.
#[derive(Debug)]
pub struct CStringArray {
    // Backing storage of `ptrs`.
    _strings: Vec<CString>,
    ptrs: Vec<*mut c_char>,
    len: c_int,
}

impl CStringArray {
    /// # Errors
    /// Returns an error if an item contains a NUL byte or there are more
    /// items than a C `int` can count.
    pub fn new<I>(items: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let strings = items
            .into_iter()
            .map(|item| c_string(item.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let len = c_len(strings.len())?;
        let ptrs = strings.iter().map(|s| s.as_ptr().cast_mut()).collect();
        Ok(Self {
            _strings: strings,
            ptrs,
            len,
        })
    }

    /// The engine only reads through this pointer.
    #[must_use]
    pub fn as_ptr(&self) -> *mut *mut c_char {
        self.ptrs.as_ptr().cast_mut()
    }

    #[must_use]
    pub const fn len(&self) -> c_int {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A host slice of ints or doubles passed as a pointer and a count.
#[derive(Debug, Clone, Copy)]
pub struct SliceArg<'a, T> {
    slice: &'a [T],
    len: c_int,
}

impl<'a, T: Copy> SliceArg<'a, T> {
    /// # Errors
    /// Returns an error if the slice is longer than a C `int` can count.
    pub fn new(slice: &'a [T]) -> Result<Self> {
        Ok(Self {
            slice,
            len: c_len(slice.len())?,
        })
    }

    #[must_use]
    pub const fn as_ptr(&self) -> *mut T {
        self.slice.as_ptr().cast_mut()
    }

    #[must_use]
    pub const fn len(&self) -> c_int {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Raw pointers of several handles, for entry points taking a handle array.
/// Borrows the handles so none is released during the call.
#[derive(Debug)]
pub struct HandleArray<'a> {
    ptrs: Vec<ObjectHandle>,
    len: c_int,
    _handles: PhantomData<&'a [Handle]>,
}

impl<'a> HandleArray<'a> {
    /// # Errors
    /// Returns an error if there are more handles than a C `int` can count.
    pub fn new(handles: &'a [Handle]) -> Result<Self> {
        Ok(Self {
            ptrs: handles.iter().map(Handle::as_ptr).collect(),
            len: c_len(handles.len())?,
            _handles: PhantomData,
        })
    }

    #[must_use]
    pub fn as_ptr(&self) -> *mut ObjectHandle {
        self.ptrs.as_ptr().cast_mut()
    }

    #[must_use]
    pub const fn len(&self) -> c_int {
        self.len
    }
}
