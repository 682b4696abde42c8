//! Host-side parameter structs and their native counterparts.
//!
//! A native struct reaches the host in one of two ways and is released
//! accordingly:
//!
//! - [`NativeParams`] is built by the host with [`Parameters::to_native`]; its
//!   strings and string arrays are host allocations freed on drop.
//! - [`EngineBox`] wraps engine defaults from a `create*Parameters` factory
//!   and is released through the matching engine free call.
//!
//! [`Parameters::from_native`] copies and never frees.

use std::{
    ffi::{CString, c_char, c_int, c_uchar},
    ops::Deref,
    ptr, slice,
};

use crate::{
    error::{Error, Result},
    isolate::Isolate,
    marshal::{EngineBox, EngineFree, c_len, c_string, copy_str},
};

mod flow_decomposition;
mod loadflow;
mod security;
mod sensitivity;
mod shortcircuit;
mod validation;

pub use flow_decomposition::FlowDecompositionParameters;
pub use loadflow::{BalanceType, ConnectedComponentMode, LoadFlowParameters, VoltageInitMode};
pub use security::SecurityAnalysisParameters;
pub use sensitivity::SensitivityAnalysisParameters;
pub use shortcircuit::{ShortCircuitAnalysisParameters, StudyType};
pub use validation::LoadFlowValidationParameters;

/// Ordered key/value pairs handed to an analysis provider.
pub type ProviderParameters = Vec<(String, String)>;

/// Native structs whose host-allocated fields can be released by the host.
pub trait HostFree {
    /// Frees strings and arrays written by [`Parameters::write_native`] and
    /// nulls them out.
    ///
    /// # Safety
    /// Every pointer field is null or was allocated by this crate.
    unsafe fn free_host_fields(&mut self);
}

/// A native parameter struct built by the host, freed by the host.
#[derive(Debug)]
pub struct NativeParams<T: HostFree> {
    inner: Box<T>,
}

impl<T: HostFree> NativeParams<T> {
    /// The engine reads the struct through this pointer; it does not keep it.
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        &raw mut *self.inner
    }
}

impl<T: HostFree> Deref for NativeParams<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: HostFree> Drop for NativeParams<T> {
    fn drop(&mut self) {
        unsafe { self.inner.free_host_fields() };
    }
}

/// A family of analysis parameters.
pub trait Parameters: Sized {
    type Native: HostFree + EngineFree + Default;

    /// Copies a native struct into host values. Frees nothing.
    ///
    /// # Errors
    /// Returns an error for unknown enum values or mismatched provider
    /// parameter arrays.
    ///
    /// # Safety
    /// Pointer fields of `native` are null or valid for their counts.
    unsafe fn from_native(native: &Self::Native) -> Result<Self>;

    /// Writes host values into a zeroed native struct, field by field.
    ///
    /// On error, `native` holds only fields written so far, all owned by the
    /// host.
    ///
    /// # Errors
    /// Returns an error if a string holds a NUL byte or an array is too long.
    fn write_native(&self, native: &mut Self::Native) -> Result<()>;

    /// Calls the engine factory for default parameters.
    ///
    /// # Errors
    /// Returns the engine error raised by the factory.
    fn create_native(isolate: &Isolate) -> Result<Option<EngineBox<Self::Native>>>;

    /// # Errors
    /// See [`Parameters::write_native`].
    fn to_native(&self) -> Result<NativeParams<Self::Native>> {
        let mut native = NativeParams {
            inner: Box::default(),
        };
        self.write_native(&mut native.inner)?;
        Ok(native)
    }

    /// Default parameters as configured on the engine side.
    ///
    /// # Errors
    /// Returns the engine error raised by the factory or the release, or a
    /// conversion error.
    fn engine_defaults(isolate: &Isolate) -> Result<Self> {
        let native = Self::create_native(isolate)?.ok_or(Error::NullResult("parameters"))?;
        let params = unsafe { Self::from_native(&native) };
        native.release()?;
        params
    }
}

#[must_use]
pub(crate) const fn flag(value: bool) -> c_uchar {
    value as c_uchar
}

#[must_use]
pub(crate) const fn is_set(value: c_uchar) -> bool {
    value != 0
}

/// Copies `count` strings. Null elements read as empty.
///
/// # Safety
/// `ptr` is null or points to `count` string pointers.
pub(crate) unsafe fn read_strings(ptr: *const *mut c_char, count: c_int) -> Result<Vec<String>> {
    let count = usize::try_from(count)
        .map_err(|_| Error::invalid_argument(format!("negative string count {count}")))?;
    if ptr.is_null() || count == 0 {
        return Ok(Vec::new());
    }
    let items = unsafe { slice::from_raw_parts(ptr, count) };
    Ok(items.iter().map(|item| unsafe { copy_str(*item) }).collect())
}

/// Host-allocated copy of `items`, released with [`free_strings`]. Empty
/// input gives a null pointer.
pub(crate) fn alloc_strings(items: &[String]) -> Result<(*mut *mut c_char, c_int)> {
    let count = c_len(items.len())?;
    if items.is_empty() {
        return Ok((ptr::null_mut(), 0));
    }
    let strings = items
        .iter()
        .map(|item| c_string(item))
        .collect::<Result<Vec<_>>>()?;
    let ptrs: Box<[*mut c_char]> = strings.into_iter().map(CString::into_raw).collect();
    Ok((Box::into_raw(ptrs).cast::<*mut c_char>(), count))
}

/// # Safety
/// `ptr` is null or came from [`alloc_strings`] with the same `count`.
pub(crate) unsafe fn free_strings(ptr: &mut *mut *mut c_char, count: &mut c_int) {
    let raw = std::mem::replace(ptr, ptr::null_mut());
    let len = usize::try_from(std::mem::take(count)).unwrap_or(0);
    if raw.is_null() {
        return;
    }
    let ptrs = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(raw, len)) };
    for item in ptrs.iter().copied().filter(|item| !item.is_null()) {
        drop(unsafe { CString::from_raw(item) });
    }
}

pub(crate) fn alloc_string(value: &str) -> Result<*mut c_char> {
    Ok(c_string(value)?.into_raw())
}

/// # Safety
/// `ptr` is null or came from [`alloc_string`].
pub(crate) unsafe fn free_string(ptr: &mut *mut c_char) {
    let raw = std::mem::replace(ptr, ptr::null_mut());
    if !raw.is_null() {
        drop(unsafe { CString::from_raw(raw) });
    }
}

/// # Safety
/// See [`read_strings`].
pub(crate) unsafe fn read_provider_parameters(
    keys: *const *mut c_char,
    keys_count: c_int,
    values: *const *mut c_char,
    values_count: c_int,
) -> Result<ProviderParameters> {
    if keys_count != values_count {
        return Err(Error::invalid_argument(format!(
            "{keys_count} provider parameter keys for {values_count} values"
        )));
    }
    let keys = unsafe { read_strings(keys, keys_count) }?;
    let values = unsafe { read_strings(values, values_count) }?;
    Ok(keys.into_iter().zip(values).collect())
}

/// Parallel key and value arrays of a native struct.
pub(crate) struct ProviderFields<'a> {
    pub keys: &'a mut *mut *mut c_char,
    pub keys_count: &'a mut c_int,
    pub values: &'a mut *mut *mut c_char,
    pub values_count: &'a mut c_int,
}

impl ProviderFields<'_> {
    pub fn write(self, pairs: &[(String, String)]) -> Result<()> {
        let (keys, values): (Vec<_>, Vec<_>) = pairs.iter().cloned().unzip();
        (*self.keys, *self.keys_count) = alloc_strings(&keys)?;
        (*self.values, *self.values_count) = alloc_strings(&values)?;
        Ok(())
    }

    /// # Safety
    /// The fields were written by [`ProviderFields::write`] or are null.
    pub unsafe fn free(self) {
        unsafe {
            free_strings(self.keys, self.keys_count);
            free_strings(self.values, self.values_count);
        }
    }
}

/// Borrows the provider parameter fields of a native struct.
macro_rules! provider_fields {
    ($native:expr) => {
        $crate::params::ProviderFields {
            keys: &mut $native.provider_parameters_keys,
            keys_count: &mut $native.provider_parameters_keys_count,
            values: &mut $native.provider_parameters_values,
            values_count: &mut $native.provider_parameters_values_count,
        }
    };
}
pub(crate) use provider_fields;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_arrays_round_trip_and_free() {
        let items = vec!["FR".to_string(), "BE".to_string()];
        let (mut ptr, mut count) = alloc_strings(&items).expect("alloc");
        assert_eq!(count, 2);
        assert_eq!(unsafe { read_strings(ptr, count) }.expect("read"), items);
        unsafe { free_strings(&mut ptr, &mut count) };
        assert!(ptr.is_null());
        assert_eq!(count, 0);
        // Freed fields are nulled, so a second free is a no-op.
        unsafe { free_strings(&mut ptr, &mut count) };
    }

    #[test]
    fn empty_array_is_null() {
        let (ptr, count) = alloc_strings(&[]).expect("alloc");
        assert!(ptr.is_null());
        assert_eq!(count, 0);
        assert!(unsafe { read_strings(ptr, count) }.expect("read").is_empty());
    }

    #[test]
    fn mismatched_provider_arrays_are_rejected() {
        let (keys, keys_count) = alloc_strings(&["a".to_string(), "b".to_string()]).expect("keys");
        let (values, values_count) = alloc_strings(&["1".to_string()]).expect("values");
        let err = unsafe { read_provider_parameters(keys, keys_count, values, values_count) }
            .expect_err("mismatch");
        assert!(matches!(err, Error::InvalidArgument(_)));
        let (mut keys, mut keys_count, mut values, mut values_count) =
            (keys, keys_count, values, values_count);
        unsafe {
            free_strings(&mut keys, &mut keys_count);
            free_strings(&mut values, &mut values_count);
        }
    }

    #[test]
    fn flags_are_bytes() {
        assert_eq!(flag(true), 1);
        assert_eq!(flag(false), 0);
        assert!(is_set(2));
        assert!(!is_set(0));
    }
}
