use std::{
    collections::HashMap,
    ffi::{c_char, c_int},
    marker::PhantomData,
    mem::ManuallyDrop,
    ops::Deref,
    ptr::NonNull,
    slice,
};

use powsybl_sys::{self as sys, Array, EngineApi, Exc, StringMap, Thread};

use super::copy_str;
use crate::{
    error::{Error, Result},
    isolate::Isolate,
    results::LoadFlowComponentResult,
};

type ReleaseFn<T> = unsafe extern "C" fn(Thread, *mut T, Exc);

fn element_count(length: c_int) -> Result<usize> {
    usize::try_from(length)
        .map_err(|_| Error::invalid_argument(format!("engine returned a negative length {length}")))
}

/// Element type of an engine array, and the entry point that releases it.
pub trait ArrayKind {
    type Item;

    fn release_fn(api: &EngineApi) -> ReleaseFn<Array>;

    /// # Safety
    /// `ptr` points to `len` readable elements of this kind.
    unsafe fn read(ptr: *const std::ffi::c_void, len: usize) -> Result<Vec<Self::Item>>;
}

/// Array of engine strings. Null elements read as empty strings.
#[derive(Debug)]
pub struct Strings;

impl ArrayKind for Strings {
    type Item = String;

    fn release_fn(api: &EngineApi) -> ReleaseFn<Array> {
        api.free_string_array
    }

    unsafe fn read(ptr: *const std::ffi::c_void, len: usize) -> Result<Vec<String>> {
        let items = unsafe { slice::from_raw_parts(ptr.cast::<*const c_char>(), len) };
        Ok(items.iter().map(|item| unsafe { copy_str(*item) }).collect())
    }
}

#[derive(Debug)]
pub struct Ints;

impl ArrayKind for Ints {
    type Item = c_int;

    fn release_fn(api: &EngineApi) -> ReleaseFn<Array> {
        api.free_array
    }

    unsafe fn read(ptr: *const std::ffi::c_void, len: usize) -> Result<Vec<c_int>> {
        Ok(unsafe { slice::from_raw_parts(ptr.cast::<c_int>(), len) }.to_vec())
    }
}

#[derive(Debug)]
pub struct Doubles;

impl ArrayKind for Doubles {
    type Item = f64;

    fn release_fn(api: &EngineApi) -> ReleaseFn<Array> {
        api.free_array
    }

    unsafe fn read(ptr: *const std::ffi::c_void, len: usize) -> Result<Vec<f64>> {
        Ok(unsafe { slice::from_raw_parts(ptr.cast::<f64>(), len) }.to_vec())
    }
}

/// Serialized network bytes.
#[derive(Debug)]
pub struct Bytes;

impl ArrayKind for Bytes {
    type Item = u8;

    fn release_fn(api: &EngineApi) -> ReleaseFn<Array> {
        api.free_network_binary_buffer
    }

    unsafe fn read(ptr: *const std::ffi::c_void, len: usize) -> Result<Vec<u8>> {
        Ok(unsafe { slice::from_raw_parts(ptr.cast::<u8>(), len) }.to_vec())
    }
}

/// Per-component load flow results.
#[derive(Debug)]
pub struct ComponentResults;

impl ArrayKind for ComponentResults {
    type Item = LoadFlowComponentResult;

    fn release_fn(api: &EngineApi) -> ReleaseFn<Array> {
        api.free_load_flow_component_result_pointer
    }

    unsafe fn read(
        ptr: *const std::ffi::c_void,
        len: usize,
    ) -> Result<Vec<LoadFlowComponentResult>> {
        let items = unsafe { slice::from_raw_parts(ptr.cast::<sys::LoadFlowComponentResult>(), len) };
        items
            .iter()
            .map(|item| unsafe { LoadFlowComponentResult::from_native(item) })
            .collect()
    }
}

fn release<T>(free: impl FnOnce(&EngineApi) -> ReleaseFn<T>, ptr: NonNull<T>) -> Result<()> {
    let isolate = Isolate::current();
    let free = free(isolate.api());
    isolate.release(|thread, exc| unsafe { free(thread, ptr.as_ptr(), exc) })
}

/// An engine-allocated array, released exactly once through the entry point
/// of `K`. A null array reads as empty and needs no release.
pub struct ReturnedArray<K: ArrayKind> {
    ptr: Option<NonNull<Array>>,
    _kind: PhantomData<K>,
}

impl<K: ArrayKind> ReturnedArray<K> {
    /// # Safety
    /// `ptr` is null or an array of kind `K` returned by the engine and not
    /// yet released.
    #[must_use]
    pub unsafe fn from_raw(ptr: *mut Array) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            _kind: PhantomData,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ptr.map_or(0, |ptr| {
            usize::try_from(unsafe { ptr.as_ref() }.length).unwrap_or(0)
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the elements into host memory.
    ///
    /// # Errors
    /// Returns an error if the engine reported a negative length or an
    /// element cannot be converted.
    pub fn to_vec(&self) -> Result<Vec<K::Item>> {
        let Some(ptr) = self.ptr else {
            return Ok(Vec::new());
        };
        let array = unsafe { *ptr.as_ptr() };
        let len = element_count(array.length)?;
        if len == 0 || array.ptr.is_null() {
            return Ok(Vec::new());
        }
        unsafe { K::read(array.ptr.cast_const(), len) }
    }

    /// Copies the elements, then releases the array.
    ///
    /// # Errors
    /// Returns the conversion error, or else the release error.
    pub fn into_vec(mut self) -> Result<Vec<K::Item>> {
        let items = self.to_vec();
        let released = self.release_now();
        let items = items?;
        released?;
        Ok(items)
    }

    fn release_now(&mut self) -> Result<()> {
        match self.ptr.take() {
            Some(ptr) => release(K::release_fn, ptr),
            None => Ok(()),
        }
    }
}

impl<K: ArrayKind> Drop for ReturnedArray<K> {
    fn drop(&mut self) {
        if let Err(err) = self.release_now() {
            tracing::warn!(error = %err, "failed to release engine array");
        }
    }
}

impl<K: ArrayKind> std::fmt::Debug for ReturnedArray<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReturnedArray")
            .field("ptr", &self.ptr)
            .field("len", &self.len())
            .finish()
    }
}

/// An engine-allocated string, released with `freeString`. Null reads as
/// empty.
#[derive(Debug)]
pub struct ReturnedString {
    ptr: Option<NonNull<c_char>>,
}

impl ReturnedString {
    /// # Safety
    /// `ptr` is null or a string returned by the engine and not yet released.
    #[must_use]
    pub unsafe fn from_raw(ptr: *mut c_char) -> Self {
        Self {
            ptr: NonNull::new(ptr),
        }
    }

    /// Copies the string, then releases it.
    ///
    /// # Errors
    /// Returns the engine error raised by the release.
    pub fn into_string(mut self) -> Result<String> {
        let value = self
            .ptr
            .map(|ptr| unsafe { copy_str(ptr.as_ptr()) })
            .unwrap_or_default();
        self.release_now()?;
        Ok(value)
    }

    fn release_now(&mut self) -> Result<()> {
        match self.ptr.take() {
            Some(ptr) => release(|api| api.free_string, ptr),
            None => Ok(()),
        }
    }
}

impl Drop for ReturnedString {
    fn drop(&mut self) {
        if let Err(err) = self.release_now() {
            tracing::warn!(error = %err, "failed to release engine string");
        }
    }
}

/// An engine-allocated string map, released with `freeStringMap`.
#[derive(Debug)]
pub struct ReturnedMap {
    ptr: Option<NonNull<StringMap>>,
}

impl ReturnedMap {
    /// # Safety
    /// `ptr` is null or a map returned by the engine and not yet released.
    #[must_use]
    pub unsafe fn from_raw(ptr: *mut StringMap) -> Self {
        Self {
            ptr: NonNull::new(ptr),
        }
    }

    /// # Errors
    /// Returns an error if the engine reported a negative length.
    pub fn to_map(&self) -> Result<HashMap<String, String>> {
        let Some(ptr) = self.ptr else {
            return Ok(HashMap::new());
        };
        let map = unsafe { *ptr.as_ptr() };
        let len = element_count(map.length)?;
        if len == 0 {
            return Ok(HashMap::new());
        }
        let keys = unsafe { slice::from_raw_parts(map.keys.cast_const(), len) };
        let values = unsafe { slice::from_raw_parts(map.values.cast_const(), len) };
        Ok(keys
            .iter()
            .zip(values)
            .map(|(k, v)| unsafe { (copy_str(*k), copy_str(*v)) })
            .collect())
    }

    /// Copies the entries, then releases the map.
    ///
    /// # Errors
    /// Returns the conversion error, or else the release error.
    pub fn into_map(mut self) -> Result<HashMap<String, String>> {
        let entries = self.to_map();
        let released = self.release_now();
        let entries = entries?;
        released?;
        Ok(entries)
    }

    fn release_now(&mut self) -> Result<()> {
        match self.ptr.take() {
            Some(ptr) => release(|api| api.free_string_map, ptr),
            None => Ok(()),
        }
    }
}

impl Drop for ReturnedMap {
    fn drop(&mut self) {
        if let Err(err) = self.release_now() {
            tracing::warn!(error = %err, "failed to release engine string map");
        }
    }
}

/// Engine struct types with a dedicated release entry point.
pub trait EngineFree {
    fn free_fn(api: &EngineApi) -> ReleaseFn<Self>;
}

impl EngineFree for sys::NetworkMetadata {
    fn free_fn(api: &EngineApi) -> ReleaseFn<Self> {
        api.free_network_metadata
    }
}

/// A single engine-allocated struct, readable in place and released through
/// [`EngineFree::free_fn`].
pub struct EngineBox<T: EngineFree> {
    ptr: NonNull<T>,
}

impl<T: EngineFree> EngineBox<T> {
    /// Returns `None` for a null pointer.
    ///
    /// # Safety
    /// `ptr` is null or a `T` allocated by the engine and not yet released.
    #[must_use]
    pub unsafe fn from_raw(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// # Errors
    /// Returns the engine error raised by the release.
    pub fn release(self) -> Result<()> {
        let this = ManuallyDrop::new(self);
        release(T::free_fn, this.ptr)
    }
}

impl<T: EngineFree> Deref for EngineBox<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: EngineFree> Drop for EngineBox<T> {
    fn drop(&mut self) {
        if let Err(err) = release(T::free_fn, self.ptr) {
            tracing::warn!(error = %err, "failed to release engine struct");
        }
    }
}

impl<T: EngineFree + std::fmt::Debug> std::fmt::Debug for EngineBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EngineBox").field(&**self).finish()
    }
}
