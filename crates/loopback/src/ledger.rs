//! Every allocation handed to the host, keyed by address.
//!
//! The ledger owns the memory behind each pointer it hands out. Releasing
//! removes the entry and drops the owner, so a double release or a release
//! with the wrong entry point is detected instead of corrupting memory.

use std::{
    any::Any,
    cell::RefCell,
    ffi::{CString, c_char, c_int, c_void},
    ptr,
    sync::LazyLock,
};

use dashmap::DashMap;
use powsybl_sys::{Array, StringMap};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    ErrorMessage,
    StringArray,
    Array,
    StringMap,
    BinaryBuffer,
    ComponentResults,
    NetworkMetadata,
    Parameters,
}

/// One release performed on the current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub kind: Kind,
    pub addr: usize,
}

struct Owner(#[allow(dead_code)] Box<dyn Any>);

// Owners are only created and dropped under the ledger map's locks; the
// engine never touches their contents concurrently.
unsafe impl Send for Owner {}
unsafe impl Sync for Owner {}

struct Entry {
    kind: Kind,
    _owner: Owner,
}

static LIVE: LazyLock<DashMap<usize, Entry>> = LazyLock::new(DashMap::new);

thread_local! {
    static RELEASES: RefCell<Vec<Release>> = const { RefCell::new(Vec::new()) };
}

fn track<T>(kind: Kind, owner: impl Any, ptr: *mut T) -> *mut T {
    LIVE.insert(
        ptr.addr(),
        Entry {
            kind,
            _owner: Owner(Box::new(owner)),
        },
    );
    ptr
}

/// Drops the allocation at `ptr` if it is live and of one of `kinds`.
pub fn release<T>(ptr: *mut T, kinds: &[Kind]) -> Result<(), EngineError> {
    let addr = ptr.addr();
    let Some((_, entry)) = LIVE.remove_if(&addr, |_, entry| kinds.contains(&entry.kind)) else {
        return Err(match LIVE.get(&addr) {
            Some(entry) => EngineError::WrongRelease {
                addr,
                kind: entry.kind,
            },
            None => EngineError::UnknownAllocation(addr),
        });
    };
    RELEASES.with(|log| {
        log.borrow_mut().push(Release {
            kind: entry.kind,
            addr,
        });
    });
    Ok(())
}

pub fn is_live(addr: usize) -> bool {
    LIVE.contains_key(&addr)
}

pub fn take_releases() -> Vec<Release> {
    RELEASES.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

fn c_string(value: &str) -> CString {
    // Engine-produced text never holds NUL bytes; strip any that slip in.
    CString::new(value.replace('\0', "")).unwrap_or_default()
}

pub fn string(value: &str) -> *mut c_char {
    tracked_string(Kind::String, value)
}

pub fn error_message(value: &str) -> *mut c_char {
    tracked_string(Kind::ErrorMessage, value)
}

fn tracked_string(kind: Kind, value: &str) -> *mut c_char {
    let owned = c_string(value).into_boxed_c_str();
    let ptr = owned.as_ptr().cast_mut();
    track(kind, owned, ptr)
}

/// Strings and pointer tables backing the fields of one engine struct.
#[derive(Default)]
pub struct StringPool {
    strings: Vec<CString>,
    tables: Vec<Vec<*mut c_char>>,
}

impl StringPool {
    pub fn string(&mut self, value: &str) -> *mut c_char {
        let owned = c_string(value);
        let ptr = owned.as_ptr().cast_mut();
        self.strings.push(owned);
        ptr
    }

    /// Pointer table of `items`; empty input gives null.
    pub fn table(&mut self, items: &[String]) -> (*mut *mut c_char, c_int) {
        if items.is_empty() {
            return (ptr::null_mut(), 0);
        }
        let mut table: Vec<_> = items.iter().map(|item| self.string(item)).collect();
        let ptr = table.as_mut_ptr();
        let len = c_int::try_from(table.len()).unwrap_or(c_int::MAX);
        self.tables.push(table);
        (ptr, len)
    }
}

/// An engine struct whose pointer fields point into `pool`.
pub fn structure<T: 'static>(kind: Kind, value: T, pool: StringPool) -> *mut T {
    let mut boxed = Box::new(value);
    let ptr: *mut T = &raw mut *boxed;
    track(kind, (boxed, pool), ptr)
}

fn array<T: 'static>(kind: Kind, mut items: Vec<T>, keep: impl Any) -> *mut Array {
    let mut header = Box::new(Array {
        ptr: items.as_mut_ptr().cast::<c_void>(),
        length: c_int::try_from(items.len()).unwrap_or(c_int::MAX),
    });
    let ptr: *mut Array = &raw mut *header;
    track(kind, (header, items, keep), ptr)
}

pub fn string_array(items: &[String]) -> *mut Array {
    let mut pool = StringPool::default();
    let ptrs: Vec<*mut c_char> = items.iter().map(|item| pool.string(item)).collect();
    array(Kind::StringArray, ptrs, pool)
}

pub fn int_array(items: Vec<c_int>) -> *mut Array {
    array(Kind::Array, items, ())
}

pub fn binary_buffer(bytes: Vec<u8>) -> *mut Array {
    array(Kind::BinaryBuffer, bytes, ())
}

pub fn struct_array<T: 'static>(kind: Kind, items: Vec<T>, pool: StringPool) -> *mut Array {
    array(kind, items, pool)
}

pub fn string_map(entries: &[(String, String)]) -> *mut StringMap {
    let mut pool = StringPool::default();
    let keys: Vec<String> = entries.iter().map(|(k, _)| k.clone()).collect();
    let values: Vec<String> = entries.iter().map(|(_, v)| v.clone()).collect();
    let (keys, length) = pool.table(&keys);
    let (values, _) = pool.table(&values);
    structure(
        Kind::StringMap,
        StringMap {
            length,
            keys,
            values,
        },
        pool,
    )
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn release_checks_kind_and_liveness() {
        let s = string("hello");
        assert_eq!(unsafe { CStr::from_ptr(s) }.to_str().unwrap(), "hello");
        assert!(matches!(
            release(s, &[Kind::StringArray]),
            Err(EngineError::WrongRelease { .. })
        ));
        release(s, &[Kind::String]).unwrap();
        assert!(matches!(
            release(s, &[Kind::String]),
            Err(EngineError::UnknownAllocation(_))
        ));
        let releases = take_releases();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].kind, Kind::String);
    }

    #[test]
    fn arrays_point_at_their_items() {
        let array = string_array(&["a".to_string(), "b".to_string()]);
        let header = unsafe { *array };
        assert_eq!(header.length, 2);
        let ptrs = unsafe { std::slice::from_raw_parts(header.ptr.cast::<*const c_char>(), 2) };
        assert_eq!(unsafe { CStr::from_ptr(ptrs[1]) }.to_str().unwrap(), "b");
        release(array, &[Kind::StringArray]).unwrap();
        take_releases();
    }
}
