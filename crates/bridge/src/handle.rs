use std::{
    hash::{Hash, Hasher},
    ptr,
    sync::Arc,
};

use powsybl_sys::ObjectHandle;

use crate::isolate::Isolate;

struct RawHandle(ObjectHandle);

// Engine handles are plain identifiers valid on any attached thread.
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

impl Drop for RawHandle {
    fn drop(&mut self) {
        if self.0.is_null() {
            return;
        }
        let Some(isolate) = Isolate::get() else {
            tracing::error!("engine handle outlived a missing isolate; leaking it");
            return;
        };
        let (handle, destroy) = (self.0, isolate.api().destroy_object_handle);
        if let Err(err) = isolate.release(|thread, exc| unsafe { destroy(thread, handle, exc) }) {
            tracing::warn!(error = %err, "failed to destroy engine object handle");
        }
    }
}

/// Shared reference to an engine object.
///
/// Clones share one underlying handle, which the engine destroys once the last
/// clone is dropped, from whichever thread drops it. A null handle is never
/// passed to the engine for release.
#[derive(Clone)]
pub struct Handle(Arc<RawHandle>);

impl Handle {
    /// Takes ownership of a handle returned by the engine.
    ///
    /// # Safety
    /// `raw` is null or a live handle that nothing else will destroy.
    #[must_use]
    pub unsafe fn from_raw(raw: ObjectHandle) -> Self {
        Self(Arc::new(RawHandle(raw)))
    }

    #[must_use]
    pub fn null() -> Self {
        Self(Arc::new(RawHandle(ptr::null_mut())))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0.0.is_null()
    }

    /// The raw handle, valid while `self` lives.
    #[must_use]
    pub fn as_ptr(&self) -> ObjectHandle {
        self.0.0
    }

    /// Number of live clones sharing this handle.
    #[must_use]
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

/// Raw pointer of an optional handle argument; absent becomes null.
pub(crate) fn opt_ptr(handle: Option<&Handle>) -> ObjectHandle {
    handle.map_or(ptr::null_mut(), Handle::as_ptr)
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.as_ptr() == other.as_ptr()
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_ptr().hash(state);
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Handle").field(&self.as_ptr()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_needs_no_isolate() {
        let handle = Handle::null();
        let copy = handle.clone();
        assert!(copy.is_null());
        assert_eq!(handle.share_count(), 2);
        drop(handle);
        assert_eq!(copy.share_count(), 1);
        assert_eq!(opt_ptr(None), ptr::null_mut());
    }
}
