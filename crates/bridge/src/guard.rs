use std::{marker::PhantomData, ptr::NonNull};

use powsybl_sys::{GraalIsolateThread, Thread};

use crate::isolate::Isolate;

/// Scoped attachment of the current thread to the isolate.
///
/// If the thread is already attached (a call nested inside another engine
/// call on the same thread), the guard reuses that attachment and leaves it in
/// place on drop. Only the guard that attached the thread detaches it.
pub struct ThreadGuard<'a> {
    isolate: &'a Isolate,
    thread: NonNull<GraalIsolateThread>,
    owns_attachment: bool,
    // Attachments are per OS thread.
    _not_send: PhantomData<*mut ()>,
}

impl<'a> ThreadGuard<'a> {
    /// # Panics
    /// Panics if the engine refuses to attach the thread.
    #[must_use]
    pub fn acquire(isolate: &'a Isolate) -> Self {
        let api = isolate.api();
        let current = unsafe { (api.get_current_thread)(isolate.as_ptr()) };
        if let Some(thread) = NonNull::new(current) {
            return Self {
                isolate,
                thread,
                owns_attachment: false,
                _not_send: PhantomData,
            };
        }

        let mut thread = std::ptr::null_mut();
        let code = unsafe { (api.attach_thread)(isolate.as_ptr(), &raw mut thread) };
        if code != 0 {
            tracing::error!(code, "failed to attach thread to the engine isolate");
            panic!("graal_attach_thread error: {code}");
        }
        let Some(thread) = NonNull::new(thread) else {
            tracing::error!("engine attached the thread but returned no thread handle");
            panic!("graal_attach_thread returned a null thread");
        };
        tracing::trace!("attached thread to the engine isolate");
        Self {
            isolate,
            thread,
            owns_attachment: true,
            _not_send: PhantomData,
        }
    }

    /// Acquires a guard on the process-wide isolate.
    ///
    /// # Panics
    /// Panics if the isolate has not been created.
    #[must_use]
    pub fn acquire_current() -> ThreadGuard<'static> {
        ThreadGuard::acquire(Isolate::current())
    }

    #[must_use]
    pub const fn thread(&self) -> Thread {
        self.thread.as_ptr()
    }

    #[must_use]
    pub const fn owns_attachment(&self) -> bool {
        self.owns_attachment
    }
}

impl Drop for ThreadGuard<'_> {
    fn drop(&mut self) {
        if !self.owns_attachment {
            return;
        }
        let code = unsafe { (self.isolate.api().detach_thread)(self.thread.as_ptr()) };
        if code != 0 {
            tracing::error!(code, "failed to detach thread from the engine isolate");
            panic!("graal_detach_thread error: {code}");
        }
        tracing::trace!("detached thread from the engine isolate");
    }
}
