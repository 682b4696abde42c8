use std::{
    ffi::c_int,
    panic::{self, AssertUnwindSafe},
};

use powsybl_sys::{Exc, Thread};
use thiserror::Error;

use crate::{
    ledger::{self, Kind},
    runtime::{self, Injection},
};

/// Failures reported to the host through the exception handler. The display
/// text is the message the host sees.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("thread is not attached to the isolate")]
    NotAttached,

    #[error("Object handle {0:#x} does not exist")]
    UnknownHandle(usize),

    #[error("Object handle {handle:#x} is not a {expected}")]
    WrongHandle {
        handle: usize,
        expected: &'static str,
    },

    #[error("Pointer {0:#x} was not allocated by the engine or was already released")]
    UnknownAllocation(usize),

    #[error("Pointer {addr:#x} holds a {kind:?}, released with the wrong function")]
    WrongRelease { addr: usize, kind: Kind },

    #[error("No network factory named '{0}'")]
    UnknownFactory(String),

    #[error("No loadflow provider for name '{0}'")]
    UnknownProvider(String),

    #[error("Unsupported file format or invalid file: {0}")]
    UnsupportedFormat(String),

    #[error("Export format {0} not supported")]
    UnsupportedExport(String),

    #[error("Invalid {kind} value: {value}")]
    InvalidEnum { kind: &'static str, value: c_int },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Injected(String),

    #[error("engine panicked: {0}")]
    Panic(String),
}

pub type Result<T, E = EngineError> = core::result::Result<T, E>;

/// Value returned by an entry point that failed.
pub trait Fallback {
    fn fallback() -> Self;
}

impl Fallback for () {
    fn fallback() -> Self {}
}

impl Fallback for bool {
    fn fallback() -> Self {
        false
    }
}

impl<T> Fallback for *mut T {
    fn fallback() -> Self {
        std::ptr::null_mut()
    }
}

/// Stores `err` as the engine message of the failing call.
pub fn raise(exc: Exc, err: &EngineError) {
    tracing::debug!(error = %err, "engine call failed");
    if exc.is_null() {
        return;
    }
    unsafe { (*exc).message = ledger::error_message(&err.to_string()) };
}

/// Body of every entry point taking a thread and an exception handler.
///
/// Checks the attachment, converts errors and panics into an engine message,
/// and returns [`Fallback::fallback`] on failure.
pub fn entry<R: Fallback>(thread: Thread, exc: Exc, f: impl FnOnce() -> Result<R>) -> R {
    guarded(thread, exc, Injection::Call, f)
}

/// [`entry`] for `setLogLevel`, which has its own injected failure slot.
pub fn log_level_entry(thread: Thread, exc: Exc, f: impl FnOnce() -> Result<()>) {
    guarded(thread, exc, Injection::LogLevel, f);
}

/// [`entry`] for release functions, which never consume an injected failure.
pub fn release_entry(thread: Thread, exc: Exc, f: impl FnOnce() -> Result<()>) {
    guarded(thread, exc, Injection::None, f);
}

fn guarded<R: Fallback>(
    thread: Thread,
    exc: Exc,
    injection: Injection,
    f: impl FnOnce() -> Result<R>,
) -> R {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        runtime::check_attached(thread)?;
        runtime::take_injected_failure(injection)?;
        f()
    }));
    match outcome {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            raise(exc, &err);
            R::fallback()
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            raise(exc, &EngineError::Panic(message));
            R::fallback()
        }
    }
}
