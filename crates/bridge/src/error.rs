use std::{cell::RefCell, ffi::c_int};

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = core::result::Result<T, E>;

thread_local! {
    static PENDING_ERROR: RefCell<Option<BoxError>> = const { RefCell::new(None) };
}

#[derive(Error, Debug)]
pub enum Error {
    /// Failure reported by the engine through the exception handler. Displays
    /// as the engine message, unchanged.
    #[error("{0}")]
    Engine(String),

    /// Host code called back by the engine failed while the call was running.
    #[error("host callback failed: {0}")]
    Callback(#[source] BoxError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Integer read from a native struct does not name a known variant.
    #[error("unknown {kind} value: {value}")]
    InvalidEnum { kind: &'static str, value: c_int },

    /// An entry point that always produces a value returned null without
    /// reporting a failure.
    #[error("engine returned a null {0}")]
    NullResult(&'static str),

    #[error("graal_create_isolate error: {0}")]
    IsolateCreation(c_int),

    #[error("failed to load engine library: {0}")]
    Library(#[from] powsybl_sys::LoadError),
}

impl Error {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Records a failure raised by host code that runs inside an engine call on
/// the current thread.
///
/// The dispatcher surfaces it as [`Error::Callback`] once the engine call
/// returns. Only the first failure is kept until it is taken.
pub fn set_pending_error(err: impl Into<BoxError>) {
    let err = err.into();
    PENDING_ERROR.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            tracing::debug!(error = %err, "pending callback error already set");
        } else {
            *slot = Some(err);
        }
    });
}

#[must_use]
pub fn has_pending_error() -> bool {
    PENDING_ERROR.with(|slot| slot.borrow().is_some())
}

pub(crate) fn take_pending_error() -> Option<BoxError> {
    PENDING_ERROR.with(|slot| slot.borrow_mut().take())
}
