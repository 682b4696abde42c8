//! Test hooks: inspect engine state and inject failures.
//!
//! Per-thread counters and logs only see activity of the calling thread, so
//! tests running in parallel do not observe each other.

use std::ffi::{c_int, c_void};

use crate::{
    ledger::{self, Release},
    objects,
    runtime::{self, Injection},
};

/// Makes the next engine call on this thread fail with `message`. The
/// log level synchronization that precedes each call is not affected.
pub fn fail_next_call(message: impl Into<String>) {
    runtime::inject(Injection::Call, message.into());
}

/// Makes the next `setLogLevel` on this thread fail with `message`.
pub fn fail_next_log_level(message: impl Into<String>) {
    runtime::inject(Injection::LogLevel, message.into());
}

/// Makes the next isolate creation fail with `code`.
pub fn fail_next_isolate_creation(code: c_int) {
    runtime::fail_next_isolate_creation(code);
}

/// Isolates created so far in this process.
#[must_use]
pub fn isolate_creations() -> u64 {
    runtime::isolate_creations()
}

#[must_use]
pub fn is_attached() -> bool {
    runtime::is_attached()
}

/// Attachments and detachments performed by this thread.
#[must_use]
pub fn attach_counts() -> (u64, u64) {
    runtime::thread_attach_counts()
}

/// Attachments and detachments across all threads.
#[must_use]
pub fn global_attach_counts() -> (u64, u64) {
    runtime::global_attach_counts()
}

/// Releases performed by this thread since the last call.
#[must_use]
pub fn take_releases() -> Vec<Release> {
    ledger::take_releases()
}

#[must_use]
pub fn is_allocation_live<T>(ptr: *const T) -> bool {
    ledger::is_live(ptr.addr())
}

#[must_use]
pub fn is_handle_live(handle: *mut c_void) -> bool {
    objects::is_live(handle)
}

/// Times the engine destroyed `handle`.
#[must_use]
pub fn destroy_count(handle: *mut c_void) -> u32 {
    objects::destroy_count(handle)
}

#[must_use]
pub fn log_level() -> c_int {
    runtime::log_level()
}

/// Emits a record through the installed logger callback, as if the engine
/// logged during a call.
pub fn log(level: c_int, logger: &str, message: &str) {
    runtime::log(level, logger, message);
}

#[must_use]
pub fn java_library_path() -> Option<String> {
    runtime::java_library_path()
}

#[must_use]
pub fn is_closed() -> bool {
    runtime::is_closed()
}
