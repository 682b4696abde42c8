//! Isolate, thread attachment and engine-wide settings.

use std::{
    cell::{Cell, RefCell},
    ffi::{CString, c_int, c_long},
    ptr,
    sync::{
        LazyLock,
        atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use parking_lot::{Mutex, RwLock};
use powsybl_sys::{GraalIsolate, GraalIsolateThread, LoggerCallback, Thread};

use crate::error::{EngineError, Result};

pub const LEVEL_TRACE: c_int = 5;
pub const LEVEL_DEBUG: c_int = 10;
pub const LEVEL_INFO: c_int = 20;
pub const LEVEL_WARN: c_int = 30;

pub const DEFAULT_PROVIDER: &str = "OpenLoadFlow";
pub const PROVIDERS: &[&str] = &["OpenLoadFlow", "DynaFlow"];

static ISOLATE_TOKEN: u8 = 0;
static ISOLATE_CREATED: AtomicBool = AtomicBool::new(false);
static CREATE_FAILURE: AtomicI32 = AtomicI32::new(0);
static CREATIONS: AtomicU64 = AtomicU64::new(0);
static ATTACHES: AtomicU64 = AtomicU64::new(0);
static DETACHES: AtomicU64 = AtomicU64::new(0);

static LOG_LEVEL: AtomicI32 = AtomicI32::new(LEVEL_INFO);
static LOGGER: RwLock<Option<LoggerCallback>> = parking_lot::const_rwlock(None);

static CONFIG_READ: AtomicBool = AtomicBool::new(true);
static CLOSED: AtomicBool = AtomicBool::new(false);
static JAVA_LIBRARY_PATH: Mutex<Option<String>> = parking_lot::const_mutex(None);
static DEFAULT_LOAD_FLOW_PROVIDER: LazyLock<Mutex<String>> =
    LazyLock::new(|| Mutex::new(DEFAULT_PROVIDER.to_string()));

thread_local! {
    static THREAD_TOKEN: u8 = const { 0 };
    static ATTACHED: Cell<bool> = const { Cell::new(false) };
    static THREAD_ATTACHES: Cell<u64> = const { Cell::new(0) };
    static THREAD_DETACHES: Cell<u64> = const { Cell::new(0) };
    static INJECTED_CALL: RefCell<Option<String>> = const { RefCell::new(None) };
    static INJECTED_LOG_LEVEL: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Which injected failure an entry point consumes.
#[derive(Debug, Clone, Copy)]
pub enum Injection {
    None,
    Call,
    LogLevel,
}

fn isolate_ptr() -> *mut GraalIsolate {
    (&raw const ISOLATE_TOKEN).cast_mut().cast()
}

fn thread_ptr() -> Thread {
    THREAD_TOKEN.with(|token| ptr::from_ref(token).cast_mut().cast::<GraalIsolateThread>())
}

pub fn create_isolate(isolate: *mut *mut GraalIsolate, thread: *mut Thread) -> c_int {
    let code = CREATE_FAILURE.swap(0, Ordering::SeqCst);
    if code != 0 {
        tracing::debug!(code, "isolate creation refused");
        return code;
    }
    ISOLATE_CREATED.store(true, Ordering::SeqCst);
    CREATIONS.fetch_add(1, Ordering::Relaxed);
    // Creating an isolate attaches the calling thread.
    let current = attach();
    unsafe {
        if !isolate.is_null() {
            *isolate = isolate_ptr();
        }
        if !thread.is_null() {
            *thread = current;
        }
    }
    0
}

fn attach() -> Thread {
    if !ATTACHED.replace(true) {
        THREAD_ATTACHES.set(THREAD_ATTACHES.get() + 1);
        ATTACHES.fetch_add(1, Ordering::Relaxed);
    }
    thread_ptr()
}

pub fn attach_thread(isolate: *mut GraalIsolate, thread: *mut Thread) -> c_int {
    if isolate != isolate_ptr() || !ISOLATE_CREATED.load(Ordering::SeqCst) {
        return -1;
    }
    let current = attach();
    if !thread.is_null() {
        unsafe { *thread = current };
    }
    0
}

pub fn current_thread(isolate: *mut GraalIsolate) -> Thread {
    if isolate == isolate_ptr() && ATTACHED.get() {
        thread_ptr()
    } else {
        ptr::null_mut()
    }
}

pub fn detach_thread(thread: Thread) -> c_int {
    if thread != thread_ptr() || !ATTACHED.replace(false) {
        return -1;
    }
    THREAD_DETACHES.set(THREAD_DETACHES.get() + 1);
    DETACHES.fetch_add(1, Ordering::Relaxed);
    0
}

pub fn check_attached(thread: Thread) -> Result<()> {
    if !thread.is_null() && thread == thread_ptr() && ATTACHED.get() {
        Ok(())
    } else {
        Err(EngineError::NotAttached)
    }
}

pub fn take_injected_failure(injection: Injection) -> Result<()> {
    let slot = match injection {
        Injection::None => return Ok(()),
        Injection::Call => &INJECTED_CALL,
        Injection::LogLevel => &INJECTED_LOG_LEVEL,
    };
    match slot.with(|slot| slot.borrow_mut().take()) {
        Some(message) => Err(EngineError::Injected(message)),
        None => Ok(()),
    }
}

pub fn inject(injection: Injection, message: String) {
    let slot = match injection {
        Injection::None => return,
        Injection::Call => &INJECTED_CALL,
        Injection::LogLevel => &INJECTED_LOG_LEVEL,
    };
    slot.with(|slot| *slot.borrow_mut() = Some(message));
}

pub fn fail_next_isolate_creation(code: c_int) {
    CREATE_FAILURE.store(code, Ordering::SeqCst);
}

pub fn isolate_creations() -> u64 {
    CREATIONS.load(Ordering::Relaxed)
}

pub fn is_attached() -> bool {
    ATTACHED.get()
}

pub fn thread_attach_counts() -> (u64, u64) {
    (THREAD_ATTACHES.get(), THREAD_DETACHES.get())
}

pub fn global_attach_counts() -> (u64, u64) {
    (
        ATTACHES.load(Ordering::Relaxed),
        DETACHES.load(Ordering::Relaxed),
    )
}

pub fn set_log_level(level: c_int) {
    LOG_LEVEL.store(level, Ordering::Relaxed);
}

pub fn log_level() -> c_int {
    LOG_LEVEL.load(Ordering::Relaxed)
}

pub fn set_logger(callback: Option<LoggerCallback>) {
    *LOGGER.write() = callback;
}

/// Sends one record to the host logger if `level` passes the engine level.
pub fn log(level: c_int, logger: &str, message: &str) {
    if level < log_level() {
        return;
    }
    let Some(callback) = *LOGGER.read() else {
        return;
    };
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| c_long::try_from(elapsed.as_millis()).unwrap_or(c_long::MAX));
    let logger = CString::new(logger).unwrap_or_default();
    let message = CString::new(message).unwrap_or_default();
    unsafe {
        callback(
            level,
            timestamp,
            logger.as_ptr().cast_mut(),
            message.as_ptr().cast_mut(),
        );
    }
}

pub fn set_config_read(read: bool) {
    CONFIG_READ.store(read, Ordering::Relaxed);
}

pub fn is_config_read() -> bool {
    CONFIG_READ.load(Ordering::Relaxed)
}

pub fn set_java_library_path(path: String) {
    *JAVA_LIBRARY_PATH.lock() = Some(path);
}

pub fn java_library_path() -> Option<String> {
    JAVA_LIBRARY_PATH.lock().clone()
}

pub fn default_provider() -> String {
    DEFAULT_LOAD_FLOW_PROVIDER.lock().clone()
}

pub fn set_default_provider(provider: &str) -> Result<()> {
    if !PROVIDERS.contains(&provider) {
        return Err(EngineError::UnknownProvider(provider.to_string()));
    }
    *DEFAULT_LOAD_FLOW_PROVIDER.lock() = provider.to_string();
    Ok(())
}

pub fn close() {
    CLOSED.store(true, Ordering::SeqCst);
}

pub fn is_closed() -> bool {
    CLOSED.load(Ordering::SeqCst)
}
