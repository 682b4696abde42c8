use std::{
    ffi::CStr,
    ptr::{self, NonNull},
    sync::OnceLock,
};

use parking_lot::Mutex;
use powsybl_sys::{EngineApi, Exc, ExceptionHandler, GraalIsolate, LoggerCallback, Thread};

use crate::{
    config::BridgeConfig,
    error::{Error, Result, take_pending_error},
    guard::ThreadGuard,
    host::Host,
    logging::{self, forward_engine_log},
    marshal,
};

static ISOLATE: OnceLock<Isolate> = OnceLock::new();
// Holds an isolate the engine created whose configuration has not succeeded.
static INIT_LOCK: Mutex<Option<Created>> = parking_lot::const_mutex(None);

struct Created(NonNull<GraalIsolate>);

unsafe impl Send for Created {}

/// The single engine isolate of the process.
///
/// Created once with [`Isolate::init`] and never torn down; every engine call
/// goes through [`Isolate::call`].
pub struct Isolate {
    raw: NonNull<GraalIsolate>,
    api: EngineApi,
    host: Box<dyn Host>,
}

// The isolate pointer is process-wide; each call attaches its own thread.
unsafe impl Send for Isolate {}
unsafe impl Sync for Isolate {}

impl std::fmt::Debug for Isolate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Isolate").field("raw", &self.raw).finish_non_exhaustive()
    }
}

impl Isolate {
    /// Creates the process isolate, or returns the existing one.
    ///
    /// Concurrent callers are serialized. The isolate is published only once
    /// `config` has been applied; after a configuration failure the next call
    /// reuses the engine isolate and applies its own `config`. Once published,
    /// later calls ignore their arguments.
    ///
    /// # Errors
    /// Returns [`Error::IsolateCreation`] if the engine refuses to create the
    /// isolate, or the engine error raised while applying `config`.
    pub fn init(api: EngineApi, host: impl Host, config: &BridgeConfig) -> Result<&'static Self> {
        let mut created = INIT_LOCK.lock();
        if let Some(isolate) = ISOLATE.get() {
            tracing::debug!("engine isolate already created");
            return Ok(isolate);
        }

        let raw = if let Some(Created(raw)) = *created {
            tracing::debug!("configuring previously created engine isolate");
            raw
        } else {
            let raw = Self::create(&api)?;
            *created = Some(Created(raw));
            raw
        };

        let isolate = Self {
            raw,
            api,
            host: Box::new(host),
        };
        isolate.configure(config)?;
        *created = None;
        Ok(ISOLATE.get_or_init(|| isolate))
    }

    fn create(api: &EngineApi) -> Result<NonNull<GraalIsolate>> {
        let mut isolate_ptr = ptr::null_mut();
        let mut thread: Thread = ptr::null_mut();
        let code = unsafe { (api.create_isolate)(ptr::null_mut(), &raw mut isolate_ptr, &raw mut thread) };
        if code != 0 {
            tracing::error!(code, "failed to create engine isolate");
            return Err(Error::IsolateCreation(code));
        }
        let raw = NonNull::new(isolate_ptr).ok_or(Error::NullResult("isolate"))?;
        tracing::info!("engine isolate created");
        Ok(raw)
    }

    fn configure(&self, config: &BridgeConfig) -> Result<()> {
        if config.forward_engine_logs() {
            let callback: LoggerCallback = forward_engine_log;
            engine_call!(self, setup_logger_callback(Some(callback)))?;
        }
        if let Some(path) = config.java_library_path() {
            let path = path
                .to_str()
                .ok_or_else(|| Error::invalid_argument("java library path is not UTF-8"))?;
            let path = marshal::c_string(path)?;
            engine_call!(self, set_java_library_path(path.as_ptr().cast_mut()))?;
        }
        if let Some(read) = config.config_read() {
            engine_call!(self, set_config_read(read))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn get() -> Option<&'static Self> {
        ISOLATE.get()
    }

    /// # Panics
    /// Panics if [`Isolate::init`] has not succeeded yet.
    #[must_use]
    pub fn current() -> &'static Self {
        match ISOLATE.get() {
            Some(isolate) => isolate,
            None => {
                tracing::error!("engine call attempted before the isolate was created");
                panic!("isolate has not been created");
            }
        }
    }

    #[must_use]
    pub const fn api(&self) -> &EngineApi {
        &self.api
    }

    #[must_use]
    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub(crate) const fn as_ptr(&self) -> *mut GraalIsolate {
        self.raw.as_ptr()
    }

    /// Runs one engine entry point on an attached thread.
    ///
    /// The engine log level is synchronized with [`Host::log_level`] first.
    /// After `f` returns, an engine-reported failure wins over a pending host
    /// callback failure; either one turns the result into an error.
    ///
    /// # Errors
    /// [`Error::Engine`] with the engine message, or [`Error::Callback`] with
    /// the failure recorded by host code during the call.
    ///
    /// # Panics
    /// Panics if the thread cannot be attached or detached.
    pub fn call<R>(&self, f: impl FnOnce(Thread, Exc) -> R) -> Result<R> {
        let guard = ThreadGuard::acquire(self);
        self.sync_log_level(&guard)?;

        let mut exc = ExceptionHandler::default();
        let value = f(guard.thread(), &raw mut exc);
        self.check(&guard, &mut exc)?;
        Ok(value)
    }

    /// Runs one engine release entry point on an attached thread.
    ///
    /// `f` always runs. Only the engine message is checked afterwards: the log
    /// level is left alone and a pending host failure stays parked for the next
    /// [`Isolate::call`] on this thread.
    ///
    /// # Errors
    /// [`Error::Engine`] with the engine message.
    ///
    /// # Panics
    /// Panics if the thread cannot be attached or detached.
    pub fn release(&self, f: impl FnOnce(Thread, Exc)) -> Result<()> {
        let guard = ThreadGuard::acquire(self);
        let mut exc = ExceptionHandler::default();
        f(guard.thread(), &raw mut exc);
        self.take_engine_error(&guard, &mut exc).map_or(Ok(()), Err)
    }

    fn sync_log_level(&self, guard: &ThreadGuard<'_>) -> Result<()> {
        let level = logging::engine_level(self.host.log_level());
        let mut exc = ExceptionHandler::default();
        unsafe { (self.api.set_log_level)(guard.thread(), level, &raw mut exc) };
        self.check(guard, &mut exc)
    }

    fn check(&self, guard: &ThreadGuard<'_>, exc: &mut ExceptionHandler) -> Result<()> {
        if let Some(err) = self.take_engine_error(guard, exc) {
            if let Some(superseded) = take_pending_error() {
                tracing::debug!(error = %superseded, "callback failure superseded by engine error");
            }
            return Err(err);
        }
        match take_pending_error() {
            Some(err) => Err(Error::Callback(err)),
            None => Ok(()),
        }
    }

    /// Copies and releases the message left in `exc`, if any.
    fn take_engine_error(
        &self,
        guard: &ThreadGuard<'_>,
        exc: &mut ExceptionHandler,
    ) -> Option<Error> {
        let message = std::mem::replace(&mut exc.message, ptr::null_mut());
        if message.is_null() {
            return None;
        }
        let text = unsafe { CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned();

        let mut free_exc = ExceptionHandler::default();
        unsafe { (self.api.free_string)(guard.thread(), message, &raw mut free_exc) };
        if !free_exc.message.is_null() {
            tracing::warn!("engine failed to release an error message");
        }
        Some(Error::Engine(text))
    }
}
