use std::{
    any::Any,
    ffi::{c_char, c_int, c_long},
    panic::{self, AssertUnwindSafe},
};

use thiserror::Error;
use tracing::{event, level_filters::LevelFilter};

use crate::{error::set_pending_error, isolate::Isolate, marshal};

pub const TRACE_TARGET_ENGINE: &str = "powsybl::engine";

/// Engine-side value that disables every record.
pub const ENGINE_LEVEL_OFF: c_int = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EngineLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl EngineLogLevel {
    #[must_use]
    pub const fn as_raw(self) -> c_int {
        match self {
            Self::Trace => 5,
            Self::Debug => 10,
            Self::Info => 20,
            Self::Warn => 30,
            Self::Error => 40,
        }
    }

    /// Engines may send any integer; values between two levels round down.
    #[must_use]
    pub const fn from_raw(raw: c_int) -> Self {
        match raw {
            ..10 => Self::Trace,
            10..20 => Self::Debug,
            20..30 => Self::Info,
            30..40 => Self::Warn,
            _ => Self::Error,
        }
    }
}

/// Maps a host verbosity to the integer level sent with `setLogLevel`.
#[must_use]
pub fn engine_level(filter: LevelFilter) -> c_int {
    if filter >= LevelFilter::TRACE {
        EngineLogLevel::Trace.as_raw()
    } else if filter >= LevelFilter::DEBUG {
        EngineLogLevel::Debug.as_raw()
    } else if filter >= LevelFilter::INFO {
        EngineLogLevel::Info.as_raw()
    } else if filter >= LevelFilter::WARN {
        EngineLogLevel::Warn.as_raw()
    } else if filter >= LevelFilter::ERROR {
        EngineLogLevel::Error.as_raw()
    } else {
        ENGINE_LEVEL_OFF
    }
}

/// One log line emitted by the engine during a call.
#[derive(Debug, Clone, Copy)]
pub struct EngineLogRecord<'a> {
    pub level: EngineLogLevel,
    pub timestamp_ms: i64,
    pub logger: &'a str,
    pub message: &'a str,
}

impl EngineLogRecord<'_> {
    /// Re-emits the record as a `tracing` event under [`TRACE_TARGET_ENGINE`].
    pub fn emit(&self) {
        match self.level {
            EngineLogLevel::Trace => event!(
                target: TRACE_TARGET_ENGINE,
                tracing::Level::TRACE,
                logger = self.logger,
                timestamp_ms = self.timestamp_ms,
                "{}",
                self.message
            ),
            EngineLogLevel::Debug => event!(
                target: TRACE_TARGET_ENGINE,
                tracing::Level::DEBUG,
                logger = self.logger,
                timestamp_ms = self.timestamp_ms,
                "{}",
                self.message
            ),
            EngineLogLevel::Info => event!(
                target: TRACE_TARGET_ENGINE,
                tracing::Level::INFO,
                logger = self.logger,
                timestamp_ms = self.timestamp_ms,
                "{}",
                self.message
            ),
            EngineLogLevel::Warn => event!(
                target: TRACE_TARGET_ENGINE,
                tracing::Level::WARN,
                logger = self.logger,
                timestamp_ms = self.timestamp_ms,
                "{}",
                self.message
            ),
            EngineLogLevel::Error => event!(
                target: TRACE_TARGET_ENGINE,
                tracing::Level::ERROR,
                logger = self.logger,
                timestamp_ms = self.timestamp_ms,
                "{}",
                self.message
            ),
        }
    }
}

#[derive(Error, Debug)]
#[error("host log callback panicked: {0}")]
pub struct CallbackPanic(String);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// Logger callback handed to the engine with `setupLoggerCallback`.
///
/// Runs on the thread that is inside the engine call. Failures and panics of
/// the host sink are parked in the pending error slot and never unwind into
/// the engine.
pub(crate) unsafe extern "C" fn forward_engine_log(
    level: c_int,
    timestamp_ms: c_long,
    logger_name: *mut c_char,
    message: *mut c_char,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let logger = unsafe { marshal::borrow_str(logger_name) };
        let message = unsafe { marshal::borrow_str(message) };
        let record = EngineLogRecord {
            level: EngineLogLevel::from_raw(level),
            timestamp_ms: i64::from(timestamp_ms),
            logger: &logger,
            message: &message,
        };
        match Isolate::get() {
            Some(isolate) => isolate.host().on_log(&record),
            None => {
                record.emit();
                Ok(())
            }
        }
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(err)) => set_pending_error(err),
        Err(payload) => set_pending_error(CallbackPanic(panic_message(payload.as_ref()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_filter_maps_to_engine_level() {
        assert_eq!(engine_level(LevelFilter::TRACE), 5);
        assert_eq!(engine_level(LevelFilter::DEBUG), 10);
        assert_eq!(engine_level(LevelFilter::INFO), 20);
        assert_eq!(engine_level(LevelFilter::WARN), 30);
        assert_eq!(engine_level(LevelFilter::ERROR), 40);
        assert_eq!(engine_level(LevelFilter::OFF), ENGINE_LEVEL_OFF);
    }

    #[test]
    fn raw_levels_round_down() {
        assert_eq!(EngineLogLevel::from_raw(0), EngineLogLevel::Trace);
        assert_eq!(EngineLogLevel::from_raw(10), EngineLogLevel::Debug);
        assert_eq!(EngineLogLevel::from_raw(25), EngineLogLevel::Info);
        assert_eq!(EngineLogLevel::from_raw(30), EngineLogLevel::Warn);
        assert_eq!(EngineLogLevel::from_raw(50), EngineLogLevel::Error);
        for level in [
            EngineLogLevel::Trace,
            EngineLogLevel::Debug,
            EngineLogLevel::Info,
            EngineLogLevel::Warn,
            EngineLogLevel::Error,
        ] {
            assert_eq!(EngineLogLevel::from_raw(level.as_raw()), level);
        }
    }

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
