#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    sync::atomic::{AtomicU8, Ordering},
};

use powsybl_bridge::{
    BoxError, BridgeConfig, Engine, EngineLogLevel, EngineLogRecord, Handle, Host,
};
use tracing::level_filters::LevelFilter;

pub const JAVA_LIBRARY_PATH: &str = "/opt/powsybl/lib";

static LEVEL: AtomicU8 = AtomicU8::new(5);

thread_local! {
    static FAIL_LOGS: Cell<bool> = const { Cell::new(false) };
    static PANIC_LOGS: Cell<bool> = const { Cell::new(false) };
    static RECORDS: RefCell<Vec<LogLine>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: EngineLogLevel,
    pub logger: String,
    pub message: String,
}

/// Host collecting engine logs per thread, optionally failing the sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestHost;

impl Host for TestHost {
    fn log_level(&self) -> LevelFilter {
        match LEVEL.load(Ordering::Relaxed) {
            0 => LevelFilter::OFF,
            1 => LevelFilter::ERROR,
            2 => LevelFilter::WARN,
            3 => LevelFilter::INFO,
            4 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    fn on_log(&self, record: &EngineLogRecord<'_>) -> Result<(), BoxError> {
        RECORDS.with(|records| {
            records.borrow_mut().push(LogLine {
                level: record.level,
                logger: record.logger.to_string(),
                message: record.message.to_string(),
            });
        });
        if PANIC_LOGS.get() {
            panic!("sink exploded");
        }
        if FAIL_LOGS.get() {
            return Err(std::io::Error::other("log sink unavailable").into());
        }
        Ok(())
    }
}

/// Host verbosity for every thread of the test binary.
pub fn set_host_level(level: LevelFilter) {
    let raw = if level == LevelFilter::OFF {
        0
    } else if level == LevelFilter::ERROR {
        1
    } else if level == LevelFilter::WARN {
        2
    } else if level == LevelFilter::INFO {
        3
    } else if level == LevelFilter::DEBUG {
        4
    } else {
        5
    };
    LEVEL.store(raw, Ordering::Relaxed);
}

/// Makes the log sink fail on the current thread.
pub fn fail_logs(fail: bool) {
    FAIL_LOGS.set(fail);
}

/// Makes the log sink panic on the current thread.
pub fn panic_logs(panic: bool) {
    PANIC_LOGS.set(panic);
}

pub fn take_logs() -> Vec<LogLine> {
    RECORDS.with(|records| std::mem::take(&mut *records.borrow_mut()))
}

pub fn config() -> BridgeConfig {
    BridgeConfig::builder()
        .java_library_path(JAVA_LIBRARY_PATH)
        .config_read(false)
        .build()
}

/// The shared engine, created on first use.
pub fn engine() -> Engine {
    Engine::init(powsybl_loopback::api(), TestHost, &config()).expect("engine isolate")
}

pub fn four_substations(engine: &Engine) -> Handle {
    engine
        .create_network("four_substations", "")
        .expect("four substations network")
}

/// Runs `f` on a fresh thread, which starts out detached.
pub fn on_new_thread<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::spawn(f).join().expect("test thread panicked")
}
