use std::sync::Arc;

use tracing::level_filters::LevelFilter;

use crate::{error::BoxError, logging::EngineLogRecord};

/// Host-side hooks the bridge consults while engine calls run.
pub trait Host: Send + Sync + 'static {
    /// Verbosity pushed to the engine before every call.
    fn log_level(&self) -> LevelFilter {
        LevelFilter::current()
    }

    /// Receives engine log records, on the thread making the engine call.
    ///
    /// An error returned here fails the surrounding call with
    /// [`crate::Error::Callback`] once the engine returns.
    fn on_log(&self, record: &EngineLogRecord<'_>) -> Result<(), BoxError> {
        record.emit();
        Ok(())
    }
}

/// Forwards engine logs to `tracing` and follows its global max level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHost;

impl Host for TracingHost {}

impl<T: Host + ?Sized> Host for Arc<T> {
    fn log_level(&self) -> LevelFilter {
        (**self).log_level()
    }

    fn on_log(&self, record: &EngineLogRecord<'_>) -> Result<(), BoxError> {
        (**self).on_log(record)
    }
}
