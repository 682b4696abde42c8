#[macro_use]
mod macros;

pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod handle;
pub mod host;
pub mod isolate;
pub mod logging;
pub mod marshal;
pub mod params;
pub mod results;

pub use config::{BridgeConfig, BridgeConfigBuilder};
pub use engine::{ElementFilter, ElementType, Engine};
pub use error::{BoxError, Error, Result, has_pending_error, set_pending_error};
pub use guard::ThreadGuard;
pub use handle::Handle;
pub use host::{Host, TracingHost};
pub use isolate::Isolate;
pub use logging::{EngineLogLevel, EngineLogRecord, TRACE_TARGET_ENGINE};
pub use params::{
    BalanceType, ConnectedComponentMode, FlowDecompositionParameters, LoadFlowParameters,
    LoadFlowValidationParameters, Parameters, ProviderParameters, SecurityAnalysisParameters,
    SensitivityAnalysisParameters, ShortCircuitAnalysisParameters, StudyType, VoltageInitMode,
};
pub use results::{ComponentStatus, LoadFlowComponentResult, NetworkMetadata};
