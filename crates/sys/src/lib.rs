//! Raw C ABI of the powsybl native engine.
//!
//! Every struct here is laid out exactly as the engine's `pypowsybl-api.h`
//! expects. Nothing in this crate owns memory: ownership rules live in
//! `powsybl-bridge`.

use std::{
    ffi::{c_char, c_int, c_long, c_uchar, c_void},
    ptr,
};

mod api;

pub use api::EngineApi;
pub use libloading::Error as LoadError;

/// Opaque engine isolate.
#[repr(C)]
pub struct GraalIsolate {
    _private: [u8; 0],
}

/// Opaque per-thread attachment to an isolate.
#[repr(C)]
pub struct GraalIsolateThread {
    _private: [u8; 0],
}

pub type Thread = *mut GraalIsolateThread;
pub type Exc = *mut ExceptionHandler;

/// Engine log sink installed with `setupLoggerCallback`.
pub type LoggerCallback = unsafe extern "C" fn(
    level: c_int,
    timestamp_ms: c_long,
    logger_name: *mut c_char,
    message: *mut c_char,
);

/// Trailing out-parameter of every engine call. A non-null `message` after
/// the call means the call failed; the string belongs to the engine and is
/// released with `freeString`.
#[repr(C)]
#[derive(Debug)]
pub struct ExceptionHandler {
    pub message: *mut c_char,
}

impl Default for ExceptionHandler {
    fn default() -> Self {
        Self {
            message: ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Array {
    pub ptr: *mut c_void,
    pub length: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct StringMap {
    pub length: c_int,
    pub keys: *mut *mut c_char,
    pub values: *mut *mut c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct LoadFlowComponentResult {
    pub connected_component_num: c_int,
    pub synchronous_component_num: c_int,
    pub status: c_int,
    pub status_text: *mut c_char,
    pub iteration_count: c_int,
    pub slack_bus_id: *mut c_char,
    pub slack_bus_active_power_mismatch: f64,
    pub distributed_active_power: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct NetworkMetadata {
    pub id: *mut c_char,
    pub name: *mut c_char,
    pub case_date: f64,
    pub source_format: *mut c_char,
    pub forecast_distance: c_int,
}

#[repr(C)]
#[derive(Debug)]
pub struct LoadFlowParameters {
    pub voltage_init_mode: c_int,
    pub transformer_voltage_control_on: c_uchar,
    pub no_generator_reactive_limits: c_uchar,
    pub phase_shifter_regulation_on: c_uchar,
    pub twt_split_shunt_admittance: c_uchar,
    pub simul_shunt: c_uchar,
    pub read_slack_bus: c_uchar,
    pub write_slack_bus: c_uchar,
    pub distributed_slack: c_uchar,
    pub balance_type: c_int,
    pub dc_use_transformer_ratio: c_uchar,
    pub countries_to_balance: *mut *mut c_char,
    pub countries_to_balance_count: c_int,
    pub connected_component_mode: c_int,
    pub provider_parameters_keys: *mut *mut c_char,
    pub provider_parameters_keys_count: c_int,
    pub provider_parameters_values: *mut *mut c_char,
    pub provider_parameters_values_count: c_int,
}

impl Default for LoadFlowParameters {
    fn default() -> Self {
        Self {
            voltage_init_mode: 0,
            transformer_voltage_control_on: 0,
            no_generator_reactive_limits: 0,
            phase_shifter_regulation_on: 0,
            twt_split_shunt_admittance: 0,
            simul_shunt: 0,
            read_slack_bus: 0,
            write_slack_bus: 0,
            distributed_slack: 0,
            balance_type: 0,
            dc_use_transformer_ratio: 0,
            countries_to_balance: ptr::null_mut(),
            countries_to_balance_count: 0,
            connected_component_mode: 0,
            provider_parameters_keys: ptr::null_mut(),
            provider_parameters_keys_count: 0,
            provider_parameters_values: ptr::null_mut(),
            provider_parameters_values_count: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct LoadFlowValidationParameters {
    pub loadflow_parameters: LoadFlowParameters,
    pub threshold: f64,
    pub verbose: c_uchar,
    pub loadflow_name: *mut c_char,
    pub epsilon_x: f64,
    pub apply_reactance_correction: c_uchar,
    pub ok_missing_values: c_uchar,
    pub no_requirement_if_reactive_bound_inversion: c_uchar,
    pub compare_results: c_uchar,
    pub check_main_component_only: c_uchar,
    pub no_requirement_if_setpoint_outside_power_bounds: c_uchar,
}

impl Default for LoadFlowValidationParameters {
    fn default() -> Self {
        Self {
            loadflow_parameters: LoadFlowParameters::default(),
            threshold: 0.0,
            verbose: 0,
            loadflow_name: ptr::null_mut(),
            epsilon_x: 0.0,
            apply_reactance_correction: 0,
            ok_missing_values: 0,
            no_requirement_if_reactive_bound_inversion: 0,
            compare_results: 0,
            check_main_component_only: 0,
            no_requirement_if_setpoint_outside_power_bounds: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct SecurityAnalysisParameters {
    pub loadflow_parameters: LoadFlowParameters,
    pub flow_proportional_threshold: f64,
    pub low_voltage_proportional_threshold: f64,
    pub low_voltage_absolute_threshold: f64,
    pub high_voltage_proportional_threshold: f64,
    pub high_voltage_absolute_threshold: f64,
    pub provider_parameters_keys: *mut *mut c_char,
    pub provider_parameters_keys_count: c_int,
    pub provider_parameters_values: *mut *mut c_char,
    pub provider_parameters_values_count: c_int,
}

impl Default for SecurityAnalysisParameters {
    fn default() -> Self {
        Self {
            loadflow_parameters: LoadFlowParameters::default(),
            flow_proportional_threshold: 0.0,
            low_voltage_proportional_threshold: 0.0,
            low_voltage_absolute_threshold: 0.0,
            high_voltage_proportional_threshold: 0.0,
            high_voltage_absolute_threshold: 0.0,
            provider_parameters_keys: ptr::null_mut(),
            provider_parameters_keys_count: 0,
            provider_parameters_values: ptr::null_mut(),
            provider_parameters_values_count: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug)]
pub struct SensitivityAnalysisParameters {
    pub loadflow_parameters: LoadFlowParameters,
    pub provider_parameters_keys: *mut *mut c_char,
    pub provider_parameters_keys_count: c_int,
    pub provider_parameters_values: *mut *mut c_char,
    pub provider_parameters_values_count: c_int,
}

impl Default for SensitivityAnalysisParameters {
    fn default() -> Self {
        Self {
            loadflow_parameters: LoadFlowParameters::default(),
            provider_parameters_keys: ptr::null_mut(),
            provider_parameters_keys_count: 0,
            provider_parameters_values: ptr::null_mut(),
            provider_parameters_values_count: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Default)]
pub struct FlowDecompositionParameters {
    pub enable_losses_compensation: c_uchar,
    pub losses_compensation_epsilon: f64,
    pub sensitivity_epsilon: f64,
    pub rescale_enabled: c_uchar,
    pub dc_fallback_enabled_after_ac_divergence: c_uchar,
    pub sensitivity_variable_batch_size: c_int,
}

#[repr(C)]
#[derive(Debug)]
pub struct ShortCircuitAnalysisParameters {
    pub with_voltage_result: c_uchar,
    pub with_feeder_result: c_uchar,
    pub with_limit_violations: c_uchar,
    pub study_type: c_int,
    pub with_fortescue_result: c_uchar,
    pub min_voltage_drop_proportional_threshold: f64,
    pub provider_parameters_keys: *mut *mut c_char,
    pub provider_parameters_keys_count: c_int,
    pub provider_parameters_values: *mut *mut c_char,
    pub provider_parameters_values_count: c_int,
}

impl Default for ShortCircuitAnalysisParameters {
    fn default() -> Self {
        Self {
            with_voltage_result: 0,
            with_feeder_result: 0,
            with_limit_violations: 0,
            study_type: 0,
            with_fortescue_result: 0,
            min_voltage_drop_proportional_threshold: 0.0,
            provider_parameters_keys: ptr::null_mut(),
            provider_parameters_keys_count: 0,
            provider_parameters_values: ptr::null_mut(),
            provider_parameters_values_count: 0,
        }
    }
}

/// Handles are plain pointers on the wire.
pub type ObjectHandle = *mut c_void;
