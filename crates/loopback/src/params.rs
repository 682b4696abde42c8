//! Engine-side parameter defaults and reading of host-built structs.

use std::{
    ffi::{CStr, c_char, c_int},
    slice,
};

use powsybl_sys::{
    FlowDecompositionParameters, LoadFlowParameters, LoadFlowValidationParameters,
    SecurityAnalysisParameters, SensitivityAnalysisParameters, ShortCircuitAnalysisParameters,
};

use crate::{
    error::{EngineError, Result},
    ledger::{self, Kind, StringPool},
};

const BALANCE_PROPORTIONAL_TO_GENERATION_P_MAX: c_int = 1;
const CONNECTED_COMPONENT_MAIN: c_int = 1;
const STUDY_TYPE_TRANSIENT: c_int = 1;

fn load_flow_defaults() -> LoadFlowParameters {
    LoadFlowParameters {
        read_slack_bus: 1,
        write_slack_bus: 1,
        distributed_slack: 1,
        balance_type: BALANCE_PROPORTIONAL_TO_GENERATION_P_MAX,
        dc_use_transformer_ratio: 1,
        connected_component_mode: CONNECTED_COMPONENT_MAIN,
        ..LoadFlowParameters::default()
    }
}

pub fn create_load_flow() -> *mut LoadFlowParameters {
    ledger::structure(Kind::Parameters, load_flow_defaults(), StringPool::default())
}

pub fn create_validation() -> *mut LoadFlowValidationParameters {
    let mut pool = StringPool::default();
    let loadflow_name = pool.string("OpenLoadFlow");
    ledger::structure(
        Kind::Parameters,
        LoadFlowValidationParameters {
            loadflow_parameters: load_flow_defaults(),
            epsilon_x: 0.1,
            loadflow_name,
            check_main_component_only: 1,
            ..LoadFlowValidationParameters::default()
        },
        pool,
    )
}

pub fn create_security_analysis() -> *mut SecurityAnalysisParameters {
    ledger::structure(
        Kind::Parameters,
        SecurityAnalysisParameters {
            loadflow_parameters: load_flow_defaults(),
            flow_proportional_threshold: 0.1,
            ..SecurityAnalysisParameters::default()
        },
        StringPool::default(),
    )
}

pub fn create_sensitivity_analysis() -> *mut SensitivityAnalysisParameters {
    ledger::structure(
        Kind::Parameters,
        SensitivityAnalysisParameters {
            loadflow_parameters: load_flow_defaults(),
            ..SensitivityAnalysisParameters::default()
        },
        StringPool::default(),
    )
}

pub fn create_flow_decomposition() -> *mut FlowDecompositionParameters {
    ledger::structure(
        Kind::Parameters,
        FlowDecompositionParameters {
            losses_compensation_epsilon: 1e-5,
            sensitivity_epsilon: 1e-5,
            dc_fallback_enabled_after_ac_divergence: 1,
            sensitivity_variable_batch_size: 15_000,
            ..FlowDecompositionParameters::default()
        },
        StringPool::default(),
    )
}

pub fn create_short_circuit_analysis() -> *mut ShortCircuitAnalysisParameters {
    ledger::structure(
        Kind::Parameters,
        ShortCircuitAnalysisParameters {
            with_voltage_result: 1,
            with_feeder_result: 1,
            with_limit_violations: 1,
            study_type: STUDY_TYPE_TRANSIENT,
            ..ShortCircuitAnalysisParameters::default()
        },
        StringPool::default(),
    )
}

pub fn release<T>(ptr: *mut T) -> Result<()> {
    ledger::release(ptr, &[Kind::Parameters])
}

/// Copies a host string argument. Null is rejected.
pub fn read_str(ptr: *const c_char, what: &str) -> Result<String> {
    if ptr.is_null() {
        return Err(EngineError::InvalidArgument(format!("{what} is null")));
    }
    Ok(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Copies a host array of `count` strings.
pub fn read_strings(ptr: *const *mut c_char, count: c_int, what: &str) -> Result<Vec<String>> {
    let len = usize::try_from(count)
        .map_err(|_| EngineError::InvalidArgument(format!("negative {what} count {count}")))?;
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(EngineError::InvalidArgument(format!(
            "{what} is null with count {count}"
        )));
    }
    unsafe { slice::from_raw_parts(ptr, len) }
        .iter()
        .map(|item| read_str(*item, what))
        .collect()
}

/// Copies a host array of `count` plain values.
pub fn read_values<T: Copy>(ptr: *const T, count: c_int, what: &str) -> Result<Vec<T>> {
    let len = usize::try_from(count)
        .map_err(|_| EngineError::InvalidArgument(format!("negative {what} count {count}")))?;
    if len == 0 {
        return Ok(Vec::new());
    }
    if ptr.is_null() {
        return Err(EngineError::InvalidArgument(format!(
            "{what} is null with count {count}"
        )));
    }
    Ok(unsafe { slice::from_raw_parts(ptr, len) }.to_vec())
}

/// What a load flow run needs from the host-built parameters.
#[derive(Debug, Clone)]
pub struct LoadFlowSettings {
    pub distributed_slack: bool,
    pub countries_to_balance: Vec<String>,
    pub all_components: bool,
    pub provider_parameters: Vec<(String, String)>,
}

impl LoadFlowSettings {
    pub fn provider_parameter(&self, key: &str) -> Option<&str> {
        self.provider_parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

pub fn read_load_flow(ptr: *const LoadFlowParameters) -> Result<LoadFlowSettings> {
    if ptr.is_null() {
        return Err(EngineError::InvalidArgument(
            "load flow parameters are null".to_string(),
        ));
    }
    let native = unsafe { &*ptr };
    let check = |kind: &'static str, value: c_int, max: c_int| {
        if (0..=max).contains(&value) {
            Ok(())
        } else {
            Err(EngineError::InvalidEnum { kind, value })
        }
    };
    check("voltage init mode", native.voltage_init_mode, 2)?;
    check("balance type", native.balance_type, 3)?;
    check("connected component mode", native.connected_component_mode, 1)?;
    if native.provider_parameters_keys_count != native.provider_parameters_values_count {
        return Err(EngineError::InvalidArgument(
            "provider parameter keys and values differ in length".to_string(),
        ));
    }
    let keys = read_strings(
        native.provider_parameters_keys,
        native.provider_parameters_keys_count,
        "provider parameter keys",
    )?;
    let values = read_strings(
        native.provider_parameters_values,
        native.provider_parameters_values_count,
        "provider parameter values",
    )?;
    Ok(LoadFlowSettings {
        distributed_slack: native.distributed_slack != 0,
        countries_to_balance: read_strings(
            native.countries_to_balance,
            native.countries_to_balance_count,
            "countries to balance",
        )?,
        all_components: native.connected_component_mode == 0,
        provider_parameters: keys.into_iter().zip(values).collect(),
    })
}
