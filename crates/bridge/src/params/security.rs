use powsybl_sys::{self as sys, EngineApi, Exc, Thread};

use super::{
    HostFree, LoadFlowParameters, Parameters, ProviderParameters, provider_fields,
    read_provider_parameters,
};
use crate::{error::Result, isolate::Isolate, marshal::{EngineBox, EngineFree}};

/// Limits beyond which a post-contingency state counts as a violation.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityAnalysisParameters {
    pub load_flow: LoadFlowParameters,
    pub flow_proportional_threshold: f64,
    pub low_voltage_proportional_threshold: f64,
    pub low_voltage_absolute_threshold: f64,
    pub high_voltage_proportional_threshold: f64,
    pub high_voltage_absolute_threshold: f64,
    pub provider_parameters: ProviderParameters,
}

impl Default for SecurityAnalysisParameters {
    fn default() -> Self {
        Self {
            load_flow: LoadFlowParameters::default(),
            flow_proportional_threshold: 0.1,
            low_voltage_proportional_threshold: 0.0,
            low_voltage_absolute_threshold: 0.0,
            high_voltage_proportional_threshold: 0.0,
            high_voltage_absolute_threshold: 0.0,
            provider_parameters: Vec::new(),
        }
    }
}

impl HostFree for sys::SecurityAnalysisParameters {
    unsafe fn free_host_fields(&mut self) {
        unsafe {
            self.loadflow_parameters.free_host_fields();
            provider_fields!(self).free();
        }
    }
}

impl EngineFree for sys::SecurityAnalysisParameters {
    fn free_fn(api: &EngineApi) -> unsafe extern "C" fn(Thread, *mut Self, Exc) {
        api.free_security_analysis_parameters
    }
}

impl Parameters for SecurityAnalysisParameters {
    type Native = sys::SecurityAnalysisParameters;

    unsafe fn from_native(native: &sys::SecurityAnalysisParameters) -> Result<Self> {
        Ok(Self {
            load_flow: unsafe { LoadFlowParameters::from_native(&native.loadflow_parameters) }?,
            flow_proportional_threshold: native.flow_proportional_threshold,
            low_voltage_proportional_threshold: native.low_voltage_proportional_threshold,
            low_voltage_absolute_threshold: native.low_voltage_absolute_threshold,
            high_voltage_proportional_threshold: native.high_voltage_proportional_threshold,
            high_voltage_absolute_threshold: native.high_voltage_absolute_threshold,
            provider_parameters: unsafe {
                read_provider_parameters(
                    native.provider_parameters_keys,
                    native.provider_parameters_keys_count,
                    native.provider_parameters_values,
                    native.provider_parameters_values_count,
                )
            }?,
        })
    }

    fn write_native(&self, native: &mut sys::SecurityAnalysisParameters) -> Result<()> {
        native.flow_proportional_threshold = self.flow_proportional_threshold;
        native.low_voltage_proportional_threshold = self.low_voltage_proportional_threshold;
        native.low_voltage_absolute_threshold = self.low_voltage_absolute_threshold;
        native.high_voltage_proportional_threshold = self.high_voltage_proportional_threshold;
        native.high_voltage_absolute_threshold = self.high_voltage_absolute_threshold;
        self.load_flow.write_native(&mut native.loadflow_parameters)?;
        provider_fields!(native).write(&self.provider_parameters)
    }

    fn create_native(isolate: &Isolate) -> Result<Option<EngineBox<Self::Native>>> {
        engine_call!(isolate, create_security_analysis_parameters() => EngineBox::from_raw)
    }
}
