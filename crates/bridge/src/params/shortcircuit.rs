use powsybl_sys::{self as sys, EngineApi, Exc, Thread};

use super::{
    HostFree, Parameters, ProviderParameters, flag, is_set, provider_fields,
    read_provider_parameters,
};
use crate::{error::Result, isolate::Isolate, marshal::{EngineBox, EngineFree}};

native_enum! {
    pub enum StudyType: "short-circuit study type" {
        SubTransient = 0,
        Transient = 1,
        Steady = 2,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShortCircuitAnalysisParameters {
    pub with_voltage_result: bool,
    pub with_feeder_result: bool,
    pub with_limit_violations: bool,
    pub study_type: StudyType,
    pub with_fortescue_result: bool,
    pub min_voltage_drop_proportional_threshold: f64,
    pub provider_parameters: ProviderParameters,
}

impl Default for ShortCircuitAnalysisParameters {
    fn default() -> Self {
        Self {
            with_voltage_result: true,
            with_feeder_result: true,
            with_limit_violations: true,
            study_type: StudyType::Transient,
            with_fortescue_result: false,
            min_voltage_drop_proportional_threshold: 0.0,
            provider_parameters: Vec::new(),
        }
    }
}

impl HostFree for sys::ShortCircuitAnalysisParameters {
    unsafe fn free_host_fields(&mut self) {
        unsafe { provider_fields!(self).free() };
    }
}

impl EngineFree for sys::ShortCircuitAnalysisParameters {
    fn free_fn(api: &EngineApi) -> unsafe extern "C" fn(Thread, *mut Self, Exc) {
        api.free_short_circuit_analysis_parameters
    }
}

impl Parameters for ShortCircuitAnalysisParameters {
    type Native = sys::ShortCircuitAnalysisParameters;

    unsafe fn from_native(native: &sys::ShortCircuitAnalysisParameters) -> Result<Self> {
        Ok(Self {
            with_voltage_result: is_set(native.with_voltage_result),
            with_feeder_result: is_set(native.with_feeder_result),
            with_limit_violations: is_set(native.with_limit_violations),
            study_type: native.study_type.try_into()?,
            with_fortescue_result: is_set(native.with_fortescue_result),
            min_voltage_drop_proportional_threshold: native
                .min_voltage_drop_proportional_threshold,
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

    fn write_native(&self, native: &mut sys::ShortCircuitAnalysisParameters) -> Result<()> {
        native.with_voltage_result = flag(self.with_voltage_result);
        native.with_feeder_result = flag(self.with_feeder_result);
        native.with_limit_violations = flag(self.with_limit_violations);
        native.study_type = self.study_type.as_raw();
        native.with_fortescue_result = flag(self.with_fortescue_result);
        native.min_voltage_drop_proportional_threshold =
            self.min_voltage_drop_proportional_threshold;
        provider_fields!(native).write(&self.provider_parameters)
    }

    fn create_native(isolate: &Isolate) -> Result<Option<EngineBox<Self::Native>>> {
        engine_call!(isolate, create_short_circuit_analysis_parameters() => EngineBox::from_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn study_type_round_trips_through_native() {
        let params = ShortCircuitAnalysisParameters {
            study_type: StudyType::SubTransient,
            with_fortescue_result: true,
            min_voltage_drop_proportional_threshold: 0.05,
            ..ShortCircuitAnalysisParameters::default()
        };
        let native = params.to_native().expect("native");
        assert_eq!(native.study_type, 0);
        let read = unsafe { ShortCircuitAnalysisParameters::from_native(&native) }.expect("read");
        assert_eq!(read, params);
    }

    #[test]
    fn unknown_study_type_is_rejected() {
        let native = sys::ShortCircuitAnalysisParameters {
            study_type: 7,
            ..sys::ShortCircuitAnalysisParameters::default()
        };
        let err = unsafe { ShortCircuitAnalysisParameters::from_native(&native) }
            .expect_err("study type");
        assert!(matches!(err, Error::InvalidEnum { value: 7, .. }));
    }
}
