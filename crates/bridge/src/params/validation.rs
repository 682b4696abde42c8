use powsybl_sys::{self as sys, EngineApi, Exc, Thread};

use super::{
    HostFree, LoadFlowParameters, Parameters, alloc_string, flag, free_string, is_set,
};
use crate::{
    error::Result,
    isolate::Isolate,
    marshal::{EngineBox, EngineFree, copy_str},
};

/// Settings of a load flow results validation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFlowValidationParameters {
    pub load_flow: LoadFlowParameters,
    pub threshold: f64,
    pub verbose: bool,
    /// Name of the load flow implementation whose results are validated.
    pub load_flow_name: String,
    pub epsilon_x: f64,
    pub apply_reactance_correction: bool,
    pub ok_missing_values: bool,
    pub no_requirement_if_reactive_bound_inversion: bool,
    pub compare_results: bool,
    pub check_main_component_only: bool,
    pub no_requirement_if_setpoint_outside_power_bounds: bool,
}

impl Default for LoadFlowValidationParameters {
    fn default() -> Self {
        Self {
            load_flow: LoadFlowParameters::default(),
            threshold: 0.0,
            verbose: false,
            load_flow_name: "OpenLoadFlow".to_string(),
            epsilon_x: 0.1,
            apply_reactance_correction: false,
            ok_missing_values: false,
            no_requirement_if_reactive_bound_inversion: false,
            compare_results: false,
            check_main_component_only: true,
            no_requirement_if_setpoint_outside_power_bounds: false,
        }
    }
}

impl HostFree for sys::LoadFlowValidationParameters {
    unsafe fn free_host_fields(&mut self) {
        unsafe {
            self.loadflow_parameters.free_host_fields();
            free_string(&mut self.loadflow_name);
        }
    }
}

impl EngineFree for sys::LoadFlowValidationParameters {
    fn free_fn(api: &EngineApi) -> unsafe extern "C" fn(Thread, *mut Self, Exc) {
        api.free_validation_config
    }
}

impl Parameters for LoadFlowValidationParameters {
    type Native = sys::LoadFlowValidationParameters;

    unsafe fn from_native(native: &sys::LoadFlowValidationParameters) -> Result<Self> {
        Ok(Self {
            load_flow: unsafe { LoadFlowParameters::from_native(&native.loadflow_parameters) }?,
            threshold: native.threshold,
            verbose: is_set(native.verbose),
            load_flow_name: unsafe { copy_str(native.loadflow_name) },
            epsilon_x: native.epsilon_x,
            apply_reactance_correction: is_set(native.apply_reactance_correction),
            ok_missing_values: is_set(native.ok_missing_values),
            no_requirement_if_reactive_bound_inversion: is_set(
                native.no_requirement_if_reactive_bound_inversion,
            ),
            compare_results: is_set(native.compare_results),
            check_main_component_only: is_set(native.check_main_component_only),
            no_requirement_if_setpoint_outside_power_bounds: is_set(
                native.no_requirement_if_setpoint_outside_power_bounds,
            ),
        })
    }

    fn write_native(&self, native: &mut sys::LoadFlowValidationParameters) -> Result<()> {
        native.threshold = self.threshold;
        native.verbose = flag(self.verbose);
        native.epsilon_x = self.epsilon_x;
        native.apply_reactance_correction = flag(self.apply_reactance_correction);
        native.ok_missing_values = flag(self.ok_missing_values);
        native.no_requirement_if_reactive_bound_inversion =
            flag(self.no_requirement_if_reactive_bound_inversion);
        native.compare_results = flag(self.compare_results);
        native.check_main_component_only = flag(self.check_main_component_only);
        native.no_requirement_if_setpoint_outside_power_bounds =
            flag(self.no_requirement_if_setpoint_outside_power_bounds);
        native.loadflow_name = alloc_string(&self.load_flow_name)?;
        self.load_flow.write_native(&mut native.loadflow_parameters)
    }

    fn create_native(isolate: &Isolate) -> Result<Option<EngineBox<Self::Native>>> {
        engine_call!(isolate, create_validation_config() => EngineBox::from_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn nested_load_flow_parameters_survive_the_copy() {
        let params = LoadFlowValidationParameters {
            load_flow: LoadFlowParameters {
                countries_to_balance: vec!["FR".into()],
                ..LoadFlowParameters::default()
            },
            threshold: 0.5,
            verbose: true,
            load_flow_name: "OpenLoadFlow".into(),
            ..LoadFlowValidationParameters::default()
        };
        let native = params.to_native().expect("native");
        assert_eq!(native.loadflow_parameters.countries_to_balance_count, 1);
        let read = unsafe { LoadFlowValidationParameters::from_native(&native) }.expect("read");
        assert_eq!(read, params);
    }

    #[test]
    fn nested_failure_frees_outer_fields() {
        let params = LoadFlowValidationParameters {
            load_flow: LoadFlowParameters {
                countries_to_balance: vec!["F\0R".into()],
                ..LoadFlowParameters::default()
            },
            load_flow_name: "OpenLoadFlow".into(),
            ..LoadFlowValidationParameters::default()
        };
        assert!(matches!(params.to_native(), Err(Error::InvalidArgument(_))));
    }
}
