use powsybl_sys::{self as sys, EngineApi, Exc, Thread};

use super::{
    HostFree, LoadFlowParameters, Parameters, ProviderParameters, provider_fields,
    read_provider_parameters,
};
use crate::{error::Result, isolate::Isolate, marshal::{EngineBox, EngineFree}};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensitivityAnalysisParameters {
    pub load_flow: LoadFlowParameters,
    pub provider_parameters: ProviderParameters,
}

impl HostFree for sys::SensitivityAnalysisParameters {
    unsafe fn free_host_fields(&mut self) {
        unsafe {
            self.loadflow_parameters.free_host_fields();
            provider_fields!(self).free();
        }
    }
}

impl EngineFree for sys::SensitivityAnalysisParameters {
    fn free_fn(api: &EngineApi) -> unsafe extern "C" fn(Thread, *mut Self, Exc) {
        api.free_sensitivity_analysis_parameters
    }
}

impl Parameters for SensitivityAnalysisParameters {
    type Native = sys::SensitivityAnalysisParameters;

    unsafe fn from_native(native: &sys::SensitivityAnalysisParameters) -> Result<Self> {
        Ok(Self {
            load_flow: unsafe { LoadFlowParameters::from_native(&native.loadflow_parameters) }?,
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

    fn write_native(&self, native: &mut sys::SensitivityAnalysisParameters) -> Result<()> {
        self.load_flow.write_native(&mut native.loadflow_parameters)?;
        provider_fields!(native).write(&self.provider_parameters)
    }

    fn create_native(isolate: &Isolate) -> Result<Option<EngineBox<Self::Native>>> {
        engine_call!(isolate, create_sensitivity_analysis_parameters() => EngineBox::from_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        params::{BalanceType, ConnectedComponentMode, VoltageInitMode},
    };

    fn sample() -> SensitivityAnalysisParameters {
        SensitivityAnalysisParameters {
            load_flow: LoadFlowParameters {
                voltage_init_mode: VoltageInitMode::PreviousValues,
                distributed_slack: false,
                balance_type: BalanceType::ProportionalToConformLoad,
                countries_to_balance: vec!["FR".into(), "ES".into()],
                connected_component_mode: ConnectedComponentMode::All,
                provider_parameters: vec![("slackBusSelectionMode".into(), "NAME".into())],
                ..LoadFlowParameters::default()
            },
            provider_parameters: vec![
                ("maxThreads".into(), "4".into()),
                ("flowsThreshold".into(), "0.1".into()),
            ],
        }
    }

    #[test]
    fn native_copy_reads_back_equal() {
        let params = sample();
        let native = params.to_native().expect("native");
        assert_eq!(native.loadflow_parameters.voltage_init_mode, 1);
        assert_eq!(native.loadflow_parameters.countries_to_balance_count, 2);
        assert_eq!(native.loadflow_parameters.provider_parameters_keys_count, 1);
        assert_eq!(native.provider_parameters_keys_count, 2);
        assert_eq!(native.provider_parameters_values_count, 2);
        let read = unsafe { SensitivityAnalysisParameters::from_native(&native) }.expect("read");
        assert_eq!(read, params);
    }

    #[test]
    fn nested_failure_leaves_only_written_fields_to_free() {
        let mut params = sample();
        params.load_flow.provider_parameters = vec![("bad\0key".into(), "1".into())];
        let mut native = sys::SensitivityAnalysisParameters::default();
        let err = params.write_native(&mut native).expect_err("interior NUL");
        assert!(matches!(err, Error::InvalidArgument(_)));

        assert!(!native.loadflow_parameters.countries_to_balance.is_null());
        assert!(native.provider_parameters_keys.is_null());
        unsafe { native.free_host_fields() };
        assert!(native.loadflow_parameters.countries_to_balance.is_null());
        assert_eq!(native.loadflow_parameters.countries_to_balance_count, 0);
        assert!(native.loadflow_parameters.provider_parameters_keys.is_null());
    }

    #[test]
    fn outer_failure_frees_the_nested_struct_too() {
        let mut params = sample();
        params.provider_parameters = vec![("maxThreads".into(), "bad\0value".into())];
        let mut native = sys::SensitivityAnalysisParameters::default();
        let err = params.write_native(&mut native).expect_err("interior NUL");
        assert!(matches!(err, Error::InvalidArgument(_)));

        assert!(!native.loadflow_parameters.provider_parameters_keys.is_null());
        assert!(!native.provider_parameters_keys.is_null());
        assert!(native.provider_parameters_values.is_null());
        unsafe { native.free_host_fields() };
        assert!(native.loadflow_parameters.countries_to_balance.is_null());
        assert!(native.loadflow_parameters.provider_parameters_keys.is_null());
        assert!(native.loadflow_parameters.provider_parameters_values.is_null());
        assert!(native.provider_parameters_keys.is_null());
        assert_eq!(native.provider_parameters_keys_count, 0);
    }

    #[test]
    fn partial_write_is_dropped_cleanly() {
        let mut params = sample();
        params.provider_parameters = vec![("bad\0key".into(), "1".into())];
        let err = params.to_native().expect_err("interior NUL");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
