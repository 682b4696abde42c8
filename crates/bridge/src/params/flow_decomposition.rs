use std::ffi::c_int;

use powsybl_sys::{self as sys, EngineApi, Exc, Thread};

use super::{HostFree, Parameters, flag, is_set};
use crate::{error::Result, isolate::Isolate, marshal::{EngineBox, EngineFree}};

#[derive(Debug, Clone, PartialEq)]
pub struct FlowDecompositionParameters {
    pub enable_losses_compensation: bool,
    pub losses_compensation_epsilon: f64,
    pub sensitivity_epsilon: f64,
    pub rescale_enabled: bool,
    pub dc_fallback_enabled_after_ac_divergence: bool,
    pub sensitivity_variable_batch_size: c_int,
}

impl Default for FlowDecompositionParameters {
    fn default() -> Self {
        Self {
            enable_losses_compensation: false,
            losses_compensation_epsilon: 1e-5,
            sensitivity_epsilon: 1e-5,
            rescale_enabled: false,
            dc_fallback_enabled_after_ac_divergence: true,
            sensitivity_variable_batch_size: 15_000,
        }
    }
}

// Scalars only.
impl HostFree for sys::FlowDecompositionParameters {
    unsafe fn free_host_fields(&mut self) {}
}

impl EngineFree for sys::FlowDecompositionParameters {
    fn free_fn(api: &EngineApi) -> unsafe extern "C" fn(Thread, *mut Self, Exc) {
        api.free_flow_decomposition_parameters
    }
}

impl Parameters for FlowDecompositionParameters {
    type Native = sys::FlowDecompositionParameters;

    unsafe fn from_native(native: &sys::FlowDecompositionParameters) -> Result<Self> {
        Ok(Self {
            enable_losses_compensation: is_set(native.enable_losses_compensation),
            losses_compensation_epsilon: native.losses_compensation_epsilon,
            sensitivity_epsilon: native.sensitivity_epsilon,
            rescale_enabled: is_set(native.rescale_enabled),
            dc_fallback_enabled_after_ac_divergence: is_set(
                native.dc_fallback_enabled_after_ac_divergence,
            ),
            sensitivity_variable_batch_size: native.sensitivity_variable_batch_size,
        })
    }

    fn write_native(&self, native: &mut sys::FlowDecompositionParameters) -> Result<()> {
        native.enable_losses_compensation = flag(self.enable_losses_compensation);
        native.losses_compensation_epsilon = self.losses_compensation_epsilon;
        native.sensitivity_epsilon = self.sensitivity_epsilon;
        native.rescale_enabled = flag(self.rescale_enabled);
        native.dc_fallback_enabled_after_ac_divergence =
            flag(self.dc_fallback_enabled_after_ac_divergence);
        native.sensitivity_variable_batch_size = self.sensitivity_variable_batch_size;
        Ok(())
    }

    fn create_native(isolate: &Isolate) -> Result<Option<EngineBox<Self::Native>>> {
        engine_call!(isolate, create_flow_decomposition_parameters() => EngineBox::from_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_copy_reads_back_equal() {
        let params = FlowDecompositionParameters {
            enable_losses_compensation: true,
            losses_compensation_epsilon: 2.5e-4,
            sensitivity_epsilon: 3e-6,
            rescale_enabled: true,
            dc_fallback_enabled_after_ac_divergence: false,
            sensitivity_variable_batch_size: 512,
        };
        let native = params.to_native().expect("native");
        assert_eq!(native.enable_losses_compensation, 1);
        assert_eq!(native.dc_fallback_enabled_after_ac_divergence, 0);
        assert_eq!(native.sensitivity_variable_batch_size, 512);
        let read = unsafe { FlowDecompositionParameters::from_native(&native) }.expect("read");
        assert_eq!(read, params);
    }

    #[test]
    fn any_nonzero_flag_reads_as_set() {
        let mut native = FlowDecompositionParameters::default().to_native().expect("native");
        unsafe { (*native.as_mut_ptr()).rescale_enabled = 7 };
        let read = unsafe { FlowDecompositionParameters::from_native(&native) }.expect("read");
        assert!(read.rescale_enabled);
        assert!(read.dc_fallback_enabled_after_ac_divergence);
    }
}
