use powsybl_sys as sys;

use crate::{error::Result, marshal::copy_str};

native_enum! {
    pub enum ComponentStatus: "load flow component status" {
        Converged = 0,
        MaxIterationReached = 1,
        Failed = 2,
        NoCalculation = 3,
    }
}

/// Outcome of a load flow on one connected component.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFlowComponentResult {
    pub connected_component_num: i32,
    pub synchronous_component_num: i32,
    pub status: ComponentStatus,
    pub status_text: String,
    pub iteration_count: i32,
    pub slack_bus_id: String,
    pub slack_bus_active_power_mismatch: f64,
    pub distributed_active_power: f64,
}

impl LoadFlowComponentResult {
    /// # Safety
    /// String fields of `native` are null or valid engine strings.
    pub(crate) unsafe fn from_native(native: &sys::LoadFlowComponentResult) -> Result<Self> {
        Ok(Self {
            connected_component_num: native.connected_component_num,
            synchronous_component_num: native.synchronous_component_num,
            status: ComponentStatus::try_from(native.status)?,
            status_text: unsafe { copy_str(native.status_text) },
            iteration_count: native.iteration_count,
            slack_bus_id: unsafe { copy_str(native.slack_bus_id) },
            slack_bus_active_power_mismatch: native.slack_bus_active_power_mismatch,
            distributed_active_power: native.distributed_active_power,
        })
    }

    #[must_use]
    pub fn converged(&self) -> bool {
        self.status == ComponentStatus::Converged
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMetadata {
    pub id: String,
    pub name: String,
    /// Case date, in seconds since the Unix epoch.
    pub case_date: f64,
    pub source_format: String,
    pub forecast_distance: i32,
}

impl NetworkMetadata {
    /// # Safety
    /// String fields of `native` are null or valid engine strings.
    pub(crate) unsafe fn from_native(native: &sys::NetworkMetadata) -> Self {
        unsafe {
            Self {
                id: copy_str(native.id),
                name: copy_str(native.name),
                case_date: native.case_date,
                source_format: copy_str(native.source_format),
                forecast_distance: native.forecast_distance,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;
    use crate::error::Error;

    #[test]
    fn component_result_is_copied() {
        let text = CString::new("CONVERGED").expect("no NUL");
        let slack = CString::new("VL1_0").expect("no NUL");
        let native = sys::LoadFlowComponentResult {
            connected_component_num: 0,
            synchronous_component_num: 0,
            status: 0,
            status_text: text.as_ptr().cast_mut(),
            iteration_count: 3,
            slack_bus_id: slack.as_ptr().cast_mut(),
            slack_bus_active_power_mismatch: -0.006,
            distributed_active_power: 1.2,
        };
        let result = unsafe { LoadFlowComponentResult::from_native(&native) }.expect("result");
        assert!(result.converged());
        assert_eq!(result.status_text, "CONVERGED");
        assert_eq!(result.slack_bus_id, "VL1_0");
        assert_eq!(result.iteration_count, 3);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let native = sys::LoadFlowComponentResult {
            connected_component_num: 0,
            synchronous_component_num: 0,
            status: 42,
            status_text: std::ptr::null_mut(),
            iteration_count: 0,
            slack_bus_id: std::ptr::null_mut(),
            slack_bus_active_power_mismatch: 0.0,
            distributed_active_power: 0.0,
        };
        let err = unsafe { LoadFlowComponentResult::from_native(&native) }.expect_err("status");
        assert!(matches!(err, Error::InvalidEnum { value: 42, .. }));
    }
}
