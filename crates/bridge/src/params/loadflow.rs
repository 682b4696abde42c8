use powsybl_sys::{self as sys, EngineApi, Exc, Thread};

use super::{
    HostFree, Parameters, ProviderParameters, alloc_strings, flag, free_strings, is_set,
    provider_fields, read_provider_parameters, read_strings,
};
use crate::{error::Result, isolate::Isolate, marshal::{EngineBox, EngineFree}};

native_enum! {
    pub enum VoltageInitMode: "voltage init mode" {
        UniformValues = 0,
        PreviousValues = 1,
        DcValues = 2,
    }
}

native_enum! {
    /// How active power mismatch is spread over the network.
    pub enum BalanceType: "balance type" {
        ProportionalToGenerationP = 0,
        ProportionalToGenerationPMax = 1,
        ProportionalToLoad = 2,
        ProportionalToConformLoad = 3,
    }
}

native_enum! {
    pub enum ConnectedComponentMode: "connected component mode" {
        All = 0,
        Main = 1,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadFlowParameters {
    pub voltage_init_mode: VoltageInitMode,
    pub transformer_voltage_control_on: bool,
    pub no_generator_reactive_limits: bool,
    pub phase_shifter_regulation_on: bool,
    pub twt_split_shunt_admittance: bool,
    pub simul_shunt: bool,
    pub read_slack_bus: bool,
    pub write_slack_bus: bool,
    pub distributed_slack: bool,
    pub balance_type: BalanceType,
    pub dc_use_transformer_ratio: bool,
    /// ISO country codes.
    pub countries_to_balance: Vec<String>,
    pub connected_component_mode: ConnectedComponentMode,
    pub provider_parameters: ProviderParameters,
}

impl Default for LoadFlowParameters {
    fn default() -> Self {
        Self {
            voltage_init_mode: VoltageInitMode::UniformValues,
            transformer_voltage_control_on: false,
            no_generator_reactive_limits: false,
            phase_shifter_regulation_on: false,
            twt_split_shunt_admittance: false,
            simul_shunt: false,
            read_slack_bus: true,
            write_slack_bus: true,
            distributed_slack: true,
            balance_type: BalanceType::ProportionalToGenerationPMax,
            dc_use_transformer_ratio: true,
            countries_to_balance: Vec::new(),
            connected_component_mode: ConnectedComponentMode::Main,
            provider_parameters: Vec::new(),
        }
    }
}

impl HostFree for sys::LoadFlowParameters {
    unsafe fn free_host_fields(&mut self) {
        unsafe {
            free_strings(
                &mut self.countries_to_balance,
                &mut self.countries_to_balance_count,
            );
            provider_fields!(self).free();
        }
    }
}

impl EngineFree for sys::LoadFlowParameters {
    fn free_fn(api: &EngineApi) -> unsafe extern "C" fn(Thread, *mut Self, Exc) {
        api.free_load_flow_parameters
    }
}

impl Parameters for LoadFlowParameters {
    type Native = sys::LoadFlowParameters;

    unsafe fn from_native(native: &sys::LoadFlowParameters) -> Result<Self> {
        Ok(Self {
            voltage_init_mode: native.voltage_init_mode.try_into()?,
            transformer_voltage_control_on: is_set(native.transformer_voltage_control_on),
            no_generator_reactive_limits: is_set(native.no_generator_reactive_limits),
            phase_shifter_regulation_on: is_set(native.phase_shifter_regulation_on),
            twt_split_shunt_admittance: is_set(native.twt_split_shunt_admittance),
            simul_shunt: is_set(native.simul_shunt),
            read_slack_bus: is_set(native.read_slack_bus),
            write_slack_bus: is_set(native.write_slack_bus),
            distributed_slack: is_set(native.distributed_slack),
            balance_type: native.balance_type.try_into()?,
            dc_use_transformer_ratio: is_set(native.dc_use_transformer_ratio),
            countries_to_balance: unsafe {
                read_strings(
                    native.countries_to_balance,
                    native.countries_to_balance_count,
                )
            }?,
            connected_component_mode: native.connected_component_mode.try_into()?,
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

    fn write_native(&self, native: &mut sys::LoadFlowParameters) -> Result<()> {
        native.voltage_init_mode = self.voltage_init_mode.as_raw();
        native.transformer_voltage_control_on = flag(self.transformer_voltage_control_on);
        native.no_generator_reactive_limits = flag(self.no_generator_reactive_limits);
        native.phase_shifter_regulation_on = flag(self.phase_shifter_regulation_on);
        native.twt_split_shunt_admittance = flag(self.twt_split_shunt_admittance);
        native.simul_shunt = flag(self.simul_shunt);
        native.read_slack_bus = flag(self.read_slack_bus);
        native.write_slack_bus = flag(self.write_slack_bus);
        native.distributed_slack = flag(self.distributed_slack);
        native.balance_type = self.balance_type.as_raw();
        native.dc_use_transformer_ratio = flag(self.dc_use_transformer_ratio);
        native.connected_component_mode = self.connected_component_mode.as_raw();
        (native.countries_to_balance, native.countries_to_balance_count) =
            alloc_strings(&self.countries_to_balance)?;
        provider_fields!(native).write(&self.provider_parameters)
    }

    fn create_native(isolate: &Isolate) -> Result<Option<EngineBox<Self::Native>>> {
        engine_call!(isolate, create_load_flow_parameters() => EngineBox::from_raw)
    }
}
