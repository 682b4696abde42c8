use std::collections::{BTreeMap, HashMap};

use powsybl_sys::EngineApi;

use crate::{
    config::BridgeConfig,
    error::{Error, Result},
    handle::{Handle, opt_ptr},
    host::Host,
    isolate::Isolate,
    marshal::{
        Bytes, CStringArray, ComponentResults, EngineBox, HandleArray, ReturnedArray, ReturnedMap,
        ReturnedString, SliceArg, Strings, c_string,
    },
    params::{LoadFlowParameters, Parameters},
    results::{LoadFlowComponentResult, NetworkMetadata},
};

native_enum! {
    /// Network element families, as numbered by the engine.
    pub enum ElementType: "element type" {
        Bus = 0,
        Line = 1,
        TwoWindingsTransformer = 2,
        ThreeWindingsTransformer = 3,
        Generator = 4,
        Load = 5,
        Battery = 6,
        ShuntCompensator = 7,
        NonLinearShuntCompensatorSection = 8,
        LinearShuntCompensatorSection = 9,
        DanglingLine = 10,
        LccConverterStation = 11,
        VscConverterStation = 12,
        StaticVarCompensator = 13,
        Switch = 14,
        VoltageLevel = 15,
        Substation = 16,
    }
}

/// Filters of [`Engine::network_elements_ids`].
#[derive(Debug, Clone, Default)]
pub struct ElementFilter {
    pub nominal_voltages: Vec<f64>,
    pub countries: Vec<String>,
    pub main_connected_component: bool,
    pub main_synchronous_component: bool,
    pub not_connected_to_same_bus_at_both_sides: bool,
}

/// Typed entry points of the engine.
///
/// Every method is one dispatched call: arguments are marshaled into transient
/// buffers, engine results are copied out and released before returning.
#[derive(Debug, Clone, Copy)]
pub struct Engine {
    isolate: &'static Isolate,
}

fn split_parameters(parameters: &BTreeMap<String, String>) -> Result<(CStringArray, CStringArray)> {
    Ok((
        CStringArray::new(parameters.keys())?,
        CStringArray::new(parameters.values())?,
    ))
}

impl Engine {
    /// # Errors
    /// See [`Isolate::init`].
    pub fn init(api: EngineApi, host: impl Host, config: &BridgeConfig) -> Result<Self> {
        Isolate::init(api, host, config).map(Self::new)
    }

    /// Loads the engine library named by `config`, then creates the isolate.
    ///
    /// # Errors
    /// Returns an error if the library cannot be loaded or the isolate cannot
    /// be created.
    ///
    /// # Safety
    /// See [`EngineApi::load`].
    pub unsafe fn from_config(config: &BridgeConfig, host: impl Host) -> Result<Self> {
        let api = unsafe { config.load_engine() }?;
        Self::init(api, host, config)
    }

    #[must_use]
    pub const fn new(isolate: &'static Isolate) -> Self {
        Self { isolate }
    }

    /// The engine of an already created isolate.
    #[must_use]
    pub fn current() -> Option<Self> {
        Isolate::get().map(Self::new)
    }

    #[must_use]
    pub const fn isolate(&self) -> &'static Isolate {
        self.isolate
    }

    /// # Errors
    /// Returns the engine error, or an argument error for a NUL byte.
    pub fn set_java_library_path(&self, path: &str) -> Result<()> {
        let path = c_string(path)?;
        engine_call!(self.isolate, set_java_library_path(path.as_ptr().cast_mut()))
    }

    /// # Errors
    /// Returns the engine error.
    pub fn set_config_read(&self, read: bool) -> Result<()> {
        engine_call!(self.isolate, set_config_read(read))
    }

    /// # Errors
    /// Returns the engine error.
    pub fn is_config_read(&self) -> Result<bool> {
        engine_call!(self.isolate, is_config_read())
    }

    /// Versions of the engine components, as a printable table.
    ///
    /// # Errors
    /// Returns the engine error.
    pub fn version_table(&self) -> Result<String> {
        engine_call!(self.isolate, get_version_table() => ReturnedString::from_raw)?.into_string()
    }

    /// # Errors
    /// Returns the engine error, or an argument error for a NUL byte.
    pub fn set_default_load_flow_provider(&self, provider: &str) -> Result<()> {
        let provider = c_string(provider)?;
        engine_call!(
            self.isolate,
            set_default_load_flow_provider(provider.as_ptr().cast_mut())
        )
    }

    /// # Errors
    /// Returns the engine error.
    pub fn default_load_flow_provider(&self) -> Result<String> {
        engine_call!(self.isolate, get_default_load_flow_provider() => ReturnedString::from_raw)?.into_string()
    }

    /// # Errors
    /// Returns the engine error.
    pub fn load_flow_provider_names(&self) -> Result<Vec<String>> {
        engine_call!(
            self.isolate,
            get_load_flow_provider_names() => ReturnedArray::<Strings>::from_raw
        )?
        .into_vec()
    }

    /// # Errors
    /// Returns the engine error.
    pub fn network_import_formats(&self) -> Result<Vec<String>> {
        engine_call!(
            self.isolate,
            get_network_import_formats() => ReturnedArray::<Strings>::from_raw
        )?
        .into_vec()
    }

    /// Shuts down engine-side services. The isolate itself stays alive.
    ///
    /// # Errors
    /// Returns the engine error.
    pub fn close(&self) -> Result<()> {
        engine_call!(self.isolate, close())
    }

    /// Builds a network from a named engine-side factory.
    ///
    /// # Errors
    /// Returns the engine error, e.g. for an unknown factory.
    pub fn create_network(&self, factory: &str, id: &str) -> Result<Handle> {
        let factory = c_string(factory)?;
        let id = c_string(id)?;
        engine_call!(
            self.isolate,
            create_network(factory.as_ptr().cast_mut(), id.as_ptr().cast_mut()) => Handle::from_raw
        )
    }

    /// # Errors
    /// Returns the engine error raised by the import.
    pub fn load_network_from_string(
        &self,
        file_name: &str,
        content: &str,
        parameters: &BTreeMap<String, String>,
        reporter: Option<&Handle>,
    ) -> Result<Handle> {
        let file_name = c_string(file_name)?;
        let content = c_string(content)?;
        let (names, values) = split_parameters(parameters)?;
        engine_call!(
            self.isolate,
            load_network_from_string(
                file_name.as_ptr().cast_mut(),
                content.as_ptr().cast_mut(),
                names.as_ptr(),
                names.len(),
                values.as_ptr(),
                values.len(),
                opt_ptr(reporter),
            ) => Handle::from_raw
        )
    }

    /// Merges `networks` into a new network.
    ///
    /// # Errors
    /// Returns the engine error.
    pub fn merge(&self, networks: &[Handle]) -> Result<Handle> {
        let handles = HandleArray::new(networks)?;
        engine_call!(self.isolate, merge(handles.as_ptr(), handles.len()) => Handle::from_raw)
    }

    /// # Errors
    /// Returns the engine error.
    pub fn network_metadata(&self, network: &Handle) -> Result<NetworkMetadata> {
        let metadata =
            engine_call!(self.isolate, get_network_metadata(network.as_ptr()) => EngineBox::from_raw)?
                .ok_or(Error::NullResult("network metadata"))?;
        let copy = unsafe { NetworkMetadata::from_native(&metadata) };
        metadata.release()?;
        Ok(copy)
    }

    /// Serializes `network` in `format`.
    ///
    /// # Errors
    /// Returns the engine error raised by the export.
    pub fn save_network_to_binary_buffer(
        &self,
        network: &Handle,
        format: &str,
        parameters: &BTreeMap<String, String>,
        reporter: Option<&Handle>,
    ) -> Result<Vec<u8>> {
        let format = c_string(format)?;
        let (names, values) = split_parameters(parameters)?;
        engine_call!(
            self.isolate,
            save_network_to_binary_buffer(
                network.as_ptr(),
                format.as_ptr().cast_mut(),
                names.as_ptr(),
                names.len(),
                values.as_ptr(),
                values.len(),
                opt_ptr(reporter),
            ) => ReturnedArray::<Bytes>::from_raw
        )?
        .into_vec()
    }

    /// Keeps the part of `network` within the voltage range, or around the
    /// given elements and voltage levels up to `depths`.
    ///
    /// # Errors
    /// Returns the engine error.
    #[allow(clippy::too_many_arguments)]
    pub fn reduce_network(
        &self,
        network: &Handle,
        v_min: f64,
        v_max: f64,
        ids: &[String],
        voltage_levels: &[String],
        depths: &[i32],
        with_dangling_lines: bool,
    ) -> Result<()> {
        let ids = CStringArray::new(ids)?;
        let voltage_levels = CStringArray::new(voltage_levels)?;
        let depths = SliceArg::new(depths)?;
        engine_call!(
            self.isolate,
            reduce_network(
                network.as_ptr(),
                v_min,
                v_max,
                ids.as_ptr(),
                ids.len(),
                voltage_levels.as_ptr(),
                voltage_levels.len(),
                depths.as_ptr(),
                depths.len(),
                with_dangling_lines,
            )
        )
    }

    /// # Errors
    /// Returns the engine error.
    pub fn network_elements_ids(
        &self,
        network: &Handle,
        element_type: ElementType,
        filter: &ElementFilter,
    ) -> Result<Vec<String>> {
        let voltages = SliceArg::new(&filter.nominal_voltages)?;
        let countries = CStringArray::new(&filter.countries)?;
        engine_call!(
            self.isolate,
            get_network_elements_ids(
                network.as_ptr(),
                element_type.as_raw(),
                voltages.as_ptr(),
                voltages.len(),
                countries.as_ptr(),
                countries.len(),
                filter.main_connected_component,
                filter.main_synchronous_component,
                filter.not_connected_to_same_bus_at_both_sides,
            ) => ReturnedArray::<Strings>::from_raw
        )?
        .into_vec()
    }

    /// Default parameters of family `P` as configured on the engine side.
    ///
    /// # Errors
    /// Returns the engine error or a conversion error.
    pub fn default_parameters<P: Parameters>(&self) -> Result<P> {
        P::engine_defaults(self.isolate)
    }

    /// Runs an AC (or DC) load flow with `provider`; an empty provider name
    /// selects the engine default.
    ///
    /// # Errors
    /// Returns the engine error raised by the computation.
    pub fn run_load_flow(
        &self,
        network: &Handle,
        dc: bool,
        parameters: &LoadFlowParameters,
        provider: &str,
        reporter: Option<&Handle>,
    ) -> Result<Vec<LoadFlowComponentResult>> {
        let mut native = parameters.to_native()?;
        let provider = c_string(provider)?;
        engine_call!(
            self.isolate,
            run_load_flow(
                network.as_ptr(),
                dc,
                native.as_mut_ptr(),
                provider.as_ptr().cast_mut(),
                opt_ptr(reporter),
            ) => ReturnedArray::<ComponentResults>::from_raw
        )?
        .into_vec()
    }

    /// # Errors
    /// Returns the engine error.
    pub fn voltage_initializer_indicators(
        &self,
        result: &Handle,
    ) -> Result<HashMap<String, String>> {
        engine_call!(
            self.isolate,
            voltage_initializer_get_indicators(result.as_ptr()) => ReturnedMap::from_raw
        )?
        .into_map()
    }

    /// # Errors
    /// Returns the engine error.
    pub fn create_reporter_model(&self, task_key: &str, default_name: &str) -> Result<Handle> {
        let task_key = c_string(task_key)?;
        let default_name = c_string(default_name)?;
        engine_call!(
            self.isolate,
            create_reporter_model(
                task_key.as_ptr().cast_mut(),
                default_name.as_ptr().cast_mut()
            ) => Handle::from_raw
        )
    }

    /// # Errors
    /// Returns the engine error.
    pub fn print_report(&self, reporter: &Handle) -> Result<String> {
        engine_call!(
            self.isolate,
            print_report(reporter.as_ptr()) => ReturnedString::from_raw
        )?
        .into_string()
    }
}
