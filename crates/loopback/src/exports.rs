//! The C entry points, under the engine's symbol names.

use std::ffi::{c_char, c_int, c_void};

use powsybl_sys::{
    Array, Exc, FlowDecompositionParameters, GraalIsolate, LoadFlowComponentResult,
    LoadFlowParameters, LoadFlowValidationParameters, LoggerCallback, NetworkMetadata,
    ObjectHandle, SecurityAnalysisParameters, SensitivityAnalysisParameters,
    ShortCircuitAnalysisParameters, StringMap, Thread,
};

use crate::{
    error::{EngineError, entry, log_level_entry, release_entry},
    ledger::{self, Kind, StringPool},
    objects::{self, Network, Object, Reporter},
    params::{self, read_str, read_strings, read_values},
    runtime::{self, LEVEL_DEBUG, LEVEL_INFO, LEVEL_TRACE, LEVEL_WARN},
};

const LOGGER_NETWORK: &str = "com.powsybl.loopback.Network";
const LOGGER_LOAD_FLOW: &str = "com.powsybl.loopback.LoadFlow";

fn report(reporter: ObjectHandle, message: &str) -> Result<(), EngineError> {
    if let Some(reporter) = objects::reporter(reporter)? {
        reporter.lock().report(message);
    }
    Ok(())
}

fn read_pairs(
    names: *mut *mut c_char,
    names_count: c_int,
    values: *mut *mut c_char,
    values_count: c_int,
) -> Result<Vec<(String, String)>, EngineError> {
    if names_count != values_count {
        return Err(EngineError::InvalidArgument(format!(
            "{names_count} parameter names for {values_count} values"
        )));
    }
    let names = read_strings(names, names_count, "parameter names")?;
    let values = read_strings(values, values_count, "parameter values")?;
    Ok(names.into_iter().zip(values).collect())
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn graal_create_isolate(
    _params: *mut c_void,
    isolate: *mut *mut GraalIsolate,
    thread: *mut Thread,
) -> c_int {
    runtime::create_isolate(isolate, thread)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn graal_get_current_thread(isolate: *mut GraalIsolate) -> Thread {
    runtime::current_thread(isolate)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn graal_attach_thread(
    isolate: *mut GraalIsolate,
    thread: *mut Thread,
) -> c_int {
    runtime::attach_thread(isolate, thread)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn graal_detach_thread(thread: Thread) -> c_int {
    runtime::detach_thread(thread)
}

#[unsafe(export_name = "setLogLevel")]
pub unsafe extern "C" fn set_log_level(thread: Thread, level: c_int, exc: Exc) {
    log_level_entry(thread, exc, || {
        runtime::set_log_level(level);
        Ok(())
    });
}

#[unsafe(export_name = "setupLoggerCallback")]
pub unsafe extern "C" fn setup_logger_callback(
    thread: Thread,
    callback: Option<LoggerCallback>,
    exc: Exc,
) {
    entry(thread, exc, || {
        runtime::set_logger(callback);
        Ok(())
    });
}

#[unsafe(export_name = "freeString")]
pub unsafe extern "C" fn free_string(thread: Thread, ptr: *mut c_char, exc: Exc) {
    release_entry(thread, exc, || {
        ledger::release(ptr, &[Kind::String, Kind::ErrorMessage])
    });
}

#[unsafe(export_name = "freeStringArray")]
pub unsafe extern "C" fn free_string_array(thread: Thread, array: *mut Array, exc: Exc) {
    release_entry(thread, exc, || ledger::release(array, &[Kind::StringArray]));
}

#[unsafe(export_name = "freeArray")]
pub unsafe extern "C" fn free_array(thread: Thread, array: *mut Array, exc: Exc) {
    release_entry(thread, exc, || ledger::release(array, &[Kind::Array]));
}

#[unsafe(export_name = "freeStringMap")]
pub unsafe extern "C" fn free_string_map(thread: Thread, map: *mut StringMap, exc: Exc) {
    release_entry(thread, exc, || ledger::release(map, &[Kind::StringMap]));
}

#[unsafe(export_name = "freeNetworkBinaryBuffer")]
pub unsafe extern "C" fn free_network_binary_buffer(thread: Thread, array: *mut Array, exc: Exc) {
    release_entry(thread, exc, || ledger::release(array, &[Kind::BinaryBuffer]));
}

#[unsafe(export_name = "freeLoadFlowComponentResultPointer")]
pub unsafe extern "C" fn free_load_flow_component_result_pointer(
    thread: Thread,
    array: *mut Array,
    exc: Exc,
) {
    release_entry(thread, exc, || {
        ledger::release(array, &[Kind::ComponentResults])
    });
}

#[unsafe(export_name = "freeNetworkMetadata")]
pub unsafe extern "C" fn free_network_metadata(
    thread: Thread,
    metadata: *mut NetworkMetadata,
    exc: Exc,
) {
    release_entry(thread, exc, || {
        ledger::release(metadata, &[Kind::NetworkMetadata])
    });
}

#[unsafe(export_name = "destroyObjectHandle")]
pub unsafe extern "C" fn destroy_object_handle(thread: Thread, handle: ObjectHandle, exc: Exc) {
    release_entry(thread, exc, || objects::destroy(handle));
}

#[unsafe(export_name = "setJavaLibraryPath")]
pub unsafe extern "C" fn set_java_library_path(thread: Thread, path: *mut c_char, exc: Exc) {
    entry(thread, exc, || {
        runtime::set_java_library_path(read_str(path, "java library path")?);
        Ok(())
    });
}

#[unsafe(export_name = "setConfigRead")]
pub unsafe extern "C" fn set_config_read(thread: Thread, read: bool, exc: Exc) {
    entry(thread, exc, || {
        runtime::set_config_read(read);
        Ok(())
    });
}

#[unsafe(export_name = "isConfigRead")]
pub unsafe extern "C" fn is_config_read(thread: Thread, exc: Exc) -> bool {
    entry(thread, exc, || Ok(runtime::is_config_read()))
}

#[unsafe(export_name = "getVersionTable")]
pub unsafe extern "C" fn get_version_table(thread: Thread, exc: Exc) -> *mut c_char {
    entry(thread, exc, || {
        let table = format!(
            "+-----------------+---------+\n\
             | Repository name | Version |\n\
             +-----------------+---------+\n\
             | powsybl-loopback | {} |\n\
             +-----------------+---------+\n",
            env!("CARGO_PKG_VERSION")
        );
        Ok(ledger::string(&table))
    })
}

#[unsafe(export_name = "setDefaultLoadFlowProvider")]
pub unsafe extern "C" fn set_default_load_flow_provider(
    thread: Thread,
    provider: *mut c_char,
    exc: Exc,
) {
    entry(thread, exc, || {
        runtime::set_default_provider(&read_str(provider, "provider")?)
    });
}

#[unsafe(export_name = "getDefaultLoadFlowProvider")]
pub unsafe extern "C" fn get_default_load_flow_provider(thread: Thread, exc: Exc) -> *mut c_char {
    entry(thread, exc, || Ok(ledger::string(&runtime::default_provider())))
}

#[unsafe(export_name = "getLoadFlowProviderNames")]
pub unsafe extern "C" fn get_load_flow_provider_names(thread: Thread, exc: Exc) -> *mut Array {
    entry(thread, exc, || {
        let names: Vec<String> = runtime::PROVIDERS.iter().map(ToString::to_string).collect();
        Ok(ledger::string_array(&names))
    })
}

#[unsafe(export_name = "getNetworkImportFormats")]
pub unsafe extern "C" fn get_network_import_formats(thread: Thread, exc: Exc) -> *mut Array {
    entry(thread, exc, || {
        Ok(ledger::string_array(&[objects::FORMAT.to_string()]))
    })
}

#[unsafe(export_name = "closePypowsybl")]
pub unsafe extern "C" fn close(thread: Thread, exc: Exc) {
    entry(thread, exc, || {
        runtime::close();
        Ok(())
    });
}

#[unsafe(export_name = "createNetwork")]
pub unsafe extern "C" fn create_network(
    thread: Thread,
    name: *mut c_char,
    id: *mut c_char,
    exc: Exc,
) -> ObjectHandle {
    entry(thread, exc, || {
        let factory = read_str(name, "network factory")?;
        let network = Network::from_factory(&factory, &read_str(id, "network id")?)?;
        runtime::log(
            LEVEL_DEBUG,
            LOGGER_NETWORK,
            &format!("Network {} created by factory {factory}", network.id),
        );
        Ok(objects::register(Object::Network(network.into_shared())))
    })
}

#[unsafe(export_name = "loadNetworkFromString")]
pub unsafe extern "C" fn load_network_from_string(
    thread: Thread,
    file_name: *mut c_char,
    content: *mut c_char,
    parameter_names: *mut *mut c_char,
    parameter_names_count: c_int,
    parameter_values: *mut *mut c_char,
    parameter_values_count: c_int,
    reporter: ObjectHandle,
    exc: Exc,
) -> ObjectHandle {
    entry(thread, exc, || {
        let file_name = read_str(file_name, "file name")?;
        let content = read_str(content, "file content")?;
        let parameters = read_pairs(
            parameter_names,
            parameter_names_count,
            parameter_values,
            parameter_values_count,
        )?;
        let mut network = Network::parse(&file_name, &content)?;
        if let Some((_, name)) = parameters.iter().find(|(key, _)| key == "name") {
            network.name.clone_from(name);
        }
        report(reporter, &format!("Network {} imported from {file_name}", network.id))?;
        runtime::log(
            LEVEL_INFO,
            LOGGER_NETWORK,
            &format!("Network {} imported ({} elements)", network.id, network.elements.len()),
        );
        Ok(objects::register(Object::Network(network.into_shared())))
    })
}

#[unsafe(export_name = "merge")]
pub unsafe extern "C" fn merge(
    thread: Thread,
    networks: *mut ObjectHandle,
    count: c_int,
    exc: Exc,
) -> ObjectHandle {
    entry(thread, exc, || {
        let handles = read_values(networks, count, "networks")?;
        let networks = handles
            .into_iter()
            .map(|handle| objects::network(handle).map(|network| network.lock().clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let merged = Network::merged(&networks)?;
        Ok(objects::register(Object::Network(merged.into_shared())))
    })
}

#[unsafe(export_name = "getNetworkMetadata")]
pub unsafe extern "C" fn get_network_metadata(
    thread: Thread,
    network: ObjectHandle,
    exc: Exc,
) -> *mut NetworkMetadata {
    entry(thread, exc, || {
        let network = objects::network(network)?;
        let network = network.lock();
        let mut pool = StringPool::default();
        let metadata = NetworkMetadata {
            id: pool.string(&network.id),
            name: pool.string(&network.name),
            case_date: network.case_date,
            source_format: pool.string(&network.source_format),
            forecast_distance: network.forecast_distance,
        };
        Ok(ledger::structure(Kind::NetworkMetadata, metadata, pool))
    })
}

#[unsafe(export_name = "saveNetworkToBinaryBuffer")]
pub unsafe extern "C" fn save_network_to_binary_buffer(
    thread: Thread,
    network: ObjectHandle,
    format: *mut c_char,
    parameter_names: *mut *mut c_char,
    parameter_names_count: c_int,
    parameter_values: *mut *mut c_char,
    parameter_values_count: c_int,
    reporter: ObjectHandle,
    exc: Exc,
) -> *mut Array {
    entry(thread, exc, || {
        let format = read_str(format, "format")?;
        read_pairs(
            parameter_names,
            parameter_names_count,
            parameter_values,
            parameter_values_count,
        )?;
        if format != objects::FORMAT {
            return Err(EngineError::UnsupportedExport(format));
        }
        let network = objects::network(network)?;
        let network = network.lock();
        report(reporter, &format!("Network {} exported in {format}", network.id))?;
        Ok(ledger::binary_buffer(network.serialize().into_bytes()))
    })
}

#[unsafe(export_name = "reduceNetwork")]
pub unsafe extern "C" fn reduce_network(
    thread: Thread,
    network: ObjectHandle,
    v_min: f64,
    v_max: f64,
    ids: *mut *mut c_char,
    ids_count: c_int,
    voltage_levels: *mut *mut c_char,
    voltage_levels_count: c_int,
    depths: *mut c_int,
    depths_count: c_int,
    with_dangling_lines: bool,
    exc: Exc,
) {
    entry(thread, exc, || {
        let ids = read_strings(ids, ids_count, "ids")?;
        let voltage_levels = read_strings(voltage_levels, voltage_levels_count, "voltage levels")?;
        let depths = read_values(depths, depths_count, "depths")?;
        if depths.len() != voltage_levels.len() {
            return Err(EngineError::InvalidArgument(
                "depths and voltage levels differ in length".to_string(),
            ));
        }
        let network = objects::network(network)?;
        let mut network = network.lock();
        let keep = |element: &objects::Element| {
            if element.element_type == objects::TYPE_SUBSTATION {
                return true;
            }
            let in_range = element.nominal_v >= v_min && element.nominal_v <= v_max;
            let in_levels =
                voltage_levels.is_empty() || voltage_levels.contains(&element.voltage_level);
            let in_ids = ids.is_empty() || ids.contains(&element.id);
            in_range && in_levels && in_ids
        };
        network.elements.retain(keep);
        runtime::log(
            LEVEL_DEBUG,
            LOGGER_NETWORK,
            &format!(
                "Network {} reduced to {} elements (dangling lines: {with_dangling_lines})",
                network.id,
                network.elements.len()
            ),
        );
        Ok(())
    });
}

#[unsafe(export_name = "getNetworkElementsIds")]
pub unsafe extern "C" fn get_network_elements_ids(
    thread: Thread,
    network: ObjectHandle,
    element_type: c_int,
    nominal_voltages: *mut f64,
    nominal_voltages_count: c_int,
    countries: *mut *mut c_char,
    countries_count: c_int,
    main_cc: bool,
    main_sc: bool,
    _not_connected_to_same_bus_at_both_sides: bool,
    exc: Exc,
) -> *mut Array {
    entry(thread, exc, || {
        let voltages = read_values(nominal_voltages, nominal_voltages_count, "nominal voltages")?;
        let countries = read_strings(countries, countries_count, "countries")?;
        let network = objects::network(network)?;
        let network = network.lock();
        let ids: Vec<String> = network
            .elements
            .iter()
            .filter(|element| element.element_type == element_type)
            .filter(|element| {
                voltages.is_empty()
                    || voltages
                        .iter()
                        .any(|v| (element.nominal_v - v).abs() < f64::EPSILON)
            })
            .filter(|element| countries.is_empty() || countries.contains(&element.country))
            .filter(|element| !(main_cc || main_sc) || element.component == 0)
            .map(|element| element.id.clone())
            .collect();
        Ok(ledger::string_array(&ids))
    })
}

#[unsafe(export_name = "createLoadFlowParameters")]
pub unsafe extern "C" fn create_load_flow_parameters(
    thread: Thread,
    exc: Exc,
) -> *mut LoadFlowParameters {
    entry(thread, exc, || Ok(params::create_load_flow()))
}

#[unsafe(export_name = "freeLoadFlowParameters")]
pub unsafe extern "C" fn free_load_flow_parameters(
    thread: Thread,
    parameters: *mut LoadFlowParameters,
    exc: Exc,
) {
    release_entry(thread, exc, || params::release(parameters));
}

#[unsafe(export_name = "createValidationConfig")]
pub unsafe extern "C" fn create_validation_config(
    thread: Thread,
    exc: Exc,
) -> *mut LoadFlowValidationParameters {
    entry(thread, exc, || Ok(params::create_validation()))
}

#[unsafe(export_name = "freeValidationConfig")]
pub unsafe extern "C" fn free_validation_config(
    thread: Thread,
    parameters: *mut LoadFlowValidationParameters,
    exc: Exc,
) {
    release_entry(thread, exc, || params::release(parameters));
}

#[unsafe(export_name = "createSecurityAnalysisParameters")]
pub unsafe extern "C" fn create_security_analysis_parameters(
    thread: Thread,
    exc: Exc,
) -> *mut SecurityAnalysisParameters {
    entry(thread, exc, || Ok(params::create_security_analysis()))
}

#[unsafe(export_name = "freeSecurityAnalysisParameters")]
pub unsafe extern "C" fn free_security_analysis_parameters(
    thread: Thread,
    parameters: *mut SecurityAnalysisParameters,
    exc: Exc,
) {
    release_entry(thread, exc, || params::release(parameters));
}

#[unsafe(export_name = "createSensitivityAnalysisParameters")]
pub unsafe extern "C" fn create_sensitivity_analysis_parameters(
    thread: Thread,
    exc: Exc,
) -> *mut SensitivityAnalysisParameters {
    entry(thread, exc, || Ok(params::create_sensitivity_analysis()))
}

#[unsafe(export_name = "freeSensitivityAnalysisParameters")]
pub unsafe extern "C" fn free_sensitivity_analysis_parameters(
    thread: Thread,
    parameters: *mut SensitivityAnalysisParameters,
    exc: Exc,
) {
    release_entry(thread, exc, || params::release(parameters));
}

#[unsafe(export_name = "createFlowDecompositionParameters")]
pub unsafe extern "C" fn create_flow_decomposition_parameters(
    thread: Thread,
    exc: Exc,
) -> *mut FlowDecompositionParameters {
    entry(thread, exc, || Ok(params::create_flow_decomposition()))
}

#[unsafe(export_name = "freeFlowDecompositionParameters")]
pub unsafe extern "C" fn free_flow_decomposition_parameters(
    thread: Thread,
    parameters: *mut FlowDecompositionParameters,
    exc: Exc,
) {
    release_entry(thread, exc, || params::release(parameters));
}

#[unsafe(export_name = "createShortCircuitAnalysisParameters")]
pub unsafe extern "C" fn create_short_circuit_analysis_parameters(
    thread: Thread,
    exc: Exc,
) -> *mut ShortCircuitAnalysisParameters {
    entry(thread, exc, || Ok(params::create_short_circuit_analysis()))
}

#[unsafe(export_name = "freeShortCircuitAnalysisParameters")]
pub unsafe extern "C" fn free_short_circuit_analysis_parameters(
    thread: Thread,
    parameters: *mut ShortCircuitAnalysisParameters,
    exc: Exc,
) {
    release_entry(thread, exc, || params::release(parameters));
}

#[unsafe(export_name = "runLoadFlow")]
pub unsafe extern "C" fn run_load_flow(
    thread: Thread,
    network: ObjectHandle,
    dc: bool,
    parameters: *mut LoadFlowParameters,
    provider: *mut c_char,
    reporter: ObjectHandle,
    exc: Exc,
) -> *mut Array {
    entry(thread, exc, || {
        let network = objects::network(network)?;
        let network = network.lock();
        let kind = if dc { "DC" } else { "AC" };
        runtime::log(
            LEVEL_INFO,
            LOGGER_LOAD_FLOW,
            &format!("Running {kind} load flow on network {}", network.id),
        );

        let settings = params::read_load_flow(parameters)?;
        let provider = read_str(provider, "provider")?;
        let provider = if provider.is_empty() {
            runtime::default_provider()
        } else {
            provider
        };
        if !runtime::PROVIDERS.contains(&provider.as_str()) {
            return Err(EngineError::UnknownProvider(provider));
        }
        for (key, value) in &settings.provider_parameters {
            runtime::log(
                LEVEL_TRACE,
                LOGGER_LOAD_FLOW,
                &format!("Provider parameter {key}={value}"),
            );
        }
        let max_iterations: c_int = settings
            .provider_parameter("maxIteration")
            .map(str::parse)
            .transpose()
            .map_err(|_| {
                EngineError::InvalidArgument("maxIteration must be an integer".to_string())
            })?
            .unwrap_or(20);

        let iterations: c_int = if dc { 0 } else { 3 };
        let converged = dc || iterations <= max_iterations;
        if !converged {
            runtime::log(
                LEVEL_WARN,
                LOGGER_LOAD_FLOW,
                &format!("Load flow on network {} did not converge", network.id),
            );
        }
        let components = if settings.all_components {
            network.component_count()
        } else {
            network.component_count().min(1)
        };
        let balanced = settings.countries_to_balance.len().max(1);

        let mut pool = StringPool::default();
        let results: Vec<LoadFlowComponentResult> = (0..components)
            .map(|component| {
                let slack = network
                    .buses()
                    .find(|bus| bus.component == component)
                    .map_or("", |bus| bus.id.as_str());
                LoadFlowComponentResult {
                    connected_component_num: c_int::try_from(component).unwrap_or(c_int::MAX),
                    synchronous_component_num: c_int::try_from(component).unwrap_or(c_int::MAX),
                    status: if converged { 0 } else { 1 },
                    status_text: pool.string(if converged {
                        "CONVERGED"
                    } else {
                        "MAX_ITERATION_REACHED"
                    }),
                    iteration_count: iterations.min(max_iterations),
                    slack_bus_id: pool.string(slack),
                    slack_bus_active_power_mismatch: if settings.distributed_slack {
                        0.0
                    } else {
                        -0.006
                    },
                    distributed_active_power: if settings.distributed_slack {
                        1.2 * f64::from(u32::try_from(balanced).unwrap_or(u32::MAX))
                    } else {
                        0.0
                    },
                }
            })
            .collect();
        report(
            reporter,
            &format!(
                "{kind} load flow with {provider} on network {}: {} component(s)",
                network.id,
                results.len()
            ),
        )?;
        Ok(ledger::struct_array(Kind::ComponentResults, results, pool))
    })
}

#[unsafe(export_name = "voltageInitializerGetIndicators")]
pub unsafe extern "C" fn voltage_initializer_get_indicators(
    thread: Thread,
    result: ObjectHandle,
    exc: Exc,
) -> *mut StringMap {
    entry(thread, exc, || {
        let network = objects::network(result)?;
        let network = network.lock();
        let indicators = [
            ("network_id".to_string(), network.id.clone()),
            ("nb_buses".to_string(), network.buses().count().to_string()),
            ("status".to_string(), "OK".to_string()),
        ];
        Ok(ledger::string_map(&indicators))
    })
}

#[unsafe(export_name = "createReporterModel")]
pub unsafe extern "C" fn create_reporter_model(
    thread: Thread,
    task_key: *mut c_char,
    default_name: *mut c_char,
    exc: Exc,
) -> ObjectHandle {
    entry(thread, exc, || {
        let reporter = Reporter {
            task_key: read_str(task_key, "task key")?,
            default_name: read_str(default_name, "default name")?,
            messages: Vec::new(),
        };
        Ok(objects::register(Object::Reporter(reporter.into_shared())))
    })
}

#[unsafe(export_name = "printReport")]
pub unsafe extern "C" fn print_report(
    thread: Thread,
    reporter: ObjectHandle,
    exc: Exc,
) -> *mut c_char {
    entry(thread, exc, || {
        let reporter = objects::reporter(reporter)?.ok_or_else(|| {
            EngineError::InvalidArgument("reporter handle is null".to_string())
        })?;
        let text = reporter.lock().print();
        Ok(ledger::string(&text))
    })
}
