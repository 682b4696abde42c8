//! An in-process engine speaking the powsybl native ABI.
//!
//! Every exported entry point behaves like its engine counterpart closely
//! enough to exercise the host bridge: thread attachment is enforced, failures
//! come back through the exception handler, and every allocation handed to the
//! host is tracked until it is released through the matching entry point.

use powsybl_sys::EngineApi;

mod error;
mod exports;
mod ledger;
mod objects;
mod params;
pub mod probe;
mod runtime;

pub use error::EngineError;
pub use ledger::{Kind, Release};

/// Entry point table bound to this crate's functions, without loading any
/// shared library.
#[must_use]
pub fn api() -> EngineApi {
    use exports as e;

    EngineApi {
        create_isolate: e::graal_create_isolate,
        get_current_thread: e::graal_get_current_thread,
        attach_thread: e::graal_attach_thread,
        detach_thread: e::graal_detach_thread,
        set_log_level: e::set_log_level,
        setup_logger_callback: e::setup_logger_callback,
        free_string: e::free_string,
        free_string_array: e::free_string_array,
        free_array: e::free_array,
        free_string_map: e::free_string_map,
        free_network_binary_buffer: e::free_network_binary_buffer,
        free_load_flow_component_result_pointer: e::free_load_flow_component_result_pointer,
        free_network_metadata: e::free_network_metadata,
        destroy_object_handle: e::destroy_object_handle,
        set_java_library_path: e::set_java_library_path,
        set_config_read: e::set_config_read,
        is_config_read: e::is_config_read,
        get_version_table: e::get_version_table,
        set_default_load_flow_provider: e::set_default_load_flow_provider,
        get_default_load_flow_provider: e::get_default_load_flow_provider,
        get_load_flow_provider_names: e::get_load_flow_provider_names,
        get_network_import_formats: e::get_network_import_formats,
        close: e::close,
        create_network: e::create_network,
        load_network_from_string: e::load_network_from_string,
        merge: e::merge,
        get_network_metadata: e::get_network_metadata,
        save_network_to_binary_buffer: e::save_network_to_binary_buffer,
        reduce_network: e::reduce_network,
        get_network_elements_ids: e::get_network_elements_ids,
        create_load_flow_parameters: e::create_load_flow_parameters,
        free_load_flow_parameters: e::free_load_flow_parameters,
        create_validation_config: e::create_validation_config,
        free_validation_config: e::free_validation_config,
        create_security_analysis_parameters: e::create_security_analysis_parameters,
        free_security_analysis_parameters: e::free_security_analysis_parameters,
        create_sensitivity_analysis_parameters: e::create_sensitivity_analysis_parameters,
        free_sensitivity_analysis_parameters: e::free_sensitivity_analysis_parameters,
        create_flow_decomposition_parameters: e::create_flow_decomposition_parameters,
        free_flow_decomposition_parameters: e::free_flow_decomposition_parameters,
        create_short_circuit_analysis_parameters: e::create_short_circuit_analysis_parameters,
        free_short_circuit_analysis_parameters: e::free_short_circuit_analysis_parameters,
        run_load_flow: e::run_load_flow,
        voltage_initializer_get_indicators: e::voltage_initializer_get_indicators,
        create_reporter_model: e::create_reporter_model,
        print_report: e::print_report,
        library: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_symbol() {
        // One field per symbol plus the library slot.
        let api = api();
        assert!(api.library.is_none());
        assert_eq!(EngineApi::SYMBOLS.len(), 46);
    }
}
