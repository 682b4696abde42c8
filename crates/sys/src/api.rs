use std::{
    ffi::{OsStr, c_char, c_int, c_void},
    sync::Arc,
};

use libloading::Library;

use crate::{
    Array, Exc, FlowDecompositionParameters, GraalIsolate, LoadError, LoadFlowParameters,
    LoadFlowValidationParameters, LoggerCallback, NetworkMetadata, ObjectHandle,
    SecurityAnalysisParameters, SensitivityAnalysisParameters, ShortCircuitAnalysisParameters,
    StringMap, Thread,
};

unsafe fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T, LoadError> {
    let name = [name.as_bytes(), b"\0"].concat();
    Ok(*unsafe { library.get::<T>(&name) }?)
}

macro_rules! engine_api {
    ($( $(#[$meta:meta])* $field:ident = $symbol:literal: $ty:ty ),* $(,)?) => {
        /// Entry points of the engine, one field per exported symbol.
        ///
        /// Built either from a loaded shared library ([`EngineApi::load`]) or
        /// directly from function items of an in-process implementation.
        #[derive(Clone, Debug)]
        pub struct EngineApi {
            $( $(#[$meta])* pub $field: $ty, )*
            /// Keeps the shared library mapped while any copy of the table lives.
            pub library: Option<Arc<Library>>,
        }

        impl EngineApi {
            /// Exported symbol names, in table order.
            pub const SYMBOLS: &'static [&'static str] = &[$($symbol),*];

            unsafe fn resolve(library: Library) -> Result<Self, LoadError> {
                Ok(Self {
                    $( $field: unsafe { symbol(&library, $symbol) }?, )*
                    library: Some(Arc::new(library)),
                })
            }
        }
    };
}

engine_api! {
    create_isolate = "graal_create_isolate":
        unsafe extern "C" fn(*mut c_void, *mut *mut GraalIsolate, *mut Thread) -> c_int,
    get_current_thread = "graal_get_current_thread":
        unsafe extern "C" fn(*mut GraalIsolate) -> Thread,
    attach_thread = "graal_attach_thread":
        unsafe extern "C" fn(*mut GraalIsolate, *mut Thread) -> c_int,
    detach_thread = "graal_detach_thread": unsafe extern "C" fn(Thread) -> c_int,

    set_log_level = "setLogLevel": unsafe extern "C" fn(Thread, c_int, Exc),
    setup_logger_callback = "setupLoggerCallback":
        unsafe extern "C" fn(Thread, Option<LoggerCallback>, Exc),

    free_string = "freeString": unsafe extern "C" fn(Thread, *mut c_char, Exc),
    free_string_array = "freeStringArray": unsafe extern "C" fn(Thread, *mut Array, Exc),
    free_array = "freeArray": unsafe extern "C" fn(Thread, *mut Array, Exc),
    free_string_map = "freeStringMap": unsafe extern "C" fn(Thread, *mut StringMap, Exc),
    free_network_binary_buffer = "freeNetworkBinaryBuffer":
        unsafe extern "C" fn(Thread, *mut Array, Exc),
    free_load_flow_component_result_pointer = "freeLoadFlowComponentResultPointer":
        unsafe extern "C" fn(Thread, *mut Array, Exc),
    free_network_metadata = "freeNetworkMetadata":
        unsafe extern "C" fn(Thread, *mut NetworkMetadata, Exc),
    /// Releases any object handle. Not guarded against double release.
    destroy_object_handle = "destroyObjectHandle": unsafe extern "C" fn(Thread, ObjectHandle, Exc),

    set_java_library_path = "setJavaLibraryPath": unsafe extern "C" fn(Thread, *mut c_char, Exc),
    set_config_read = "setConfigRead": unsafe extern "C" fn(Thread, bool, Exc),
    is_config_read = "isConfigRead": unsafe extern "C" fn(Thread, Exc) -> bool,
    get_version_table = "getVersionTable": unsafe extern "C" fn(Thread, Exc) -> *mut c_char,
    set_default_load_flow_provider = "setDefaultLoadFlowProvider":
        unsafe extern "C" fn(Thread, *mut c_char, Exc),
    get_default_load_flow_provider = "getDefaultLoadFlowProvider":
        unsafe extern "C" fn(Thread, Exc) -> *mut c_char,
    get_load_flow_provider_names = "getLoadFlowProviderNames":
        unsafe extern "C" fn(Thread, Exc) -> *mut Array,
    get_network_import_formats = "getNetworkImportFormats":
        unsafe extern "C" fn(Thread, Exc) -> *mut Array,
    close = "closePypowsybl": unsafe extern "C" fn(Thread, Exc),

    create_network = "createNetwork":
        unsafe extern "C" fn(Thread, *mut c_char, *mut c_char, Exc) -> ObjectHandle,
    load_network_from_string = "loadNetworkFromString":
        unsafe extern "C" fn(
            Thread,
            *mut c_char,
            *mut c_char,
            *mut *mut c_char,
            c_int,
            *mut *mut c_char,
            c_int,
            ObjectHandle,
            Exc,
        ) -> ObjectHandle,
    merge = "merge": unsafe extern "C" fn(Thread, *mut ObjectHandle, c_int, Exc) -> ObjectHandle,
    get_network_metadata = "getNetworkMetadata":
        unsafe extern "C" fn(Thread, ObjectHandle, Exc) -> *mut NetworkMetadata,
    save_network_to_binary_buffer = "saveNetworkToBinaryBuffer":
        unsafe extern "C" fn(
            Thread,
            ObjectHandle,
            *mut c_char,
            *mut *mut c_char,
            c_int,
            *mut *mut c_char,
            c_int,
            ObjectHandle,
            Exc,
        ) -> *mut Array,
    reduce_network = "reduceNetwork":
        unsafe extern "C" fn(
            Thread,
            ObjectHandle,
            f64,
            f64,
            *mut *mut c_char,
            c_int,
            *mut *mut c_char,
            c_int,
            *mut c_int,
            c_int,
            bool,
            Exc,
        ),
    get_network_elements_ids = "getNetworkElementsIds":
        unsafe extern "C" fn(
            Thread,
            ObjectHandle,
            c_int,
            *mut f64,
            c_int,
            *mut *mut c_char,
            c_int,
            bool,
            bool,
            bool,
            Exc,
        ) -> *mut Array,

    create_load_flow_parameters = "createLoadFlowParameters":
        unsafe extern "C" fn(Thread, Exc) -> *mut LoadFlowParameters,
    free_load_flow_parameters = "freeLoadFlowParameters":
        unsafe extern "C" fn(Thread, *mut LoadFlowParameters, Exc),
    create_validation_config = "createValidationConfig":
        unsafe extern "C" fn(Thread, Exc) -> *mut LoadFlowValidationParameters,
    free_validation_config = "freeValidationConfig":
        unsafe extern "C" fn(Thread, *mut LoadFlowValidationParameters, Exc),
    create_security_analysis_parameters = "createSecurityAnalysisParameters":
        unsafe extern "C" fn(Thread, Exc) -> *mut SecurityAnalysisParameters,
    free_security_analysis_parameters = "freeSecurityAnalysisParameters":
        unsafe extern "C" fn(Thread, *mut SecurityAnalysisParameters, Exc),
    create_sensitivity_analysis_parameters = "createSensitivityAnalysisParameters":
        unsafe extern "C" fn(Thread, Exc) -> *mut SensitivityAnalysisParameters,
    free_sensitivity_analysis_parameters = "freeSensitivityAnalysisParameters":
        unsafe extern "C" fn(Thread, *mut SensitivityAnalysisParameters, Exc),
    create_flow_decomposition_parameters = "createFlowDecompositionParameters":
        unsafe extern "C" fn(Thread, Exc) -> *mut FlowDecompositionParameters,
    free_flow_decomposition_parameters = "freeFlowDecompositionParameters":
        unsafe extern "C" fn(Thread, *mut FlowDecompositionParameters, Exc),
    create_short_circuit_analysis_parameters = "createShortCircuitAnalysisParameters":
        unsafe extern "C" fn(Thread, Exc) -> *mut ShortCircuitAnalysisParameters,
    free_short_circuit_analysis_parameters = "freeShortCircuitAnalysisParameters":
        unsafe extern "C" fn(Thread, *mut ShortCircuitAnalysisParameters, Exc),

    run_load_flow = "runLoadFlow":
        unsafe extern "C" fn(
            Thread,
            ObjectHandle,
            bool,
            *mut LoadFlowParameters,
            *mut c_char,
            ObjectHandle,
            Exc,
        ) -> *mut Array,
    voltage_initializer_get_indicators = "voltageInitializerGetIndicators":
        unsafe extern "C" fn(Thread, ObjectHandle, Exc) -> *mut StringMap,

    create_reporter_model = "createReporterModel":
        unsafe extern "C" fn(Thread, *mut c_char, *mut c_char, Exc) -> ObjectHandle,
    print_report = "printReport": unsafe extern "C" fn(Thread, ObjectHandle, Exc) -> *mut c_char,
}

impl EngineApi {
    /// Loads the engine shared library and resolves every entry point.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be opened or any symbol in
    /// [`EngineApi::SYMBOLS`] is missing.
    ///
    /// # Safety
    ///
    /// Loading runs the library's initializers, and the resolved symbols are
    /// trusted to have the signatures declared here.
    pub unsafe fn load(path: impl AsRef<OsStr>) -> Result<Self, LoadError> {
        let library = unsafe { Library::new(path) }?;
        unsafe { Self::resolve(library) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_names_are_unique() {
        let mut names = EngineApi::SYMBOLS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EngineApi::SYMBOLS.len());
    }

    #[test]
    fn missing_library_fails_to_load() {
        let result = unsafe { EngineApi::load("/nonexistent/libpowsybl-java.so") };
        assert!(result.is_err());
    }
}
