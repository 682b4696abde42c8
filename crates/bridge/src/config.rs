use std::path::{Path, PathBuf};

use powsybl_sys::EngineApi;

use crate::error::{Error, Result};

pub const ENV_ENGINE_LIBRARY: &str = "POWSYBL_ENGINE_LIBRARY";
pub const ENV_JAVA_LIBRARY_PATH: &str = "POWSYBL_JAVA_LIBRARY_PATH";
pub const ENV_CONFIG_READ: &str = "POWSYBL_CONFIG_READ";

/// Settings applied once, when the isolate is created.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    library: Option<PathBuf>,
    java_library_path: Option<PathBuf>,
    config_read: Option<bool>,
    forward_engine_logs: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            library: None,
            java_library_path: None,
            config_read: None,
            forward_engine_logs: true,
        }
    }
}

impl BridgeConfig {
    #[must_use]
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Reads [`ENV_ENGINE_LIBRARY`], [`ENV_JAVA_LIBRARY_PATH`] and
    /// [`ENV_CONFIG_READ`].
    ///
    /// # Errors
    /// Returns an error if `POWSYBL_CONFIG_READ` is not a boolean.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(library) = lookup(ENV_ENGINE_LIBRARY) {
            builder = builder.library(library);
        }
        if let Some(path) = lookup(ENV_JAVA_LIBRARY_PATH) {
            builder = builder.java_library_path(path);
        }
        if let Some(value) = lookup(ENV_CONFIG_READ) {
            builder = builder.config_read(parse_bool(ENV_CONFIG_READ, &value)?);
        }
        Ok(builder.build())
    }

    #[must_use]
    pub fn library(&self) -> Option<&Path> {
        self.library.as_deref()
    }

    #[must_use]
    pub fn java_library_path(&self) -> Option<&Path> {
        self.java_library_path.as_deref()
    }

    #[must_use]
    pub const fn config_read(&self) -> Option<bool> {
        self.config_read
    }

    #[must_use]
    pub const fn forward_engine_logs(&self) -> bool {
        self.forward_engine_logs
    }

    /// Loads the configured engine library.
    ///
    /// # Errors
    /// Returns an error if no library is configured or it fails to load.
    ///
    /// # Safety
    /// See [`EngineApi::load`].
    pub unsafe fn load_engine(&self) -> Result<EngineApi> {
        let library = self
            .library
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("no engine library configured"))?;
        Ok(unsafe { EngineApi::load(library) }?)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_argument(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}

#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    #[must_use]
    pub fn library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.library = Some(path.into());
        self
    }

    /// Directory the engine searches for its own native dependencies.
    #[must_use]
    pub fn java_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.java_library_path = Some(path.into());
        self
    }

    /// Whether the engine reads its user configuration file.
    #[must_use]
    pub const fn config_read(mut self, read: bool) -> Self {
        self.config.config_read = Some(read);
        self
    }

    #[must_use]
    pub const fn forward_engine_logs(mut self, forward: bool) -> Self {
        self.config.forward_engine_logs = forward;
        self
    }

    #[must_use]
    pub fn build(self) -> BridgeConfig {
        self.config
    }
}
