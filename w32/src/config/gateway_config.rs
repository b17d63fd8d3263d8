use std::{
    fs::File,
    io::{ErrorKind, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::config::{emulator_config::EmulatorConfig, logger_config::LoggerConfig};
use crate::error::{Error, Result};

/// Which implementation of the platform seam the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Native,
    Emulated,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(windows) {
            Backend::Native
        } else {
            Backend::Emulated
        }
    }
}

/// Main configuration used by [`crate::Gateway::from_config`].
/// Please use [`GatewayConfigBuilder`] if you want to build it from code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Name of the embedding application, used in log output.
    pub app_name: String,
    /// Logger configuration to use.
    pub logger_config: Option<LoggerConfig>,
    pub backend: Backend,
    /// Capacity of the queue collecting hotkey listener faults.
    pub hotkey_fault_capacity: usize,
    /// Used when `backend` is `emulated`.
    pub emulator: EmulatorConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            app_name: "w32".to_string(),
            logger_config: Some(Default::default()),
            backend: Backend::default(),
            hotkey_fault_capacity: 64,
            emulator: EmulatorConfig::default(),
        }
    }
}

/// `GatewayConfigBuilder` is a convenience builder to create a `GatewayConfig` from code.
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl Default for GatewayConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayConfigBuilder {
    /// Create a new `GatewayConfigBuilder` builder
    pub fn new() -> Self {
        Self { config: Default::default() }
    }

    pub fn with_app_name(mut self, app_name: String) -> Self {
        self.config.app_name = app_name;
        self
    }

    /// Sets the logger configuration for the application
    pub fn with_logger_config(mut self, logger_config: LoggerConfig) -> Self {
        self.config.logger_config = Some(logger_config);
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn with_hotkey_fault_capacity(mut self, capacity: usize) -> Self {
        self.config.hotkey_fault_capacity = capacity.max(1);
        self
    }

    /// Sets the emulator configuration. `EmulatorConfig` can be built using `EmulatorConfigBuilder`
    pub fn with_emulator_config(mut self, emulator: EmulatorConfig) -> Self {
        self.config.emulator = emulator;
        self
    }

    /// Retrieves the configuration built
    pub fn get(self) -> GatewayConfig {
        self.config
    }
}

pub struct GatewayConfigReader;

impl GatewayConfigReader {
    pub const DEFAULT_FILE: &'static str = "w32.json";

    /// Read `w32.json` from the working directory, writing the default
    /// configuration there first when it is missing.
    pub fn read_or_create_default_w32_json() -> Result<GatewayConfig> {
        Self::read_or_create(Path::new(Self::DEFAULT_FILE))
    }

    pub fn read_or_create(path: &Path) -> Result<GatewayConfig> {
        if !path.exists() {
            println!("Couldn't find `{}` configuration file. Generating a new one", path.display());
            let config = GatewayConfig::default();
            let mut file = File::create(path)?;
            file.write_all(serde_json::to_vec_pretty(&config)?.as_slice())?;
            Ok(config)
        } else {
            GatewayConfigReader::read_gateway_config(path)
        }
    }

    pub fn read_gateway_json(path: &Path) -> Result<GatewayConfig> {
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(ErrorKind::NotFound, "File not found")));
        }
        GatewayConfigReader::read_gateway_config(path)
    }

    fn read_gateway_config(path: &Path) -> Result<GatewayConfig> {
        let mut gateway_config = File::open(path)?;
        let mut bytes = Vec::new();
        gateway_config.read_to_end(&mut bytes)?;
        let config = serde_json::from_slice(bytes.as_slice())?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w32.json");
        let created = GatewayConfigReader::read_or_create(&path).unwrap();
        assert!(path.exists());
        let read = GatewayConfigReader::read_gateway_json(&path).unwrap();
        assert_eq!(read.app_name, created.app_name);
        assert_eq!(read.hotkey_fault_capacity, 64);
        assert_eq!(read.emulator, EmulatorConfig::default());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{"backend":"emulated","emulator":{"user_name":"ops","is_admin":true}}"#).unwrap();
        let config = GatewayConfigReader::read_gateway_json(&path).unwrap();
        assert_eq!(config.backend, Backend::Emulated);
        assert_eq!(config.emulator.user_name.as_deref(), Some("ops"));
        assert!(config.emulator.is_admin);
        assert_eq!(config.hotkey_fault_capacity, 64);
    }

    #[test]
    fn reading_a_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GatewayConfigReader::read_gateway_json(&dir.path().join("absent.json")),
            Err(Error::Io(_))
        ));
    }
}
