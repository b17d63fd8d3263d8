pub mod emulator_config;
pub mod gateway_config;
pub mod logger_config;

pub use emulator_config::{EmulatorConfig, EmulatorConfigBuilder};
pub use gateway_config::{Backend, GatewayConfig, GatewayConfigBuilder, GatewayConfigReader};
pub use logger_config::LoggerConfig;
