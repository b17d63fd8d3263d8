use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Logger configuration used by the gateway.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Filter for the `w32` crates.
    pub app_level_filter: LevelFilter,
    /// Filter for everything else.
    pub level_filter: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self { app_level_filter: LevelFilter::Info, level_filter: LevelFilter::Warn }
    }
}
