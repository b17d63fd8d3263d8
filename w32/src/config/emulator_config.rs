use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Answers the emulated backend gives for questions about the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Reported by `GetUserName`; falls back to the environment when unset.
    pub user_name: Option<String>,
    /// Packed `GetVersion` value.
    pub version: u32,
    pub is_admin: bool,
    /// CSIDL value to folder path.
    pub special_folders: BTreeMap<u32, String>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        let special_folders = [
            (CSIDL_PROGRAM_FILES, r"C:\Program Files"),
            (CSIDL_COMMON_PROGRAMS, r"C:\ProgramData\Microsoft\Windows\Start Menu\Programs"),
            (CSIDL_COMMON_STARTMENU, r"C:\ProgramData\Microsoft\Windows\Start Menu"),
            (CSIDL_COMMON_STARTUP, r"C:\ProgramData\Microsoft\Windows\Start Menu\Programs\Startup"),
        ]
        .into_iter()
        .map(|(csidl, path)| (csidl, path.to_string()))
        .collect();
        Self {
            user_name: None,
            // 10.0 reports itself as 6.2 build 9200 without a manifest.
            version: 0x23F0_0206,
            is_admin: false,
            special_folders,
        }
    }
}

/// `EmulatorConfigBuilder` is a convenience builder to create an `EmulatorConfig` from code.
pub struct EmulatorConfigBuilder {
    config: EmulatorConfig,
}

impl Default for EmulatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatorConfigBuilder {
    pub fn new() -> Self {
        Self { config: Default::default() }
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.config.user_name = Some(user_name.into());
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.config.version = version;
        self
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.config.is_admin = is_admin;
        self
    }

    /// Adds or replaces the path reported for a CSIDL.
    pub fn with_special_folder(mut self, csidl: u32, path: impl Into<String>) -> Self {
        self.config.special_folders.insert(csidl, path.into());
        self
    }

    pub fn get(self) -> EmulatorConfig {
        self.config
    }
}
