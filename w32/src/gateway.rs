//! The facade a script host embeds.

use std::sync::Arc;

use w32_script::{FunctionRegistry, Param, ScriptError, Table, Variant};

use crate::bindings;
use crate::config::{Backend, GatewayConfig};
use crate::constants;
use crate::error::{Error, Result};
use crate::hotkey::HotkeyListeners;
use crate::platform::{self, emu::Emulator, Win32};
use crate::trace;

/// State shared by every binding of one gateway.
pub struct Host {
    os: Arc<dyn Win32>,
    hotkeys: HotkeyListeners,
}

impl Host {
    pub fn new(os: Arc<dyn Win32>, hotkey_fault_capacity: usize) -> Self {
        Self { os, hotkeys: HotkeyListeners::new(hotkey_fault_capacity) }
    }

    pub fn os(&self) -> &dyn Win32 {
        self.os.as_ref()
    }

    pub(crate) fn os_arc(&self) -> &Arc<dyn Win32> {
        &self.os
    }

    pub fn hotkeys(&self) -> &HotkeyListeners {
        &self.hotkeys
    }
}

/// Flat namespace of Win32 bindings over one platform backend.
pub struct Gateway {
    host: Host,
    functions: FunctionRegistry<Host>,
}

impl Gateway {
    pub fn new(os: Arc<dyn Win32>) -> Self {
        Self::with_fault_capacity(os, GatewayConfig::default().hotkey_fault_capacity)
    }

    fn with_fault_capacity(os: Arc<dyn Win32>, capacity: usize) -> Self {
        let mut functions = FunctionRegistry::new();
        bindings::register_all(&mut functions);
        log::debug!("registered {} bindings", functions.len());
        Self { host: Host::new(os, capacity), functions }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let os: Arc<dyn Win32> = match config.backend {
            Backend::Native => platform::native().ok_or(Error::BackendUnavailable("native"))?,
            Backend::Emulated => Arc::new(Emulator::new(config.emulator.clone())),
        };
        log::info!("{}: using the {:?} backend", config.app_name, config.backend);
        Ok(Self::with_fault_capacity(os, config.hotkey_fault_capacity))
    }

    /// Gateway over a fresh emulator, returned alongside it so callers can
    /// drive the emulated machine.
    pub fn emulated() -> (Self, Arc<Emulator>) {
        let emu = Arc::new(Emulator::default());
        (Self::new(emu.clone()), emu)
    }

    /// Invoke the binding registered under `name`.
    pub fn call(&self, name: &str, args: &[Variant]) -> std::result::Result<Vec<Variant>, ScriptError> {
        let result = self.functions.call(&self.host, name, args);
        match &result {
            Ok(values) => trace::call(format_args!(
                "{name}({}) -> ({})",
                trace::values(args),
                trace::values(values)
            )),
            Err(e) => trace::call(format_args!("{name}({}) raised: {e}", trace::values(args))),
        }
        result
    }

    /// Registered names in lexical order.
    pub fn function_names(&self) -> Vec<&'static str> {
        self.functions.names()
    }

    /// Declared parameters of `name`.
    pub fn signature(&self, name: &str) -> Option<&[Param]> {
        self.functions.params(name)
    }

    /// Catalog group (`"Window"`, `"Registry"`, ...) of `name`.
    pub fn group(&self, name: &str) -> Option<&'static str> {
        bindings::group(name)
    }

    pub fn constants_table(&self) -> Table {
        constants::as_table()
    }

    pub fn host(&self) -> &Host {
        &self.host
    }
}
