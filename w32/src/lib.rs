//! Win32 API bindings for an embedded script host.
//!
//! Scripts call into a flat namespace of functions through [`Gateway`]:
//! arguments arrive as [`Variant`]s, are checked against each binding's
//! declared parameters, go to the OS through the [`Win32`] seam and come
//! back as a fixed-shape result tuple. The seam has two backends: the real
//! OS on Windows and an in-process [`Emulator`] everywhere.

pub mod bindings;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod handle;
pub mod hotkey;
pub mod logger;
pub mod marshal;
pub mod platform;
pub mod trace;

pub use config::{Backend, GatewayConfig, GatewayConfigBuilder, GatewayConfigReader, LoggerConfig};
pub use error::{Error, OsError, OsResult, Result};
pub use gateway::{Gateway, Host};
pub use platform::emu::Emulator;
pub use platform::Win32;
pub use w32_script::{Param, ScriptError, Table, TableKey, Variant};
