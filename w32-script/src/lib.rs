//! Script-side half of the w32 gateway: the dynamic value model, strict
//! argument extraction and the flat function registry a host exposes.

pub mod args;
pub mod error;
pub mod syscall;
pub mod variant;

pub use args::{Args, Fallback, Kind, Param};
pub use error::{Result, ScriptError};
pub use syscall::{FunctionRegistry, Syscaller};
pub use variant::{Table, TableKey, Variant};
