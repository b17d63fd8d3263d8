//! Function integration points.
//!
//! Hosts expose native functionality as a flat set of named callables; each
//! callable receives the raw script arguments and produces an ordered tuple
//! of results.

mod registry;

pub use registry::FunctionRegistry;

use crate::args::Param;
use crate::error::Result;
use crate::variant::Variant;

/// A named callable bound into the script namespace.
///
/// `C` is the host context shared by every callable of a registry.
pub trait Syscaller<C: ?Sized> {
    fn call(&self, ctx: &C, args: &[Variant]) -> Result<Vec<Variant>>;

    /// Declared parameters, used for listings and diagnostics.
    fn params(&self) -> &[Param] {
        &[]
    }
}
