//! The binding catalog.
//!
//! Most bindings are rows of a [`BindingSpec`] table: a name, the declared
//! parameters, a result policy and a handler making one native call. The
//! few that need more than that (the hotkey listener, the retrying registry
//! read, registry enumeration) implement [`Syscaller`] directly.

mod file;
mod hotkey;
mod message;
mod process;
mod registry;
mod service;
mod shell;
mod sync;
mod tabctrl;
mod window;

use w32_script::{Args, FunctionRegistry, Param, Result, Syscaller, Variant};

use crate::error::OsResult;
use crate::gateway::Host;
use crate::marshal::{Completion, Policy};
use crate::trace;

pub type Handler = fn(&Host, &Args) -> Result<Completion>;

#[derive(Clone, Copy)]
pub struct BindingSpec {
    pub name: &'static str,
    pub group: &'static str,
    pub params: &'static [Param],
    pub policy: Policy,
    pub handler: Handler,
}

/// Check `values` against `params`, tracing marshaling failures.
pub(crate) fn check(func: &'static str, params: &[Param], values: &[Variant]) -> Result<Args> {
    Args::check(func, params, values).inspect_err(|e| trace::marshal(format_args!("{e}")))
}

impl Syscaller<Host> for BindingSpec {
    fn call(&self, host: &Host, values: &[Variant]) -> Result<Vec<Variant>> {
        let args = check(self.name, self.params, values)?;
        let completion = (self.handler)(host, &args)?;
        Ok(self.policy.apply(completion))
    }

    fn params(&self) -> &[Param] {
        self.params
    }
}

const TABLES: &[&[BindingSpec]] = &[
    window::SPECS,
    message::SPECS,
    hotkey::SPECS,
    tabctrl::SPECS,
    sync::SPECS,
    process::SPECS,
    file::SPECS,
    registry::SPECS,
    service::SPECS,
    shell::SPECS,
];

/// Every binding the gateway exports.
pub fn specs() -> impl Iterator<Item = &'static BindingSpec> {
    TABLES.iter().flat_map(|t| t.iter())
}

/// Bindings that implement [`Syscaller`] themselves, with their groups.
const HAND_WRITTEN: &[(&str, &str)] = &[
    ("RegisterHotKey", "HotKey"),
    ("RegQueryValueEx", "Registry"),
    ("RegEnumKeyEx", "Registry"),
    ("RegEnumValue", "Registry"),
];

/// Catalog group of the binding `name`.
pub fn group(name: &str) -> Option<&'static str> {
    specs()
        .map(|s| (s.name, s.group))
        .chain(HAND_WRITTEN.iter().copied())
        .find_map(|(n, g)| (n == name).then_some(g))
}

pub fn register_all(registry: &mut FunctionRegistry<Host>) {
    for spec in specs() {
        registry.register(spec.name, *spec);
    }
    hotkey::register(registry);
    registry::register(registry);
}

/// Log a failed native call at debug level and pass the result on.
pub(crate) fn logged<T>(args: &Args, r: OsResult<T>) -> OsResult<T> {
    if let Err(e) = &r {
        log::debug!("{} failed: {e}", args.func());
    }
    r
}

/// `true` / `false`.
pub(crate) fn boolean(args: &Args, r: OsResult<()>) -> Completion {
    Completion::value(logged(args, r).is_ok())
}

/// `1` / `0`.
pub(crate) fn numeric(args: &Args, r: OsResult<()>) -> Completion {
    Completion::value(logged(args, r).is_ok() as i64)
}

/// The value on success, nil on failure.
pub(crate) fn or_nil<T: Into<Variant>>(args: &Args, r: OsResult<T>) -> Completion {
    Completion::value(logged(args, r).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn spec_names_are_unique() {
        let mut seen = HashSet::new();
        for spec in specs() {
            assert!(seen.insert(spec.name), "{} declared twice", spec.name);
            assert!(!spec.group.is_empty());
        }
    }

    #[test]
    fn every_registered_binding_has_a_group() {
        let mut registry = FunctionRegistry::new();
        register_all(&mut registry);
        for name in registry.names() {
            assert!(group(name).is_some(), "{name} has no group");
        }
        assert_eq!(group("RegisterHotKey"), Some("HotKey"));
        assert_eq!(group("RegEnumValue"), Some("Registry"));
        assert_eq!(group("TabCtrl_GetCurSel"), Some("TabCtrl"));
        assert_eq!(group("NoSuchApi"), None);
    }
}
