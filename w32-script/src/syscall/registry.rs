use std::collections::HashMap;

use crate::args::Param;
use crate::error::{Result, ScriptError};
use crate::syscall::Syscaller;
use crate::variant::Variant;

type BoxedSyscaller<C> = Box<dyn Syscaller<C> + Send + Sync>;

/// Name-keyed table of callables.
pub struct FunctionRegistry<C: ?Sized> {
    fns: HashMap<&'static str, BoxedSyscaller<C>>,
}

impl<C: ?Sized> Default for FunctionRegistry<C> {
    fn default() -> Self {
        Self { fns: HashMap::new() }
    }
}

impl<C: ?Sized> FunctionRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `f` under `name`, replacing any earlier binding.
    pub fn register<F>(&mut self, name: &'static str, f: F)
    where
        F: Syscaller<C> + Send + Sync + 'static,
    {
        if self.fns.insert(name, Box::new(f)).is_some() {
            log::warn!("function {} registered twice", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.fns.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn params(&self, name: &str) -> Option<&[Param]> {
        self.fns.get(name).map(|f| f.params())
    }

    pub fn call(&self, ctx: &C, name: &str, args: &[Variant]) -> Result<Vec<Variant>> {
        let f = self
            .fns
            .get(name)
            .ok_or_else(|| ScriptError::UnknownFunction(name.to_string()))?;
        f.call(ctx, args)
    }
}
