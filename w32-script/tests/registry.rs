use std::cell::Cell;

use anyhow::Result;
use pretty_assertions::assert_eq;

use w32_script::{Args, FunctionRegistry, Param, ScriptError, Syscaller, Variant};

#[derive(Default)]
struct Counter {
    calls: Cell<u32>,
}

struct Add;

const ADD_PARAMS: &[Param] = &[Param::int("a"), Param::opt_int("b", 1)];

impl Syscaller<Counter> for Add {
    fn call(&self, ctx: &Counter, args: &[Variant]) -> w32_script::Result<Vec<Variant>> {
        ctx.calls.set(ctx.calls.get() + 1);
        let args = Args::check("Add", ADD_PARAMS, args)?;
        Ok(vec![Variant::Int(args.int(0)? + args.int(1)?)])
    }

    fn params(&self) -> &[Param] {
        ADD_PARAMS
    }
}

#[test]
fn dispatches_by_name() -> Result<()> {
    let mut reg = FunctionRegistry::<Counter>::new();
    reg.register("Add", Add);
    let ctx = Counter::default();

    assert_eq!(reg.call(&ctx, "Add", &[Variant::Int(2)])?, vec![Variant::Int(3)]);
    assert_eq!(reg.call(&ctx, "Add", &[Variant::Int(2), Variant::Float(5.0)])?, vec![Variant::Int(7)]);
    assert_eq!(ctx.calls.get(), 2);
    assert_eq!(reg.params("Add").map(|p| p.len()), Some(2));
    Ok(())
}

#[test]
fn unknown_function_is_an_error() {
    let reg = FunctionRegistry::<Counter>::new();
    let err = reg.call(&Counter::default(), "Nope", &[]).unwrap_err();
    assert_eq!(err, ScriptError::UnknownFunction("Nope".into()));
}

#[test]
fn marshaling_error_propagates() {
    let mut reg = FunctionRegistry::<Counter>::new();
    reg.register("Add", Add);
    let err = reg.call(&Counter::default(), "Add", &[Variant::from("two")]).unwrap_err();
    assert_eq!(err.to_string(), "bad argument #1 to 'Add' (number expected, got string)");
}
