//! Strict argument extraction.
//!
//! Every exported function declares an ordered list of [`Param`]s. Required
//! parameters must be present and of the right type; optional ones fall back
//! to the declared default when absent or `nil`. Record and list parameters
//! are always optional: any non-table value reads as absent.

use crate::error::{Result, ScriptError};
use crate::variant::{Table, TableKey, Variant};

macro_rules! get_var {
    ($args:expr, $i:expr) => {
        if let Some(variant) = $args.get($i) {
            variant
        } else {
            &Variant::Nil
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Int,
    /// Native `BOOL`: a boolean or a number (non-zero is true).
    Flag,
    Str,
    Bytes,
    /// Pointer-sized handle, passed as an integer.
    Handle,
    /// Number or string, kept as given.
    Value,
    Record,
    List,
}

impl Kind {
    pub fn expected(self) -> &'static str {
        match self {
            Kind::Int | Kind::Handle => "number",
            Kind::Flag => "boolean",
            Kind::Str | Kind::Bytes => "string",
            Kind::Value => "number or string",
            Kind::Record | Kind::List => "table",
        }
    }

    fn accepts(self, v: &Variant) -> bool {
        match self {
            Kind::Int | Kind::Handle => v.as_int().is_some(),
            Kind::Flag => matches!(v, Variant::Bool(_)) || v.as_int().is_some(),
            Kind::Str => v.as_str().is_some(),
            Kind::Bytes => v.as_bytes().is_some(),
            Kind::Value => v.is_number() || v.is_string(),
            Kind::Record | Kind::List => v.is_table(),
        }
    }

    fn normalize(self, v: &Variant) -> Variant {
        match self {
            Kind::Int | Kind::Handle => v.as_int().map(Variant::Int).unwrap_or_default(),
            Kind::Flag => match v {
                Variant::Bool(b) => Variant::Bool(*b),
                other => Variant::Bool(other.as_int().unwrap_or(0) != 0),
            },
            Kind::Str => v.as_str().map(Variant::from).unwrap_or_default(),
            _ => v.clone(),
        }
    }
}

/// Value substituted for an absent optional argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    Nil,
    Int(i64),
    Bool(bool),
}

impl From<Fallback> for Variant {
    fn from(value: Fallback) -> Self {
        match value {
            Fallback::Nil => Variant::Nil,
            Fallback::Int(i) => Variant::Int(i),
            Fallback::Bool(b) => Variant::Bool(b),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: Kind,
    /// `None` marks a required parameter.
    pub fallback: Option<Fallback>,
}

impl Param {
    const fn new(name: &'static str, kind: Kind, fallback: Option<Fallback>) -> Self {
        Self { name, kind, fallback }
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, Kind::Int, None)
    }

    pub const fn opt_int(name: &'static str, default: i64) -> Self {
        Self::new(name, Kind::Int, Some(Fallback::Int(default)))
    }

    pub const fn flag(name: &'static str) -> Self {
        Self::new(name, Kind::Flag, None)
    }

    pub const fn str(name: &'static str) -> Self {
        Self::new(name, Kind::Str, None)
    }

    pub const fn opt_str(name: &'static str) -> Self {
        Self::new(name, Kind::Str, Some(Fallback::Nil))
    }

    pub const fn bytes(name: &'static str) -> Self {
        Self::new(name, Kind::Bytes, None)
    }

    pub const fn handle(name: &'static str) -> Self {
        Self::new(name, Kind::Handle, None)
    }

    pub const fn opt_handle(name: &'static str) -> Self {
        Self::new(name, Kind::Handle, Some(Fallback::Int(0)))
    }

    pub const fn value(name: &'static str) -> Self {
        Self::new(name, Kind::Value, None)
    }

    pub const fn record(name: &'static str) -> Self {
        Self::new(name, Kind::Record, Some(Fallback::Nil))
    }

    pub const fn list(name: &'static str) -> Self {
        Self::new(name, Kind::List, Some(Fallback::Nil))
    }

    /// Optional parameter with no native default; reads as `nil` when absent.
    pub const fn opt(name: &'static str, kind: Kind) -> Self {
        Self::new(name, kind, Some(Fallback::Nil))
    }

    pub fn is_optional(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Arguments of one call, checked against a parameter list.
#[derive(Debug, Clone)]
pub struct Args {
    func: &'static str,
    values: Vec<Variant>,
}

impl Args {
    /// Validate `values` against `params`, filling defaults for absent
    /// optional arguments. Extra trailing values are ignored.
    pub fn check(func: &'static str, params: &[Param], values: &[Variant]) -> Result<Self> {
        let mut out = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            let v = get_var!(values, i);
            let slot = match (param.kind, v) {
                (Kind::Record | Kind::List, Variant::Table(_)) => v.clone(),
                (Kind::Record | Kind::List, _) => Variant::Nil,
                (kind, Variant::Nil) => match param.fallback {
                    Some(fallback) => fallback.into(),
                    None => {
                        return Err(ScriptError::BadArgument {
                            func,
                            index: i + 1,
                            expected: kind.expected(),
                            got: v.type_name(),
                        })
                    }
                },
                (kind, v) if kind.accepts(v) => kind.normalize(v),
                (kind, v) => {
                    return Err(ScriptError::BadArgument {
                        func,
                        index: i + 1,
                        expected: kind.expected(),
                        got: v.type_name(),
                    })
                }
            };
            out.push(slot);
        }
        Ok(Self { func, values: out })
    }

    /// Wrap already-normalized values without a parameter list.
    pub fn raw(func: &'static str, values: Vec<Variant>) -> Self {
        Self { func, values }
    }

    pub fn func(&self) -> &'static str {
        self.func
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, i: usize) -> &Variant {
        get_var!(self.values, i)
    }

    fn bad(&self, i: usize, expected: &'static str) -> ScriptError {
        ScriptError::BadArgument {
            func: self.func,
            index: i + 1,
            expected,
            got: self.value(i).type_name(),
        }
    }

    /// Error for a wrongly typed field inside a record or list argument.
    pub fn bad_field(&self, i: usize, field: &TableKey, expected: &'static str, got: &Variant) -> ScriptError {
        ScriptError::BadField {
            func: self.func,
            index: i + 1,
            field: field.to_string(),
            expected,
            got: got.type_name(),
        }
    }

    pub fn int(&self, i: usize) -> Result<i64> {
        self.value(i).as_int().ok_or_else(|| self.bad(i, "number"))
    }

    /// Integer for a signed 32-bit parameter such as an index or an id.
    pub fn int32(&self, i: usize) -> Result<i32> {
        let value = self.int(i)?;
        i32::try_from(value).map_err(|_| ScriptError::OutOfRange { func: self.func, index: i + 1, value })
    }

    pub fn opt_int32(&self, i: usize) -> Result<Option<i32>> {
        match self.value(i) {
            Variant::Nil => Ok(None),
            _ => self.int32(i).map(Some),
        }
    }

    /// Integer truncated to a native `DWORD`, as a C cast would.
    pub fn dword(&self, i: usize) -> Result<u32> {
        Ok(self.int(i)? as u32)
    }

    pub fn opt_int(&self, i: usize) -> Result<Option<i64>> {
        match self.value(i) {
            Variant::Nil => Ok(None),
            _ => self.int(i).map(Some),
        }
    }

    pub fn flag(&self, i: usize) -> Result<bool> {
        match self.value(i) {
            Variant::Bool(b) => Ok(*b),
            v => v.as_int().map(|n| n != 0).ok_or_else(|| self.bad(i, "boolean")),
        }
    }

    pub fn string(&self, i: usize) -> Result<&str> {
        self.value(i).as_str().ok_or_else(|| self.bad(i, "string"))
    }

    pub fn opt_string(&self, i: usize) -> Result<Option<&str>> {
        match self.value(i) {
            Variant::Nil => Ok(None),
            _ => self.string(i).map(Some),
        }
    }

    pub fn bytes(&self, i: usize) -> Result<&[u8]> {
        self.value(i).as_bytes().ok_or_else(|| self.bad(i, "string"))
    }

    /// Handle slot reinterpreted bit-for-bit as a pointer-sized value.
    pub fn handle<H: From<isize>>(&self, i: usize) -> Result<H> {
        Ok(H::from(self.int(i)? as isize))
    }

    pub fn table(&self, i: usize) -> Option<&Table> {
        self.value(i).as_table()
    }

    /// Integers of the array part of a list argument, stopping at the first
    /// gap and after `max` entries.
    pub fn int_list(&self, i: usize, max: usize) -> Result<Vec<i64>> {
        let Some(table) = self.table(i) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (n, v) in table.array().take(max).enumerate() {
            let key = TableKey::Index(n as i64 + 1);
            out.push(v.as_int().ok_or_else(|| self.bad_field(i, &key, "number", v))?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PARAMS: &[Param] = &[
        Param::handle("hWnd"),
        Param::opt_int("wMsgFilterMin", 0),
        Param::opt_str("lpName"),
        Param::record("lpAttributes"),
    ];

    #[test]
    fn optional_arguments_take_declared_defaults() {
        let args = Args::check("Probe", PARAMS, &[Variant::Int(7)]).unwrap();
        assert_eq!(args.int(0).unwrap(), 7);
        assert_eq!(args.int(1).unwrap(), 0);
        assert_eq!(args.opt_string(2).unwrap(), None);
        assert!(args.table(3).is_none());
    }

    #[test]
    fn missing_required_argument_names_position_and_types() {
        let err = Args::check("Probe", PARAMS, &[]).unwrap_err();
        assert_eq!(err.to_string(), "bad argument #1 to 'Probe' (number expected, got nil)");
    }

    #[test]
    fn wrong_typed_optional_argument_is_rejected() {
        let err = Args::check("Probe", PARAMS, &[Variant::Int(1), Variant::from("x")]).unwrap_err();
        assert_eq!(
            err,
            ScriptError::BadArgument { func: "Probe", index: 2, expected: "number", got: "string" }
        );
    }

    #[test]
    fn int32_rejects_values_outside_the_range() {
        let args = Args::check("Probe", PARAMS, &[Variant::Int(7), Variant::Int(1 << 32)]).unwrap();
        assert_eq!(args.int32(0).unwrap(), 7);
        assert_eq!(args.int32(1).unwrap_err(), ScriptError::OutOfRange { func: "Probe", index: 2, value: 1 << 32 });
        assert_eq!(args.opt_int32(2).unwrap(), None);
    }

    #[test]
    fn non_table_record_reads_as_absent() {
        let args = Args::check("Probe", PARAMS, &[1.into(), 0.into(), "n".into(), 5.into()]).unwrap();
        assert!(args.value(3).is_nil());
        assert_eq!(args.opt_string(2).unwrap(), Some("n"));
    }

    #[test]
    fn flags_accept_numbers_and_booleans() {
        let params = [Param::flag("a"), Param::flag("b"), Param::flag("c")];
        let args = Args::check("F", &params, &[true.into(), 0.into(), 2.into()]).unwrap();
        assert_eq!((args.flag(0).unwrap(), args.flag(1).unwrap(), args.flag(2).unwrap()), (true, false, true));
    }

    #[test]
    fn handles_keep_their_bits() {
        let args = Args::check("H", &[Param::handle("h")], &[Variant::Int(-2147483646)]).unwrap();
        let raw: isize = args.handle(0).unwrap();
        assert_eq!(raw, -2147483646isize);
    }

    #[test]
    fn int_list_stops_at_gap() {
        let mut t = Table::new();
        t.push(1);
        t.push(2);
        t.insert(4i64, 4);
        let args = Args::check("W", &[Param::list("h")], &[t.into()]).unwrap();
        assert_eq!(args.int_list(0, 64).unwrap(), vec![1, 2]);
    }
}
