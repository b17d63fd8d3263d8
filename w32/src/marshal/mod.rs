//! Conversions between script values and native data.
//!
//! Arguments arrive already checked against the binding's parameter list;
//! this module covers the rest: table-shaped records, registry value
//! payloads and the normalization of native results into the tuple a
//! script receives.

pub mod record;
pub mod regval;

use w32_script::Variant;

/// How a binding's [`Completion`] becomes its result tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Values as produced.
    Direct,
    /// Status first; then `slots` payload values on success or `slots`
    /// nils on failure.
    Gated { slots: usize },
    /// Like `Gated`, followed by the OS error code on failure (nil on
    /// success).
    GatedWithError { slots: usize },
    /// Exactly `width` values, nil-padded.
    Fixed { width: usize },
}

/// Raw outcome of a binding before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    Values(Vec<Variant>),
    Status {
        /// Pushed as the first value; a bool or a number depending on the
        /// binding.
        status: Variant,
        ok: bool,
        payload: Vec<Variant>,
        error: Option<u32>,
    },
}

impl Completion {
    pub fn none() -> Self {
        Completion::Values(Vec::new())
    }

    pub fn value(v: impl Into<Variant>) -> Self {
        Completion::Values(vec![v.into()])
    }

    /// Boolean status.
    pub fn flag(ok: bool, payload: Vec<Variant>) -> Self {
        Completion::Status { status: Variant::Bool(ok), ok, payload, error: None }
    }

    /// Numeric status: `1` on success, `0` on failure.
    pub fn numeric(ok: bool, payload: Vec<Variant>) -> Self {
        Completion::Status { status: Variant::Int(ok as i64), ok, payload, error: None }
    }

    pub fn with_error(mut self, code: Option<u32>) -> Self {
        if let Completion::Status { error, .. } = &mut self {
            *error = code;
        }
        self
    }
}

fn fit(mut values: Vec<Variant>, width: usize) -> Vec<Variant> {
    values.resize(width, Variant::Nil);
    values
}

impl Policy {
    pub fn apply(self, completion: Completion) -> Vec<Variant> {
        match (self, completion) {
            (Policy::Fixed { width }, Completion::Values(values)) => fit(values, width),
            (Policy::Fixed { width }, Completion::Status { status, ok, payload, .. }) => {
                let mut out = vec![status];
                if ok {
                    out.extend(payload);
                }
                fit(out, width)
            }
            (_, Completion::Values(values)) => values,
            (Policy::Direct, Completion::Status { status, payload, error, .. }) => {
                let mut out = vec![status];
                out.extend(payload);
                out.extend(error.map(Variant::from));
                out
            }
            (Policy::Gated { slots }, Completion::Status { status, ok, payload, .. }) => {
                let mut out = vec![status];
                out.extend(if ok { fit(payload, slots) } else { vec![Variant::Nil; slots] });
                out
            }
            (Policy::GatedWithError { slots }, Completion::Status { status, ok, payload, error }) => {
                let mut out = vec![status];
                if ok {
                    out.extend(fit(payload, slots));
                    out.push(Variant::Nil);
                } else {
                    out.extend(vec![Variant::Nil; slots]);
                    out.push(Variant::from(error.unwrap_or(0)));
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn failed_gated_call_keeps_its_arity() {
        let failed = Completion::numeric(false, vec![Variant::Int(3), Variant::Int(4)]);
        assert_eq!(
            Policy::Gated { slots: 4 }.apply(failed),
            vec![Variant::Int(0), Variant::Nil, Variant::Nil, Variant::Nil, Variant::Nil]
        );
        let ok = Completion::numeric(true, vec![Variant::Int(3)]);
        assert_eq!(Policy::Gated { slots: 2 }.apply(ok), vec![Variant::Int(1), Variant::Int(3), Variant::Nil]);
    }

    #[test]
    fn error_slot_is_nil_on_success() {
        let policy = Policy::GatedWithError { slots: 1 };
        let ok = Completion::flag(true, vec![Variant::from("C:\\x")]).with_error(Some(5));
        assert_eq!(policy.apply(ok), vec![Variant::Bool(true), Variant::from("C:\\x"), Variant::Nil]);
        let failed = Completion::flag(false, vec![]).with_error(Some(123));
        assert_eq!(policy.apply(failed), vec![Variant::Bool(false), Variant::Nil, Variant::Int(123)]);
    }

    #[test]
    fn fixed_width_pads_and_drops_failed_payload() {
        let policy = Policy::Fixed { width: 4 };
        assert_eq!(policy.apply(Completion::value(1)).len(), 4);
        let quit = Completion::Status { status: Variant::Int(0), ok: false, payload: vec![Variant::Int(9)], error: None };
        assert_eq!(policy.apply(quit), vec![Variant::Int(0), Variant::Nil, Variant::Nil, Variant::Nil]);
    }
}
