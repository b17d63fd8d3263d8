use std::env;
use std::fmt;
use std::sync::OnceLock;

/// Trace categories, enabled via environment variables.
///
/// Supported:
/// - W32_TRACE="call,marshal,hotkey" (comma/space separated; "all" enables all)
/// - W32_TRACE_CALL=1, W32_TRACE_MARSHAL=1, W32_TRACE_HOTKEY=1
///
/// Caps:
/// - W32_TRACE_MAX_VALUES (usize, default 8): values shown per argument or result list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceKind {
    /// Every binding invocation with its arguments and results.
    Call,
    /// Argument marshaling failures.
    Marshal,
    /// Hotkey listener lifecycle and forwarded messages.
    Hotkey,
}

#[derive(Clone, Copy, Debug)]
struct TraceConfig {
    mask: u32,
    max_values: usize,
}

const M_CALL: u32 = 1 << 0;
const M_MARSHAL: u32 = 1 << 1;
const M_HOTKEY: u32 = 1 << 2;

fn parse_bool_env(name: &str) -> bool {
    match env::var(name) {
        Ok(v) => {
            let s = v.trim().to_ascii_lowercase();
            !(s.is_empty() || s == "0" || s == "false" || s == "no" || s == "off")
        }
        Err(_) => false,
    }
}

fn parse_usize_env(name: &str, default_v: usize) -> usize {
    env::var(name).ok().and_then(|v| v.trim().parse::<usize>().ok()).unwrap_or(default_v)
}

fn parse_mask_from_trace_list(s: &str) -> u32 {
    let mut mask = 0u32;
    for raw in s.split(|c: char| c == ',' || c == ';' || c.is_whitespace()) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => mask |= M_CALL | M_MARSHAL | M_HOTKEY,
            "call" | "calls" => mask |= M_CALL,
            "marshal" | "args" => mask |= M_MARSHAL,
            "hotkey" | "hk" => mask |= M_HOTKEY,
            _ => {}
        }
    }
    mask
}

fn build_config() -> TraceConfig {
    let mut mask = 0u32;

    if let Ok(list) = env::var("W32_TRACE") {
        mask |= parse_mask_from_trace_list(&list);
    }
    if parse_bool_env("W32_TRACE_CALL") {
        mask |= M_CALL;
    }
    if parse_bool_env("W32_TRACE_MARSHAL") {
        mask |= M_MARSHAL;
    }
    if parse_bool_env("W32_TRACE_HOTKEY") {
        mask |= M_HOTKEY;
    }

    TraceConfig { mask, max_values: parse_usize_env("W32_TRACE_MAX_VALUES", 8) }
}

fn cfg() -> &'static TraceConfig {
    static CFG: OnceLock<TraceConfig> = OnceLock::new();
    CFG.get_or_init(build_config)
}

pub fn enabled(k: TraceKind) -> bool {
    let c = cfg();
    match k {
        TraceKind::Call => (c.mask & M_CALL) != 0,
        TraceKind::Marshal => (c.mask & M_MARSHAL) != 0,
        TraceKind::Hotkey => (c.mask & M_HOTKEY) != 0,
    }
}

pub fn max_values() -> usize {
    cfg().max_values
}

/// Render at most [`max_values`] items of a value list.
pub fn values<T: fmt::Display>(items: &[T]) -> String {
    let cap = max_values();
    let mut out: Vec<String> = items.iter().take(cap).map(|v| v.to_string()).collect();
    if items.len() > cap {
        out.push(format!("... +{}", items.len() - cap));
    }
    out.join(", ")
}

pub fn call(args: fmt::Arguments) {
    if !enabled(TraceKind::Call) {
        return;
    }
    log::info!("{}", args);
}

pub fn marshal(args: fmt::Arguments) {
    if !enabled(TraceKind::Marshal) {
        return;
    }
    log::info!("{}", args);
}

pub fn hotkey(args: fmt::Arguments) {
    if !enabled(TraceKind::Hotkey) {
        return;
    }
    log::info!("{}", args);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn trace_list_parsing() {
        assert_eq!(parse_mask_from_trace_list("call, hotkey"), M_CALL | M_HOTKEY);
        assert_eq!(parse_mask_from_trace_list("ALL"), M_CALL | M_MARSHAL | M_HOTKEY);
        assert_eq!(parse_mask_from_trace_list("bogus;;"), 0);
    }
}
