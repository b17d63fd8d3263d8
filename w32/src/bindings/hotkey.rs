use w32_script::{Args, FunctionRegistry, Param, Result, Syscaller, Table, Variant};

use crate::gateway::Host;
use crate::hotkey::{HotKeyModifiers, HotkeyBinding};
use crate::marshal::{record, Completion, Policy};

use super::{check, BindingSpec};

/// `RegisterHotKey`: start a listener thread that forwards presses of the
/// combination to a window as a posted message.
struct RegisterHotKey;

const REGISTER_PARAMS: &[Param] = &[
    Param::handle("hWnd"),
    Param::int("id"),
    Param::int("fsModifiers"),
    Param::int("vk"),
    Param::int("Msg"),
    Param::int("wParam"),
    Param::int("lParam"),
];

impl Syscaller<Host> for RegisterHotKey {
    fn call(&self, host: &Host, values: &[Variant]) -> Result<Vec<Variant>> {
        let args = check("RegisterHotKey", REGISTER_PARAMS, values)?;
        let binding = HotkeyBinding {
            target: args.handle(0)?,
            id: args.int32(1)?,
            modifiers: HotKeyModifiers::from_bits_retain(args.dword(2)?),
            vk: args.dword(3)?,
            message: args.dword(4)?,
            wparam: args.int(5)? as usize,
            lparam: args.int(6)? as isize,
        };
        let status = match host.hotkeys().start(host.os_arc(), binding) {
            Ok(()) => 0,
            Err(e) => e.status(),
        };
        Ok(vec![Variant::Int(status)])
    }

    fn params(&self) -> &[Param] {
        REGISTER_PARAMS
    }
}

pub(super) fn register(registry: &mut FunctionRegistry<Host>) {
    registry.register("RegisterHotKey", RegisterHotKey);
}

fn unregister_hot_key(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.hotkeys().stop(args.int32(0)?)))
}

fn poll_hot_key_errors(host: &Host, _args: &Args) -> Result<Completion> {
    let faults: Table = host.hotkeys().poll_faults().iter().map(record::hotkey_fault).collect();
    Ok(Completion::value(faults))
}

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec {
        name: "UnregisterHotKey",
        group: "HotKey",
        params: &[Param::int("id")],
        policy: Policy::Direct,
        handler: unregister_hot_key,
    },
    BindingSpec {
        name: "PollHotKeyErrors",
        group: "HotKey",
        params: &[],
        policy: Policy::Direct,
        handler: poll_hot_key_errors,
    },
];
