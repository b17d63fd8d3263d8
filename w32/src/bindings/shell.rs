use w32_script::{Args, Param, Result};

use crate::gateway::Host;
use crate::marshal::{Completion, Policy};

use super::{boolean, logged, or_nil, BindingSpec};

fn sh_get_special_folder_location(host: &Host, args: &Args) -> Result<Completion> {
    Ok(or_nil(args, host.os().special_folder_path(args.dword(0)?)))
}

fn is_user_admin(host: &Host, _args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().is_user_admin()))
}

fn get_user_name(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(logged(args, host.os().user_name()).unwrap_or_default()))
}

fn get_version(host: &Host, _args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().version()))
}

fn mci_send_string(host: &Host, args: &Args) -> Result<Completion> {
    let code = host.os().mci_send_string(args.string(0)?);
    if code != 0 {
        log::debug!("mciSendString failed: mci error {code}");
    }
    Ok(Completion::value(code))
}

fn message_beep(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().message_beep(args.dword(0)?)))
}

fn beep(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().beep(args.dword(0)?, args.dword(1)?)))
}

fn co_initialize(host: &Host, _args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().co_initialize()))
}

fn co_uninitialize(host: &Host, _args: &Args) -> Result<Completion> {
    host.os().co_uninitialize();
    Ok(Completion::none())
}

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec {
        name: "SHGetSpecialFolderLocation",
        group: "Shell",
        params: &[Param::int("nFolder")],
        policy: Policy::Direct,
        handler: sh_get_special_folder_location,
    },
    BindingSpec { name: "IsUserAdmin", group: "Shell", params: &[], policy: Policy::Direct, handler: is_user_admin },
    BindingSpec { name: "GetUserName", group: "Shell", params: &[], policy: Policy::Direct, handler: get_user_name },
    BindingSpec { name: "GetVersion", group: "Shell", params: &[], policy: Policy::Direct, handler: get_version },
    BindingSpec {
        name: "mciSendString",
        group: "Shell",
        params: &[Param::str("lpszCommand")],
        policy: Policy::Direct,
        handler: mci_send_string,
    },
    BindingSpec {
        name: "MessageBeep",
        group: "Shell",
        params: &[Param::int("uType")],
        policy: Policy::Direct,
        handler: message_beep,
    },
    BindingSpec {
        name: "Beep",
        group: "Shell",
        params: &[Param::int("dwFreq"), Param::int("dwDuration")],
        policy: Policy::Direct,
        handler: beep,
    },
    BindingSpec { name: "CoInitialize", group: "Shell", params: &[], policy: Policy::Direct, handler: co_initialize },
    BindingSpec { name: "CoUninitialize", group: "Shell", params: &[], policy: Policy::Direct, handler: co_uninitialize },
];
