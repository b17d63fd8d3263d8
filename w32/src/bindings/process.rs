use w32_script::{Args, Param, Result};

use crate::constants::SYNCHRONIZE;
use crate::gateway::Host;
use crate::marshal::record::FromRecord;
use crate::marshal::{Completion, Policy};
use crate::platform::{ProcessRequest, SecurityAttributes, StartupInfo};

use super::{logged, numeric, or_nil, BindingSpec};

fn create_process(host: &Host, args: &Args) -> Result<Completion> {
    let request = ProcessRequest {
        application: args.opt_string(0)?,
        command_line: args.opt_string(1)?,
        process_attributes: SecurityAttributes::from_arg(args, 2)?,
        thread_attributes: SecurityAttributes::from_arg(args, 3)?,
        inherit_handles: args.flag(4)?,
        creation_flags: args.dword(5)?,
        startup: StartupInfo::from_arg(args, 6)?,
        current_directory: args.opt_string(7)?,
    };
    Ok(match logged(args, host.os().create_process(&request)) {
        Ok(info) => Completion::numeric(
            true,
            vec![info.process.into(), info.thread.into(), info.process_id.into(), info.thread_id.into()],
        ),
        Err(_) => Completion::numeric(false, Vec::new()),
    })
}

fn open_process(host: &Host, args: &Args) -> Result<Completion> {
    Ok(or_nil(args, host.os().open_process(args.dword(0)?, args.flag(1)?, args.dword(2)?)))
}

fn terminate_process(host: &Host, args: &Args) -> Result<Completion> {
    Ok(numeric(args, host.os().terminate_process(args.handle(0)?, args.dword(1)?)))
}

fn get_exit_code_process(host: &Host, args: &Args) -> Result<Completion> {
    Ok(match logged(args, host.os().exit_code_process(args.handle(0)?)) {
        Ok(code) => Completion::numeric(true, vec![code.into()]),
        Err(_) => Completion::numeric(false, Vec::new()),
    })
}

fn is_running(host: &Host, args: &Args) -> Result<Completion> {
    let running = match host.os().open_process(SYNCHRONIZE, false, args.dword(0)?) {
        Ok(handle) => {
            if let Err(e) = host.os().close_handle(handle) {
                log::warn!("IsRunning: closing process handle {:#x} failed: {e}", handle.as_raw());
            }
            true
        }
        Err(_) => false,
    };
    Ok(Completion::value(running))
}

fn get_current_process_id(host: &Host, _args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().current_process_id()))
}

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec {
        name: "CreateProcess",
        group: "Process",
        params: &[
            Param::opt_str("lpApplicationName"),
            Param::opt_str("lpCommandLine"),
            Param::record("lpProcessAttributes"),
            Param::record("lpThreadAttributes"),
            Param::flag("bInheritHandles"),
            Param::int("dwCreationFlags"),
            Param::record("lpStartupInfo"),
            Param::opt_str("lpCurrentDirectory"),
        ],
        policy: Policy::Gated { slots: 4 },
        handler: create_process,
    },
    BindingSpec {
        name: "OpenProcess",
        group: "Process",
        params: &[Param::int("dwDesiredAccess"), Param::flag("bInheritHandle"), Param::int("dwProcessId")],
        policy: Policy::Direct,
        handler: open_process,
    },
    BindingSpec {
        name: "TerminateProcess",
        group: "Process",
        params: &[Param::handle("hProcess"), Param::int("uExitCode")],
        policy: Policy::Direct,
        handler: terminate_process,
    },
    BindingSpec {
        name: "GetExitCodeProcess",
        group: "Process",
        params: &[Param::handle("hProcess")],
        policy: Policy::Gated { slots: 1 },
        handler: get_exit_code_process,
    },
    BindingSpec {
        name: "IsRunning",
        group: "Process",
        params: &[Param::int("dwProcessId")],
        policy: Policy::Direct,
        handler: is_running,
    },
    BindingSpec {
        name: "GetCurrentProcessId",
        group: "Process",
        params: &[],
        policy: Policy::Direct,
        handler: get_current_process_id,
    },
];
