use w32_script::{Args, Param, Result, Variant};

use crate::error::OsResult;
use crate::gateway::Host;
use crate::handle::ScHandle;
use crate::marshal::{Completion, Policy};
use crate::platform::ServiceStatus;

use super::{boolean, logged, BindingSpec};

fn status_values(s: &ServiceStatus) -> Vec<Variant> {
    vec![
        s.service_type.into(),
        s.current_state.into(),
        s.controls_accepted.into(),
        s.win32_exit_code.into(),
        s.service_specific_exit_code.into(),
        s.check_point.into(),
        s.wait_hint.into(),
    ]
}

/// Handle, or 0 when the open fails.
fn handle_or_zero(args: &Args, r: OsResult<ScHandle>) -> Completion {
    Completion::value(logged(args, r).unwrap_or(ScHandle::NULL))
}

fn open_sc_manager(host: &Host, args: &Args) -> Result<Completion> {
    Ok(handle_or_zero(args, host.os().open_sc_manager()))
}

fn open_service(host: &Host, args: &Args) -> Result<Completion> {
    Ok(handle_or_zero(args, host.os().open_service(args.handle(0)?, args.string(1)?)))
}

fn close_service_handle(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().close_service_handle(args.handle(0)?)))
}

fn query_service_status(host: &Host, args: &Args) -> Result<Completion> {
    Ok(match logged(args, host.os().query_service_status(args.handle(0)?)) {
        Ok(status) => Completion::flag(true, status_values(&status)),
        Err(_) => Completion::flag(false, Vec::new()),
    })
}

fn query_service_config(host: &Host, args: &Args) -> Result<Completion> {
    Ok(match logged(args, host.os().query_service_config(args.handle(0)?)) {
        Ok(c) => Completion::flag(
            true,
            vec![
                c.service_type.into(),
                c.start_type.into(),
                c.error_control.into(),
                c.binary_path_name.into(),
                c.display_name.into(),
            ],
        ),
        Err(e) => Completion::flag(false, Vec::new()).with_error(Some(e.code())),
    })
}

fn control_service(host: &Host, args: &Args) -> Result<Completion> {
    let r = host.os().control_service(args.handle(0)?, args.dword(1)?);
    Ok(boolean(args, r.map(|_| ())))
}

fn delete_service(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().delete_service(args.handle(0)?)))
}

fn start_service(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().start_service(args.handle(0)?)))
}

const SERVICE: &[Param] = &[Param::handle("hService")];

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec {
        name: "OpenSCManager",
        group: "Service",
        params: &[],
        policy: Policy::Direct,
        handler: open_sc_manager,
    },
    BindingSpec {
        name: "OpenService",
        group: "Service",
        params: &[Param::handle("hSCManager"), Param::str("lpServiceName")],
        policy: Policy::Direct,
        handler: open_service,
    },
    BindingSpec {
        name: "CloseServiceHandle",
        group: "Service",
        params: &[Param::handle("hSCObject")],
        policy: Policy::Direct,
        handler: close_service_handle,
    },
    BindingSpec {
        name: "QueryServiceStatus",
        group: "Service",
        params: SERVICE,
        policy: Policy::Gated { slots: 7 },
        handler: query_service_status,
    },
    BindingSpec {
        name: "QueryServiceConfig",
        group: "Service",
        params: SERVICE,
        policy: Policy::GatedWithError { slots: 5 },
        handler: query_service_config,
    },
    BindingSpec {
        name: "ControlService",
        group: "Service",
        params: &[Param::handle("hService"), Param::int("dwControl")],
        policy: Policy::Direct,
        handler: control_service,
    },
    BindingSpec { name: "DeleteService", group: "Service", params: SERVICE, policy: Policy::Direct, handler: delete_service },
    BindingSpec { name: "StartService", group: "Service", params: SERVICE, policy: Policy::Direct, handler: start_service },
];
