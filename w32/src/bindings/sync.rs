use w32_script::{Args, Param, Result};

use crate::constants::MAXIMUM_WAIT_OBJECTS;
use crate::gateway::Host;
use crate::handle::KernelHandle;
use crate::marshal::record::FromRecord;
use crate::marshal::{Completion, Policy};
use crate::platform::SecurityAttributes;

use super::{boolean, logged, numeric, or_nil, BindingSpec};

fn get_last_error(host: &Host, _args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().last_error()))
}

fn close_handle(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().close_handle(args.handle(0)?)))
}

fn create_event(host: &Host, args: &Args) -> Result<Completion> {
    let sa = SecurityAttributes::from_arg(args, 0)?;
    let r = host.os().create_event(&sa, args.flag(1)?, args.flag(2)?, args.opt_string(3)?);
    Ok(or_nil(args, r))
}

fn open_event(host: &Host, args: &Args) -> Result<Completion> {
    Ok(or_nil(args, host.os().open_event(args.dword(0)?, args.flag(1)?, args.string(2)?)))
}

fn set_event(host: &Host, args: &Args) -> Result<Completion> {
    Ok(numeric(args, host.os().set_event(args.handle(0)?)))
}

fn reset_event(host: &Host, args: &Args) -> Result<Completion> {
    Ok(numeric(args, host.os().reset_event(args.handle(0)?)))
}

fn pulse_event(host: &Host, args: &Args) -> Result<Completion> {
    Ok(numeric(args, host.os().pulse_event(args.handle(0)?)))
}

fn create_mutex(host: &Host, args: &Args) -> Result<Completion> {
    let sa = SecurityAttributes::from_arg(args, 0)?;
    Ok(or_nil(args, host.os().create_mutex(&sa, args.flag(1)?, args.opt_string(2)?)))
}

fn open_mutex(host: &Host, args: &Args) -> Result<Completion> {
    Ok(or_nil(args, host.os().open_mutex(args.dword(0)?, args.flag(1)?, args.string(2)?)))
}

fn release_mutex(host: &Host, args: &Args) -> Result<Completion> {
    Ok(numeric(args, host.os().release_mutex(args.handle(0)?)))
}

fn create_semaphore(host: &Host, args: &Args) -> Result<Completion> {
    let sa = SecurityAttributes::from_arg(args, 0)?;
    let r = host.os().create_semaphore(&sa, args.int32(1)?, args.int32(2)?, args.opt_string(3)?);
    Ok(or_nil(args, r))
}

fn open_semaphore(host: &Host, args: &Args) -> Result<Completion> {
    Ok(or_nil(args, host.os().open_semaphore(args.dword(0)?, args.flag(1)?, args.string(2)?)))
}

fn release_semaphore(host: &Host, args: &Args) -> Result<Completion> {
    let r = logged(args, host.os().release_semaphore(args.handle(0)?, args.int32(1)?));
    Ok(match r {
        Ok(previous) => Completion::numeric(true, vec![previous.into()]),
        Err(_) => Completion::numeric(false, Vec::new()),
    })
}

fn wait_for_single_object(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().wait_for_single_object(args.handle(0)?, args.dword(1)?)))
}

fn wait_for_multiple_objects(host: &Host, args: &Args) -> Result<Completion> {
    let handles: Vec<KernelHandle> = args
        .int_list(0, MAXIMUM_WAIT_OBJECTS)?
        .into_iter()
        .map(|raw| KernelHandle::from_raw(raw as isize))
        .collect();
    Ok(Completion::value(host.os().wait_for_multiple_objects(&handles, args.flag(1)?, args.dword(2)?)))
}

fn sleep(host: &Host, args: &Args) -> Result<Completion> {
    host.os().sleep(args.dword(0)?);
    Ok(Completion::none())
}

const HANDLE: &[Param] = &[Param::handle("hObject")];
const OPEN: &[Param] = &[Param::int("dwDesiredAccess"), Param::flag("bInheritHandle"), Param::str("lpName")];

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec { name: "GetLastError", group: "Sync", params: &[], policy: Policy::Direct, handler: get_last_error },
    BindingSpec { name: "CloseHandle", group: "Sync", params: HANDLE, policy: Policy::Direct, handler: close_handle },
    BindingSpec {
        name: "CreateEvent",
        group: "Sync",
        params: &[
            Param::record("lpEventAttributes"),
            Param::flag("bManualReset"),
            Param::flag("bInitialState"),
            Param::opt_str("lpName"),
        ],
        policy: Policy::Direct,
        handler: create_event,
    },
    BindingSpec { name: "OpenEvent", group: "Sync", params: OPEN, policy: Policy::Direct, handler: open_event },
    BindingSpec { name: "SetEvent", group: "Sync", params: HANDLE, policy: Policy::Direct, handler: set_event },
    BindingSpec { name: "ResetEvent", group: "Sync", params: HANDLE, policy: Policy::Direct, handler: reset_event },
    BindingSpec { name: "PulseEvent", group: "Sync", params: HANDLE, policy: Policy::Direct, handler: pulse_event },
    BindingSpec {
        name: "CreateMutex",
        group: "Sync",
        params: &[Param::record("lpMutexAttributes"), Param::flag("bInitialOwner"), Param::opt_str("lpName")],
        policy: Policy::Direct,
        handler: create_mutex,
    },
    BindingSpec { name: "OpenMutex", group: "Sync", params: OPEN, policy: Policy::Direct, handler: open_mutex },
    BindingSpec { name: "ReleaseMutex", group: "Sync", params: HANDLE, policy: Policy::Direct, handler: release_mutex },
    BindingSpec {
        name: "CreateSemaphore",
        group: "Sync",
        params: &[
            Param::record("lpSemaphoreAttributes"),
            Param::int("lInitialCount"),
            Param::int("lMaximumCount"),
            Param::opt_str("lpName"),
        ],
        policy: Policy::Direct,
        handler: create_semaphore,
    },
    BindingSpec { name: "OpenSemaphore", group: "Sync", params: OPEN, policy: Policy::Direct, handler: open_semaphore },
    BindingSpec {
        name: "ReleaseSemaphore",
        group: "Sync",
        params: &[Param::handle("hSemaphore"), Param::int("lReleaseCount")],
        policy: Policy::Gated { slots: 1 },
        handler: release_semaphore,
    },
    BindingSpec {
        name: "WaitForSingleObject",
        group: "Sync",
        params: &[Param::handle("hHandle"), Param::int("dwMilliseconds")],
        policy: Policy::Direct,
        handler: wait_for_single_object,
    },
    BindingSpec {
        name: "WaitForMultipleObjects",
        group: "Sync",
        params: &[Param::list("lpHandles"), Param::flag("bWaitAll"), Param::int("dwMilliseconds")],
        policy: Policy::Direct,
        handler: wait_for_multiple_objects,
    },
    BindingSpec {
        name: "Sleep",
        group: "Sync",
        params: &[Param::int("dwMilliseconds")],
        policy: Policy::Direct,
        handler: sleep,
    },
];
