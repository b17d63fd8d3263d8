use w32_script::{Args, Param, Result, Variant};

use crate::constants::PM_NOREMOVE;
use crate::gateway::Host;
use crate::handle::Hwnd;
use crate::marshal::{Completion, Policy};
use crate::platform::{Message, Point};

use super::{boolean, numeric, BindingSpec};

fn message_values(m: &Message) -> Vec<Variant> {
    vec![
        m.hwnd.into(),
        m.message.into(),
        m.wparam.into(),
        m.lparam.into(),
        m.time.into(),
        m.pt.x.into(),
        m.pt.y.into(),
    ]
}

/// `(hwnd, msg, wparam, lparam)` as the first four arguments.
fn post_args(args: &Args) -> Result<(u32, usize, isize)> {
    Ok((args.dword(1)?, args.int(2)? as usize, args.int(3)? as isize))
}

fn post_message(host: &Host, args: &Args) -> Result<Completion> {
    let (msg, wparam, lparam) = post_args(args)?;
    Ok(boolean(args, host.os().post_message(args.handle(0)?, msg, wparam, lparam)))
}

fn send_message(host: &Host, args: &Args) -> Result<Completion> {
    let (msg, wparam, lparam) = post_args(args)?;
    Ok(Completion::value(host.os().send_message(args.handle(0)?, msg, wparam, lparam)))
}

fn post_thread_message(host: &Host, args: &Args) -> Result<Completion> {
    let (msg, wparam, lparam) = post_args(args)?;
    Ok(numeric(args, host.os().post_thread_message(args.dword(0)?, msg, wparam, lparam)))
}

fn get_message(host: &Host, args: &Args) -> Result<Completion> {
    let (rc, msg) = host.os().get_message(args.handle(0)?, args.dword(1)?, args.dword(2)?);
    let payload = msg.as_ref().map(message_values).unwrap_or_default();
    if rc < 0 {
        log::debug!("GetMessage failed: win32 error {}", host.os().last_error());
    }
    Ok(Completion::Status { status: Variant::from(rc), ok: rc > 0, payload, error: None })
}

fn peek_message(host: &Host, args: &Args) -> Result<Completion> {
    let msg = host.os().peek_message(args.handle(0)?, args.dword(1)?, args.dword(2)?, args.dword(3)?);
    let payload = msg.as_ref().map(message_values).unwrap_or_default();
    Ok(Completion::numeric(msg.is_some(), payload))
}

fn reply_message(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().reply_message(args.int(0)? as isize)))
}

fn dispatch_message(host: &Host, args: &Args) -> Result<Completion> {
    let (message, wparam, lparam) = post_args(args)?;
    let msg = Message {
        hwnd: args.handle::<Hwnd>(0)?,
        message,
        wparam,
        lparam,
        time: args.dword(4)?,
        pt: Point { x: args.int32(5)?, y: args.int32(6)? },
    };
    Ok(Completion::value(host.os().dispatch_message(&msg)))
}

fn get_current_thread_id(host: &Host, _args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().current_thread_id()))
}

const POST: &[Param] = &[Param::handle("hWnd"), Param::int("Msg"), Param::int("wParam"), Param::int("lParam")];

const GET: &[Param] = &[Param::opt_handle("hWnd"), Param::opt_int("wMsgFilterMin", 0), Param::opt_int("wMsgFilterMax", 0)];

const PEEK: &[Param] = &[
    Param::opt_handle("hWnd"),
    Param::opt_int("wMsgFilterMin", 0),
    Param::opt_int("wMsgFilterMax", 0),
    Param::opt_int("wRemoveMsg", PM_NOREMOVE as i64),
];

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec { name: "PostMessage", group: "Message", params: POST, policy: Policy::Direct, handler: post_message },
    BindingSpec { name: "SendMessage", group: "Message", params: POST, policy: Policy::Direct, handler: send_message },
    BindingSpec {
        name: "PostThreadMessage",
        group: "Message",
        params: &[Param::int("idThread"), Param::int("Msg"), Param::int("wParam"), Param::int("lParam")],
        policy: Policy::Direct,
        handler: post_thread_message,
    },
    BindingSpec {
        name: "GetMessage",
        group: "Message",
        params: GET,
        policy: Policy::Fixed { width: 8 },
        handler: get_message,
    },
    BindingSpec {
        name: "PeekMessage",
        group: "Message",
        params: PEEK,
        policy: Policy::Fixed { width: 8 },
        handler: peek_message,
    },
    BindingSpec {
        name: "ReplyMessage",
        group: "Message",
        params: &[Param::int("lResult")],
        policy: Policy::Direct,
        handler: reply_message,
    },
    BindingSpec {
        name: "DispatchMessage",
        group: "Message",
        params: &[
            Param::handle("hwnd"),
            Param::int("message"),
            Param::int("wParam"),
            Param::int("lParam"),
            Param::int("time"),
            Param::int("x"),
            Param::int("y"),
        ],
        policy: Policy::Direct,
        handler: dispatch_message,
    },
    BindingSpec {
        name: "GetCurrentThreadId",
        group: "Message",
        params: &[],
        policy: Policy::Direct,
        handler: get_current_thread_id,
    },
];
