use w32_script::{Args, Param, Result};

use crate::gateway::Host;
use crate::handle::Hwnd;
use crate::marshal::{Completion, Policy};

use super::{logged, numeric, BindingSpec};

/// An empty class or title means "any".
fn filter(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

fn shell_open(host: &Host, args: &Args) -> Result<Completion> {
    let code = host.os().shell_open(args.string(0)?);
    // ShellExecute reports success as any value above 32.
    Ok(Completion::value(if code > 32 { 0 } else { code as i64 }))
}

fn find_window(host: &Host, args: &Args) -> Result<Completion> {
    let hwnd = host.os().find_window(filter(args.opt_string(0)?), filter(args.opt_string(1)?));
    Ok(Completion::value(hwnd))
}

fn find_window_ex(host: &Host, args: &Args) -> Result<Completion> {
    let hwnd = host.os().find_window_ex(
        args.handle(0)?,
        args.handle(1)?,
        filter(args.opt_string(2)?),
        filter(args.opt_string(3)?),
    );
    Ok(Completion::value(hwnd))
}

fn set_focus(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().set_focus(args.handle(0)?)))
}

fn get_window_text(host: &Host, args: &Args) -> Result<Completion> {
    let text = logged(args, host.os().window_text(args.handle(0)?));
    Ok(Completion::value(text.ok()))
}

fn set_window_text(host: &Host, args: &Args) -> Result<Completion> {
    Ok(numeric(args, host.os().set_window_text(args.handle(0)?, args.string(1)?)))
}

fn get_window_rect(host: &Host, args: &Args) -> Result<Completion> {
    let values = match logged(args, host.os().window_rect(args.handle(0)?)) {
        Ok(r) => vec![r.left.into(), r.top.into(), r.right.into(), r.bottom.into()],
        Err(_) => Vec::new(),
    };
    Ok(Completion::Values(values))
}

fn set_foreground_window(host: &Host, args: &Args) -> Result<Completion> {
    let ok = host.os().set_foreground_window(args.handle(0)?);
    Ok(Completion::value(ok as i64))
}

fn set_topmost(host: &Host, args: &Args) -> Result<Completion> {
    Ok(numeric(args, host.os().set_topmost(args.handle(0)?)))
}

fn close_window(host: &Host, args: &Args) -> Result<Completion> {
    let ok = logged(args, host.os().close_window(args.handle(0)?)).is_ok();
    Ok(Completion::value(ok))
}

fn is_window_visible(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().is_window_visible(args.handle(0)?)))
}

fn get_window_thread_process_id(host: &Host, args: &Args) -> Result<Completion> {
    let (tid, pid) = host.os().window_thread_process_id(args.handle::<Hwnd>(0)?);
    Ok(Completion::Values(vec![tid.into(), pid.into()]))
}

fn register_window_message(host: &Host, args: &Args) -> Result<Completion> {
    let id = logged(args, host.os().register_window_message(args.string(0)?)).unwrap_or(0);
    Ok(Completion::value(id))
}

const HWND: &[Param] = &[Param::handle("hWnd")];

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec {
        name: "ShellOpen",
        group: "Window",
        params: &[Param::str("lpFile")],
        policy: Policy::Direct,
        handler: shell_open,
    },
    BindingSpec {
        name: "FindWindow",
        group: "Window",
        params: &[Param::str("lpClassName"), Param::opt_str("lpWindowName")],
        policy: Policy::Direct,
        handler: find_window,
    },
    BindingSpec {
        name: "FindWindowEx",
        group: "Window",
        params: &[
            Param::handle("hwndParent"),
            Param::handle("hwndChildAfter"),
            Param::opt_str("lpszClass"),
            Param::opt_str("lpszWindow"),
        ],
        policy: Policy::Direct,
        handler: find_window_ex,
    },
    BindingSpec { name: "SetFocus", group: "Window", params: HWND, policy: Policy::Direct, handler: set_focus },
    BindingSpec {
        name: "GetWindowText",
        group: "Window",
        params: HWND,
        policy: Policy::Direct,
        handler: get_window_text,
    },
    BindingSpec {
        name: "SetWindowText",
        group: "Window",
        params: &[Param::handle("hWnd"), Param::str("lpString")],
        policy: Policy::Direct,
        handler: set_window_text,
    },
    BindingSpec {
        name: "GetWindowRect",
        group: "Window",
        params: HWND,
        policy: Policy::Fixed { width: 4 },
        handler: get_window_rect,
    },
    BindingSpec {
        name: "SetForegroundWindow",
        group: "Window",
        params: HWND,
        policy: Policy::Direct,
        handler: set_foreground_window,
    },
    BindingSpec { name: "SetTopmost", group: "Window", params: HWND, policy: Policy::Direct, handler: set_topmost },
    BindingSpec { name: "CloseWindow", group: "Window", params: HWND, policy: Policy::Direct, handler: close_window },
    BindingSpec {
        name: "IsWindowVisible",
        group: "Window",
        params: HWND,
        policy: Policy::Direct,
        handler: is_window_visible,
    },
    BindingSpec {
        name: "GetWindowThreadProcessId",
        group: "Window",
        params: HWND,
        policy: Policy::Direct,
        handler: get_window_thread_process_id,
    },
    BindingSpec {
        name: "RegisterWindowMessage",
        group: "Window",
        params: &[Param::str("lpString")],
        policy: Policy::Direct,
        handler: register_window_message,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_names_match_anything() {
        assert_eq!(filter(Some("")), None);
        assert_eq!(filter(Some("Notepad")), Some("Notepad"));
    }
}
