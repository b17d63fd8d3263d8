use w32_script::{Args, Kind, Param, Result};

use crate::gateway::Host;
use crate::marshal::{Completion, Policy};

use super::BindingSpec;

fn get_item_count(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().tab_item_count(args.handle(0)?)))
}

fn set_cur_focus(host: &Host, args: &Args) -> Result<Completion> {
    host.os().tab_set_cur_focus(args.handle(0)?, args.int32(1)?);
    Ok(Completion::none())
}

fn set_cur_sel(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().tab_set_cur_sel(args.handle(0)?, args.int32(1)?)))
}

fn get_item_text(host: &Host, args: &Args) -> Result<Completion> {
    let hwnd = args.handle(0)?;
    let index = match args.opt_int32(1)? {
        Some(i) => i,
        None => host.os().tab_cur_focus(hwnd),
    };
    Ok(Completion::value(host.os().tab_item_text(hwnd, index)))
}

fn get_item_index_by_text(host: &Host, args: &Args) -> Result<Completion> {
    let hwnd = args.handle(0)?;
    let wanted = args.string(1)?;
    let count = host.os().tab_item_count(hwnd);
    let found = (0..count).find(|&i| host.os().tab_item_text(hwnd, i).as_deref() == Some(wanted));
    Ok(Completion::value(found.unwrap_or(-1)))
}

fn get_cur_sel(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().tab_cur_sel(args.handle(0)?)))
}

fn get_cur_focus(host: &Host, args: &Args) -> Result<Completion> {
    Ok(Completion::value(host.os().tab_cur_focus(args.handle(0)?)))
}

const HWND: &[Param] = &[Param::handle("hwnd")];
const HWND_INDEX: &[Param] = &[Param::handle("hwnd"), Param::int("i")];

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec {
        name: "TabCtrl_GetItemCount",
        group: "TabCtrl",
        params: HWND,
        policy: Policy::Direct,
        handler: get_item_count,
    },
    BindingSpec {
        name: "TabCtrl_SetCurFocus",
        group: "TabCtrl",
        params: HWND_INDEX,
        policy: Policy::Direct,
        handler: set_cur_focus,
    },
    BindingSpec {
        name: "TabCtrl_SetCurSel",
        group: "TabCtrl",
        params: HWND_INDEX,
        policy: Policy::Direct,
        handler: set_cur_sel,
    },
    BindingSpec {
        name: "TabCtrl_GetItemText",
        group: "TabCtrl",
        params: &[Param::handle("hwnd"), Param::opt("iItem", Kind::Int)],
        policy: Policy::Direct,
        handler: get_item_text,
    },
    BindingSpec {
        name: "TabCtrl_GetItemIndexByText",
        group: "TabCtrl",
        params: &[Param::handle("hwnd"), Param::str("text")],
        policy: Policy::Direct,
        handler: get_item_index_by_text,
    },
    BindingSpec {
        name: "TabCtrl_GetCurSel",
        group: "TabCtrl",
        params: HWND,
        policy: Policy::Direct,
        handler: get_cur_sel,
    },
    BindingSpec {
        name: "TabCtrl_GetCurFocus",
        group: "TabCtrl",
        params: HWND,
        policy: Policy::Direct,
        handler: get_cur_focus,
    },
];
