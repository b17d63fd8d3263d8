use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use w32::constants::{MOD_CONTROL, MOD_NOREPEAT, PM_REMOVE, WM_USER};
use w32::platform::Rect;
use w32::{Gateway, ScriptError, Variant};

fn int(v: &Variant) -> i64 {
    v.as_int().unwrap_or_else(|| panic!("expected a number, got {v:?}"))
}

/// Peek with removal until `message` arrives or two seconds pass.
fn wait_for(gateway: &Gateway, message: u32) -> Vec<Variant> {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let r = gateway
            .call("PeekMessage", &[Variant::Nil, 0.into(), 0.into(), PM_REMOVE.into()])
            .unwrap();
        if int(&r[0]) == 1 && int(&r[2]) == message as i64 {
            return r;
        }
        assert!(Instant::now() < deadline, "message {message:#x} never arrived");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn window_text_and_rect_round_trip_through_the_gateway() {
    let (gateway, emu) = Gateway::emulated();
    let hwnd = emu.create_window("Notepad", "untitled", Rect { left: 10, top: 20, right: 110, bottom: 220 });

    let found = gateway.call("FindWindow", &["Notepad".into()]).unwrap();
    assert_eq!(found, vec![Variant::from(hwnd)]);
    let by_title = gateway.call("FindWindow", &["".into(), "untitled".into()]).unwrap();
    assert_eq!(by_title, vec![Variant::from(hwnd)]);

    assert_eq!(gateway.call("SetWindowText", &[hwnd.into(), "notes.txt".into()]).unwrap(), vec![Variant::Int(1)]);
    assert_eq!(gateway.call("GetWindowText", &[hwnd.into()]).unwrap(), vec![Variant::from("notes.txt")]);
    assert_eq!(
        gateway.call("GetWindowRect", &[hwnd.into()]).unwrap(),
        vec![Variant::Int(10), Variant::Int(20), Variant::Int(110), Variant::Int(220)]
    );

    assert_eq!(gateway.call("SetTopmost", &[hwnd.into()]).unwrap(), vec![Variant::Int(1)]);
    assert!(emu.is_topmost(hwnd));
    assert_eq!(gateway.call("CloseWindow", &[hwnd.into()]).unwrap(), vec![Variant::Bool(true)]);
    assert!(emu.is_minimized(hwnd));
}

#[test]
fn missing_window_keeps_result_arity() {
    let (gateway, _emu) = Gateway::emulated();
    assert_eq!(gateway.call("GetWindowText", &[0x7777.into()]).unwrap(), vec![Variant::Nil]);
    assert_eq!(gateway.call("GetWindowRect", &[0x7777.into()]).unwrap(), vec![Variant::Nil; 4]);
    assert_eq!(gateway.call("FindWindow", &["NoSuchClass".into()]).unwrap(), vec![Variant::Int(0)]);
}

#[test]
fn find_window_ex_walks_children_in_order() {
    let (gateway, emu) = Gateway::emulated();
    let parent = emu.create_window("Main", "main", Rect::default());
    let first = emu.create_child_window(parent, "Button", "OK");
    let second = emu.create_child_window(parent, "Button", "Cancel");

    let r = gateway.call("FindWindowEx", &[parent.into(), 0.into(), "Button".into()]).unwrap();
    assert_eq!(r, vec![Variant::from(first)]);
    let r = gateway.call("FindWindowEx", &[parent.into(), first.into(), "Button".into()]).unwrap();
    assert_eq!(r, vec![Variant::from(second)]);
    let r = gateway.call("FindWindowEx", &[parent.into(), second.into(), "Button".into()]).unwrap();
    assert_eq!(r, vec![Variant::Int(0)]);
}

#[test]
fn posted_message_is_peeked_with_eight_values() {
    let (gateway, emu) = Gateway::emulated();
    let hwnd = emu.create_window("Main", "main", Rect::default());
    let msg = WM_USER + 5;

    let posted = gateway.call("PostMessage", &[hwnd.into(), msg.into(), 7.into(), 9.into()]).unwrap();
    assert_eq!(posted, vec![Variant::Bool(true)]);

    let peeked = gateway.call("PeekMessage", &[hwnd.into(), 0.into(), 0.into(), PM_REMOVE.into()]).unwrap();
    assert_eq!(peeked.len(), 8);
    assert_eq!(&peeked[..5], &[Variant::Int(1), hwnd.into(), msg.into(), Variant::Int(7), Variant::Int(9)]);

    let empty = gateway.call("PeekMessage", &[]).unwrap();
    assert_eq!(empty, [vec![Variant::Int(0)], vec![Variant::Nil; 7]].concat());
}

#[test]
fn dispatched_message_reaches_the_window() {
    let (gateway, emu) = Gateway::emulated();
    let hwnd = emu.create_window("Main", "main", Rect::default());
    let args: Vec<Variant> = vec![hwnd.into(), (WM_USER + 1).into(), 1.into(), 2.into(), 0.into(), 3.into(), 4.into()];
    gateway.call("DispatchMessage", &args).unwrap();

    let received = emu.received_messages(hwnd);
    assert_eq!(received.len(), 1);
    assert_eq!((received[0].message, received[0].wparam, received[0].lparam), (WM_USER + 1, 1, 2));
    assert_eq!((received[0].pt.x, received[0].pt.y), (3, 4));
}

#[test]
fn registered_message_names_share_an_id() {
    let (gateway, _emu) = Gateway::emulated();
    let a = gateway.call("RegisterWindowMessage", &["W32_PING".into()]).unwrap();
    let b = gateway.call("RegisterWindowMessage", &["w32_ping".into()]).unwrap();
    assert_eq!(a, b);
    assert!(int(&a[0]) >= 0xC000);
}

#[test]
fn tab_control_lookup_by_caption() {
    let (gateway, emu) = Gateway::emulated();
    let parent = emu.create_window("Dialog", "Settings", Rect::default());
    let tab = emu.create_tab_control(parent, &["General", "Network", "Advanced"]);

    assert_eq!(gateway.call("TabCtrl_GetItemCount", &[tab.into()]).unwrap(), vec![Variant::Int(3)]);
    assert_eq!(
        gateway.call("TabCtrl_GetItemIndexByText", &[tab.into(), "Advanced".into()]).unwrap(),
        vec![Variant::Int(2)]
    );
    assert_eq!(
        gateway.call("TabCtrl_GetItemIndexByText", &[tab.into(), "Missing".into()]).unwrap(),
        vec![Variant::Int(-1)]
    );

    assert_eq!(gateway.call("TabCtrl_SetCurSel", &[tab.into(), 1.into()]).unwrap(), vec![Variant::Int(0)]);
    assert_eq!(gateway.call("TabCtrl_GetCurSel", &[tab.into()]).unwrap(), vec![Variant::Int(1)]);
    // Without an index the focused item is read.
    assert_eq!(gateway.call("TabCtrl_GetItemText", &[tab.into()]).unwrap(), vec![Variant::from("Network")]);
    assert_eq!(gateway.call("TabCtrl_GetItemText", &[tab.into(), 0.into()]).unwrap(), vec![Variant::from("General")]);
    assert_eq!(gateway.call("TabCtrl_GetItemText", &[tab.into(), 9.into()]).unwrap(), vec![Variant::Nil]);
}

#[test]
fn tab_index_wider_than_32_bits_is_rejected() {
    let (gateway, emu) = Gateway::emulated();
    let parent = emu.create_window("Dialog", "Settings", Rect::default());
    let tab = emu.create_tab_control(parent, &["General", "Network"]);

    let wide = 0x1_0000_0001_i64;
    let err = gateway.call("TabCtrl_SetCurSel", &[tab.into(), wide.into()]).unwrap_err();
    assert_eq!(err, ScriptError::OutOfRange { func: "TabCtrl_SetCurSel", index: 2, value: wide });
    assert!(gateway.call("TabCtrl_GetItemText", &[tab.into(), wide.into()]).is_err());
    assert_eq!(gateway.call("TabCtrl_GetCurSel", &[tab.into()]).unwrap(), vec![Variant::Int(0)]);
}

#[test]
fn hotkey_press_is_forwarded_to_the_target_window() {
    let (gateway, emu) = Gateway::emulated();
    let hwnd = emu.create_window("Main", "main", Rect::default());
    let forwarded = WM_USER + 42;
    let vk = 0x70;

    let args: Vec<Variant> =
        vec![hwnd.into(), 1.into(), (MOD_CONTROL | MOD_NOREPEAT).into(), vk.into(), forwarded.into(), 11.into(), 22.into()];
    assert_eq!(gateway.call("RegisterHotKey", &args).unwrap(), vec![Variant::Int(0)]);
    assert_eq!(gateway.host().hotkeys().running(), vec![1]);

    assert!(emu.press_hotkey(MOD_CONTROL, vk));
    let msg = wait_for(&gateway, forwarded);
    assert_eq!(&msg[1..5], &[hwnd.into(), forwarded.into(), Variant::Int(11), Variant::Int(22)]);

    assert_eq!(gateway.call("UnregisterHotKey", &[1.into()]).unwrap(), vec![Variant::Bool(true)]);
    assert!(gateway.host().hotkeys().running().is_empty());
    assert!(!emu.press_hotkey(MOD_CONTROL, vk));
    assert_eq!(gateway.call("UnregisterHotKey", &[1.into()]).unwrap(), vec![Variant::Bool(false)]);
}

#[test]
fn duplicate_hotkey_is_reported_through_the_fault_queue() {
    let (gateway, emu) = Gateway::emulated();
    let hwnd = emu.create_window("Main", "main", Rect::default());
    let args = |id: i64| -> Vec<Variant> {
        vec![hwnd.into(), id.into(), MOD_CONTROL.into(), 0x71.into(), WM_USER.into(), 0.into(), 0.into()]
    };

    assert_eq!(gateway.call("RegisterHotKey", &args(1)).unwrap(), vec![Variant::Int(0)]);
    assert_eq!(gateway.call("RegisterHotKey", &args(2)).unwrap(), vec![Variant::Int(-1)]);

    let faults = gateway.call("PollHotKeyErrors", &[]).unwrap();
    let faults = faults[0].as_table().unwrap();
    assert_eq!(faults.len(), 1);
    let fault = faults.index(1).and_then(Variant::as_table).unwrap();
    assert_eq!(fault.field("Id"), Some(&Variant::Int(2)));
    assert_eq!(fault.field("Stage"), Some(&Variant::from("register")));
    assert_eq!(fault.field("Code"), Some(&Variant::Int(1409)));

    let drained = gateway.call("PollHotKeyErrors", &[]).unwrap();
    assert_eq!(drained[0].as_table().map(|t| t.len()), Some(0));
    gateway.host().hotkeys().stop_all();
}

#[test]
fn thread_messages_reach_the_calling_thread() {
    let (gateway, _emu) = Gateway::emulated();
    // Peeking creates the queue.
    gateway.call("PeekMessage", &[]).unwrap();
    let tid = gateway.call("GetCurrentThreadId", &[]).unwrap();
    let r = gateway.call("PostThreadMessage", &[tid[0].clone(), (WM_USER + 3).into(), 0.into(), 0.into()]).unwrap();
    assert_eq!(r, vec![Variant::Int(1)]);
    let msg = wait_for(&gateway, WM_USER + 3);
    assert_eq!(msg[1], Variant::Int(0));
}
