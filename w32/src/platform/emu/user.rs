//! Emulated windows, per-thread message queues and hotkeys.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Instant;

use crate::constants::*;
use crate::error::OsResult;
use crate::handle::Hwnd;
use crate::hotkey::HotKeyModifiers;
use crate::platform::{Message, Point, Rect};

use super::{fail, on_thread_exit, set_last_error, thread_id};

const WM_GETTEXTLENGTH: u32 = 0x000E;

#[derive(Clone, Debug, Default)]
struct TabState {
    items: Vec<String>,
    cur_sel: i32,
    cur_focus: i32,
}

#[derive(Clone, Debug)]
struct Window {
    class: String,
    title: String,
    rect: Rect,
    parent: Hwnd,
    thread_id: u32,
    visible: bool,
    minimized: bool,
    topmost: bool,
    tab: Option<TabState>,
    received: Vec<Message>,
}

#[derive(Clone, Copy, Debug)]
struct HotKey {
    thread_id: u32,
    hwnd: Hwnd,
    id: i32,
    modifiers: HotKeyModifiers,
    vk: u32,
}

#[derive(Default)]
struct UserState {
    next_hwnd: isize,
    windows: BTreeMap<isize, Window>,
    focus: Hwnd,
    queues: HashMap<u32, VecDeque<Message>>,
    hotkeys: Vec<HotKey>,
    registered_messages: Vec<String>,
}

impl UserState {
    fn window(&self, hwnd: Hwnd) -> Option<&Window> {
        self.windows.get(&hwnd.as_raw())
    }

    fn window_mut(&mut self, hwnd: Hwnd) -> OsResult<&mut Window> {
        match self.windows.get_mut(&hwnd.as_raw()) {
            Some(w) => Ok(w),
            None => fail(ERROR_INVALID_WINDOW_HANDLE),
        }
    }

    fn take(&mut self, tid: u32, hwnd: Hwnd, min: u32, max: u32, remove: bool) -> Option<Message> {
        let queue = self.queues.get_mut(&tid)?;
        let pos = queue.iter().position(|m| {
            if m.message == WM_QUIT {
                return true;
            }
            let hwnd_ok = match hwnd.as_raw() {
                0 => true,
                -1 => m.hwnd.is_null(),
                _ => m.hwnd == hwnd,
            };
            let range_ok = (min == 0 && max == 0) || (m.message >= min && m.message <= max);
            hwnd_ok && range_ok
        })?;
        if remove {
            queue.remove(pos)
        } else {
            queue.get(pos).copied()
        }
    }
}

fn lock(state: &Mutex<UserState>) -> MutexGuard<'_, UserState> {
    match state.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn matches_name(filter: Option<&str>, value: &str) -> bool {
    filter.map_or(true, |f| f.eq_ignore_ascii_case(value))
}

pub(super) struct User {
    state: Arc<Mutex<UserState>>,
    posted: Condvar,
    started: Instant,
}

impl Default for User {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(UserState { next_hwnd: 0x10010, ..Default::default() })),
            posted: Condvar::new(),
            started: Instant::now(),
        }
    }
}

impl User {
    fn state(&self) -> MutexGuard<'_, UserState> {
        lock(&self.state)
    }

    /// Give the calling thread a message queue. The queue and the thread's
    /// hotkeys go away when the thread exits.
    fn ensure_queue(&self, st: &mut UserState) -> u32 {
        let tid = thread_id();
        if !st.queues.contains_key(&tid) {
            st.queues.insert(tid, VecDeque::new());
            let state = Arc::downgrade(&self.state);
            on_thread_exit(move |tid| {
                if let Some(state) = state.upgrade() {
                    let mut st = lock(&state);
                    st.queues.remove(&tid);
                    st.hotkeys.retain(|h| h.thread_id != tid);
                }
            });
        }
        tid
    }

    /// Number of threads with a live message queue.
    pub(super) fn queue_count(&self) -> usize {
        self.state().queues.len()
    }

    fn now(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    fn enqueue(&self, st: &mut UserState, tid: u32, mut msg: Message) {
        msg.time = self.now();
        match st.queues.get_mut(&tid) {
            Some(queue) => queue.push_back(msg),
            None => log::debug!("thread {tid:#x} has exited, message {:#x} dropped", msg.message),
        }
        self.posted.notify_all();
    }

    pub(super) fn create_window(&self, parent: Hwnd, class: &str, title: &str, rect: Rect, tab: Option<Vec<String>>) -> Hwnd {
        let mut st = self.state();
        let tid = self.ensure_queue(&mut st);
        let raw = st.next_hwnd;
        st.next_hwnd += 2;
        let tab = tab.map(|items| TabState { items, cur_sel: 0, cur_focus: 0 });
        st.windows.insert(
            raw,
            Window {
                class: class.to_string(),
                title: title.to_string(),
                rect,
                parent,
                thread_id: tid,
                visible: true,
                minimized: false,
                topmost: false,
                tab,
                received: Vec::new(),
            },
        );
        Hwnd::from_raw(raw)
    }

    pub(super) fn received(&self, hwnd: Hwnd) -> Vec<Message> {
        self.state().window(hwnd).map(|w| w.received.clone()).unwrap_or_default()
    }

    pub(super) fn is_topmost(&self, hwnd: Hwnd) -> bool {
        self.state().window(hwnd).is_some_and(|w| w.topmost)
    }

    pub(super) fn is_minimized(&self, hwnd: Hwnd) -> bool {
        self.state().window(hwnd).is_some_and(|w| w.minimized)
    }

    pub(super) fn find_window(&self, parent: Hwnd, after: Hwnd, class: Option<&str>, title: Option<&str>) -> Hwnd {
        let st = self.state();
        let mut passed = after.is_null();
        for (raw, w) in &st.windows {
            if w.parent != parent {
                continue;
            }
            if !passed {
                passed = *raw == after.as_raw();
                continue;
            }
            if matches_name(class, &w.class) && matches_name(title, &w.title) {
                return Hwnd::from_raw(*raw);
            }
        }
        Hwnd::NULL
    }

    pub(super) fn set_window_text(&self, hwnd: Hwnd, text: &str) -> OsResult<()> {
        self.state().window_mut(hwnd)?.title = text.to_string();
        Ok(())
    }

    pub(super) fn window_text(&self, hwnd: Hwnd) -> OsResult<String> {
        let st = self.state();
        match st.window(hwnd) {
            Some(w) => Ok(w.title.clone()),
            None => fail(ERROR_INVALID_WINDOW_HANDLE),
        }
    }

    pub(super) fn window_rect(&self, hwnd: Hwnd) -> OsResult<Rect> {
        let st = self.state();
        match st.window(hwnd) {
            Some(w) => Ok(w.rect),
            None => fail(ERROR_INVALID_WINDOW_HANDLE),
        }
    }

    pub(super) fn set_focus(&self, hwnd: Hwnd) -> Hwnd {
        let mut st = self.state();
        if !hwnd.is_null() && st.window(hwnd).is_none() {
            set_last_error(ERROR_INVALID_WINDOW_HANDLE);
            return Hwnd::NULL;
        }
        std::mem::replace(&mut st.focus, hwnd)
    }

    pub(super) fn set_foreground(&self, hwnd: Hwnd) -> bool {
        let mut st = self.state();
        match st.window_mut(hwnd) {
            Ok(w) => {
                w.minimized = false;
                true
            }
            Err(_) => false,
        }
    }

    pub(super) fn set_topmost(&self, hwnd: Hwnd) -> OsResult<()> {
        self.state().window_mut(hwnd)?.topmost = true;
        Ok(())
    }

    pub(super) fn close_window(&self, hwnd: Hwnd) -> OsResult<()> {
        self.state().window_mut(hwnd)?.minimized = true;
        Ok(())
    }

    pub(super) fn is_visible(&self, hwnd: Hwnd) -> bool {
        self.state().window(hwnd).is_some_and(|w| w.visible)
    }

    pub(super) fn thread_process_id(&self, hwnd: Hwnd) -> (u32, u32) {
        match self.state().window(hwnd) {
            Some(w) => (w.thread_id, std::process::id()),
            None => {
                set_last_error(ERROR_INVALID_WINDOW_HANDLE);
                (0, 0)
            }
        }
    }

    pub(super) fn register_message(&self, name: &str) -> OsResult<u32> {
        if name.is_empty() {
            return fail(ERROR_INVALID_PARAMETER);
        }
        let mut st = self.state();
        let pos = match st.registered_messages.iter().position(|n| n.eq_ignore_ascii_case(name)) {
            Some(pos) => pos,
            None => {
                st.registered_messages.push(name.to_string());
                st.registered_messages.len() - 1
            }
        };
        Ok(0xC000 + pos as u32)
    }

    pub(super) fn post_message(&self, hwnd: Hwnd, msg: u32, wparam: usize, lparam: isize) -> OsResult<()> {
        let mut st = self.state();
        let tid = if hwnd.is_null() {
            self.ensure_queue(&mut st)
        } else {
            match st.window(hwnd) {
                Some(w) => w.thread_id,
                None => return fail(ERROR_INVALID_WINDOW_HANDLE),
            }
        };
        let m = Message { hwnd, message: msg, wparam, lparam, ..Default::default() };
        self.enqueue(&mut st, tid, m);
        Ok(())
    }

    pub(super) fn post_thread_message(&self, tid: u32, msg: u32, wparam: usize, lparam: isize) -> OsResult<()> {
        let mut st = self.state();
        if !st.queues.contains_key(&tid) {
            return fail(ERROR_INVALID_THREAD_ID);
        }
        let m = Message { message: msg, wparam, lparam, ..Default::default() };
        self.enqueue(&mut st, tid, m);
        Ok(())
    }

    pub(super) fn send_message(&self, hwnd: Hwnd, msg: u32, wparam: usize, lparam: isize) -> isize {
        let mut st = self.state();
        if msg == WM_CLOSE && st.window(hwnd).is_some() {
            st.windows.remove(&hwnd.as_raw());
            if st.focus == hwnd {
                st.focus = Hwnd::NULL;
            }
            return 0;
        }
        let time = self.now();
        let w = match st.window_mut(hwnd) {
            Ok(w) => w,
            Err(_) => return 0,
        };
        if let Some(tab) = w.tab.as_mut() {
            let count = tab.items.len() as i32;
            match msg {
                TCM_GETITEMCOUNT => return count as isize,
                TCM_GETCURSEL => return tab.cur_sel as isize,
                TCM_GETCURFOCUS => return tab.cur_focus as isize,
                TCM_SETCURSEL => {
                    let index = wparam as i32;
                    if index < 0 || index >= count {
                        return -1;
                    }
                    let previous = std::mem::replace(&mut tab.cur_sel, index);
                    tab.cur_focus = index;
                    return previous as isize;
                }
                TCM_SETCURFOCUS => {
                    let index = wparam as i32;
                    if index >= 0 && index < count {
                        tab.cur_focus = index;
                        tab.cur_sel = index;
                    }
                    return 0;
                }
                _ => {}
            }
        }
        if msg == WM_GETTEXTLENGTH {
            return w.title.encode_utf16().count() as isize;
        }
        w.received.push(Message { hwnd, message: msg, wparam, lparam, time, pt: Point::default() });
        0
    }

    pub(super) fn tab_item_text(&self, hwnd: Hwnd, index: i32) -> Option<String> {
        let st = self.state();
        let tab = st.window(hwnd)?.tab.as_ref()?;
        usize::try_from(index).ok().and_then(|i| tab.items.get(i).cloned())
    }

    pub(super) fn get_message(&self, hwnd: Hwnd, min: u32, max: u32) -> (i32, Option<Message>) {
        let mut st = self.state();
        if !matches!(hwnd.as_raw(), 0 | -1) && st.window(hwnd).is_none() {
            set_last_error(ERROR_INVALID_WINDOW_HANDLE);
            return (-1, None);
        }
        let tid = self.ensure_queue(&mut st);
        loop {
            if let Some(m) = st.take(tid, hwnd, min, max, true) {
                let rc = if m.message == WM_QUIT { 0 } else { 1 };
                return (rc, Some(m));
            }
            st = match self.posted.wait(st) {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    pub(super) fn peek_message(&self, hwnd: Hwnd, min: u32, max: u32, remove: u32) -> Option<Message> {
        let mut st = self.state();
        let tid = self.ensure_queue(&mut st);
        st.take(tid, hwnd, min, max, remove & PM_REMOVE != 0)
    }

    pub(super) fn dispatch(&self, msg: &Message) -> isize {
        if let Ok(w) = self.state().window_mut(msg.hwnd) {
            w.received.push(*msg);
        }
        0
    }

    pub(super) fn register_hotkey(&self, hwnd: Hwnd, id: i32, modifiers: u32, vk: u32) -> OsResult<()> {
        let mut st = self.state();
        let tid = if hwnd.is_null() {
            self.ensure_queue(&mut st)
        } else {
            match st.window(hwnd) {
                Some(w) => w.thread_id,
                None => return fail(ERROR_INVALID_WINDOW_HANDLE),
            }
        };
        let modifiers = HotKeyModifiers::from_bits_truncate(modifiers);
        if st.hotkeys.iter().any(|h| h.vk == vk && h.modifiers.combination() == modifiers.combination()) {
            return fail(ERROR_HOTKEY_ALREADY_REGISTERED);
        }
        st.hotkeys.push(HotKey { thread_id: tid, hwnd, id, modifiers, vk });
        Ok(())
    }

    pub(super) fn unregister_hotkey(&self, hwnd: Hwnd, id: i32) -> OsResult<()> {
        let tid = thread_id();
        let mut st = self.state();
        let pos = st
            .hotkeys
            .iter()
            .position(|h| h.id == id && h.hwnd == hwnd && (!hwnd.is_null() || h.thread_id == tid));
        match pos {
            Some(pos) => {
                st.hotkeys.remove(pos);
                Ok(())
            }
            None => fail(ERROR_HOTKEY_NOT_REGISTERED),
        }
    }

    /// Deliver `WM_HOTKEY` for a registered combination.
    pub(super) fn press_hotkey(&self, modifiers: u32, vk: u32) -> bool {
        let modifiers = HotKeyModifiers::from_bits_truncate(modifiers).combination();
        let mut st = self.state();
        let Some(hk) = st.hotkeys.iter().find(|h| h.vk == vk && h.modifiers.combination() == modifiers).copied() else {
            return false;
        };
        let lparam = ((vk << 16) | modifiers.bits()) as isize;
        let m = Message { hwnd: hk.hwnd, message: WM_HOTKEY, wparam: hk.id as usize, lparam, ..Default::default() };
        self.enqueue(&mut st, hk.thread_id, m);
        true
    }
}
