//! Hotkey listener threads.
//!
//! A hotkey belongs to the thread that registers it, so every registration
//! runs on its own named thread. The thread registers the combination,
//! reports its thread id back, then pumps its message queue and forwards
//! each `WM_HOTKEY` to the target window as a posted message.
//!
//! Listeners stop when their cancellation channel fires; a posted `WM_QUIT`
//! wakes them out of the blocking `GetMessage`. Faults inside a listener
//! never reach the caller directly. They go to a bounded queue shared by
//! all listeners and are drained with [`HotkeyListeners::poll_faults`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use bitflags::bitflags;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

use crate::constants::*;
use crate::handle::Hwnd;
use crate::platform::Win32;
use crate::trace;

bitflags! {
    /// `fsModifiers` of `RegisterHotKey`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct HotKeyModifiers: u32 {
        const ALT = MOD_ALT;
        const CONTROL = MOD_CONTROL;
        const SHIFT = MOD_SHIFT;
        const WIN = MOD_WIN;
        const NOREPEAT = MOD_NOREPEAT;
    }
}

impl HotKeyModifiers {
    /// The key combination itself, without behaviour flags.
    pub(crate) fn combination(self) -> Self {
        self.difference(Self::NOREPEAT)
    }
}

/// What to register and where to forward it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub target: Hwnd,
    pub id: i32,
    pub modifiers: HotKeyModifiers,
    pub vk: u32,
    /// Posted to `target` for every press.
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultStage {
    Register,
    Receive,
    Forward,
}

impl FaultStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultStage::Register => "register",
            FaultStage::Receive => "receive",
            FaultStage::Forward => "forward",
        }
    }
}

/// A failed native call inside a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HotkeyFault {
    pub id: i32,
    pub stage: FaultStage,
    pub code: u32,
}

impl fmt::Display for HotkeyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hotkey {} failed to {}: win32 error {}", self.id, self.stage.as_str(), self.code)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartError {
    /// The listener thread could not be created.
    Spawn,
    /// The listener exited before reporting readiness.
    NotReady,
}

impl StartError {
    /// Status code reported to scripts.
    pub fn status(self) -> i64 {
        match self {
            StartError::Spawn => -2,
            StartError::NotReady => -1,
        }
    }
}

#[derive(Clone)]
struct FaultSink(Sender<HotkeyFault>);

impl FaultSink {
    fn report(&self, fault: HotkeyFault) {
        log::warn!("{fault}");
        match self.0.try_send(fault) {
            Ok(()) => {}
            Err(TrySendError::Full(f)) => log::warn!("hotkey fault queue full, dropping: {f}"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

struct HotkeyListener {
    os: Arc<dyn Win32>,
    thread_id: u32,
    cancel: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl HotkeyListener {
    fn signal(&self) {
        let _ = self.cancel.try_send(());
        if let Err(e) = self.os.post_thread_message(self.thread_id, WM_QUIT, 0, 0) {
            // Already gone; the join below returns immediately.
            log::debug!("waking hotkey listener {:#x}: {e}", self.thread_id);
        }
    }

    fn stop(mut self) {
        self.signal();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("hotkey listener {:#x} panicked", self.thread_id);
            }
        }
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.signal();
        }
    }
}

fn run_listener(os: Arc<dyn Win32>, binding: HotkeyBinding, ready: Sender<u32>, cancel: Receiver<()>, faults: FaultSink) {
    let id = binding.id;
    let fault = |stage, code| faults.report(HotkeyFault { id, stage, code });

    if let Err(e) = os.register_hotkey(Hwnd::NULL, id, binding.modifiers.bits(), binding.vk) {
        fault(FaultStage::Register, e.code());
        return;
    }
    let _ = ready.send(os.current_thread_id());
    drop(ready);

    loop {
        match cancel.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => break,
        }
        let (rc, msg) = os.get_message(Hwnd::NULL, 0, 0);
        let msg = match (rc, msg) {
            (0, _) => break,
            (-1, _) | (_, None) => {
                fault(FaultStage::Receive, os.last_error());
                break;
            }
            (_, Some(msg)) => msg,
        };
        if msg.message != WM_HOTKEY {
            continue;
        }
        trace::hotkey(format_args!("hotkey {id} pressed, posting {:#x} to {}", binding.message, binding.target));
        if let Err(e) = os.post_message(binding.target, binding.message, binding.wparam, binding.lparam) {
            fault(FaultStage::Forward, e.code());
        }
    }

    if let Err(e) = os.unregister_hotkey(Hwnd::NULL, id) {
        log::debug!("hotkey {id} unregister: {e}");
    }
    trace::hotkey(format_args!("hotkey {id} listener stopped"));
}

/// Running listeners keyed by hotkey id, plus their fault queue.
pub struct HotkeyListeners {
    listeners: Mutex<HashMap<i32, HotkeyListener>>,
    faults: FaultSink,
    fault_rx: Receiver<HotkeyFault>,
}

impl HotkeyListeners {
    pub fn new(fault_capacity: usize) -> Self {
        let (tx, fault_rx) = bounded(fault_capacity.max(1));
        Self { listeners: Mutex::new(HashMap::new()), faults: FaultSink(tx), fault_rx }
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<i32, HotkeyListener>> {
        match self.listeners.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Start a listener for `binding`, stopping any listener already
    /// running under the same id. Returns once the hotkey is registered.
    pub fn start(&self, os: &Arc<dyn Win32>, binding: HotkeyBinding) -> Result<(), StartError> {
        let previous = self.listeners().remove(&binding.id);
        if let Some(previous) = previous {
            trace::hotkey(format_args!("replacing hotkey {} listener", binding.id));
            previous.stop();
        }

        let (ready_tx, ready_rx) = bounded(1);
        let (cancel_tx, cancel_rx) = bounded(1);
        let thread_os = os.clone();
        let faults = self.faults.clone();
        let handle = thread::Builder::new()
            .name(format!("w32-hotkey-{}", binding.id))
            .spawn(move || run_listener(thread_os, binding, ready_tx, cancel_rx, faults))
            .map_err(|e| {
                log::error!("failed to spawn hotkey listener: {e}");
                StartError::Spawn
            })?;

        let Ok(thread_id) = ready_rx.recv() else {
            let _ = handle.join();
            return Err(StartError::NotReady);
        };
        trace::hotkey(format_args!("hotkey {} listening on thread {thread_id:#x}", binding.id));
        let listener = HotkeyListener { os: os.clone(), thread_id, cancel: cancel_tx, handle: Some(handle) };
        if let Some(raced) = self.listeners().insert(binding.id, listener) {
            raced.stop();
        }
        Ok(())
    }

    /// Stop the listener for `id`; false when none was running.
    pub fn stop(&self, id: i32) -> bool {
        let listener = self.listeners().remove(&id);
        match listener {
            Some(listener) => {
                listener.stop();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let running = self.running();
        if !running.is_empty() {
            log::debug!("stopping hotkey listeners {running:?}");
        }
        let all: Vec<HotkeyListener> = self.listeners().drain().map(|(_, l)| l).collect();
        for listener in all {
            listener.stop();
        }
    }

    pub fn running(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.listeners().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Drain the faults reported since the last poll, oldest first.
    pub fn poll_faults(&self) -> Vec<HotkeyFault> {
        self.fault_rx.try_iter().collect()
    }
}

impl Drop for HotkeyListeners {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn norepeat_is_not_part_of_the_combination() {
        let m = HotKeyModifiers::CONTROL | HotKeyModifiers::NOREPEAT;
        assert_eq!(m.combination(), HotKeyModifiers::CONTROL);
    }

    #[test]
    fn full_fault_queue_drops_newest() {
        let listeners = HotkeyListeners::new(2);
        for id in 0..3 {
            listeners.faults.report(HotkeyFault { id, stage: FaultStage::Forward, code: 5 });
        }
        let ids: Vec<i32> = listeners.poll_faults().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(listeners.poll_faults().is_empty());
    }
}
