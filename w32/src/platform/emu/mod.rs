//! Portable in-process implementation of [`Win32`].
//!
//! Kernel objects, windows, message queues, hotkeys, the registry and the
//! service manager are emulated in memory. Files, directories and child
//! processes go to the host OS. Last-error codes and thread ids are kept
//! per thread, like the real thing.

mod fs;
mod kernel;
mod registry;
mod scm;
mod user;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::MAIN_SEPARATOR;
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::EmulatorConfig;
use crate::constants::*;
use crate::error::{OsError, OsResult};
use crate::handle::{FindHandle, Hwnd, KernelHandle, RegKey, ScHandle};

use super::{
    io_error_code, FileRequest, FindData, Message, ProcessInfo, ProcessRequest, Rect, RegRead, SecurityAttributes,
    ServiceConfig, ServiceStatus, Win32,
};

use self::fs::FileSystem;
use self::kernel::{FileObject, Kernel};
use self::registry::Hive;
use self::scm::ServiceManager;
use self::user::User;

static NEXT_THREAD_ID: AtomicU32 = AtomicU32::new(0x1000);

/// The calling thread's emulated id and the cleanups to run when it exits.
struct ThreadSlot {
    id: u32,
    on_exit: RefCell<Vec<Box<dyn FnOnce(u32)>>>,
}

impl Drop for ThreadSlot {
    fn drop(&mut self) {
        for hook in self.on_exit.get_mut().drain(..) {
            hook(self.id);
        }
    }
}

thread_local! {
    static THREAD: ThreadSlot = ThreadSlot { id: next_thread_id(), on_exit: RefCell::new(Vec::new()) };
    static LAST_ERROR: Cell<u32> = const { Cell::new(0) };
    static COM_DEPTH: Cell<u32> = const { Cell::new(0) };
}

pub(crate) fn next_thread_id() -> u32 {
    NEXT_THREAD_ID.fetch_add(4, Ordering::Relaxed)
}

/// Emulated id of the calling thread.
pub(crate) fn thread_id() -> u32 {
    THREAD.with(|t| t.id)
}

/// Run `hook` with the calling thread's id once that thread exits.
pub(crate) fn on_thread_exit(hook: impl FnOnce(u32) + 'static) {
    if THREAD.try_with(|t| t.on_exit.borrow_mut().push(Box::new(hook))).is_err() {
        log::debug!("thread is exiting, exit hook dropped");
    }
}

pub(crate) fn set_last_error(code: u32) {
    LAST_ERROR.with(|e| e.set(code));
}

/// Record `code` as the thread's last error and fail with it.
pub(crate) fn fail<T>(code: u32) -> OsResult<T> {
    set_last_error(code);
    Err(OsError(code))
}

const MCIERR_UNRECOGNIZED_COMMAND: u32 = 261;

pub struct Emulator {
    kernel: Kernel,
    user: User,
    hive: Hive,
    scm: ServiceManager,
    fs: FileSystem,
    config: EmulatorConfig,
    shell_log: Mutex<Vec<String>>,
    mci_log: Mutex<Vec<String>>,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(EmulatorConfig::default())
    }
}

impl Emulator {
    pub fn new(config: EmulatorConfig) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| std::env::temp_dir());
        Self {
            kernel: Kernel::default(),
            user: User::default(),
            hive: Hive::default(),
            scm: ServiceManager::default(),
            fs: FileSystem::new(cwd),
            config,
            shell_log: Mutex::new(Vec::new()),
            mci_log: Mutex::new(Vec::new()),
        }
    }

    /// Create a top-level window owned by the calling thread.
    pub fn create_window(&self, class: &str, title: &str, rect: Rect) -> Hwnd {
        self.user.create_window(Hwnd::NULL, class, title, rect, None)
    }

    pub fn create_child_window(&self, parent: Hwnd, class: &str, title: &str) -> Hwnd {
        self.user.create_window(parent, class, title, Rect::default(), None)
    }

    /// Create a tab control with the given item captions.
    pub fn create_tab_control(&self, parent: Hwnd, items: &[&str]) -> Hwnd {
        let items = items.iter().map(|s| s.to_string()).collect();
        self.user.create_window(parent, "SysTabControl32", "", Rect::default(), Some(items))
    }

    /// Messages sent or dispatched to `hwnd` so far.
    pub fn received_messages(&self, hwnd: Hwnd) -> Vec<Message> {
        self.user.received(hwnd)
    }

    /// Simulate the user pressing a registered hotkey combination.
    pub fn press_hotkey(&self, modifiers: u32, vk: u32) -> bool {
        self.user.press_hotkey(modifiers, vk)
    }

    pub fn install_service(&self, name: &str, config: ServiceConfig) {
        self.scm.install(name, config);
    }

    /// Kernel handles currently open, find handles included.
    pub fn open_handles(&self) -> usize {
        self.kernel.open_handles()
    }

    /// Number of registry value reads issued so far.
    pub fn registry_reads(&self) -> usize {
        self.hive.reads()
    }

    pub fn is_topmost(&self, hwnd: Hwnd) -> bool {
        self.user.is_topmost(hwnd)
    }

    pub fn is_minimized(&self, hwnd: Hwnd) -> bool {
        self.user.is_minimized(hwnd)
    }

    pub fn shell_opened(&self) -> Vec<String> {
        lock_log(&self.shell_log).clone()
    }

    pub fn mci_commands(&self) -> Vec<String> {
        lock_log(&self.mci_log).clone()
    }
}

fn lock_log(log: &Mutex<Vec<String>>) -> std::sync::MutexGuard<'_, Vec<String>> {
    match log.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Split a command line into arguments. Whitespace separates arguments,
/// double quotes group them and `\"` is a literal quote.
pub(crate) fn split_command_line(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                has_token = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

impl Win32 for Emulator {
    fn last_error(&self) -> u32 {
        LAST_ERROR.with(|e| e.get())
    }

    fn shell_open(&self, path: &str) -> isize {
        lock_log(&self.shell_log).push(path.to_string());
        if path.contains("://") || self.fs.resolve(path).exists() {
            42
        } else {
            set_last_error(ERROR_FILE_NOT_FOUND);
            ERROR_FILE_NOT_FOUND as isize
        }
    }

    fn special_folder_path(&self, csidl: u32) -> OsResult<String> {
        match self.config.special_folders.get(&csidl) {
            Some(path) => Ok(path.clone()),
            None => fail(ERROR_FILE_NOT_FOUND),
        }
    }

    fn user_name(&self) -> OsResult<String> {
        if let Some(name) = &self.config.user_name {
            return Ok(name.clone());
        }
        match std::env::var("USERNAME").or_else(|_| std::env::var("USER")) {
            Ok(name) => Ok(name),
            Err(_) => fail(ERROR_FILE_NOT_FOUND),
        }
    }

    fn is_user_admin(&self) -> bool {
        self.config.is_admin
    }

    fn version(&self) -> u32 {
        self.config.version
    }

    fn mci_send_string(&self, command: &str) -> u32 {
        lock_log(&self.mci_log).push(command.to_string());
        if command.trim().is_empty() {
            MCIERR_UNRECOGNIZED_COMMAND
        } else {
            0
        }
    }

    fn message_beep(&self, kind: u32) -> OsResult<()> {
        log::debug!("message beep {kind:#x}");
        Ok(())
    }

    fn beep(&self, frequency: u32, duration: u32) -> OsResult<()> {
        if !(0x25..=0x7FFF).contains(&frequency) {
            return fail(ERROR_INVALID_PARAMETER);
        }
        log::debug!("beep {frequency} Hz for {duration} ms");
        Ok(())
    }

    fn co_initialize(&self) -> i32 {
        COM_DEPTH.with(|d| {
            let depth = d.get();
            d.set(depth + 1);
            if depth == 0 {
                0
            } else {
                1
            }
        })
    }

    fn co_uninitialize(&self) {
        COM_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }

    fn current_thread_id(&self) -> u32 {
        thread_id()
    }

    fn current_process_id(&self) -> u32 {
        std::process::id()
    }

    fn sleep(&self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }

    fn find_window(&self, class: Option<&str>, title: Option<&str>) -> Hwnd {
        self.user.find_window(Hwnd::NULL, Hwnd::NULL, class, title)
    }

    fn find_window_ex(&self, parent: Hwnd, after: Hwnd, class: Option<&str>, title: Option<&str>) -> Hwnd {
        self.user.find_window(parent, after, class, title)
    }

    fn set_window_text(&self, hwnd: Hwnd, text: &str) -> OsResult<()> {
        self.user.set_window_text(hwnd, text)
    }

    fn window_text(&self, hwnd: Hwnd) -> OsResult<String> {
        self.user.window_text(hwnd)
    }

    fn window_rect(&self, hwnd: Hwnd) -> OsResult<Rect> {
        self.user.window_rect(hwnd)
    }

    fn set_focus(&self, hwnd: Hwnd) -> Hwnd {
        self.user.set_focus(hwnd)
    }

    fn set_foreground_window(&self, hwnd: Hwnd) -> bool {
        self.user.set_foreground(hwnd)
    }

    fn set_topmost(&self, hwnd: Hwnd) -> OsResult<()> {
        self.user.set_topmost(hwnd)
    }

    fn close_window(&self, hwnd: Hwnd) -> OsResult<()> {
        self.user.close_window(hwnd)
    }

    fn is_window_visible(&self, hwnd: Hwnd) -> bool {
        self.user.is_visible(hwnd)
    }

    fn window_thread_process_id(&self, hwnd: Hwnd) -> (u32, u32) {
        self.user.thread_process_id(hwnd)
    }

    fn register_window_message(&self, name: &str) -> OsResult<u32> {
        self.user.register_message(name)
    }

    fn post_message(&self, hwnd: Hwnd, msg: u32, wparam: usize, lparam: isize) -> OsResult<()> {
        self.user.post_message(hwnd, msg, wparam, lparam)
    }

    fn send_message(&self, hwnd: Hwnd, msg: u32, wparam: usize, lparam: isize) -> isize {
        self.user.send_message(hwnd, msg, wparam, lparam)
    }

    fn post_thread_message(&self, thread_id: u32, msg: u32, wparam: usize, lparam: isize) -> OsResult<()> {
        self.user.post_thread_message(thread_id, msg, wparam, lparam)
    }

    fn get_message(&self, hwnd: Hwnd, min: u32, max: u32) -> (i32, Option<Message>) {
        self.user.get_message(hwnd, min, max)
    }

    fn peek_message(&self, hwnd: Hwnd, min: u32, max: u32, remove: u32) -> Option<Message> {
        self.user.peek_message(hwnd, min, max, remove)
    }

    fn reply_message(&self, _result: isize) -> bool {
        // Only meaningful while handling an inter-thread SendMessage, which
        // the emulator delivers synchronously.
        false
    }

    fn dispatch_message(&self, msg: &Message) -> isize {
        self.user.dispatch(msg)
    }

    fn register_hotkey(&self, hwnd: Hwnd, id: i32, modifiers: u32, vk: u32) -> OsResult<()> {
        self.user.register_hotkey(hwnd, id, modifiers, vk)
    }

    fn unregister_hotkey(&self, hwnd: Hwnd, id: i32) -> OsResult<()> {
        self.user.unregister_hotkey(hwnd, id)
    }

    fn tab_item_count(&self, hwnd: Hwnd) -> i32 {
        self.user.send_message(hwnd, TCM_GETITEMCOUNT, 0, 0) as i32
    }

    fn tab_cur_sel(&self, hwnd: Hwnd) -> i32 {
        self.user.send_message(hwnd, TCM_GETCURSEL, 0, 0) as i32
    }

    fn tab_cur_focus(&self, hwnd: Hwnd) -> i32 {
        self.user.send_message(hwnd, TCM_GETCURFOCUS, 0, 0) as i32
    }

    fn tab_set_cur_sel(&self, hwnd: Hwnd, index: i32) -> i32 {
        self.user.send_message(hwnd, TCM_SETCURSEL, index as usize, 0) as i32
    }

    fn tab_set_cur_focus(&self, hwnd: Hwnd, index: i32) {
        self.user.send_message(hwnd, TCM_SETCURFOCUS, index as usize, 0);
    }

    fn tab_item_text(&self, hwnd: Hwnd, index: i32) -> Option<String> {
        self.user.tab_item_text(hwnd, index)
    }

    fn close_handle(&self, handle: KernelHandle) -> OsResult<()> {
        self.kernel.close(handle)
    }

    fn create_event(
        &self,
        _security: &SecurityAttributes,
        manual_reset: bool,
        initial_state: bool,
        name: Option<&str>,
    ) -> OsResult<KernelHandle> {
        self.kernel.create_event(manual_reset, initial_state, name)
    }

    fn open_event(&self, _access: u32, _inherit: bool, name: &str) -> OsResult<KernelHandle> {
        self.kernel.open_event(name)
    }

    fn set_event(&self, handle: KernelHandle) -> OsResult<()> {
        self.kernel.set_event(handle, true)
    }

    fn reset_event(&self, handle: KernelHandle) -> OsResult<()> {
        self.kernel.set_event(handle, false)
    }

    fn pulse_event(&self, handle: KernelHandle) -> OsResult<()> {
        self.kernel.pulse_event(handle)
    }

    fn create_mutex(
        &self,
        _security: &SecurityAttributes,
        initial_owner: bool,
        name: Option<&str>,
    ) -> OsResult<KernelHandle> {
        self.kernel.create_mutex(initial_owner, name)
    }

    fn open_mutex(&self, _access: u32, _inherit: bool, name: &str) -> OsResult<KernelHandle> {
        self.kernel.open_mutex(name)
    }

    fn release_mutex(&self, handle: KernelHandle) -> OsResult<()> {
        self.kernel.release_mutex(handle)
    }

    fn create_semaphore(
        &self,
        _security: &SecurityAttributes,
        initial: i32,
        maximum: i32,
        name: Option<&str>,
    ) -> OsResult<KernelHandle> {
        self.kernel.create_semaphore(initial, maximum, name)
    }

    fn open_semaphore(&self, _access: u32, _inherit: bool, name: &str) -> OsResult<KernelHandle> {
        self.kernel.open_semaphore(name)
    }

    fn release_semaphore(&self, handle: KernelHandle, count: i32) -> OsResult<i32> {
        self.kernel.release_semaphore(handle, count)
    }

    fn wait_for_single_object(&self, handle: KernelHandle, timeout_ms: u32) -> u32 {
        self.kernel.wait(&[handle], false, timeout_ms)
    }

    fn wait_for_multiple_objects(&self, handles: &[KernelHandle], wait_all: bool, timeout_ms: u32) -> u32 {
        self.kernel.wait(handles, wait_all, timeout_ms)
    }

    fn create_process(&self, request: &ProcessRequest<'_>) -> OsResult<ProcessInfo> {
        let mut tokens = request.command_line.map(split_command_line).unwrap_or_default().into_iter();
        let program = match request.application {
            Some(app) => {
                // argv[0] of the command line names the program again.
                tokens.next();
                app.to_string()
            }
            None => match tokens.next() {
                Some(first) => first,
                None => return fail(ERROR_INVALID_PARAMETER),
            },
        };
        let mut command = Command::new(self.fs.resolve_program(&program));
        command.args(tokens);
        if let Some(dir) = request.current_directory {
            command.current_dir(self.fs.resolve(dir));
        }
        self.kernel.spawn(command)
    }

    fn open_process(&self, _access: u32, _inherit: bool, pid: u32) -> OsResult<KernelHandle> {
        self.kernel.open_process(pid)
    }

    fn terminate_process(&self, handle: KernelHandle, exit_code: u32) -> OsResult<()> {
        self.kernel.terminate_process(handle, exit_code)
    }

    fn exit_code_process(&self, handle: KernelHandle) -> OsResult<u32> {
        self.kernel.exit_code_process(handle)
    }

    fn temp_file_name(&self, dir: &str, prefix: &str, unique: u32) -> OsResult<(u32, String)> {
        match self.fs.temp_file_name(dir, prefix, unique) {
            Ok(v) => Ok(v),
            Err(e) => fail(e.code()),
        }
    }

    fn temp_path(&self) -> OsResult<String> {
        let mut path = std::env::temp_dir().to_string_lossy().into_owned();
        if !path.ends_with(MAIN_SEPARATOR) {
            path.push(MAIN_SEPARATOR);
        }
        Ok(path)
    }

    fn create_file(&self, request: &FileRequest<'_>) -> KernelHandle {
        let existed = self.fs.resolve(request.name).exists();
        match self.fs.open(request) {
            Ok((file, path)) => {
                let reopened = existed && matches!(request.disposition, CREATE_ALWAYS | OPEN_ALWAYS);
                set_last_error(if reopened { ERROR_ALREADY_EXISTS } else { ERROR_SUCCESS });
                let delete_on_close = request.flags_and_attributes & FILE_FLAG_DELETE_ON_CLOSE != 0;
                self.kernel.insert_file(FileObject::new(file, path, delete_on_close))
            }
            Err(e) => {
                set_last_error(io_error_code(&e).code());
                KernelHandle::INVALID
            }
        }
    }

    fn read_file(&self, handle: KernelHandle, len: u32) -> OsResult<Vec<u8>> {
        self.kernel.read_file(handle, len)
    }

    fn write_file(&self, handle: KernelHandle, data: &[u8]) -> OsResult<u32> {
        self.kernel.write_file(handle, data)
    }

    fn find_first_file(&self, pattern: &str) -> OsResult<(FindHandle, FindData)> {
        let mut found: VecDeque<FindData> = match self.fs.list(pattern) {
            Ok(list) => list.into(),
            Err(e) => return fail(e.code()),
        };
        let Some(first) = found.pop_front() else {
            return fail(ERROR_FILE_NOT_FOUND);
        };
        Ok((self.kernel.insert_find(found), first))
    }

    fn find_next_file(&self, handle: FindHandle) -> OsResult<FindData> {
        self.kernel.find_next(handle)
    }

    fn find_close(&self, handle: FindHandle) -> OsResult<()> {
        self.kernel.find_close(handle)
    }

    fn set_current_directory(&self, path: &str) -> OsResult<()> {
        match self.fs.set_current_directory(path) {
            Ok(()) => Ok(()),
            Err(e) => fail(e.code()),
        }
    }

    fn full_path_name(&self, path: &str) -> OsResult<String> {
        match self.fs.full_path(path) {
            Ok(p) => Ok(p),
            Err(e) => fail(e.code()),
        }
    }

    fn reg_open_key(&self, root: RegKey, subkey: &str, _access: u32) -> OsResult<RegKey> {
        self.hive.open(root, subkey)
    }

    fn reg_create_key(&self, root: RegKey, subkey: &str, _access: u32) -> OsResult<RegKey> {
        self.hive.create(root, subkey)
    }

    fn reg_close_key(&self, key: RegKey) -> OsResult<()> {
        self.hive.close(key)
    }

    fn reg_query_value(&self, key: RegKey, name: &str, buf: &mut [u8]) -> OsResult<RegRead> {
        self.hive.query(key, name, buf)
    }

    fn reg_set_value(&self, key: RegKey, name: &str, kind: u32, data: &[u8]) -> OsResult<()> {
        self.hive.set(key, name, kind, data)
    }

    fn reg_delete_value(&self, key: RegKey, name: &str) -> OsResult<()> {
        self.hive.delete_value(key, name)
    }

    fn reg_delete_key(&self, root: RegKey, subkey: &str) -> OsResult<()> {
        self.hive.delete_key(root, subkey, false)
    }

    fn sh_delete_key(&self, root: RegKey, subkey: &str) -> OsResult<()> {
        self.hive.delete_key(root, subkey, true)
    }

    fn reg_enum_key(&self, key: RegKey, index: u32) -> OsResult<String> {
        self.hive.enum_key(key, index)
    }

    fn reg_enum_value(&self, key: RegKey, index: u32) -> OsResult<String> {
        self.hive.enum_value(key, index)
    }

    fn open_sc_manager(&self) -> OsResult<ScHandle> {
        Ok(self.scm.open_manager())
    }

    fn open_service(&self, manager: ScHandle, name: &str) -> OsResult<ScHandle> {
        self.scm.open_service(manager, name)
    }

    fn close_service_handle(&self, handle: ScHandle) -> OsResult<()> {
        self.scm.close(handle)
    }

    fn query_service_status(&self, handle: ScHandle) -> OsResult<ServiceStatus> {
        self.scm.status(handle)
    }

    fn query_service_config(&self, handle: ScHandle) -> OsResult<ServiceConfig> {
        self.scm.config(handle)
    }

    fn control_service(&self, handle: ScHandle, control: u32) -> OsResult<ServiceStatus> {
        self.scm.control(handle, control)
    }

    fn delete_service(&self, handle: ScHandle) -> OsResult<()> {
        self.scm.delete(handle)
    }

    fn start_service(&self, handle: ScHandle) -> OsResult<()> {
        self.scm.start(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn command_line_splits_on_unquoted_whitespace() {
        assert_eq!(split_command_line(r#"sh -c "exit 3""#), vec!["sh", "-c", "exit 3"]);
        assert_eq!(split_command_line(r#"  a  ""  b\"c "#), vec!["a", "", "b\"c"]);
        assert!(split_command_line("   ").is_empty());
    }

    #[test]
    fn last_error_is_per_thread() {
        let emu = Emulator::default();
        let _ = emu.reg_close_key(RegKey::from_raw(0x1234));
        set_last_error(ERROR_ACCESS_DENIED);
        let other = std::thread::spawn(|| LAST_ERROR.with(|e| e.get())).join().unwrap();
        assert_eq!(other, 0);
        assert_eq!(emu.last_error(), ERROR_ACCESS_DENIED);
    }

    #[test]
    fn exited_threads_leave_no_queue_behind() {
        let emu = Emulator::default();
        let before = emu.user.queue_count();
        let tid = std::thread::scope(|s| {
            s.spawn(|| {
                assert!(emu.peek_message(Hwnd::NULL, 0, 0, PM_REMOVE).is_none());
                emu.register_hotkey(Hwnd::NULL, 7, MOD_ALT, 0x41).unwrap();
                assert_eq!(emu.user.queue_count(), before + 1);
                emu.current_thread_id()
            })
            .join()
            .unwrap()
        });
        assert_eq!(emu.user.queue_count(), before);
        assert_eq!(emu.post_thread_message(tid, WM_USER, 0, 0), Err(OsError(ERROR_INVALID_THREAD_ID)));
        assert!(!emu.press_hotkey(MOD_ALT, 0x41));
    }

    #[test]
    fn com_initialization_nests() {
        let emu = Emulator::default();
        assert_eq!(emu.co_initialize(), 0);
        assert_eq!(emu.co_initialize(), 1);
        emu.co_uninitialize();
        emu.co_uninitialize();
        assert_eq!(emu.co_initialize(), 0);
        emu.co_uninitialize();
    }

    #[test]
    fn emulated_calls_report_last_error() {
        let emu = Emulator::default();
        assert!(emu.open_event(EVENT_ALL_ACCESS, false, "no-such-event").is_err());
        assert_eq!(emu.last_error(), ERROR_FILE_NOT_FOUND);
    }
}
