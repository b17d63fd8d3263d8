//! The native surface the bindings call into.
//!
//! Each method performs one Win32 call (or the emulated equivalent). A
//! failing call returns `Err(OsError)` holding the last-error code read
//! immediately after the call, before anything else can overwrite it.

pub mod emu;
#[cfg(windows)]
pub mod native;
mod types;

use std::sync::Arc;

pub use types::*;

use crate::error::{OsError, OsResult};
use crate::handle::{FindHandle, Hwnd, KernelHandle, RegKey, ScHandle};

pub trait Win32: Send + Sync {
    /// `GetLastError` for the calling thread.
    fn last_error(&self) -> u32;

    // Shell and miscellaneous.

    /// `ShellExecute` with the "open" verb; returns the raw result code.
    fn shell_open(&self, path: &str) -> isize;
    fn special_folder_path(&self, csidl: u32) -> OsResult<String>;
    fn user_name(&self) -> OsResult<String>;
    fn is_user_admin(&self) -> bool;
    fn version(&self) -> u32;
    fn mci_send_string(&self, command: &str) -> u32;
    fn message_beep(&self, kind: u32) -> OsResult<()>;
    fn beep(&self, frequency: u32, duration: u32) -> OsResult<()>;
    fn co_initialize(&self) -> i32;
    fn co_uninitialize(&self);
    fn current_thread_id(&self) -> u32;
    fn current_process_id(&self) -> u32;
    fn sleep(&self, ms: u32);

    // Windows.

    fn find_window(&self, class: Option<&str>, title: Option<&str>) -> Hwnd;
    fn find_window_ex(&self, parent: Hwnd, after: Hwnd, class: Option<&str>, title: Option<&str>) -> Hwnd;
    fn set_window_text(&self, hwnd: Hwnd, text: &str) -> OsResult<()>;
    /// Window text; an empty title with no error set reads as `Ok("")`.
    fn window_text(&self, hwnd: Hwnd) -> OsResult<String>;
    fn window_rect(&self, hwnd: Hwnd) -> OsResult<Rect>;
    /// Returns the window that had the focus before.
    fn set_focus(&self, hwnd: Hwnd) -> Hwnd;
    fn set_foreground_window(&self, hwnd: Hwnd) -> bool;
    fn set_topmost(&self, hwnd: Hwnd) -> OsResult<()>;
    fn close_window(&self, hwnd: Hwnd) -> OsResult<()>;
    fn is_window_visible(&self, hwnd: Hwnd) -> bool;
    /// `(thread id, process id)`; zeros for an invalid window.
    fn window_thread_process_id(&self, hwnd: Hwnd) -> (u32, u32);
    fn register_window_message(&self, name: &str) -> OsResult<u32>;

    // Messages.

    fn post_message(&self, hwnd: Hwnd, msg: u32, wparam: usize, lparam: isize) -> OsResult<()>;
    fn send_message(&self, hwnd: Hwnd, msg: u32, wparam: usize, lparam: isize) -> isize;
    fn post_thread_message(&self, thread_id: u32, msg: u32, wparam: usize, lparam: isize) -> OsResult<()>;
    /// Blocking retrieval: `1` with a message, `0` on `WM_QUIT`, `-1` on error.
    fn get_message(&self, hwnd: Hwnd, min: u32, max: u32) -> (i32, Option<Message>);
    fn peek_message(&self, hwnd: Hwnd, min: u32, max: u32, remove: u32) -> Option<Message>;
    fn reply_message(&self, result: isize) -> bool;
    fn dispatch_message(&self, msg: &Message) -> isize;
    fn register_hotkey(&self, hwnd: Hwnd, id: i32, modifiers: u32, vk: u32) -> OsResult<()>;
    fn unregister_hotkey(&self, hwnd: Hwnd, id: i32) -> OsResult<()>;

    // Tab controls.

    fn tab_item_count(&self, hwnd: Hwnd) -> i32;
    fn tab_cur_sel(&self, hwnd: Hwnd) -> i32;
    fn tab_cur_focus(&self, hwnd: Hwnd) -> i32;
    /// Returns the previous selection, or -1.
    fn tab_set_cur_sel(&self, hwnd: Hwnd, index: i32) -> i32;
    fn tab_set_cur_focus(&self, hwnd: Hwnd, index: i32);
    fn tab_item_text(&self, hwnd: Hwnd, index: i32) -> Option<String>;

    // Kernel objects.

    fn close_handle(&self, handle: KernelHandle) -> OsResult<()>;
    fn create_event(
        &self,
        security: &SecurityAttributes,
        manual_reset: bool,
        initial_state: bool,
        name: Option<&str>,
    ) -> OsResult<KernelHandle>;
    fn open_event(&self, access: u32, inherit: bool, name: &str) -> OsResult<KernelHandle>;
    fn set_event(&self, handle: KernelHandle) -> OsResult<()>;
    fn reset_event(&self, handle: KernelHandle) -> OsResult<()>;
    fn pulse_event(&self, handle: KernelHandle) -> OsResult<()>;
    fn create_mutex(&self, security: &SecurityAttributes, initial_owner: bool, name: Option<&str>)
        -> OsResult<KernelHandle>;
    fn open_mutex(&self, access: u32, inherit: bool, name: &str) -> OsResult<KernelHandle>;
    fn release_mutex(&self, handle: KernelHandle) -> OsResult<()>;
    fn create_semaphore(
        &self,
        security: &SecurityAttributes,
        initial: i32,
        maximum: i32,
        name: Option<&str>,
    ) -> OsResult<KernelHandle>;
    fn open_semaphore(&self, access: u32, inherit: bool, name: &str) -> OsResult<KernelHandle>;
    /// Returns the count before the release.
    fn release_semaphore(&self, handle: KernelHandle, count: i32) -> OsResult<i32>;
    fn wait_for_single_object(&self, handle: KernelHandle, timeout_ms: u32) -> u32;
    fn wait_for_multiple_objects(&self, handles: &[KernelHandle], wait_all: bool, timeout_ms: u32) -> u32;

    // Processes.

    fn create_process(&self, request: &ProcessRequest<'_>) -> OsResult<ProcessInfo>;
    fn open_process(&self, access: u32, inherit: bool, pid: u32) -> OsResult<KernelHandle>;
    fn terminate_process(&self, handle: KernelHandle, exit_code: u32) -> OsResult<()>;
    fn exit_code_process(&self, handle: KernelHandle) -> OsResult<u32>;

    // Files and directories.

    /// Returns the unique number used and the generated name.
    fn temp_file_name(&self, dir: &str, prefix: &str, unique: u32) -> OsResult<(u32, String)>;
    fn temp_path(&self) -> OsResult<String>;
    /// Failure is reported as `KernelHandle::INVALID`, like the native call.
    fn create_file(&self, request: &FileRequest<'_>) -> KernelHandle;
    fn read_file(&self, handle: KernelHandle, len: u32) -> OsResult<Vec<u8>>;
    fn write_file(&self, handle: KernelHandle, data: &[u8]) -> OsResult<u32>;
    fn find_first_file(&self, pattern: &str) -> OsResult<(FindHandle, FindData)>;
    fn find_next_file(&self, handle: FindHandle) -> OsResult<FindData>;
    fn find_close(&self, handle: FindHandle) -> OsResult<()>;
    fn set_current_directory(&self, path: &str) -> OsResult<()>;
    fn full_path_name(&self, path: &str) -> OsResult<String>;

    // Registry.

    fn reg_open_key(&self, root: RegKey, subkey: &str, access: u32) -> OsResult<RegKey>;
    fn reg_create_key(&self, root: RegKey, subkey: &str, access: u32) -> OsResult<RegKey>;
    fn reg_close_key(&self, key: RegKey) -> OsResult<()>;
    fn reg_query_value(&self, key: RegKey, name: &str, buf: &mut [u8]) -> OsResult<RegRead>;
    fn reg_set_value(&self, key: RegKey, name: &str, kind: u32, data: &[u8]) -> OsResult<()>;
    fn reg_delete_value(&self, key: RegKey, name: &str) -> OsResult<()>;
    /// Fails when the key still has subkeys.
    fn reg_delete_key(&self, root: RegKey, subkey: &str) -> OsResult<()>;
    /// Deletes the key and everything below it.
    fn sh_delete_key(&self, root: RegKey, subkey: &str) -> OsResult<()>;
    /// `Err(ERROR_NO_MORE_ITEMS)` past the last subkey.
    fn reg_enum_key(&self, key: RegKey, index: u32) -> OsResult<String>;
    fn reg_enum_value(&self, key: RegKey, index: u32) -> OsResult<String>;

    // Services.

    fn open_sc_manager(&self) -> OsResult<ScHandle>;
    fn open_service(&self, manager: ScHandle, name: &str) -> OsResult<ScHandle>;
    fn close_service_handle(&self, handle: ScHandle) -> OsResult<()>;
    fn query_service_status(&self, handle: ScHandle) -> OsResult<ServiceStatus>;
    fn query_service_config(&self, handle: ScHandle) -> OsResult<ServiceConfig>;
    fn control_service(&self, handle: ScHandle, control: u32) -> OsResult<ServiceStatus>;
    fn delete_service(&self, handle: ScHandle) -> OsResult<()>;
    fn start_service(&self, handle: ScHandle) -> OsResult<()>;
}

/// The real OS, when this target has one.
pub fn native() -> Option<Arc<dyn Win32>> {
    #[cfg(windows)]
    {
        Some(Arc::new(native::Native))
    }
    #[cfg(not(windows))]
    {
        None
    }
}

/// Map a `std::io::Error` onto the closest Win32 error code.
pub(crate) fn io_error_code(err: &std::io::Error) -> OsError {
    use crate::constants::*;
    use std::io::ErrorKind;

    #[cfg(windows)]
    if let Some(code) = err.raw_os_error() {
        return OsError(code as u32);
    }
    OsError(match err.kind() {
        ErrorKind::NotFound => ERROR_FILE_NOT_FOUND,
        ErrorKind::PermissionDenied => ERROR_ACCESS_DENIED,
        ErrorKind::AlreadyExists => ERROR_FILE_EXISTS,
        ErrorKind::InvalidInput => ERROR_INVALID_PARAMETER,
        _ => ERROR_INVALID_HANDLE,
    })
}
