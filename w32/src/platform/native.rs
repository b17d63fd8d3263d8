//! The real OS through `windows-sys`.
//!
//! Every `unsafe` FFI call of the crate lives here. Strings cross as
//! NUL-terminated UTF-16 (the `W` entry points); handles cross bit-for-bit.

use std::ffi::c_void;
use std::mem::{size_of, zeroed};
use std::ptr::{null, null_mut};

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, SetLastError, BOOL, ERROR_MORE_DATA, ERROR_SUCCESS, FILETIME, HANDLE, HWND,
    INVALID_HANDLE_VALUE, RECT,
};
use windows_sys::Win32::Media::Multimedia::mciSendStringW;
use windows_sys::Win32::Security::{
    AllocateAndInitializeSid, CheckTokenMembership, FreeSid, PSID, SECURITY_ATTRIBUTES, SID_IDENTIFIER_AUTHORITY,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FindClose, FindFirstFileW, FindNextFileW, GetFullPathNameW, GetTempFileNameW, GetTempPathW,
    ReadFile, WriteFile, WIN32_FIND_DATAW,
};
use windows_sys::Win32::System::Com::{CoInitialize, CoTaskMemFree, CoUninitialize};
use windows_sys::Win32::System::Diagnostics::Debug::Beep;
use windows_sys::Win32::System::Environment::SetCurrentDirectoryW;
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyW, RegDeleteValueW, RegEnumKeyExW, RegEnumValueW, RegOpenKeyExW,
    RegQueryValueExW, RegSetValueExW, HKEY, REG_OPTION_NON_VOLATILE,
};
use windows_sys::Win32::System::Services::{
    CloseServiceHandle, ControlService, DeleteService, OpenSCManagerW, OpenServiceW, QueryServiceConfigW,
    QueryServiceStatus, StartServiceW, QUERY_SERVICE_CONFIGW, SC_HANDLE, SC_MANAGER_ALL_ACCESS, SERVICE_ALL_ACCESS,
    SERVICE_STATUS,
};
use windows_sys::Win32::System::SystemInformation::GetVersion;
use windows_sys::Win32::System::Threading::{
    CreateEventW, CreateMutexW, CreateProcessW, CreateSemaphoreW, GetCurrentProcessId, GetCurrentThreadId,
    GetExitCodeProcess, OpenEventW, OpenMutexW, OpenProcess, OpenSemaphoreW, PulseEvent, ReleaseMutex,
    ReleaseSemaphore, ResetEvent, SetEvent, Sleep, TerminateProcess, WaitForMultipleObjects, WaitForSingleObject,
    PROCESS_INFORMATION, STARTUPINFOW,
};
use windows_sys::Win32::System::WindowsProgramming::GetUserNameW;
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{RegisterHotKey, SetFocus, UnregisterHotKey};
use windows_sys::Win32::UI::Shell::Common::ITEMIDLIST;
use windows_sys::Win32::UI::Shell::{SHDeleteKeyW, SHGetPathFromIDListW, SHGetSpecialFolderLocation, ShellExecuteW};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CloseWindow, DispatchMessageW, FindWindowExW, FindWindowW, GetDesktopWindow, GetMessageW, GetWindowRect,
    GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId, IsWindowVisible, MessageBeep, PeekMessageW,
    PostMessageW, PostThreadMessageW, RegisterWindowMessageW, ReplyMessage, SendMessageW, SetForegroundWindow,
    SetWindowPos, SetWindowTextW, HWND_TOPMOST, MSG, SWP_NOMOVE, SWP_NOSIZE, SW_SHOW,
};

use super::{
    FileRequest, FileTime, FindData, Message, Point, ProcessInfo, ProcessRequest, Rect, RegRead, SecurityAttributes,
    ServiceConfig, ServiceStatus, StartupInfo, Win32,
};
use crate::constants::{TCM_GETCURFOCUS, TCM_GETCURSEL, TCM_GETITEMCOUNT, TCM_GETITEMW, TCM_SETCURFOCUS, TCM_SETCURSEL};
use crate::error::{OsError, OsResult};
use crate::handle::{FindHandle, Hwnd, KernelHandle, RegKey, ScHandle};

const MAX_PATH: usize = 260;
const TCIF_TEXT: u32 = 0x0001;
const SECURITY_NT_AUTHORITY: SID_IDENTIFIER_AUTHORITY = SID_IDENTIFIER_AUTHORITY { Value: [0, 0, 0, 0, 0, 5] };
const SECURITY_BUILTIN_DOMAIN_RID: u32 = 0x20;
const DOMAIN_ALIAS_RID_ADMINS: u32 = 0x220;
/// Longest registry value name, in characters.
const MAX_VALUE_NAME: usize = 16_384;
const MAX_KEY_NAME: usize = 256;

/// `TCITEMW` from commctrl.h.
#[repr(C)]
struct TcItemW {
    mask: u32,
    state: u32,
    state_mask: u32,
    text: *mut u16,
    text_max: i32,
    image: i32,
    lparam: isize,
}

pub struct Native;

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn opt_wide(s: Option<&str>) -> Option<Vec<u16>> {
    s.map(to_wide)
}

fn wide_ptr(s: &Option<Vec<u16>>) -> *const u16 {
    s.as_ref().map_or(null(), |w| w.as_ptr())
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

/// # Safety
/// `p` must be null or point to a NUL-terminated UTF-16 string.
unsafe fn from_wide_ptr(p: *const u16) -> String {
    if p.is_null() {
        return String::new();
    }
    let mut len = 0;
    while *p.add(len) != 0 {
        len += 1;
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(p, len))
}

fn last_error() -> OsError {
    OsError(unsafe { GetLastError() })
}

fn check_win32_bool(result: BOOL) -> OsResult<()> {
    if result != 0 {
        Ok(())
    } else {
        Err(last_error())
    }
}

/// Registry and other status-returning calls.
fn check_status(code: u32) -> OsResult<()> {
    if code == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(OsError(code))
    }
}

fn hwnd(h: Hwnd) -> HWND {
    h.as_raw() as HWND
}

fn from_hwnd(h: HWND) -> Hwnd {
    Hwnd::from_raw(h as isize)
}

fn handle(h: KernelHandle) -> HANDLE {
    h.as_raw() as HANDLE
}

/// Null means failure, with the reason in the last-error slot.
fn kernel_handle(h: HANDLE) -> OsResult<KernelHandle> {
    if h.is_null() {
        Err(last_error())
    } else {
        Ok(KernelHandle::from_raw(h as isize))
    }
}

fn hkey(k: RegKey) -> HKEY {
    k.as_raw() as HKEY
}

fn sc_handle(h: ScHandle) -> SC_HANDLE {
    h.as_raw() as SC_HANDLE
}

fn from_sc_handle(h: SC_HANDLE) -> OsResult<ScHandle> {
    if h.is_null() {
        Err(last_error())
    } else {
        Ok(ScHandle::from_raw(h as isize))
    }
}

/// Storage for a `SECURITY_ATTRIBUTES` that the call may point at.
fn security_attributes(sa: &SecurityAttributes) -> SECURITY_ATTRIBUTES {
    SECURITY_ATTRIBUTES {
        nLength: size_of::<SECURITY_ATTRIBUTES>() as u32,
        lpSecurityDescriptor: null_mut(),
        bInheritHandle: sa.inherit_handle as BOOL,
    }
}

fn file_time(ft: FILETIME) -> FileTime {
    FileTime::from_parts(ft.dwLowDateTime, ft.dwHighDateTime)
}

fn find_data(d: &WIN32_FIND_DATAW) -> FindData {
    FindData {
        attributes: d.dwFileAttributes,
        creation_time: file_time(d.ftCreationTime),
        last_access_time: file_time(d.ftLastAccessTime),
        last_write_time: file_time(d.ftLastWriteTime),
        file_size: ((d.nFileSizeHigh as u64) << 32) | d.nFileSizeLow as u64,
        file_name: from_wide(&d.cFileName),
        alternate_file_name: from_wide(&d.cAlternateFileName),
    }
}

fn message(m: &MSG) -> Message {
    Message {
        hwnd: from_hwnd(m.hwnd),
        message: m.message,
        wparam: m.wParam,
        lparam: m.lParam,
        time: m.time,
        pt: Point { x: m.pt.x, y: m.pt.y },
    }
}

fn service_status(s: &SERVICE_STATUS) -> ServiceStatus {
    ServiceStatus {
        service_type: s.dwServiceType,
        current_state: s.dwCurrentState,
        controls_accepted: s.dwControlsAccepted,
        win32_exit_code: s.dwWin32ExitCode,
        service_specific_exit_code: s.dwServiceSpecificExitCode,
        check_point: s.dwCheckPoint,
        wait_hint: s.dwWaitHint,
    }
}

/// Call a `GetXxxW(len, buf)`-style function that returns the needed size
/// when the buffer is too small and zero on failure.
fn sized_string(mut f: impl FnMut(u32, *mut u16) -> u32) -> OsResult<String> {
    let mut buf = vec![0u16; MAX_PATH + 1];
    loop {
        let n = f(buf.len() as u32, buf.as_mut_ptr()) as usize;
        if n == 0 {
            return Err(last_error());
        }
        if n < buf.len() {
            return Ok(String::from_utf16_lossy(&buf[..n]));
        }
        buf.resize(n + 1, 0);
    }
}

fn startup_info(s: &StartupInfo, desktop: &mut Option<Vec<u16>>, title: &mut Option<Vec<u16>>) -> STARTUPINFOW {
    let mut si: STARTUPINFOW = unsafe { zeroed() };
    si.cb = size_of::<STARTUPINFOW>() as u32;
    si.lpDesktop = desktop.as_mut().map_or(null_mut(), |w| w.as_mut_ptr());
    si.lpTitle = title.as_mut().map_or(null_mut(), |w| w.as_mut_ptr());
    si.dwX = s.x;
    si.dwY = s.y;
    si.dwXSize = s.x_size;
    si.dwYSize = s.y_size;
    si.dwXCountChars = s.x_count_chars;
    si.dwYCountChars = s.y_count_chars;
    si.dwFillAttribute = s.fill_attribute;
    si.dwFlags = s.flags;
    si.wShowWindow = s.show_window;
    si.hStdInput = handle(s.std_input);
    si.hStdOutput = handle(s.std_output);
    si.hStdError = handle(s.std_error);
    si
}

impl Win32 for Native {
    fn last_error(&self) -> u32 {
        unsafe { GetLastError() }
    }

    fn shell_open(&self, path: &str) -> isize {
        let verb = to_wide("open");
        let file = to_wide(path);
        unsafe { ShellExecuteW(null_mut(), verb.as_ptr(), file.as_ptr(), null(), null(), SW_SHOW) as isize }
    }

    fn special_folder_path(&self, csidl: u32) -> OsResult<String> {
        let mut idl: *mut ITEMIDLIST = null_mut();
        let hr = unsafe { SHGetSpecialFolderLocation(GetDesktopWindow(), csidl as i32, &mut idl) };
        if hr != 0 {
            return Err(OsError(hr as u32));
        }
        let mut buf = vec![0u16; MAX_PATH * 4];
        let ok = unsafe { SHGetPathFromIDListW(idl, buf.as_mut_ptr()) };
        let r = if ok != 0 { Ok(from_wide(&buf)) } else { Err(last_error()) };
        unsafe { CoTaskMemFree(idl as *const c_void) };
        r
    }

    fn user_name(&self) -> OsResult<String> {
        let mut buf = vec![0u16; 2048];
        let mut len = buf.len() as u32;
        check_win32_bool(unsafe { GetUserNameW(buf.as_mut_ptr(), &mut len) })?;
        Ok(from_wide(&buf))
    }

    fn is_user_admin(&self) -> bool {
        let mut group: PSID = null_mut();
        let ok = unsafe {
            AllocateAndInitializeSid(
                &SECURITY_NT_AUTHORITY,
                2,
                SECURITY_BUILTIN_DOMAIN_RID,
                DOMAIN_ALIAS_RID_ADMINS,
                0,
                0,
                0,
                0,
                0,
                0,
                &mut group,
            )
        };
        if ok == 0 {
            return false;
        }
        let mut member: BOOL = 0;
        let checked = unsafe { CheckTokenMembership(null_mut(), group, &mut member) };
        unsafe { FreeSid(group) };
        checked != 0 && member != 0
    }

    fn version(&self) -> u32 {
        unsafe { GetVersion() }
    }

    fn mci_send_string(&self, command: &str) -> u32 {
        let command = to_wide(command);
        unsafe { mciSendStringW(command.as_ptr(), null_mut(), 0, null_mut()) }
    }

    fn message_beep(&self, kind: u32) -> OsResult<()> {
        check_win32_bool(unsafe { MessageBeep(kind) })
    }

    fn beep(&self, frequency: u32, duration: u32) -> OsResult<()> {
        check_win32_bool(unsafe { Beep(frequency, duration) })
    }

    fn co_initialize(&self) -> i32 {
        unsafe { CoInitialize(null()) }
    }

    fn co_uninitialize(&self) {
        unsafe { CoUninitialize() }
    }

    fn current_thread_id(&self) -> u32 {
        unsafe { GetCurrentThreadId() }
    }

    fn current_process_id(&self) -> u32 {
        unsafe { GetCurrentProcessId() }
    }

    fn sleep(&self, ms: u32) {
        unsafe { Sleep(ms) }
    }

    fn find_window(&self, class: Option<&str>, title: Option<&str>) -> Hwnd {
        let (class, title) = (opt_wide(class), opt_wide(title));
        from_hwnd(unsafe { FindWindowW(wide_ptr(&class), wide_ptr(&title)) })
    }

    fn find_window_ex(&self, parent: Hwnd, after: Hwnd, class: Option<&str>, title: Option<&str>) -> Hwnd {
        let (class, title) = (opt_wide(class), opt_wide(title));
        from_hwnd(unsafe { FindWindowExW(hwnd(parent), hwnd(after), wide_ptr(&class), wide_ptr(&title)) })
    }

    fn set_window_text(&self, h: Hwnd, text: &str) -> OsResult<()> {
        let text = to_wide(text);
        check_win32_bool(unsafe { SetWindowTextW(hwnd(h), text.as_ptr()) })
    }

    fn window_text(&self, h: Hwnd) -> OsResult<String> {
        unsafe { SetLastError(ERROR_SUCCESS) };
        let len = unsafe { GetWindowTextLengthW(hwnd(h)) }.max(0) as usize;
        let mut buf = vec![0u16; len.max(2047) + 1];
        let n = unsafe { GetWindowTextW(hwnd(h), buf.as_mut_ptr(), buf.len() as i32) };
        if n > 0 {
            return Ok(String::from_utf16_lossy(&buf[..n as usize]));
        }
        match unsafe { GetLastError() } {
            ERROR_SUCCESS => Ok(String::new()),
            code => Err(OsError(code)),
        }
    }

    fn window_rect(&self, h: Hwnd) -> OsResult<Rect> {
        let mut r: RECT = unsafe { zeroed() };
        check_win32_bool(unsafe { GetWindowRect(hwnd(h), &mut r) })?;
        Ok(Rect { left: r.left, top: r.top, right: r.right, bottom: r.bottom })
    }

    fn set_focus(&self, h: Hwnd) -> Hwnd {
        from_hwnd(unsafe { SetFocus(hwnd(h)) })
    }

    fn set_foreground_window(&self, h: Hwnd) -> bool {
        unsafe { SetForegroundWindow(hwnd(h)) != 0 }
    }

    fn set_topmost(&self, h: Hwnd) -> OsResult<()> {
        check_win32_bool(unsafe { SetWindowPos(hwnd(h), HWND_TOPMOST, 0, 0, 0, 0, SWP_NOMOVE | SWP_NOSIZE) })
    }

    fn close_window(&self, h: Hwnd) -> OsResult<()> {
        check_win32_bool(unsafe { CloseWindow(hwnd(h)) })
    }

    fn is_window_visible(&self, h: Hwnd) -> bool {
        unsafe { IsWindowVisible(hwnd(h)) != 0 }
    }

    fn window_thread_process_id(&self, h: Hwnd) -> (u32, u32) {
        let mut pid = 0;
        let tid = unsafe { GetWindowThreadProcessId(hwnd(h), &mut pid) };
        (tid, pid)
    }

    fn register_window_message(&self, name: &str) -> OsResult<u32> {
        let name = to_wide(name);
        match unsafe { RegisterWindowMessageW(name.as_ptr()) } {
            0 => Err(last_error()),
            id => Ok(id),
        }
    }

    fn post_message(&self, h: Hwnd, msg: u32, wparam: usize, lparam: isize) -> OsResult<()> {
        check_win32_bool(unsafe { PostMessageW(hwnd(h), msg, wparam, lparam) })
    }

    fn send_message(&self, h: Hwnd, msg: u32, wparam: usize, lparam: isize) -> isize {
        unsafe { SendMessageW(hwnd(h), msg, wparam, lparam) }
    }

    fn post_thread_message(&self, thread_id: u32, msg: u32, wparam: usize, lparam: isize) -> OsResult<()> {
        check_win32_bool(unsafe { PostThreadMessageW(thread_id, msg, wparam, lparam) })
    }

    fn get_message(&self, h: Hwnd, min: u32, max: u32) -> (i32, Option<Message>) {
        let mut m: MSG = unsafe { zeroed() };
        let rc = unsafe { GetMessageW(&mut m, hwnd(h), min, max) };
        (rc, (rc > 0).then(|| message(&m)))
    }

    fn peek_message(&self, h: Hwnd, min: u32, max: u32, remove: u32) -> Option<Message> {
        let mut m: MSG = unsafe { zeroed() };
        let found = unsafe { PeekMessageW(&mut m, hwnd(h), min, max, remove) };
        (found != 0).then(|| message(&m))
    }

    fn reply_message(&self, result: isize) -> bool {
        unsafe { ReplyMessage(result) != 0 }
    }

    fn dispatch_message(&self, msg: &Message) -> isize {
        let mut m: MSG = unsafe { zeroed() };
        m.hwnd = hwnd(msg.hwnd);
        m.message = msg.message;
        m.wParam = msg.wparam;
        m.lParam = msg.lparam;
        m.time = msg.time;
        m.pt.x = msg.pt.x;
        m.pt.y = msg.pt.y;
        unsafe { DispatchMessageW(&m) }
    }

    fn register_hotkey(&self, h: Hwnd, id: i32, modifiers: u32, vk: u32) -> OsResult<()> {
        check_win32_bool(unsafe { RegisterHotKey(hwnd(h), id, modifiers, vk) })
    }

    fn unregister_hotkey(&self, h: Hwnd, id: i32) -> OsResult<()> {
        check_win32_bool(unsafe { UnregisterHotKey(hwnd(h), id) })
    }

    fn tab_item_count(&self, h: Hwnd) -> i32 {
        self.send_message(h, TCM_GETITEMCOUNT, 0, 0) as i32
    }

    fn tab_cur_sel(&self, h: Hwnd) -> i32 {
        self.send_message(h, TCM_GETCURSEL, 0, 0) as i32
    }

    fn tab_cur_focus(&self, h: Hwnd) -> i32 {
        self.send_message(h, TCM_GETCURFOCUS, 0, 0) as i32
    }

    fn tab_set_cur_sel(&self, h: Hwnd, index: i32) -> i32 {
        self.send_message(h, TCM_SETCURSEL, index as usize, 0) as i32
    }

    fn tab_set_cur_focus(&self, h: Hwnd, index: i32) {
        self.send_message(h, TCM_SETCURFOCUS, index as usize, 0);
    }

    fn tab_item_text(&self, h: Hwnd, index: i32) -> Option<String> {
        let mut buf = [0u16; 256];
        let mut item = TcItemW {
            mask: TCIF_TEXT,
            state: 0,
            state_mask: 0,
            text: buf.as_mut_ptr(),
            text_max: buf.len() as i32,
            image: 0,
            lparam: 0,
        };
        let ok = self.send_message(h, TCM_GETITEMW, index as usize, &mut item as *mut TcItemW as isize);
        (ok != 0).then(|| from_wide(&buf))
    }

    fn close_handle(&self, h: KernelHandle) -> OsResult<()> {
        check_win32_bool(unsafe { CloseHandle(handle(h)) })
    }

    fn create_event(
        &self,
        security: &SecurityAttributes,
        manual_reset: bool,
        initial_state: bool,
        name: Option<&str>,
    ) -> OsResult<KernelHandle> {
        let sa = security_attributes(security);
        let name = opt_wide(name);
        kernel_handle(unsafe { CreateEventW(&sa, manual_reset as BOOL, initial_state as BOOL, wide_ptr(&name)) })
    }

    fn open_event(&self, access: u32, inherit: bool, name: &str) -> OsResult<KernelHandle> {
        let name = to_wide(name);
        kernel_handle(unsafe { OpenEventW(access, inherit as BOOL, name.as_ptr()) })
    }

    fn set_event(&self, h: KernelHandle) -> OsResult<()> {
        check_win32_bool(unsafe { SetEvent(handle(h)) })
    }

    fn reset_event(&self, h: KernelHandle) -> OsResult<()> {
        check_win32_bool(unsafe { ResetEvent(handle(h)) })
    }

    fn pulse_event(&self, h: KernelHandle) -> OsResult<()> {
        check_win32_bool(unsafe { PulseEvent(handle(h)) })
    }

    fn create_mutex(
        &self,
        security: &SecurityAttributes,
        initial_owner: bool,
        name: Option<&str>,
    ) -> OsResult<KernelHandle> {
        let sa = security_attributes(security);
        let name = opt_wide(name);
        kernel_handle(unsafe { CreateMutexW(&sa, initial_owner as BOOL, wide_ptr(&name)) })
    }

    fn open_mutex(&self, access: u32, inherit: bool, name: &str) -> OsResult<KernelHandle> {
        let name = to_wide(name);
        kernel_handle(unsafe { OpenMutexW(access, inherit as BOOL, name.as_ptr()) })
    }

    fn release_mutex(&self, h: KernelHandle) -> OsResult<()> {
        check_win32_bool(unsafe { ReleaseMutex(handle(h)) })
    }

    fn create_semaphore(
        &self,
        security: &SecurityAttributes,
        initial: i32,
        maximum: i32,
        name: Option<&str>,
    ) -> OsResult<KernelHandle> {
        let sa = security_attributes(security);
        let name = opt_wide(name);
        kernel_handle(unsafe { CreateSemaphoreW(&sa, initial, maximum, wide_ptr(&name)) })
    }

    fn open_semaphore(&self, access: u32, inherit: bool, name: &str) -> OsResult<KernelHandle> {
        let name = to_wide(name);
        kernel_handle(unsafe { OpenSemaphoreW(access, inherit as BOOL, name.as_ptr()) })
    }

    fn release_semaphore(&self, h: KernelHandle, count: i32) -> OsResult<i32> {
        let mut previous = 0;
        check_win32_bool(unsafe { ReleaseSemaphore(handle(h), count, &mut previous) })?;
        Ok(previous)
    }

    fn wait_for_single_object(&self, h: KernelHandle, timeout_ms: u32) -> u32 {
        unsafe { WaitForSingleObject(handle(h), timeout_ms) }
    }

    fn wait_for_multiple_objects(&self, handles: &[KernelHandle], wait_all: bool, timeout_ms: u32) -> u32 {
        let raw: Vec<HANDLE> = handles.iter().map(|&h| handle(h)).collect();
        unsafe { WaitForMultipleObjects(raw.len() as u32, raw.as_ptr(), wait_all as BOOL, timeout_ms) }
    }

    fn create_process(&self, request: &ProcessRequest<'_>) -> OsResult<ProcessInfo> {
        let application = opt_wide(request.application);
        // CreateProcessW may write into the command line buffer.
        let mut command_line = opt_wide(request.command_line);
        let directory = opt_wide(request.current_directory);
        let psa = security_attributes(&request.process_attributes);
        let tsa = security_attributes(&request.thread_attributes);
        let mut desktop = opt_wide(request.startup.desktop.as_deref());
        let mut title = opt_wide(request.startup.title.as_deref());
        let si = startup_info(&request.startup, &mut desktop, &mut title);
        let mut pi: PROCESS_INFORMATION = unsafe { zeroed() };
        check_win32_bool(unsafe {
            CreateProcessW(
                wide_ptr(&application),
                command_line.as_mut().map_or(null_mut(), |w| w.as_mut_ptr()),
                &psa,
                &tsa,
                request.inherit_handles as BOOL,
                request.creation_flags,
                null(),
                wide_ptr(&directory),
                &si,
                &mut pi,
            )
        })?;
        Ok(ProcessInfo {
            process: KernelHandle::from_raw(pi.hProcess as isize),
            thread: KernelHandle::from_raw(pi.hThread as isize),
            process_id: pi.dwProcessId,
            thread_id: pi.dwThreadId,
        })
    }

    fn open_process(&self, access: u32, inherit: bool, pid: u32) -> OsResult<KernelHandle> {
        kernel_handle(unsafe { OpenProcess(access, inherit as BOOL, pid) })
    }

    fn terminate_process(&self, h: KernelHandle, exit_code: u32) -> OsResult<()> {
        check_win32_bool(unsafe { TerminateProcess(handle(h), exit_code) })
    }

    fn exit_code_process(&self, h: KernelHandle) -> OsResult<u32> {
        let mut code = 0;
        check_win32_bool(unsafe { GetExitCodeProcess(handle(h), &mut code) })?;
        Ok(code)
    }

    fn temp_file_name(&self, dir: &str, prefix: &str, unique: u32) -> OsResult<(u32, String)> {
        let (dir, prefix) = (to_wide(dir), to_wide(prefix));
        let mut buf = vec![0u16; MAX_PATH + 1];
        match unsafe { GetTempFileNameW(dir.as_ptr(), prefix.as_ptr(), unique, buf.as_mut_ptr()) } {
            0 => Err(last_error()),
            n => Ok((n, from_wide(&buf))),
        }
    }

    fn temp_path(&self) -> OsResult<String> {
        sized_string(|len, buf| unsafe { GetTempPathW(len, buf) })
    }

    fn create_file(&self, request: &FileRequest<'_>) -> KernelHandle {
        let name = to_wide(request.name);
        let sa = security_attributes(&request.security);
        let h = unsafe {
            CreateFileW(
                name.as_ptr(),
                request.access,
                request.share_mode,
                &sa,
                request.disposition,
                request.flags_and_attributes,
                handle(request.template),
            )
        };
        KernelHandle::from_raw(h as isize)
    }

    fn read_file(&self, h: KernelHandle, len: u32) -> OsResult<Vec<u8>> {
        let mut buf = vec![0u8; len as usize];
        let mut read = 0;
        check_win32_bool(unsafe { ReadFile(handle(h), buf.as_mut_ptr(), len, &mut read, null_mut()) })?;
        buf.truncate(read as usize);
        Ok(buf)
    }

    fn write_file(&self, h: KernelHandle, data: &[u8]) -> OsResult<u32> {
        let mut written = 0;
        check_win32_bool(unsafe { WriteFile(handle(h), data.as_ptr(), data.len() as u32, &mut written, null_mut()) })?;
        Ok(written)
    }

    fn find_first_file(&self, pattern: &str) -> OsResult<(FindHandle, FindData)> {
        let pattern = to_wide(pattern);
        let mut data: WIN32_FIND_DATAW = unsafe { zeroed() };
        let h = unsafe { FindFirstFileW(pattern.as_ptr(), &mut data) };
        if h == INVALID_HANDLE_VALUE {
            return Err(last_error());
        }
        Ok((FindHandle::from_raw(h as isize), find_data(&data)))
    }

    fn find_next_file(&self, cursor: FindHandle) -> OsResult<FindData> {
        let mut data: WIN32_FIND_DATAW = unsafe { zeroed() };
        check_win32_bool(unsafe { FindNextFileW(cursor.as_raw() as HANDLE, &mut data) })?;
        Ok(find_data(&data))
    }

    fn find_close(&self, cursor: FindHandle) -> OsResult<()> {
        check_win32_bool(unsafe { FindClose(cursor.as_raw() as HANDLE) })
    }

    fn set_current_directory(&self, path: &str) -> OsResult<()> {
        let path = to_wide(path);
        check_win32_bool(unsafe { SetCurrentDirectoryW(path.as_ptr()) })
    }

    fn full_path_name(&self, path: &str) -> OsResult<String> {
        let path = to_wide(path);
        sized_string(|len, buf| unsafe { GetFullPathNameW(path.as_ptr(), len, buf, null_mut()) })
    }

    fn reg_open_key(&self, root: RegKey, subkey: &str, access: u32) -> OsResult<RegKey> {
        let subkey = to_wide(subkey);
        let mut key: HKEY = null_mut();
        check_status(unsafe { RegOpenKeyExW(hkey(root), subkey.as_ptr(), 0, access, &mut key) })?;
        Ok(RegKey::from_raw(key as isize))
    }

    fn reg_create_key(&self, root: RegKey, subkey: &str, access: u32) -> OsResult<RegKey> {
        let subkey = to_wide(subkey);
        let mut key: HKEY = null_mut();
        check_status(unsafe {
            RegCreateKeyExW(
                hkey(root),
                subkey.as_ptr(),
                0,
                null(),
                REG_OPTION_NON_VOLATILE,
                access,
                null(),
                &mut key,
                null_mut(),
            )
        })?;
        Ok(RegKey::from_raw(key as isize))
    }

    fn reg_close_key(&self, key: RegKey) -> OsResult<()> {
        check_status(unsafe { RegCloseKey(hkey(key)) })
    }

    fn reg_query_value(&self, key: RegKey, name: &str, buf: &mut [u8]) -> OsResult<RegRead> {
        let name = to_wide(name);
        let mut kind = 0;
        let mut len = buf.len() as u32;
        let rc = unsafe { RegQueryValueExW(hkey(key), name.as_ptr(), null(), &mut kind, buf.as_mut_ptr(), &mut len) };
        match rc {
            ERROR_SUCCESS => Ok(RegRead::Complete { kind, len: len as usize }),
            ERROR_MORE_DATA => Ok(RegRead::MoreData { kind, needed: len as usize }),
            code => Err(OsError(code)),
        }
    }

    fn reg_set_value(&self, key: RegKey, name: &str, kind: u32, data: &[u8]) -> OsResult<()> {
        let name = to_wide(name);
        check_status(unsafe { RegSetValueExW(hkey(key), name.as_ptr(), 0, kind, data.as_ptr(), data.len() as u32) })
    }

    fn reg_delete_value(&self, key: RegKey, name: &str) -> OsResult<()> {
        let name = to_wide(name);
        check_status(unsafe { RegDeleteValueW(hkey(key), name.as_ptr()) })
    }

    fn reg_delete_key(&self, root: RegKey, subkey: &str) -> OsResult<()> {
        let subkey = to_wide(subkey);
        check_status(unsafe { RegDeleteKeyW(hkey(root), subkey.as_ptr()) })
    }

    fn sh_delete_key(&self, root: RegKey, subkey: &str) -> OsResult<()> {
        let subkey = to_wide(subkey);
        check_status(unsafe { SHDeleteKeyW(hkey(root), subkey.as_ptr()) } as u32)
    }

    fn reg_enum_key(&self, key: RegKey, index: u32) -> OsResult<String> {
        let mut buf = vec![0u16; MAX_KEY_NAME];
        let mut len = buf.len() as u32;
        check_status(unsafe {
            RegEnumKeyExW(hkey(key), index, buf.as_mut_ptr(), &mut len, null(), null_mut(), null_mut(), null_mut())
        })?;
        Ok(String::from_utf16_lossy(&buf[..len as usize]))
    }

    fn reg_enum_value(&self, key: RegKey, index: u32) -> OsResult<String> {
        let mut buf = vec![0u16; MAX_VALUE_NAME];
        let mut len = buf.len() as u32;
        check_status(unsafe {
            RegEnumValueW(hkey(key), index, buf.as_mut_ptr(), &mut len, null(), null_mut(), null_mut(), null_mut())
        })?;
        Ok(String::from_utf16_lossy(&buf[..len as usize]))
    }

    fn open_sc_manager(&self) -> OsResult<ScHandle> {
        from_sc_handle(unsafe { OpenSCManagerW(null(), null(), SC_MANAGER_ALL_ACCESS) })
    }

    fn open_service(&self, manager: ScHandle, name: &str) -> OsResult<ScHandle> {
        let name = to_wide(name);
        from_sc_handle(unsafe { OpenServiceW(sc_handle(manager), name.as_ptr(), SERVICE_ALL_ACCESS) })
    }

    fn close_service_handle(&self, h: ScHandle) -> OsResult<()> {
        check_win32_bool(unsafe { CloseServiceHandle(sc_handle(h)) })
    }

    fn query_service_status(&self, h: ScHandle) -> OsResult<ServiceStatus> {
        let mut status: SERVICE_STATUS = unsafe { zeroed() };
        check_win32_bool(unsafe { QueryServiceStatus(sc_handle(h), &mut status) })?;
        Ok(service_status(&status))
    }

    fn query_service_config(&self, h: ScHandle) -> OsResult<ServiceConfig> {
        // u64 storage keeps the struct at the front suitably aligned.
        let mut storage = vec![0u64; 1024];
        let size = (storage.len() * size_of::<u64>()) as u32;
        let mut needed = 0;
        let config = storage.as_mut_ptr() as *mut QUERY_SERVICE_CONFIGW;
        check_win32_bool(unsafe { QueryServiceConfigW(sc_handle(h), config, size, &mut needed) })?;
        let c = unsafe { &*config };
        Ok(ServiceConfig {
            service_type: c.dwServiceType,
            start_type: c.dwStartType,
            error_control: c.dwErrorControl,
            binary_path_name: unsafe { from_wide_ptr(c.lpBinaryPathName) },
            display_name: unsafe { from_wide_ptr(c.lpDisplayName) },
        })
    }

    fn control_service(&self, h: ScHandle, control: u32) -> OsResult<ServiceStatus> {
        let mut status: SERVICE_STATUS = unsafe { zeroed() };
        check_win32_bool(unsafe { ControlService(sc_handle(h), control, &mut status) })?;
        Ok(service_status(&status))
    }

    fn delete_service(&self, h: ScHandle) -> OsResult<()> {
        check_win32_bool(unsafe { DeleteService(sc_handle(h)) })
    }

    fn start_service(&self, h: ScHandle) -> OsResult<()> {
        check_win32_bool(unsafe { StartServiceW(sc_handle(h), 0, null()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wide_strings_are_nul_terminated() {
        assert_eq!(to_wide(""), vec![0]);
        assert_eq!(to_wide("\u{1F600}"), vec![0xD83D, 0xDE00, 0]);
        assert_eq!(from_wide(&[b'h' as u16, b'i' as u16, 0, b'x' as u16]), "hi");
    }

    #[test]
    fn own_process_is_visible() {
        let native = Native;
        let pid = native.current_process_id();
        let h = native.open_process(crate::constants::SYNCHRONIZE, false, pid).unwrap();
        native.close_handle(h).unwrap();
    }
}
