//! Symbolic constants exported to scripts.
//!
//! Values are the fixed Win32 ABI numbers, so the table is identical on every
//! target. Predefined registry roots and `INVALID_HANDLE_VALUE` are
//! pointer-sized and stored sign-extended.

use std::collections::HashMap;

use lazy_static::lazy_static;
use w32_script::{Table, Variant};

macro_rules! constants {
    ($($name:ident: $ty:ty = $value:expr;)*) => {
        $(pub const $name: $ty = $value;)*

        const EXPORTED: &[(&str, i64)] = &[$((stringify!($name), $name as i64)),*];
    };
}

constants! {
    TRUE: i32 = 1;
    FALSE: i32 = 0;
    INVALID_HANDLE_VALUE: isize = -1;
    INFINITE: u32 = 0xFFFF_FFFF;

    EVENT_ALL_ACCESS: u32 = 0x001F_0003;
    EVENT_MODIFY_STATE: u32 = 0x0002;
    SYNCHRONIZE: u32 = 0x0010_0000;
    MUTEX_ALL_ACCESS: u32 = 0x001F_0001;
    SEMAPHORE_ALL_ACCESS: u32 = 0x001F_0003;
    SEMAPHORE_MODIFY_STATE: u32 = 0x0002;

    WAIT_OBJECT_0: u32 = 0;
    WAIT_ABANDONED: u32 = 0x80;
    WAIT_ABANDONED_0: u32 = 0x80;
    WAIT_TIMEOUT: u32 = 0x102;
    WAIT_FAILED: u32 = 0xFFFF_FFFF;

    CREATE_DEFAULT_ERROR_MODE: u32 = 0x0400_0000;
    CREATE_NEW_CONSOLE: u32 = 0x10;
    CREATE_NEW_PROCESS_GROUP: u32 = 0x200;
    CREATE_SUSPENDED: u32 = 0x4;
    CREATE_UNICODE_ENVIRONMENT: u32 = 0x400;
    DETACHED_PROCESS: u32 = 0x8;
    HIGH_PRIORITY_CLASS: u32 = 0x80;
    IDLE_PRIORITY_CLASS: u32 = 0x40;
    NORMAL_PRIORITY_CLASS: u32 = 0x20;
    REALTIME_PRIORITY_CLASS: u32 = 0x100;

    FOREGROUND_BLUE: u32 = 0x01;
    FOREGROUND_GREEN: u32 = 0x02;
    FOREGROUND_RED: u32 = 0x04;
    FOREGROUND_INTENSITY: u32 = 0x08;
    BACKGROUND_BLUE: u32 = 0x10;
    BACKGROUND_GREEN: u32 = 0x20;
    BACKGROUND_RED: u32 = 0x40;
    BACKGROUND_INTENSITY: u32 = 0x80;

    STARTF_FORCEONFEEDBACK: u32 = 0x40;
    STARTF_FORCEOFFFEEDBACK: u32 = 0x80;
    STARTF_RUNFULLSCREEN: u32 = 0x20;
    STARTF_USECOUNTCHARS: u32 = 0x08;
    STARTF_USEFILLATTRIBUTE: u32 = 0x10;
    STARTF_USEPOSITION: u32 = 0x04;
    STARTF_USESHOWWINDOW: u32 = 0x01;
    STARTF_USESIZE: u32 = 0x02;
    STARTF_USESTDHANDLES: u32 = 0x100;

    SW_HIDE: u32 = 0;
    SW_MAXIMIZE: u32 = 3;
    SW_MINIMIZE: u32 = 6;
    SW_RESTORE: u32 = 9;
    SW_SHOW: u32 = 5;
    SW_SHOWDEFAULT: u32 = 10;
    SW_SHOWMAXIMIZED: u32 = 3;
    SW_SHOWMINIMIZED: u32 = 2;
    SW_SHOWMINNOACTIVE: u32 = 7;
    SW_SHOWNA: u32 = 8;
    SW_SHOWNOACTIVATE: u32 = 4;
    SW_SHOWNORMAL: u32 = 1;

    GENERIC_READ: u32 = 0x8000_0000;
    GENERIC_WRITE: u32 = 0x4000_0000;
    GENERIC_EXECUTE: u32 = 0x2000_0000;
    GENERIC_ALL: u32 = 0x1000_0000;
    MAXIMUM_ALLOWED: u32 = 0x0200_0000;
    FILE_SHARE_READ: u32 = 0x1;
    FILE_SHARE_WRITE: u32 = 0x2;
    FILE_SHARE_DELETE: u32 = 0x4;

    CREATE_NEW: u32 = 1;
    CREATE_ALWAYS: u32 = 2;
    OPEN_EXISTING: u32 = 3;
    OPEN_ALWAYS: u32 = 4;
    TRUNCATE_EXISTING: u32 = 5;

    FILE_ATTRIBUTE_READONLY: u32 = 0x1;
    FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;
    FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;
    FILE_ATTRIBUTE_ARCHIVE: u32 = 0x20;
    FILE_ATTRIBUTE_NORMAL: u32 = 0x80;
    FILE_ATTRIBUTE_TEMPORARY: u32 = 0x100;
    FILE_ATTRIBUTE_OFFLINE: u32 = 0x1000;
    FILE_ATTRIBUTE_NOT_CONTENT_INDEXED: u32 = 0x2000;
    FILE_ATTRIBUTE_ENCRYPTED: u32 = 0x4000;

    FILE_FLAG_WRITE_THROUGH: u32 = 0x8000_0000;
    FILE_FLAG_OVERLAPPED: u32 = 0x4000_0000;
    FILE_FLAG_NO_BUFFERING: u32 = 0x2000_0000;
    FILE_FLAG_RANDOM_ACCESS: u32 = 0x1000_0000;
    FILE_FLAG_SEQUENTIAL_SCAN: u32 = 0x0800_0000;
    FILE_FLAG_DELETE_ON_CLOSE: u32 = 0x0400_0000;
    FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;
    FILE_FLAG_POSIX_SEMANTICS: u32 = 0x0100_0000;
    FILE_FLAG_OPEN_REPARSE_POINT: u32 = 0x0020_0000;
    FILE_FLAG_OPEN_NO_RECALL: u32 = 0x0010_0000;

    SECURITY_ANONYMOUS: u32 = 0;
    SECURITY_IDENTIFICATION: u32 = 0x0001_0000;
    SECURITY_IMPERSONATION: u32 = 0x0002_0000;
    SECURITY_DELEGATION: u32 = 0x0003_0000;
    SECURITY_CONTEXT_TRACKING: u32 = 0x0004_0000;
    SECURITY_EFFECTIVE_ONLY: u32 = 0x0008_0000;

    PM_NOREMOVE: u32 = 0;
    PM_REMOVE: u32 = 1;

    HKEY_CLASSES_ROOT: isize = 0x8000_0000u32 as i32 as isize;
    HKEY_CURRENT_USER: isize = 0x8000_0001u32 as i32 as isize;
    HKEY_LOCAL_MACHINE: isize = 0x8000_0002u32 as i32 as isize;
    HKEY_USERS: isize = 0x8000_0003u32 as i32 as isize;
    HKEY_CURRENT_CONFIG: isize = 0x8000_0005u32 as i32 as isize;

    REG_NONE: u32 = 0;
    REG_SZ: u32 = 1;
    REG_EXPAND_SZ: u32 = 2;
    REG_BINARY: u32 = 3;
    REG_DWORD: u32 = 4;
    REG_DWORD_BIG_ENDIAN: u32 = 5;
    REG_MULTI_SZ: u32 = 7;

    KEY_QUERY_VALUE: u32 = 0x0001;
    KEY_SET_VALUE: u32 = 0x0002;
    KEY_CREATE_SUB_KEY: u32 = 0x0004;
    KEY_ENUMERATE_SUB_KEYS: u32 = 0x0008;
    KEY_READ: u32 = 0x0002_0019;
    KEY_WRITE: u32 = 0x0002_0006;
    KEY_ALL_ACCESS: u32 = 0x000F_003F;

    CSIDL_STARTUP: u32 = 0x07;
    CSIDL_STARTMENU: u32 = 0x0B;
    CSIDL_COMMON_STARTMENU: u32 = 0x16;
    CSIDL_COMMON_PROGRAMS: u32 = 0x17;
    CSIDL_COMMON_STARTUP: u32 = 0x18;
    CSIDL_PROGRAM_FILES: u32 = 0x26;

    SERVICE_CONTROL_STOP: u32 = 1;
    SERVICE_CONTROL_PAUSE: u32 = 2;
    SERVICE_CONTROL_CONTINUE: u32 = 3;
    SERVICE_CONTROL_INTERROGATE: u32 = 4;
    SERVICE_CONTROL_SHUTDOWN: u32 = 5;

    SERVICE_STOPPED: u32 = 1;
    SERVICE_START_PENDING: u32 = 2;
    SERVICE_STOP_PENDING: u32 = 3;
    SERVICE_RUNNING: u32 = 4;
    SERVICE_CONTINUE_PENDING: u32 = 5;
    SERVICE_PAUSE_PENDING: u32 = 6;
    SERVICE_PAUSED: u32 = 7;

    SERVICE_BOOT_START: u32 = 0;
    SERVICE_SYSTEM_START: u32 = 1;
    SERVICE_AUTO_START: u32 = 2;
    SERVICE_DEMAND_START: u32 = 3;
    SERVICE_DISABLED: u32 = 4;

    SERVICE_WIN32_OWN_PROCESS: u32 = 0x10;
    SERVICE_ERROR_NORMAL: u32 = 1;

    PROCESS_TERMINATE: u32 = 0x0001;
    PROCESS_QUERY_INFORMATION: u32 = 0x0400;
    PROCESS_ALL_ACCESS: u32 = 0x001F_FFFF;
    STILL_ACTIVE: u32 = 259;

    MB_OK: u32 = 0x00;
    MB_ICONHAND: u32 = 0x10;
    MB_ICONERROR: u32 = 0x10;
    MB_ICONSTOP: u32 = 0x10;
    MB_ICONQUESTION: u32 = 0x20;
    MB_ICONEXCLAMATION: u32 = 0x30;
    MB_ICONWARNING: u32 = 0x30;
    MB_ICONASTERISK: u32 = 0x40;
    MB_ICONINFORMATION: u32 = 0x40;

    BM_CLICK: u32 = 0x00F5;
    CB_GETCOUNT: u32 = 0x0146;
    CB_GETCURSEL: u32 = 0x0147;
    CB_SETCURSEL: u32 = 0x014E;

    WM_CLOSE: u32 = 0x0010;
    WM_QUIT: u32 = 0x0012;
    WM_COMMAND: u32 = 0x0111;
    WM_SYSCOMMAND: u32 = 0x0112;
    WM_HOTKEY: u32 = 0x0312;
    WM_USER: u32 = 0x0400;

    MOD_ALT: u32 = 0x1;
    MOD_CONTROL: u32 = 0x2;
    MOD_SHIFT: u32 = 0x4;
    MOD_WIN: u32 = 0x8;
    MOD_NOREPEAT: u32 = 0x4000;

    ERROR_SUCCESS: u32 = 0;
    ERROR_FILE_NOT_FOUND: u32 = 2;
    ERROR_PATH_NOT_FOUND: u32 = 3;
    ERROR_ACCESS_DENIED: u32 = 5;
    ERROR_INVALID_HANDLE: u32 = 6;
    ERROR_NO_MORE_FILES: u32 = 18;
    ERROR_FILE_EXISTS: u32 = 80;
    ERROR_INVALID_PARAMETER: u32 = 87;
    ERROR_INVALID_NAME: u32 = 123;
    ERROR_ALREADY_EXISTS: u32 = 183;
    ERROR_MORE_DATA: u32 = 234;
    ERROR_NO_MORE_ITEMS: u32 = 259;
    ERROR_DIRECTORY: u32 = 267;
    ERROR_NOT_OWNER: u32 = 288;
    ERROR_TOO_MANY_POSTS: u32 = 298;
    ERROR_SERVICE_ALREADY_RUNNING: u32 = 1056;
    ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;
    ERROR_SERVICE_CANNOT_ACCEPT_CTRL: u32 = 1061;
    ERROR_SERVICE_NOT_ACTIVE: u32 = 1062;
    ERROR_SERVICE_MARKED_FOR_DELETE: u32 = 1072;
    ERROR_INVALID_WINDOW_HANDLE: u32 = 1400;
    ERROR_HOTKEY_ALREADY_REGISTERED: u32 = 1409;
    ERROR_HOTKEY_NOT_REGISTERED: u32 = 1419;
    ERROR_INVALID_THREAD_ID: u32 = 1444;
}

// Tab control messages; used by the native backend, not exported.
pub const TCM_FIRST: u32 = 0x1300;
pub const TCM_GETITEMCOUNT: u32 = TCM_FIRST + 4;
pub const TCM_GETCURSEL: u32 = TCM_FIRST + 11;
pub const TCM_SETCURSEL: u32 = TCM_FIRST + 12;
pub const TCM_GETCURFOCUS: u32 = TCM_FIRST + 47;
pub const TCM_SETCURFOCUS: u32 = TCM_FIRST + 48;
pub const TCM_GETITEMW: u32 = TCM_FIRST + 60;

/// Upper bound on handles passed to a multi-object wait.
pub const MAXIMUM_WAIT_OBJECTS: usize = 64;

lazy_static! {
    static ref CONSTANTS: HashMap<&'static str, i64> = EXPORTED.iter().copied().collect();
}

pub fn lookup(name: &str) -> Option<i64> {
    CONSTANTS.get(name).copied()
}

/// Every exported constant, in declaration order.
pub fn all() -> &'static [(&'static str, i64)] {
    EXPORTED
}

/// The constant set as a script table keyed by name.
pub fn as_table() -> Table {
    let mut table = Table::new();
    for (name, value) in EXPORTED {
        table.insert(*name, Variant::Int(*value));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn registry_roots_are_sign_extended() {
        assert_eq!(lookup("HKEY_LOCAL_MACHINE"), Some(-2147483646));
        assert_eq!(lookup("HKEY_CURRENT_USER").map(|v| v as u32), Some(0x8000_0001));
        assert_eq!(lookup("INVALID_HANDLE_VALUE"), Some(-1));
    }

    #[test]
    fn dword_constants_stay_unsigned() {
        assert_eq!(lookup("GENERIC_READ"), Some(0x8000_0000));
        assert_eq!(lookup("INFINITE"), Some(0xFFFF_FFFF));
        assert_eq!(lookup("CSIDL_PROGRAM_FILES"), Some(38));
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = all().iter().map(|(n, _)| *n).collect();
        assert_eq!(names.len(), all().len());
        assert_eq!(as_table().iter().count(), all().len());
    }

    #[test]
    fn unknown_names_are_absent() {
        assert_eq!(lookup("NOT_A_CONSTANT"), None);
    }
}
