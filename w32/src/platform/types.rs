use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime};

use crate::handle::{Hwnd, KernelHandle};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// A queued window or thread message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub hwnd: Hwnd,
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
    pub time: u32,
    pub pt: Point,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SecurityAttributes {
    pub inherit_handle: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StartupInfo {
    pub desktop: Option<String>,
    pub title: Option<String>,
    pub x: u32,
    pub y: u32,
    pub x_size: u32,
    pub y_size: u32,
    pub x_count_chars: u32,
    pub y_count_chars: u32,
    pub fill_attribute: u32,
    pub flags: u32,
    pub show_window: u16,
    pub std_input: KernelHandle,
    pub std_output: KernelHandle,
    pub std_error: KernelHandle,
}

#[derive(Clone, Debug, Default)]
pub struct ProcessRequest<'a> {
    pub application: Option<&'a str>,
    pub command_line: Option<&'a str>,
    pub process_attributes: SecurityAttributes,
    pub thread_attributes: SecurityAttributes,
    pub inherit_handles: bool,
    pub creation_flags: u32,
    pub current_directory: Option<&'a str>,
    pub startup: StartupInfo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessInfo {
    pub process: KernelHandle,
    pub thread: KernelHandle,
    pub process_id: u32,
    pub thread_id: u32,
}

#[derive(Clone, Debug)]
pub struct FileRequest<'a> {
    pub name: &'a str,
    pub access: u32,
    pub share_mode: u32,
    pub security: SecurityAttributes,
    pub disposition: u32,
    pub flags_and_attributes: u32,
    pub template: KernelHandle,
}

/// 100-nanosecond intervals since 1601-01-01 UTC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileTime(pub u64);

impl FileTime {
    /// Intervals between 1601-01-01 and 1970-01-01.
    pub const UNIX_EPOCH_OFFSET: u64 = 116_444_736_000_000_000;

    pub fn from_parts(low: u32, high: u32) -> Self {
        Self(((high as u64) << 32) | low as u64)
    }

    pub fn from_system_time(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self(Self::UNIX_EPOCH_OFFSET + (d.as_nanos() / 100) as u64),
            Err(e) => Self(Self::UNIX_EPOCH_OFFSET.saturating_sub((e.duration().as_nanos() / 100) as u64)),
        }
    }

    /// Calendar date and time in UTC.
    pub fn to_datetime(self) -> Option<NaiveDateTime> {
        let since_unix = self.0 as i128 - Self::UNIX_EPOCH_OFFSET as i128;
        let secs = since_unix.div_euclid(10_000_000) as i64;
        let nanos = (since_unix.rem_euclid(10_000_000) * 100) as u32;
        DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FindData {
    pub attributes: u32,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub file_size: u64,
    pub file_name: String,
    pub alternate_file_name: String,
}

/// Outcome of a value read into a caller-sized buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegRead {
    /// `len` bytes of data were copied.
    Complete { kind: u32, len: usize },
    /// The buffer was too small; `needed` bytes are required.
    MoreData { kind: u32, needed: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServiceStatus {
    pub service_type: u32,
    pub current_state: u32,
    pub controls_accepted: u32,
    pub win32_exit_code: u32,
    pub service_specific_exit_code: u32,
    pub check_point: u32,
    pub wait_hint: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    pub service_type: u32,
    pub start_type: u32,
    pub error_control: u32,
    pub binary_path_name: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;

    #[test]
    fn unix_epoch_maps_to_1970() {
        let dt = FileTime(FileTime::UNIX_EPOCH_OFFSET).to_datetime().unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (1970, 1, 1, 0));
    }

    #[test]
    fn system_time_round_trip_keeps_milliseconds() {
        let t = UNIX_EPOCH + std::time::Duration::from_millis(1_700_000_000_123);
        let dt = FileTime::from_system_time(t).to_datetime().unwrap();
        assert_eq!(dt.and_utc().timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn parts_combine_high_and_low() {
        assert_eq!(FileTime::from_parts(1, 2).0, (2u64 << 32) | 1);
    }
}
