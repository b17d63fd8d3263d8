//! Table-shaped records.
//!
//! Input records fill a native struct field by field: unknown keys are
//! ignored, missing keys keep the zero default and a known key holding the
//! wrong type is a marshaling error. Output records render native structs
//! with their Win32 field names.

use chrono::{Datelike, Timelike};
use w32_script::{Args, ScriptError, Table, TableKey, Variant};

use crate::handle::KernelHandle;
use crate::hotkey::HotkeyFault;
use crate::platform::{FileTime, FindData, SecurityAttributes, StartupInfo};

type Result<T> = std::result::Result<T, ScriptError>;

/// A native struct built from a record argument.
pub trait FromRecord: Sized + Default {
    fn read(fields: &Fields<'_>) -> Result<Self>;

    /// Read argument `i`; an absent or non-table argument yields the
    /// all-default struct.
    fn from_arg(args: &Args, i: usize) -> Result<Self> {
        match args.table(i) {
            Some(table) => Self::read(&Fields { args, index: i, table }),
            None => Ok(Self::default()),
        }
    }
}

/// Typed access to the fields of one record argument.
pub struct Fields<'a> {
    args: &'a Args,
    index: usize,
    table: &'a Table,
}

impl<'a> Fields<'a> {
    fn get(&self, name: &str) -> Option<&'a Variant> {
        self.table.field(name).filter(|v| !v.is_nil())
    }

    fn bad(&self, name: &str, expected: &'static str, got: &Variant) -> ScriptError {
        self.args.bad_field(self.index, &TableKey::from(name), expected, got)
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v.as_int().map(Some).ok_or_else(|| self.bad(name, "number", v)),
        }
    }

    pub fn dword(&self, name: &str) -> Result<u32> {
        Ok(self.int(name)?.unwrap_or(0) as u32)
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            None => Ok(false),
            Some(Variant::Bool(b)) => Ok(*b),
            Some(v) => v.as_int().map(|n| n != 0).ok_or_else(|| self.bad(name, "boolean", v)),
        }
    }

    pub fn string(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v.as_str().map(|s| Some(s.to_string())).ok_or_else(|| self.bad(name, "string", v)),
        }
    }

    pub fn handle(&self, name: &str) -> Result<KernelHandle> {
        Ok(KernelHandle::from_raw(self.int(name)?.unwrap_or(0) as isize))
    }
}

impl FromRecord for SecurityAttributes {
    fn read(fields: &Fields<'_>) -> Result<Self> {
        Ok(SecurityAttributes { inherit_handle: fields.flag("bInheritHandle")? })
    }
}

impl FromRecord for StartupInfo {
    fn read(fields: &Fields<'_>) -> Result<Self> {
        Ok(StartupInfo {
            desktop: fields.string("lpDesktop")?,
            title: fields.string("lpTitle")?,
            x: fields.dword("dwX")?,
            y: fields.dword("dwY")?,
            x_size: fields.dword("dwXSize")?,
            y_size: fields.dword("dwYSize")?,
            x_count_chars: fields.dword("dwXCountChars")?,
            y_count_chars: fields.dword("dwYCountChars")?,
            fill_attribute: fields.dword("dwFillAttribute")?,
            flags: fields.dword("dwFlags")?,
            show_window: fields.dword("wShowWindow")? as u16,
            std_input: fields.handle("hStdInput")?,
            std_output: fields.handle("hStdOutput")?,
            std_error: fields.handle("hStdError")?,
        })
    }
}

/// `FileTimeToSystemTime` as a table; nil when out of range.
pub fn system_time(ft: FileTime) -> Variant {
    let Some(dt) = ft.to_datetime() else {
        return Variant::Nil;
    };
    let mut t = Table::new();
    t.insert("Year", dt.year());
    t.insert("Month", dt.month());
    t.insert("DayOfWeek", dt.weekday().num_days_from_sunday());
    t.insert("Day", dt.day());
    t.insert("Hour", dt.hour());
    t.insert("Minute", dt.minute());
    t.insert("Second", dt.second());
    t.insert("Milliseconds", dt.nanosecond() / 1_000_000);
    Variant::Table(t)
}

pub fn find_data(data: &FindData) -> Variant {
    let mut t = Table::new();
    t.insert("FileAttributes", data.attributes);
    t.insert("CreationTime", system_time(data.creation_time));
    t.insert("LastAccessTime", system_time(data.last_access_time));
    t.insert("LastWriteTime", system_time(data.last_write_time));
    t.insert("FileSizeHigh", (data.file_size >> 32) as u32);
    t.insert("FileSizeLow", data.file_size as u32);
    t.insert("FileName", data.file_name.as_str());
    t.insert("AlternateFileName", data.alternate_file_name.as_str());
    Variant::Table(t)
}

pub fn hotkey_fault(fault: &HotkeyFault) -> Variant {
    let mut t = Table::new();
    t.insert("Id", fault.id);
    t.insert("Stage", fault.stage.as_str());
    t.insert("Code", fault.code);
    Variant::Table(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use w32_script::Param;

    const PARAMS: &[Param] = &[Param::record("lpStartupInfo")];

    fn args(v: Variant) -> Args {
        Args::check("CreateProcess", PARAMS, &[v]).unwrap()
    }

    #[test]
    fn startup_info_reads_known_fields() {
        let mut t = Table::new();
        t.insert("dwFlags", 0x101);
        t.insert("wShowWindow", 5);
        t.insert("lpTitle", "worker");
        t.insert("hStdOutput", -1);
        t.insert("ignored", "x");
        let si = StartupInfo::from_arg(&args(Variant::Table(t)), 0).unwrap();
        assert_eq!(si.flags, 0x101);
        assert_eq!(si.show_window, 5);
        assert_eq!(si.title.as_deref(), Some("worker"));
        assert_eq!(si.std_output, KernelHandle::INVALID);
        assert_eq!(si.x_size, 0);
    }

    #[test]
    fn non_table_record_is_all_defaults() {
        let sa = SecurityAttributes::from_arg(&args(Variant::Int(3)), 0).unwrap();
        assert_eq!(sa, SecurityAttributes::default());
    }

    #[test]
    fn wrong_field_type_is_an_error() {
        let mut t = Table::new();
        t.insert("dwX", "left");
        let err = StartupInfo::from_arg(&args(Variant::Table(t)), 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            ScriptError::BadField {
                func: "CreateProcess",
                index: 1,
                field: "dwX".to_string(),
                expected: "number",
                got: "string",
            }
            .to_string()
        );
    }

    #[test]
    fn filetime_decomposes_to_calendar_fields() {
        // 2024-02-29 13:45:30.250 UTC, a Thursday.
        let secs = 1_709_214_330u64;
        let ft = FileTime(FileTime::UNIX_EPOCH_OFFSET + secs * 10_000_000 + 2_500_000);
        let Variant::Table(t) = system_time(ft) else {
            panic!("expected a table");
        };
        let field = |k: &str| t.field(k).and_then(Variant::as_int).unwrap();
        assert_eq!(field("Year"), 2024);
        assert_eq!(field("Month"), 2);
        assert_eq!(field("Day"), 29);
        assert_eq!(field("DayOfWeek"), 4);
        assert_eq!(field("Hour"), 13);
        assert_eq!(field("Minute"), 45);
        assert_eq!(field("Second"), 30);
        assert_eq!(field("Milliseconds"), 250);
    }

    #[test]
    fn large_file_sizes_split_into_high_and_low() {
        let data = FindData { file_size: 0x1_0000_0010, file_name: "big.bin".into(), ..Default::default() };
        let Variant::Table(t) = find_data(&data) else {
            panic!("expected a table");
        };
        assert_eq!(t.field("FileSizeHigh"), Some(&Variant::Int(1)));
        assert_eq!(t.field("FileSizeLow"), Some(&Variant::Int(0x10)));
        assert_eq!(t.field("FileName"), Some(&Variant::from("big.bin")));
    }
}
