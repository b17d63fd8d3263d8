use w32_script::{Args, FunctionRegistry, Kind, Param, Result, Syscaller, Table, Variant};

use crate::constants::{ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, KEY_ENUMERATE_SUB_KEYS, KEY_QUERY_VALUE, KEY_READ, KEY_SET_VALUE};
use crate::error::{OsError, OsResult};
use crate::gateway::Host;
use crate::handle::RegKey;
use crate::marshal::{regval, Completion, Policy};
use crate::platform::{RegRead, Win32};

use super::{boolean, check, logged, or_nil, BindingSpec};

/// Read into a 4-byte buffer first; on `MoreData` grow to the reported size
/// and read once more.
fn read_value(os: &dyn Win32, key: RegKey, name: &str) -> OsResult<Variant> {
    let mut buf = vec![0u8; 4];
    let (kind, len) = match os.reg_query_value(key, name, &mut buf)? {
        RegRead::Complete { kind, len } => (kind, len),
        RegRead::MoreData { needed, .. } => {
            buf.resize(needed, 0);
            match os.reg_query_value(key, name, &mut buf)? {
                RegRead::Complete { kind, len } => (kind, len),
                RegRead::MoreData { .. } => return Err(OsError(ERROR_MORE_DATA)),
            }
        }
    };
    Ok(regval::decode(kind, &buf[..len.min(buf.len())]))
}

/// Close a key this module opened. A failure is logged, never returned.
fn close_key(os: &dyn Win32, key: RegKey) -> bool {
    match os.reg_close_key(key) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("RegCloseKey({:#x}) failed: {e}", key.as_raw());
            false
        }
    }
}

/// Run `f` on `subkey` opened with `access`, closing it afterwards.
fn with_key<T>(os: &dyn Win32, root: RegKey, subkey: &str, access: u32, f: impl FnOnce(RegKey) -> OsResult<T>) -> OsResult<T> {
    let key = os.reg_open_key(root, subkey, access)?;
    let r = f(key);
    close_key(os, key);
    r
}

/// Collect names until the cursor reports `ERROR_NO_MORE_ITEMS`.
fn collect_names(mut next: impl FnMut(u32) -> OsResult<String>) -> OsResult<Table> {
    let mut names = Table::new();
    for index in 0.. {
        match next(index) {
            Ok(name) => names.push(name),
            Err(OsError(ERROR_NO_MORE_ITEMS)) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(names)
}

const KEY_VALUE: &[Param] = &[Param::handle("hKey"), Param::str("lpSubKey"), Param::opt_str("lpValueName")];
const KEY_ONLY: &[Param] = &[Param::handle("hKey"), Param::str("lpSubKey")];

/// `RegQueryValueEx`: the decoded value, or nil when the key or value is
/// missing.
struct RegQueryValueEx;

impl Syscaller<Host> for RegQueryValueEx {
    fn call(&self, host: &Host, values: &[Variant]) -> Result<Vec<Variant>> {
        let args = check("RegQueryValueEx", KEY_VALUE, values)?;
        let name = args.opt_string(2)?.unwrap_or("");
        let r = with_key(host.os(), args.handle(0)?, args.string(1)?, KEY_QUERY_VALUE, |key| {
            read_value(host.os(), key, name)
        });
        Ok(vec![logged(&args, r).unwrap_or(Variant::Nil)])
    }

    fn params(&self) -> &[Param] {
        KEY_VALUE
    }
}

#[derive(Clone, Copy)]
enum Listing {
    Keys,
    Values,
}

/// `RegEnumKeyEx` / `RegEnumValue`: every subkey or value name of a key as
/// a list, nil when the key cannot be opened.
struct RegEnum {
    name: &'static str,
    listing: Listing,
}

impl Syscaller<Host> for RegEnum {
    fn call(&self, host: &Host, values: &[Variant]) -> Result<Vec<Variant>> {
        let args = check(self.name, KEY_ONLY, values)?;
        let os = host.os();
        let access = match self.listing {
            Listing::Keys => KEY_ENUMERATE_SUB_KEYS,
            Listing::Values => KEY_QUERY_VALUE,
        };
        let r = with_key(os, args.handle(0)?, args.string(1)?, access, |key| match self.listing {
            Listing::Keys => collect_names(|i| os.reg_enum_key(key, i)),
            Listing::Values => collect_names(|i| os.reg_enum_value(key, i)),
        });
        Ok(vec![logged(&args, r).map(Variant::Table).unwrap_or(Variant::Nil)])
    }

    fn params(&self) -> &[Param] {
        KEY_ONLY
    }
}

pub(super) fn register(registry: &mut FunctionRegistry<Host>) {
    registry.register("RegQueryValueEx", RegQueryValueEx);
    registry.register("RegEnumKeyEx", RegEnum { name: "RegEnumKeyEx", listing: Listing::Keys });
    registry.register("RegEnumValue", RegEnum { name: "RegEnumValue", listing: Listing::Values });
}

fn reg_set_value_ex(host: &Host, args: &Args) -> Result<Completion> {
    let os = host.os();
    let Some((kind, data)) = regval::encode(args.value(3), args.opt_int(4)?.map(|k| k as u32)) else {
        log::debug!("RegSetValueEx: cannot store a {}", args.value(3).type_name());
        return Ok(Completion::value(false));
    };
    let name = args.opt_string(2)?.unwrap_or("");
    let r = os.reg_create_key(args.handle(0)?, args.string(1)?, KEY_SET_VALUE).and_then(|key| {
        let r = os.reg_set_value(key, name, kind, &data);
        close_key(os, key);
        r
    });
    Ok(boolean(args, r))
}

fn reg_delete_value(host: &Host, args: &Args) -> Result<Completion> {
    let name = args.opt_string(2)?.unwrap_or("");
    let r = with_key(host.os(), args.handle(0)?, args.string(1)?, KEY_SET_VALUE, |key| {
        host.os().reg_delete_value(key, name)
    });
    Ok(boolean(args, r))
}

fn reg_delete_key(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().reg_delete_key(args.handle(0)?, args.string(1)?)))
}

fn sh_delete_key(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().sh_delete_key(args.handle(0)?, args.string(1)?)))
}

fn reg_open_key_ex(host: &Host, args: &Args) -> Result<Completion> {
    Ok(or_nil(args, host.os().reg_open_key(args.handle(0)?, args.string(1)?, args.dword(2)?)))
}

/// Past the last entry is the expected end of a walk, not worth a log line.
fn cursor_name(r: OsResult<String>) -> Completion {
    Completion::value(r.ok())
}

fn reg_enum_key_at(host: &Host, args: &Args) -> Result<Completion> {
    Ok(cursor_name(host.os().reg_enum_key(args.handle(0)?, args.dword(1)?)))
}

fn reg_enum_value_at(host: &Host, args: &Args) -> Result<Completion> {
    Ok(cursor_name(host.os().reg_enum_value(args.handle(0)?, args.dword(1)?)))
}

fn reg_close_key(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().reg_close_key(args.handle(0)?)))
}

const CURSOR: &[Param] = &[Param::handle("hKey"), Param::int("dwIndex")];

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec {
        name: "RegSetValueEx",
        group: "Registry",
        params: &[
            Param::handle("hKey"),
            Param::str("lpSubKey"),
            Param::opt_str("lpValueName"),
            Param::value("lpData"),
            Param::opt("dwType", Kind::Int),
        ],
        policy: Policy::Direct,
        handler: reg_set_value_ex,
    },
    BindingSpec {
        name: "RegDeleteValue",
        group: "Registry",
        params: KEY_VALUE,
        policy: Policy::Direct,
        handler: reg_delete_value,
    },
    BindingSpec { name: "RegDeleteKey", group: "Registry", params: KEY_ONLY, policy: Policy::Direct, handler: reg_delete_key },
    BindingSpec { name: "SHDeleteKey", group: "Registry", params: KEY_ONLY, policy: Policy::Direct, handler: sh_delete_key },
    BindingSpec {
        name: "RegOpenKeyEx",
        group: "Registry",
        params: &[Param::handle("hKey"), Param::str("lpSubKey"), Param::opt_int("samDesired", KEY_READ as i64)],
        policy: Policy::Direct,
        handler: reg_open_key_ex,
    },
    BindingSpec { name: "RegEnumKeyAt", group: "Registry", params: CURSOR, policy: Policy::Direct, handler: reg_enum_key_at },
    BindingSpec {
        name: "RegEnumValueAt",
        group: "Registry",
        params: CURSOR,
        policy: Policy::Direct,
        handler: reg_enum_value_at,
    },
    BindingSpec {
        name: "RegCloseKey",
        group: "Registry",
        params: &[Param::handle("hKey")],
        policy: Policy::Direct,
        handler: reg_close_key,
    },
];
