use w32_script::{Args, Param, Result, Variant};

use crate::error::OsResult;
use crate::gateway::Host;
use crate::handle::FindHandle;
use crate::marshal::record::{self, FromRecord};
use crate::marshal::{Completion, Policy};
use crate::platform::{FileRequest, SecurityAttributes};

use super::{boolean, logged, BindingSpec};

/// Length in `WCHAR`s, as the wide API reports it.
fn wide_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Status is the path length, zero on failure.
fn sized_path(args: &Args, r: OsResult<String>) -> Completion {
    match logged(args, r) {
        Ok(path) => Completion::Status { status: wide_len(&path).into(), ok: true, payload: vec![path.into()], error: None },
        Err(e) => Completion::Status { status: Variant::Int(0), ok: false, payload: Vec::new(), error: Some(e.code()) },
    }
}

fn get_temp_file_name(host: &Host, args: &Args) -> Result<Completion> {
    let r = host.os().temp_file_name(args.string(0)?, args.string(1)?, args.dword(2)?);
    Ok(match logged(args, r) {
        Ok((unique, name)) => Completion::Status { status: unique.into(), ok: true, payload: vec![name.into()], error: None },
        Err(_) => Completion::Status { status: Variant::Int(0), ok: false, payload: Vec::new(), error: None },
    })
}

fn get_temp_path(host: &Host, args: &Args) -> Result<Completion> {
    Ok(sized_path(args, host.os().temp_path()))
}

fn create_file(host: &Host, args: &Args) -> Result<Completion> {
    let request = FileRequest {
        name: args.string(0)?,
        access: args.dword(1)?,
        share_mode: args.dword(2)?,
        security: SecurityAttributes::from_arg(args, 3)?,
        disposition: args.dword(4)?,
        flags_and_attributes: args.dword(5)?,
        template: args.handle(6)?,
    };
    let handle = host.os().create_file(&request);
    if handle.is_invalid() {
        log::debug!("CreateFile({}) failed: win32 error {}", request.name, host.os().last_error());
    }
    Ok(Completion::value(handle))
}

fn read_file(host: &Host, args: &Args) -> Result<Completion> {
    let r = logged(args, host.os().read_file(args.handle(0)?, args.dword(1)?));
    Ok(match r {
        Ok(data) => Completion::flag(true, vec![Variant::Bytes(data)]),
        Err(_) => Completion::flag(false, Vec::new()),
    })
}

fn write_file(host: &Host, args: &Args) -> Result<Completion> {
    let r = logged(args, host.os().write_file(args.handle(0)?, args.bytes(1)?));
    Ok(match r {
        Ok(written) => Completion::flag(true, vec![written.into()]),
        Err(_) => Completion::flag(false, Vec::new()),
    })
}

fn find_first_file(host: &Host, args: &Args) -> Result<Completion> {
    Ok(match logged(args, host.os().find_first_file(args.string(0)?)) {
        Ok((cursor, data)) => {
            Completion::Status { status: cursor.into(), ok: true, payload: vec![record::find_data(&data)], error: None }
        }
        Err(_) => Completion::Status { status: FindHandle::NULL.into(), ok: false, payload: Vec::new(), error: None },
    })
}

fn find_next_file(host: &Host, args: &Args) -> Result<Completion> {
    // Running off the end is the normal way out of a listing.
    Ok(match host.os().find_next_file(args.handle(0)?) {
        Ok(data) => Completion::flag(true, vec![record::find_data(&data)]),
        Err(_) => Completion::flag(false, Vec::new()),
    })
}

fn find_close(host: &Host, args: &Args) -> Result<Completion> {
    Ok(boolean(args, host.os().find_close(args.handle(0)?)))
}

fn set_current_directory(host: &Host, args: &Args) -> Result<Completion> {
    let r = logged(args, host.os().set_current_directory(args.string(0)?));
    Ok(Completion::flag(r.is_ok(), Vec::new()).with_error(r.err().map(|e| e.code())))
}

fn get_full_path_name(host: &Host, args: &Args) -> Result<Completion> {
    Ok(sized_path(args, host.os().full_path_name(args.string(0)?)))
}

pub(super) const SPECS: &[BindingSpec] = &[
    BindingSpec {
        name: "GetTempFileName",
        group: "File",
        params: &[Param::str("lpPathName"), Param::str("lpPrefixString"), Param::int("uUnique")],
        policy: Policy::Gated { slots: 1 },
        handler: get_temp_file_name,
    },
    BindingSpec {
        name: "GetTempPath",
        group: "File",
        params: &[],
        policy: Policy::Gated { slots: 1 },
        handler: get_temp_path,
    },
    BindingSpec {
        name: "CreateFile",
        group: "File",
        params: &[
            Param::str("lpFileName"),
            Param::int("dwDesiredAccess"),
            Param::int("dwShareMode"),
            Param::record("lpSecurityAttributes"),
            Param::int("dwCreationDisposition"),
            Param::int("dwFlagsAndAttributes"),
            Param::opt_handle("hTemplateFile"),
        ],
        policy: Policy::Direct,
        handler: create_file,
    },
    BindingSpec {
        name: "ReadFile",
        group: "File",
        params: &[Param::handle("hFile"), Param::int("nNumberOfBytesToRead")],
        policy: Policy::Gated { slots: 1 },
        handler: read_file,
    },
    BindingSpec {
        name: "WriteFile",
        group: "File",
        params: &[Param::handle("hFile"), Param::bytes("lpBuffer")],
        policy: Policy::Gated { slots: 1 },
        handler: write_file,
    },
    BindingSpec {
        name: "FindFirstFile",
        group: "File",
        params: &[Param::str("lpFileName")],
        policy: Policy::Gated { slots: 1 },
        handler: find_first_file,
    },
    BindingSpec {
        name: "FindNextFile",
        group: "File",
        params: &[Param::handle("hFindFile")],
        policy: Policy::Gated { slots: 1 },
        handler: find_next_file,
    },
    BindingSpec {
        name: "FindClose",
        group: "File",
        params: &[Param::handle("hFindFile")],
        policy: Policy::Direct,
        handler: find_close,
    },
    BindingSpec {
        name: "SetCurrentDirectory",
        group: "File",
        params: &[Param::str("lpPathName")],
        policy: Policy::GatedWithError { slots: 0 },
        handler: set_current_directory,
    },
    BindingSpec {
        name: "GetFullPathName",
        group: "File",
        params: &[Param::str("lpFileName")],
        policy: Policy::GatedWithError { slots: 1 },
        handler: get_full_path_name,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OsError;
    use pretty_assertions::assert_eq;

    #[test]
    fn path_length_counts_utf16_units() {
        assert_eq!(wide_len("C:\\tmp\\"), 7);
        assert_eq!(wide_len("\u{1F600}"), 2);
    }

    #[test]
    fn failed_path_carries_error_code() {
        let args = Args::raw("GetFullPathName", vec![]);
        let out = Policy::GatedWithError { slots: 1 }.apply(sized_path(&args, Err(OsError(123))));
        assert_eq!(out, vec![Variant::Int(0), Variant::Nil, Variant::Int(123)]);
        let out = Policy::GatedWithError { slots: 1 }.apply(sized_path(&args, Ok("C:\\a".into())));
        assert_eq!(out, vec![Variant::Int(4), Variant::from("C:\\a"), Variant::Nil]);
    }
}
