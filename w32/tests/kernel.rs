use pretty_assertions::assert_eq;
use w32::constants::{
    CREATE_ALWAYS, ERROR_ALREADY_EXISTS, ERROR_FILE_NOT_FOUND, ERROR_INVALID_PARAMETER, GENERIC_READ, GENERIC_WRITE,
    INFINITE, OPEN_EXISTING, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use w32::{Gateway, Table, Variant};

fn int(v: &Variant) -> i64 {
    v.as_int().unwrap_or_else(|| panic!("expected a number, got {v:?}"))
}

fn call(gateway: &Gateway, name: &str, args: &[Variant]) -> Vec<Variant> {
    gateway.call(name, args).unwrap_or_else(|e| panic!("{name}: {e}"))
}

#[test]
fn manual_reset_event_stays_signaled_until_reset() {
    let (gateway, _emu) = Gateway::emulated();
    let event = call(&gateway, "CreateEvent", &[Variant::Nil, true.into(), false.into(), "w32-test-event".into()]);
    let event = event[0].clone();
    assert!(event.is_number());

    let wait = |ms: u32| int(&call(&gateway, "WaitForSingleObject", &[event.clone(), ms.into()])[0]) as u32;
    assert_eq!(wait(0), WAIT_TIMEOUT);
    assert_eq!(call(&gateway, "SetEvent", &[event.clone()]), vec![Variant::Int(1)]);
    assert_eq!(wait(0), WAIT_OBJECT_0);
    assert_eq!(wait(0), WAIT_OBJECT_0);
    assert_eq!(call(&gateway, "ResetEvent", &[event.clone()]), vec![Variant::Int(1)]);
    assert_eq!(wait(10), WAIT_TIMEOUT);

    let opened = call(&gateway, "OpenEvent", &[0.into(), false.into(), "w32-test-event".into()]);
    assert!(opened[0].is_number());
    call(&gateway, "SetEvent", &[opened[0].clone()]);
    assert_eq!(wait(0), WAIT_OBJECT_0);

    assert_eq!(call(&gateway, "CloseHandle", &[opened[0].clone()]), vec![Variant::Bool(true)]);
    assert_eq!(call(&gateway, "CloseHandle", &[event]), vec![Variant::Bool(true)]);
}

#[test]
fn named_object_reopen_sets_already_exists() {
    let (gateway, _emu) = Gateway::emulated();
    let first = call(&gateway, "CreateMutex", &[Variant::Nil, false.into(), "w32-test-mutex".into()]);
    assert!(first[0].is_number());
    let second = call(&gateway, "CreateMutex", &[Variant::Nil, false.into(), "w32-test-mutex".into()]);
    assert!(second[0].is_number());
    assert_eq!(call(&gateway, "GetLastError", &[]), vec![Variant::from(ERROR_ALREADY_EXISTS)]);

    let missing = call(&gateway, "OpenMutex", &[0.into(), false.into(), "w32-no-such-mutex".into()]);
    assert_eq!(missing, vec![Variant::Nil]);
}

#[test]
fn semaphore_release_reports_previous_count() {
    let (gateway, _emu) = Gateway::emulated();
    let sem = call(&gateway, "CreateSemaphore", &[Variant::Nil, 0.into(), 2.into()]);
    let sem = sem[0].clone();

    assert_eq!(call(&gateway, "ReleaseSemaphore", &[sem.clone(), 1.into()]), vec![Variant::Int(1), Variant::Int(0)]);
    assert_eq!(call(&gateway, "ReleaseSemaphore", &[sem.clone(), 1.into()]), vec![Variant::Int(1), Variant::Int(1)]);
    // Past the maximum.
    assert_eq!(call(&gateway, "ReleaseSemaphore", &[sem.clone(), 1.into()]), vec![Variant::Int(0), Variant::Nil]);

    let event = call(&gateway, "CreateEvent", &[Variant::Nil, false.into(), false.into()]);
    let handles: Table = [event[0].clone(), sem.clone()].into_iter().collect();
    let any = |handles: &Table| call(&gateway, "WaitForMultipleObjects", &[handles.clone().into(), false.into(), 0.into()]);
    assert_eq!(any(&handles), vec![Variant::from(WAIT_OBJECT_0 + 1)]);
    assert_eq!(any(&handles), vec![Variant::from(WAIT_OBJECT_0 + 1)]);
    assert_eq!(any(&handles), vec![Variant::from(WAIT_TIMEOUT)]);
}

#[test]
fn wait_all_rejects_a_repeated_object() {
    let (gateway, _emu) = Gateway::emulated();
    let sem = call(&gateway, "CreateSemaphore", &[Variant::Nil, 1.into(), 2.into()]);
    let sem = sem[0].clone();
    let twice: Table = [sem.clone(), sem.clone()].into_iter().collect();

    let all = call(&gateway, "WaitForMultipleObjects", &[twice.clone().into(), true.into(), 0.into()]);
    assert_eq!(all, vec![Variant::from(WAIT_FAILED)]);
    assert_eq!(call(&gateway, "GetLastError", &[]), vec![Variant::from(ERROR_INVALID_PARAMETER)]);
    // The count is untouched.
    assert_eq!(call(&gateway, "ReleaseSemaphore", &[sem.clone(), 1.into()]), vec![Variant::Int(1), Variant::Int(1)]);

    let any = call(&gateway, "WaitForMultipleObjects", &[twice.into(), false.into(), 0.into()]);
    assert_eq!(any, vec![Variant::from(WAIT_OBJECT_0)]);
}

#[test]
fn wait_list_must_hold_handles() {
    let (gateway, _emu) = Gateway::emulated();
    let list: Table = [Variant::from("nope")].into_iter().collect();
    let err = gateway.call("WaitForMultipleObjects", &[list.into(), false.into(), 0.into()]).unwrap_err();
    assert!(err.to_string().contains("WaitForMultipleObjects"), "{err}");
}

#[test]
fn own_process_is_running() {
    let (gateway, emu) = Gateway::emulated();
    let pid = call(&gateway, "GetCurrentProcessId", &[]);
    assert_eq!(pid, vec![Variant::from(std::process::id())]);
    let before = emu.open_handles();
    assert_eq!(call(&gateway, "IsRunning", &pid), vec![Variant::Bool(true)]);
    assert_eq!(call(&gateway, "IsRunning", &pid), vec![Variant::Bool(true)]);
    assert_eq!(emu.open_handles(), before);
    assert_eq!(call(&gateway, "OpenProcess", &[0.into(), false.into(), 0.into()]), vec![Variant::Nil]);
}

#[cfg(unix)]
#[test]
fn child_exit_code_is_reported_after_wait() {
    let (gateway, _emu) = Gateway::emulated();
    let r = call(
        &gateway,
        "CreateProcess",
        &[Variant::Nil, r#"sh -c "exit 3""#.into(), Variant::Nil, Variant::Nil, false.into(), 0.into(), Variant::Nil],
    );
    assert_eq!(r.len(), 5);
    assert_eq!(r[0], Variant::Int(1));
    let process = r[1].clone();

    let waited = call(&gateway, "WaitForSingleObject", &[process.clone(), INFINITE.into()]);
    assert_eq!(waited, vec![Variant::from(WAIT_OBJECT_0)]);
    assert_eq!(call(&gateway, "GetExitCodeProcess", &[process.clone()]), vec![Variant::Int(1), Variant::Int(3)]);
    // Already exited.
    assert_eq!(call(&gateway, "TerminateProcess", &[process.clone(), 1.into()]), vec![Variant::Int(0)]);
    call(&gateway, "CloseHandle", &[process]);
    call(&gateway, "CloseHandle", &[r[2].clone()]);
}

#[test]
fn failed_spawn_keeps_five_values() {
    let (gateway, _emu) = Gateway::emulated();
    let r = call(
        &gateway,
        "CreateProcess",
        &[Variant::Nil, "w32-definitely-not-a-program".into(), Variant::Nil, Variant::Nil, false.into(), 0.into(), Variant::Nil],
    );
    assert_eq!(r, [vec![Variant::Int(0)], vec![Variant::Nil; 4]].concat());
}

#[test]
fn file_write_read_and_listing() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _emu) = Gateway::emulated();
    let path = dir.path().join("notes.txt").to_string_lossy().into_owned();

    let create = |disposition: u32| {
        let access = GENERIC_READ | GENERIC_WRITE;
        call(
            &gateway,
            "CreateFile",
            &[path.as_str().into(), access.into(), 0.into(), Variant::Nil, disposition.into(), 0.into()],
        )[0]
        .clone()
    };

    let file = create(CREATE_ALWAYS);
    assert_ne!(int(&file), -1);
    let written = call(&gateway, "WriteFile", &[file.clone(), Variant::Bytes(b"hello".to_vec())]);
    assert_eq!(written, vec![Variant::Bool(true), Variant::Int(5)]);
    call(&gateway, "CloseHandle", &[file]);

    let file = create(OPEN_EXISTING);
    let read = call(&gateway, "ReadFile", &[file.clone(), 64.into()]);
    assert_eq!(read, vec![Variant::Bool(true), Variant::Bytes(b"hello".to_vec())]);
    call(&gateway, "CloseHandle", &[file]);

    std::fs::write(dir.path().join("other.txt"), b"x").unwrap();
    std::fs::write(dir.path().join("skip.log"), b"x").unwrap();
    let pattern = dir.path().join("*.txt").to_string_lossy().into_owned();
    let first = call(&gateway, "FindFirstFile", &[pattern.into()]);
    assert_eq!(first.len(), 2);
    let cursor = first[0].clone();
    let name = |v: &Variant| v.as_table().and_then(|t| t.field("FileName")).cloned();
    assert_eq!(name(&first[1]), Some(Variant::from("notes.txt")));

    let next = call(&gateway, "FindNextFile", &[cursor.clone()]);
    assert_eq!(next[0], Variant::Bool(true));
    assert_eq!(name(&next[1]), Some(Variant::from("other.txt")));
    assert_eq!(call(&gateway, "FindNextFile", &[cursor.clone()]), vec![Variant::Bool(false), Variant::Nil]);
    assert_eq!(call(&gateway, "FindClose", &[cursor]), vec![Variant::Bool(true)]);
}

#[test]
fn missing_files_fail_with_codes() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _emu) = Gateway::emulated();

    let pattern = dir.path().join("*.none").to_string_lossy().into_owned();
    assert_eq!(call(&gateway, "FindFirstFile", &[pattern.into()]), vec![Variant::Int(0), Variant::Nil]);
    assert_eq!(call(&gateway, "GetLastError", &[]), vec![Variant::from(ERROR_FILE_NOT_FOUND)]);

    let missing = dir.path().join("absent").to_string_lossy().into_owned();
    let r = call(&gateway, "SetCurrentDirectory", &[missing.into()]);
    assert_eq!(r[0], Variant::Bool(false));
    assert!(int(&r[1]) != 0);
}

#[test]
fn relative_paths_follow_the_current_directory() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _emu) = Gateway::emulated();
    let root = dir.path().to_string_lossy().into_owned();

    assert_eq!(call(&gateway, "SetCurrentDirectory", &[root.into()]), vec![Variant::Bool(true), Variant::Nil]);
    let full = call(&gateway, "GetFullPathName", &["inner.txt".into()]);
    let expected = dir.path().join("inner.txt").to_string_lossy().into_owned();
    assert_eq!(full[0], Variant::from(expected.encode_utf16().count()));
    assert_eq!(full[1], Variant::from(expected));
    assert_eq!(full[2], Variant::Nil);
}

#[test]
fn temp_file_names_use_the_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let (gateway, _emu) = Gateway::emulated();
    let root = dir.path().to_string_lossy().into_owned();

    let r = call(&gateway, "GetTempFileName", &[root.into(), "w32abc".into(), 0x1234.into()]);
    assert_eq!(r[0], Variant::Int(0x1234));
    let name = r[1].as_str().unwrap();
    assert!(name.ends_with("w321234.TMP"), "{name}");

    let temp = call(&gateway, "GetTempPath", &[]);
    assert!(int(&temp[0]) > 0);
}
