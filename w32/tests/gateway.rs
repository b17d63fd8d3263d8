use pretty_assertions::assert_eq;
use w32::config::{Backend, EmulatorConfigBuilder, GatewayConfigBuilder, GatewayConfigReader};
use w32::constants::{CSIDL_PROGRAM_FILES, CSIDL_STARTUP};
use w32::{Gateway, ScriptError, Table, Variant};

fn configured(builder: EmulatorConfigBuilder) -> Gateway {
    let config = GatewayConfigBuilder::new()
        .with_backend(Backend::Emulated)
        .with_emulator_config(builder.get())
        .get();
    Gateway::from_config(&config).unwrap()
}

#[test]
fn wrong_argument_type_names_the_function_and_position() {
    let (gateway, _emu) = Gateway::emulated();
    let err = gateway.call("SetWindowText", &[1.into(), Variant::Table(Table::new())]).unwrap_err();
    assert_eq!(
        err,
        ScriptError::BadArgument { func: "SetWindowText", index: 2, expected: "string", got: "table" }
    );
    assert_eq!(err.to_string(), "bad argument #2 to 'SetWindowText' (string expected, got table)");
}

#[test]
fn missing_required_argument_is_reported_as_nil() {
    let (gateway, _emu) = Gateway::emulated();
    let err = gateway.call("Beep", &[440.into()]).unwrap_err();
    assert_eq!(err.to_string(), "bad argument #2 to 'Beep' (number expected, got nil)");
}

#[test]
fn bad_record_field_is_reported_with_its_name() {
    let (gateway, _emu) = Gateway::emulated();
    let mut sa = Table::new();
    sa.insert("bInheritHandle", "yes");
    let err = gateway.call("CreateEvent", &[sa.into(), true.into(), false.into()]).unwrap_err();
    assert!(matches!(err, ScriptError::BadField { func: "CreateEvent", index: 1, .. }), "{err}");
    assert!(err.to_string().contains("bInheritHandle"), "{err}");
}

#[test]
fn unknown_function_is_an_error() {
    let (gateway, _emu) = Gateway::emulated();
    let err = gateway.call("NoSuchApi", &[]).unwrap_err();
    assert_eq!(err, ScriptError::UnknownFunction("NoSuchApi".to_string()));
}

#[test]
fn every_binding_is_listed_once() {
    let (gateway, _emu) = Gateway::emulated();
    let names = gateway.function_names();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(names, sorted);
    for name in ["RegisterHotKey", "RegQueryValueEx", "RegEnumKeyEx", "RegEnumValue", "CreateProcess", "mciSendString"] {
        assert!(names.contains(&name), "{name} is missing");
    }
    let params = gateway.signature("RegOpenKeyEx").unwrap();
    assert_eq!(params.iter().map(|p| p.name).collect::<Vec<_>>(), vec!["hKey", "lpSubKey", "samDesired"]);
    assert!(params[2].is_optional());
}

#[test]
fn constants_table_holds_win32_values() {
    let (gateway, _emu) = Gateway::emulated();
    let table = gateway.constants_table();
    assert_eq!(table.field("WM_USER"), Some(&Variant::Int(0x400)));
    assert_eq!(table.field("INFINITE"), Some(&Variant::Int(0xFFFF_FFFF)));
    assert_eq!(table.field("NOT_A_CONSTANT"), None);
}

#[test]
fn machine_answers_come_from_the_emulator_config() {
    let gateway = configured(
        EmulatorConfigBuilder::new()
            .with_user_name("operator")
            .with_admin(true)
            .with_version(0x1DB1_0106)
            .with_special_folder(CSIDL_STARTUP, r"C:\Users\operator\Startup"),
    );
    assert_eq!(gateway.call("GetUserName", &[]).unwrap(), vec![Variant::from("operator")]);
    assert_eq!(gateway.call("IsUserAdmin", &[]).unwrap(), vec![Variant::Bool(true)]);
    assert_eq!(gateway.call("GetVersion", &[]).unwrap(), vec![Variant::Int(0x1DB1_0106)]);

    let folder = |csidl: u32| gateway.call("SHGetSpecialFolderLocation", &[csidl.into()]).unwrap();
    assert_eq!(folder(CSIDL_STARTUP), vec![Variant::from(r"C:\Users\operator\Startup")]);
    assert_eq!(folder(CSIDL_PROGRAM_FILES), vec![Variant::from(r"C:\Program Files")]);
    assert_eq!(folder(0x7F), vec![Variant::Nil]);
}

#[test]
fn shell_open_reports_zero_on_success() {
    let (gateway, emu) = Gateway::emulated();
    assert_eq!(gateway.call("ShellOpen", &["https://example.org".into()]).unwrap(), vec![Variant::Int(0)]);
    assert_eq!(gateway.call("ShellOpen", &["w32-no-such-document.txt".into()]).unwrap(), vec![Variant::Int(2)]);
    assert_eq!(emu.shell_opened(), vec!["https://example.org", "w32-no-such-document.txt"]);
}

#[test]
fn mci_and_beeps() {
    let (gateway, emu) = Gateway::emulated();
    assert_eq!(gateway.call("mciSendString", &["play intro".into()]).unwrap(), vec![Variant::Int(0)]);
    assert_ne!(gateway.call("mciSendString", &["  ".into()]).unwrap(), vec![Variant::Int(0)]);
    assert_eq!(emu.mci_commands(), vec!["play intro", "  "]);

    assert_eq!(gateway.call("MessageBeep", &[0.into()]).unwrap(), vec![Variant::Bool(true)]);
    assert_eq!(gateway.call("Beep", &[750.into(), 10.into()]).unwrap(), vec![Variant::Bool(true)]);
    assert_eq!(gateway.call("Beep", &[1.into(), 10.into()]).unwrap(), vec![Variant::Bool(false)]);
}

#[test]
fn com_initialization_nests() {
    let (gateway, _emu) = Gateway::emulated();
    assert_eq!(gateway.call("CoInitialize", &[]).unwrap(), vec![Variant::Int(0)]);
    assert_eq!(gateway.call("CoInitialize", &[]).unwrap(), vec![Variant::Int(1)]);
    assert_eq!(gateway.call("CoUninitialize", &[]).unwrap(), Vec::<Variant>::new());
    assert_eq!(gateway.call("CoUninitialize", &[]).unwrap(), Vec::<Variant>::new());
}

#[test]
fn gateway_from_a_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("w32.json");
    std::fs::write(&path, r#"{"backend":"emulated","hotkey_fault_capacity":4,"emulator":{"user_name":"json"}}"#).unwrap();

    let config = GatewayConfigReader::read_gateway_json(&path).unwrap();
    assert_eq!(config.hotkey_fault_capacity, 4);
    let gateway = Gateway::from_config(&config).unwrap();
    assert_eq!(gateway.call("GetUserName", &[]).unwrap(), vec![Variant::from("json")]);
}

#[cfg(not(windows))]
#[test]
fn native_backend_is_unavailable_off_windows() {
    let config = GatewayConfigBuilder::new().with_backend(Backend::Native).get();
    assert!(Gateway::from_config(&config).is_err());
}
