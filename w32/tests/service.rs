use pretty_assertions::assert_eq;
use w32::constants::{
    SERVICE_CONTROL_STOP, SERVICE_DEMAND_START, SERVICE_RUNNING, SERVICE_STOPPED, SERVICE_WIN32_OWN_PROCESS,
};
use w32::platform::ServiceConfig;
use w32::{Gateway, Variant};

fn call(gateway: &Gateway, name: &str, args: &[Variant]) -> Vec<Variant> {
    gateway.call(name, args).unwrap_or_else(|e| panic!("{name}: {e}"))
}

fn spooler() -> ServiceConfig {
    ServiceConfig {
        service_type: SERVICE_WIN32_OWN_PROCESS,
        start_type: SERVICE_DEMAND_START,
        error_control: 1,
        binary_path_name: "C:\\Windows\\spoolsv.exe".to_string(),
        display_name: "Print Spooler".to_string(),
    }
}

#[test]
fn service_lifecycle() {
    let (gateway, emu) = Gateway::emulated();
    emu.install_service("Spooler", spooler());

    let manager = call(&gateway, "OpenSCManager", &[]);
    assert!(manager[0].as_int().is_some_and(|h| h != 0));
    let service = call(&gateway, "OpenService", &[manager[0].clone(), "spooler".into()]);
    let service = service[0].clone();
    assert_ne!(service, Variant::Int(0));

    let config = call(&gateway, "QueryServiceConfig", &[service.clone()]);
    assert_eq!(
        config,
        vec![
            Variant::Bool(true),
            SERVICE_WIN32_OWN_PROCESS.into(),
            SERVICE_DEMAND_START.into(),
            Variant::Int(1),
            "C:\\Windows\\spoolsv.exe".into(),
            "Print Spooler".into(),
            Variant::Nil,
        ]
    );

    let state = |gateway: &Gateway| {
        let status = call(gateway, "QueryServiceStatus", &[service.clone()]);
        assert_eq!(status.len(), 8);
        assert_eq!(status[0], Variant::Bool(true));
        status[2].as_int().map(|s| s as u32)
    };
    assert_eq!(state(&gateway), Some(SERVICE_STOPPED));

    assert_eq!(call(&gateway, "StartService", &[service.clone()]), vec![Variant::Bool(true)]);
    assert_eq!(state(&gateway), Some(SERVICE_RUNNING));
    assert_eq!(call(&gateway, "StartService", &[service.clone()]), vec![Variant::Bool(false)]);

    let stop = call(&gateway, "ControlService", &[service.clone(), SERVICE_CONTROL_STOP.into()]);
    assert_eq!(stop, vec![Variant::Bool(true)]);
    assert_eq!(state(&gateway), Some(SERVICE_STOPPED));

    assert_eq!(call(&gateway, "DeleteService", &[service.clone()]), vec![Variant::Bool(true)]);
    assert_eq!(call(&gateway, "CloseServiceHandle", &[service]), vec![Variant::Bool(true)]);
    let reopened = call(&gateway, "OpenService", &[manager[0].clone(), "Spooler".into()]);
    assert_eq!(reopened, vec![Variant::Int(0)]);
    assert_eq!(call(&gateway, "CloseServiceHandle", &manager), vec![Variant::Bool(true)]);
}

#[test]
fn queries_on_a_closed_handle_keep_their_shape() {
    let (gateway, _emu) = Gateway::emulated();
    let status = call(&gateway, "QueryServiceStatus", &[0x99.into()]);
    assert_eq!(status, [vec![Variant::Bool(false)], vec![Variant::Nil; 7]].concat());

    let config = call(&gateway, "QueryServiceConfig", &[0x99.into()]);
    assert_eq!(config.len(), 7);
    assert_eq!(&config[..6], &[Variant::Bool(false), Variant::Nil, Variant::Nil, Variant::Nil, Variant::Nil, Variant::Nil]);
    assert!(config[6].as_int().is_some_and(|code| code != 0));
}
