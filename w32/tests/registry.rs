use pretty_assertions::assert_eq;
use w32::constants::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, REG_BINARY, REG_DWORD_BIG_ENDIAN};
use w32::{Gateway, Table, Variant};

const KEY: &str = "Software\\W32 Test";

fn call(gateway: &Gateway, name: &str, args: &[Variant]) -> Vec<Variant> {
    gateway.call(name, args).unwrap_or_else(|e| panic!("{name}: {e}"))
}

fn set(gateway: &Gateway, subkey: &str, name: &str, value: Variant) {
    let r = call(gateway, "RegSetValueEx", &[HKEY_CURRENT_USER.into(), subkey.into(), name.into(), value]);
    assert_eq!(r, vec![Variant::Bool(true)], "setting {subkey}\\{name}");
}

fn names(v: &Variant) -> Vec<String> {
    let t = v.as_table().unwrap_or_else(|| panic!("expected a list, got {v:?}"));
    t.array().filter_map(|s| s.as_str().map(str::to_string)).collect()
}

#[test]
fn long_values_take_a_second_read() {
    let (gateway, emu) = Gateway::emulated();
    set(&gateway, KEY, "Greeting", "hello, registry".into());
    set(&gateway, KEY, "Count", 7.into());

    let before = emu.registry_reads();
    let r = call(&gateway, "RegQueryValueEx", &[HKEY_CURRENT_USER.into(), KEY.into(), "Greeting".into()]);
    assert_eq!(r, vec![Variant::from("hello, registry")]);
    assert_eq!(emu.registry_reads() - before, 2);

    let before = emu.registry_reads();
    let r = call(&gateway, "RegQueryValueEx", &[HKEY_CURRENT_USER.into(), KEY.into(), "count".into()]);
    assert_eq!(r, vec![Variant::Int(7)]);
    assert_eq!(emu.registry_reads() - before, 1);
}

#[test]
fn explicit_types_are_honoured() {
    let (gateway, _emu) = Gateway::emulated();
    let args = |name: &str, value: Variant, kind: u32| -> Vec<Variant> {
        vec![HKEY_CURRENT_USER.into(), KEY.into(), name.into(), value, kind.into()]
    };
    call(&gateway, "RegSetValueEx", &args("Raw", Variant::Bytes(vec![1, 2, 3, 4, 5, 6]), REG_BINARY));
    call(&gateway, "RegSetValueEx", &args("Order", 0x0102_0304.into(), REG_DWORD_BIG_ENDIAN));

    let query = |name: &str| call(&gateway, "RegQueryValueEx", &[HKEY_CURRENT_USER.into(), KEY.into(), name.into()]);
    assert_eq!(query("Raw"), vec![Variant::Bytes(vec![1, 2, 3, 4, 5, 6])]);
    assert_eq!(query("Order"), vec![Variant::Int(0x0102_0304)]);
}

#[test]
fn default_value_is_the_unnamed_one() {
    let (gateway, _emu) = Gateway::emulated();
    let r = call(&gateway, "RegSetValueEx", &[HKEY_CURRENT_USER.into(), KEY.into(), Variant::Nil, "default".into()]);
    assert_eq!(r, vec![Variant::Bool(true)]);
    let r = call(&gateway, "RegQueryValueEx", &[HKEY_CURRENT_USER.into(), KEY.into()]);
    assert_eq!(r, vec![Variant::from("default")]);
    let r = call(&gateway, "RegQueryValueEx", &[HKEY_CURRENT_USER.into(), KEY.into(), "".into()]);
    assert_eq!(r, vec![Variant::from("default")]);
}

#[test]
fn absent_keys_and_values_read_as_nil() {
    let (gateway, _emu) = Gateway::emulated();
    set(&gateway, KEY, "Present", 1.into());
    let query = |subkey: &str, name: &str| {
        call(&gateway, "RegQueryValueEx", &[HKEY_CURRENT_USER.into(), subkey.into(), name.into()])
    };
    assert_eq!(query(KEY, "Absent"), vec![Variant::Nil]);
    assert_eq!(query("Software\\Nowhere", "Present"), vec![Variant::Nil]);
    assert_eq!(call(&gateway, "RegEnumKeyEx", &[HKEY_CURRENT_USER.into(), "Software\\Nowhere".into()]), vec![Variant::Nil]);
}

#[test]
fn enumeration_lists_every_name() {
    let (gateway, _emu) = Gateway::emulated();
    for sub in ["Beta", "alpha", "Gamma"] {
        set(&gateway, &format!("{KEY}\\{sub}"), "x", 0.into());
    }
    set(&gateway, KEY, "Second", 2.into());
    set(&gateway, KEY, "First", 1.into());

    let keys = call(&gateway, "RegEnumKeyEx", &[HKEY_CURRENT_USER.into(), KEY.into()]);
    assert_eq!(names(&keys[0]), vec!["alpha", "Beta", "Gamma"]);
    let values = call(&gateway, "RegEnumValue", &[HKEY_CURRENT_USER.into(), KEY.into()]);
    assert_eq!(names(&values[0]), vec!["First", "Second"]);

    let leaf = call(&gateway, "RegEnumValue", &[HKEY_CURRENT_USER.into(), format!("{KEY}\\alpha\\").into()]);
    assert_eq!(names(&leaf[0]), vec!["x"]);
}

#[test]
fn cursor_walk_ends_with_nil() {
    let (gateway, _emu) = Gateway::emulated();
    set(&gateway, KEY, "One", 1.into());
    set(&gateway, KEY, "Two", 2.into());

    let key = call(&gateway, "RegOpenKeyEx", &[HKEY_CURRENT_USER.into(), KEY.into()]);
    let key = key[0].clone();
    assert!(key.is_number());

    let mut seen = Vec::new();
    for index in 0.. {
        let r = call(&gateway, "RegEnumValueAt", &[key.clone(), Variant::Int(index)]);
        match r[0].as_str() {
            Some(name) => seen.push(name.to_string()),
            None => break,
        }
    }
    assert_eq!(seen, vec!["One", "Two"]);
    assert_eq!(call(&gateway, "RegEnumKeyAt", &[key.clone(), 0.into()]), vec![Variant::Nil]);
    assert_eq!(call(&gateway, "RegCloseKey", &[key.clone()]), vec![Variant::Bool(true)]);
    assert_eq!(call(&gateway, "RegCloseKey", &[key]), vec![Variant::Bool(false)]);
}

#[test]
fn deleting_values_and_trees() {
    let (gateway, _emu) = Gateway::emulated();
    set(&gateway, &format!("{KEY}\\Tree\\Leaf"), "v", 1.into());
    set(&gateway, KEY, "Gone", 1.into());

    let delete_value = call(&gateway, "RegDeleteValue", &[HKEY_CURRENT_USER.into(), KEY.into(), "Gone".into()]);
    assert_eq!(delete_value, vec![Variant::Bool(true)]);
    let again = call(&gateway, "RegDeleteValue", &[HKEY_CURRENT_USER.into(), KEY.into(), "Gone".into()]);
    assert_eq!(again, vec![Variant::Bool(false)]);

    let tree = format!("{KEY}\\Tree");
    // A key with subkeys only goes with the recursive delete.
    assert_eq!(call(&gateway, "RegDeleteKey", &[HKEY_CURRENT_USER.into(), tree.as_str().into()]), vec![Variant::Bool(false)]);
    assert_eq!(call(&gateway, "SHDeleteKey", &[HKEY_CURRENT_USER.into(), tree.as_str().into()]), vec![Variant::Bool(true)]);
    let keys = call(&gateway, "RegEnumKeyEx", &[HKEY_CURRENT_USER.into(), KEY.into()]);
    assert_eq!(keys[0].as_table().map(Table::len), Some(0));
}

#[test]
fn hives_are_separate() {
    let (gateway, _emu) = Gateway::emulated();
    set(&gateway, KEY, "Where", "user".into());
    let r = call(&gateway, "RegQueryValueEx", &[HKEY_LOCAL_MACHINE.into(), KEY.into(), "Where".into()]);
    assert_eq!(r, vec![Variant::Nil]);
}
