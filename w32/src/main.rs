use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use w32::config::{Backend, GatewayConfig, GatewayConfigReader};
use w32::logger::Logger;
use w32::{Gateway, Table, TableKey, Variant};

#[derive(Parser, Debug)]
#[command(name = "w32")]
#[command(version, about = "Call Win32 bindings the way an embedded script would.")]
struct Cli {
    /// Gateway configuration (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured backend.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Native,
    Emulated,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every binding with its parameters.
    List,
    /// Print the constant table, optionally only names containing FILTER.
    Consts { filter: Option<String> },
    /// Call one binding. Arguments are a JSON array.
    Call { name: String, args: Option<String> },
}

fn to_variant(value: &Value) -> Variant {
    match value {
        Value::Null => Variant::Nil,
        Value::Bool(b) => Variant::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Variant::Int(i),
            None => n.as_u64().map(|u| Variant::Int(u as i64)).unwrap_or_else(|| Variant::Float(n.as_f64().unwrap_or(0.0))),
        },
        Value::String(s) => Variant::String(s.clone()),
        Value::Array(items) => Variant::Table(items.iter().map(to_variant).collect()),
        Value::Object(fields) => {
            let mut table = Table::new();
            for (k, v) in fields {
                table.insert(k.as_str(), to_variant(v));
            }
            Variant::Table(table)
        }
    }
}

fn to_json(value: &Variant) -> Value {
    match value {
        Variant::Nil => Value::Null,
        Variant::Bool(b) => Value::Bool(*b),
        Variant::Int(i) => Value::from(*i),
        Variant::Float(f) => Value::from(*f),
        Variant::String(s) => Value::String(s.clone()),
        Variant::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => Value::Array(b.iter().map(|&x| Value::from(x)).collect()),
        },
        Variant::Table(t) => table_json(t),
    }
}

/// A pure sequence becomes an array, anything else an object.
fn table_json(t: &Table) -> Value {
    let len = t.len();
    if len > 0 && t.iter().count() == len {
        return Value::Array(t.array().map(to_json).collect());
    }
    let mut map = Map::new();
    for (k, v) in t.iter() {
        let key = match k {
            TableKey::Index(i) => i.to_string(),
            TableKey::Name(s) => s.clone(),
        };
        map.insert(key, to_json(v));
    }
    Value::Object(map)
}

fn load_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => GatewayConfigReader::read_gateway_json(path)
            .with_context(|| format!("reading config: {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = match backend {
            BackendArg::Native => Backend::Native,
            BackendArg::Emulated => Backend::Emulated,
        };
    }
    Ok(config)
}

fn list(gateway: &Gateway) {
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for name in gateway.function_names() {
        groups.entry(gateway.group(name).unwrap_or("Other")).or_default().push(name);
    }
    for (group, names) in groups {
        println!("[{group}]");
        for name in names {
            println!("  {}", describe(gateway, name));
        }
    }
}

fn describe(gateway: &Gateway, name: &str) -> String {
    let params = gateway
        .signature(name)
        .unwrap_or_default()
        .iter()
        .map(|p| {
            if p.is_optional() {
                format!("[{}: {}]", p.name, p.kind.expected())
            } else {
                format!("{}: {}", p.name, p.kind.expected())
            }
        })
        .collect::<Vec<_>>();
    format!("{name}({})", params.join(", "))
}

fn consts(filter: Option<&str>) {
    let filter = filter.map(str::to_ascii_uppercase);
    for (name, value) in w32::constants::all() {
        if filter.as_deref().map_or(true, |f| name.contains(f)) {
            println!("{name} = {value} ({value:#x})");
        }
    }
}

fn call(gateway: &Gateway, name: &str, args: Option<&str>) -> Result<()> {
    let args = match args {
        Some(text) => match serde_json::from_str::<Value>(text).context("parsing arguments")? {
            Value::Array(items) => items.iter().map(to_variant).collect(),
            other => vec![to_variant(&other)],
        },
        None => Vec::new(),
    };
    let results = gateway.call(name, &args).map_err(|e| anyhow!(e))?;
    let json = Value::Array(results.iter().map(to_json).collect());
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    Logger::init_logging(config.logger_config.clone());

    match &cli.command {
        Command::Consts { filter } => {
            consts(filter.as_deref());
            Ok(())
        }
        Command::List => {
            list(&Gateway::from_config(&config)?);
            Ok(())
        }
        Command::Call { name, args } => call(&Gateway::from_config(&config)?, name, args.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn json_arrays_and_objects_become_tables() {
        let v = to_variant(&serde_json::json!([1, "a", {"bInheritHandle": true}, null]));
        let t = v.as_table().unwrap();
        assert_eq!(t.index(1), Some(&Variant::Int(1)));
        assert_eq!(t.index(2), Some(&Variant::from("a")));
        let record = t.index(3).and_then(Variant::as_table).unwrap();
        assert_eq!(record.field("bInheritHandle"), Some(&Variant::Bool(true)));
    }

    #[test]
    fn listing_shows_optional_parameters_in_brackets() {
        let (gateway, _emu) = Gateway::emulated();
        assert_eq!(describe(&gateway, "Beep"), "Beep(dwFreq: number, dwDuration: number)");
        assert_eq!(
            describe(&gateway, "RegOpenKeyEx"),
            "RegOpenKeyEx(hKey: number, lpSubKey: string, [samDesired: number])"
        );
        assert_eq!(gateway.group("RegOpenKeyEx"), Some("Registry"));
    }

    #[test]
    fn sequences_print_as_arrays() {
        let list: Table = ["x", "y"].into_iter().collect();
        assert_eq!(to_json(&Variant::Table(list)), serde_json::json!(["x", "y"]));
        let mut record = Table::new();
        record.insert("Id", 3);
        assert_eq!(to_json(&Variant::Table(record)), serde_json::json!({"Id": 3}));
        assert_eq!(to_json(&Variant::Bytes(vec![0xff, 0])), serde_json::json!([255, 0]));
    }
}
