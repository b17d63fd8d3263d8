//! Registry value payloads.

use w32_script::{Table, Variant};

use crate::constants::*;

/// UTF-16LE bytes of `s` followed by a NUL terminator.
pub fn utf16_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16().chain(Some(0)).flat_map(u16::to_le_bytes).collect()
}

fn utf16_units(data: &[u8]) -> Vec<u16> {
    data.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect()
}

/// Decode a UTF-16LE string, stopping at the first NUL.
pub fn utf16_string(data: &[u8]) -> String {
    let units = utf16_units(data);
    let end = units.iter().position(|&u| u == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

fn dword(data: &[u8], big_endian: bool) -> Variant {
    let Some(bytes) = data.get(..4).and_then(|b| <[u8; 4]>::try_from(b).ok()) else {
        return Variant::Nil;
    };
    let n = if big_endian { u32::from_be_bytes(bytes) } else { u32::from_le_bytes(bytes) };
    Variant::from(n)
}

/// Script value for raw registry data of type `kind`.
pub fn decode(kind: u32, data: &[u8]) -> Variant {
    match kind {
        REG_DWORD => dword(data, false),
        REG_DWORD_BIG_ENDIAN => dword(data, true),
        REG_SZ | REG_EXPAND_SZ => Variant::from(utf16_string(data)),
        REG_MULTI_SZ => {
            let units = utf16_units(data);
            let list: Table = units
                .split(|&u| u == 0)
                .take_while(|s| !s.is_empty())
                .map(|s| String::from_utf16_lossy(s))
                .collect();
            Variant::Table(list)
        }
        REG_BINARY => Variant::Bytes(data.to_vec()),
        _ => Variant::Nil,
    }
}

/// Registry type and bytes for a script value. Numbers default to
/// `REG_DWORD`, strings to `REG_SZ`; with `REG_BINARY` a string is stored
/// as its raw bytes.
pub fn encode(value: &Variant, kind: Option<u32>) -> Option<(u32, Vec<u8>)> {
    if let Some(n) = value.as_int() {
        let kind = kind.unwrap_or(REG_DWORD);
        let n = n as u32;
        let bytes = if kind == REG_DWORD_BIG_ENDIAN { n.to_be_bytes() } else { n.to_le_bytes() };
        return Some((kind, bytes.to_vec()));
    }
    match (value, kind) {
        (Variant::String(_) | Variant::Bytes(_), Some(REG_BINARY)) => Some((REG_BINARY, value.as_bytes()?.to_vec())),
        (Variant::Bytes(b), None) if std::str::from_utf8(b).is_err() => Some((REG_BINARY, b.clone())),
        (Variant::String(_) | Variant::Bytes(_), Some(REG_MULTI_SZ)) => {
            let mut data = utf16_bytes(value.as_str()?);
            data.extend([0, 0]);
            Some((REG_MULTI_SZ, data))
        }
        (Variant::String(_) | Variant::Bytes(_), kind) => Some((kind.unwrap_or(REG_SZ), utf16_bytes(value.as_str()?))),
        _ => None,
    }
}
