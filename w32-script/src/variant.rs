use std::collections::BTreeMap;
use std::fmt;

/// Key of a [`Table`] entry.
///
/// Integer keys sort before string keys, so the array part of a table
/// iterates first and in index order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableKey {
    Index(i64),
    Name(String),
}

impl From<i64> for TableKey {
    fn from(value: i64) -> Self {
        TableKey::Index(value)
    }
}

impl From<&str> for TableKey {
    fn from(value: &str) -> Self {
        TableKey::Name(value.to_string())
    }
}

impl From<String> for TableKey {
    fn from(value: String) -> Self {
        TableKey::Name(value)
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKey::Index(i) => write!(f, "[{i}]"),
            TableKey::Name(s) => write!(f, "{s}"),
        }
    }
}

/// Key/value mapping handed across the script boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    entries: BTreeMap<TableKey, Variant>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the next free 1-based index.
    pub fn push(&mut self, value: impl Into<Variant>) {
        let next = self.len() as i64 + 1;
        self.entries.insert(TableKey::Index(next), value.into());
    }

    pub fn insert(&mut self, key: impl Into<TableKey>, value: impl Into<Variant>) {
        let value = value.into();
        let key = key.into();
        if value.is_nil() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    pub fn get(&self, key: &TableKey) -> Option<&Variant> {
        self.entries.get(key)
    }

    pub fn field(&self, name: &str) -> Option<&Variant> {
        self.entries.get(&TableKey::Name(name.to_string()))
    }

    pub fn index(&self, i: i64) -> Option<&Variant> {
        self.entries.get(&TableKey::Index(i))
    }

    /// Length of the array part: the count of consecutive integer keys from 1.
    pub fn len(&self) -> usize {
        let mut n = 0i64;
        while self.entries.contains_key(&TableKey::Index(n + 1)) {
            n += 1;
        }
        n as usize
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TableKey, &Variant)> {
        self.entries.iter()
    }

    /// Values of the array part in index order.
    pub fn array(&self) -> impl Iterator<Item = &Variant> {
        (1..=self.len() as i64).filter_map(move |i| self.index(i))
    }
}

impl<V: Into<Variant>> FromIterator<V> for Table {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        let mut table = Table::new();
        for v in iter {
            table.push(v);
        }
        table
    }
}

/// A script value.
///
/// Only `Nil` and `Bool(false)` are falsy; numbers (including zero) and
/// strings are truthy, as in the embedding host.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Variant {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Binary-safe string payload (file content, raw registry data).
    Bytes(Vec<u8>),
    Table(Table),
}

impl Variant {
    pub fn is_nil(&self) -> bool {
        matches!(self, Variant::Nil)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Variant::Int(_) | Variant::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Variant::String(_) | Variant::Bytes(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Variant::Table(_))
    }

    pub fn truthy(&self) -> bool {
        !matches!(self, Variant::Nil | Variant::Bool(false))
    }

    /// Integer view. Floats convert only when they hold an exact integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Variant::Int(v) => Some(*v),
            Variant::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Variant::Int(v) => Some(*v as f64),
            Variant::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s),
            Variant::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Variant::String(s) => Some(s.as_bytes()),
            Variant::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Variant::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Host-facing type name used in marshaling errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Nil => "nil",
            Variant::Bool(_) => "boolean",
            Variant::Int(_) | Variant::Float(_) => "number",
            Variant::String(_) | Variant::Bytes(_) => "string",
            Variant::Table(_) => "table",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Nil => write!(f, "nil"),
            Variant::Bool(b) => write!(f, "{}", b),
            Variant::Int(v) => write!(f, "{}", v),
            Variant::Float(v) => write!(f, "{}", v),
            Variant::String(s) => write!(f, "{s:?}"),
            Variant::Bytes(b) => write!(f, "bytes({})", b.len()),
            Variant::Table(t) => {
                write!(f, "{{")?;
                for (i, (k, v)) in t.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

macro_rules! int_variant {
    ($($t:ty),*) => {
        $(impl From<$t> for Variant {
            fn from(value: $t) -> Self {
                Variant::Int(value as i64)
            }
        })*
    };
}

int_variant!(i8, i16, i32, i64, isize, u8, u16, u32, usize);

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Float(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(value.to_string())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(value)
    }
}

impl From<Vec<u8>> for Variant {
    fn from(value: Vec<u8>) -> Self {
        Variant::Bytes(value)
    }
}

impl From<Table> for Variant {
    fn from(value: Table) -> Self {
        Variant::Table(value)
    }
}

impl<T: Into<Variant>> From<Option<T>> for Variant {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Variant::Nil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_is_truthy() {
        assert!(Variant::Int(0).truthy());
        assert!(Variant::from("").truthy());
        assert!(!Variant::Nil.truthy());
        assert!(!Variant::Bool(false).truthy());
    }

    #[test]
    fn integral_floats_coerce() {
        assert_eq!(Variant::Float(4.0).as_int(), Some(4));
        assert_eq!(Variant::Float(4.5).as_int(), None);
        assert_eq!(Variant::from("4").as_int(), None);
    }

    #[test]
    fn push_appends_after_array_part() {
        let mut t = Table::new();
        t.insert("name", "x");
        t.push(10);
        t.push(20);
        assert_eq!(t.len(), 2);
        assert_eq!(t.index(2), Some(&Variant::Int(20)));
        assert_eq!(t.array().cloned().collect::<Vec<_>>(), vec![Variant::Int(10), Variant::Int(20)]);
    }

    #[test]
    fn nil_insert_removes() {
        let mut t = Table::new();
        t.insert("k", 1);
        t.insert("k", Variant::Nil);
        assert!(t.is_empty());
    }
}
