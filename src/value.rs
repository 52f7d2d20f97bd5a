//! Value model shared by search, sort and key derivation.
//!
//! Records are schema-less JSON values. Everything that needs to branch on
//! the shape of a value goes through [`ValueKind`], and everything that needs
//! a primary or index key goes through [`Key`] and [`KeyPath`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A stored record. No fixed shape is enforced.
pub type Record = Value;

/// Coarse classification of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    /// Objects and arrays.
    Composite,
}

impl ValueKind {
    /// Classify a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) | Value::Object(_) => Self::Composite,
        }
    }
}

/// A valid key: a finite number, a string, or an array of keys.
///
/// Keys order as `Number < String < Array`. Numbers compare numerically with
/// `-0` equal to `0`, strings by code point, arrays element-wise with a proper
/// prefix sorting first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Key {
    Number(f64),
    String(String),
    Array(Vec<Key>),
}

impl Key {
    /// Convert a JSON value into a key, if it is a valid one.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                let n = n.as_f64()?;
                if !n.is_finite() {
                    return None;
                }
                // Normalize -0 so equal keys encode identically.
                Some(Self::Number(if n == 0.0 { 0.0 } else { n }))
            }
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Self::Array),
            Value::Null | Value::Bool(_) | Value::Object(_) => None,
        }
    }

    /// Convert the key back into a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => number_value(*n),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_value).collect()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::String(_) => 1,
            Self::Array(_) => 2,
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl TryFrom<Value> for Key {
    type Error = InvalidKey;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value).ok_or(InvalidKey(value))
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        key.to_value()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Error returned when a JSON value is not a valid key.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidKey(pub Value);

impl fmt::Display for InvalidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a valid key", self.0)
    }
}

impl std::error::Error for InvalidKey {}

/// A key path: one dotted field path, or an ordered list of them for
/// compound keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPath {
    Single(String),
    Compound(Vec<String>),
}

impl KeyPath {
    /// The path when this is a single (non-compound) key path.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(path) => Some(path),
            Self::Compound(_) => None,
        }
    }

    /// Evaluate the key path against a record.
    ///
    /// A compound path yields an array of the component values and is
    /// `None` as soon as one component is missing.
    pub fn evaluate(&self, record: &Value) -> Option<Value> {
        match self {
            Self::Single(path) => lookup(record, path).cloned(),
            Self::Compound(paths) => paths
                .iter()
                .map(|path| lookup(record, path).cloned())
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }

    /// Evaluate the key path and convert the result into a key.
    pub fn extract_key(&self, record: &Value) -> Option<Key> {
        self.evaluate(record).as_ref().and_then(Key::from_value)
    }

    /// Write `key` into `record` at this key path, creating intermediate
    /// objects as needed. Only single key paths can be injected.
    pub fn inject(&self, record: &mut Value, key: &Key) -> bool {
        let Some(path) = self.as_single() else {
            return false;
        };
        let mut current = record;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let map = match current {
                Value::Object(map) => map,
                _ => return false,
            };
            if segments.peek().is_none() {
                map.insert(segment.to_string(), key.to_value());
                return true;
            }
            current = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        false
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(path) => write!(f, "'{}'", path),
            Self::Compound(paths) => write!(f, "[{}]", paths.join(", ")),
        }
    }
}

/// Resolve a dotted path (`"address.city"`) inside a value.
///
/// The empty path resolves to the value itself. Numeric segments index into
/// arrays.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Render a leaf the way a browser's `String(value)` would.
///
/// Returns `None` for null and for composite values, which have no leaf text.
pub fn leaf_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
    }
}

fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => format!("{}", f as i64),
        Some(f) => format!("{}", f),
        None => n.to_string(),
    }
}

/// Build a JSON number, preferring an integer representation when exact.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}
