//! FILENAME: engine/src/value.rs
//! PURPOSE: Defines the cell value type stored in every table.
//! CONTEXT: Input tables arrive already normalized by the data loaders
//! ("N/A" for missing categories, 0 for missing weights), so the value
//! set is small. `ValueKey` is the hashable projection used wherever
//! values act as identities (entity ids, group keys).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Represents the raw data within one table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Returns the display value of the cell as a String.
    /// This is the canonical form used for category names, search and
    /// categorical filters.
    pub fn display(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Number(n) => {
                // Format without unnecessary decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn key(&self) -> ValueKey {
        match self {
            Value::Empty => ValueKey::Empty,
            Value::Number(n) => ValueKey::Number(OrderedFloat(*n)),
            Value::Text(s) => ValueKey::Text(s.clone()),
            Value::Boolean(b) => ValueKey::Boolean(*b),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// f64 wrapper with bit-exact equality and a total order, so numbers can
/// be used as hash keys. 0.0 and -0.0 are normalized to the same key.
#[derive(Debug, Clone, Copy)]
pub struct OrderedFloat(pub f64);

impl OrderedFloat {
    fn normalized_bits(&self) -> u64 {
        if self.0 == 0.0 {
            0.0f64.to_bits()
        } else {
            self.0.to_bits()
        }
    }
}

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_bits() == other.normalized_bits()
    }
}

impl Eq for OrderedFloat {}

impl Hash for OrderedFloat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized_bits().hash(state);
    }
}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            Ordering::Equal
        } else {
            self.0.total_cmp(&other.0)
        }
    }
}

/// Hashable, ordered identity of a `Value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    Empty,
    Boolean(bool),
    Number(OrderedFloat),
    Text(String),
}

impl std::fmt::Display for ValueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKey::Empty => Ok(()),
            ValueKey::Boolean(b) => write!(f, "{}", Value::Boolean(*b)),
            ValueKey::Number(n) => write!(f, "{}", Value::Number(n.0)),
            ValueKey::Text(s) => write!(f, "{}", s),
        }
    }
}
