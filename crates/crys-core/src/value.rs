//! Structured values: the capability records and aggregates need.
//!
//! The engine never looks inside an aggregate, and only reads a record's
//! scalar fields for ordering and timestamp stamping. [`Shard`] captures
//! exactly that: keyed read access to scalar fields plus the ability to
//! write one field, on top of `Clone` for isolated copies.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Milliseconds on whatever timeline the configured clock uses.
pub type Timestamp = i64;

/// A scalar field value read from a shard.
///
/// Values are totally ordered so they can drive sorting: `Null < Bool <
/// numbers < Text`, with integers and floats compared numerically against
/// each other.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int(_) | FieldValue::Float(_) => 2,
            FieldValue::Text(_) => 3,
        }
    }

    /// Integers and floats; the only values that can act as timestamps.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldValue::Int(_) | FieldValue::Float(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.total_cmp(b),
            (FieldValue::Int(a), FieldValue::Float(b)) => (*a as f64).total_cmp(b),
            (FieldValue::Float(a), FieldValue::Int(b)) => a.total_cmp(&(*b as f64)),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<FieldValue> for serde_json::Value {
    fn from(v: FieldValue) -> Self {
        match v {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Bool(b) => serde_json::Value::Bool(b),
            FieldValue::Int(i) => serde_json::Value::from(i),
            FieldValue::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Text(s) => serde_json::Value::String(s),
        }
    }
}

/// Anything that can hold a folded aggregate.
pub trait Crystal: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Crystal for T {}

/// A record that can be appended to the log.
pub trait Shard: Clone + Send + Sync + 'static {
    /// Read a scalar field. Missing or non-scalar fields yield `None`.
    fn field(&self, key: &str) -> Option<FieldValue>;

    /// Write a scalar field, overwriting any previous value.
    ///
    /// Shards without keyed fields may ignore the write.
    fn set_field(&mut self, key: &str, value: FieldValue);

    /// Read `key` as a timestamp. Fractional values keep their precision
    /// and compare numerically against integers.
    fn timestamp(&self, key: &str) -> Option<FieldValue> {
        self.field(key).filter(FieldValue::is_numeric)
    }

    /// Whether the shard defines `key` at all (null counts as undefined).
    fn has_field(&self, key: &str) -> bool {
        self.field(key).is_some_and(|v| !v.is_null())
    }
}

impl Shard for serde_json::Value {
    fn field(&self, key: &str) -> Option<FieldValue> {
        match self.get(key)? {
            serde_json::Value::Null => Some(FieldValue::Null),
            serde_json::Value::Bool(b) => Some(FieldValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Int)
                .or_else(|| n.as_f64().map(FieldValue::Float)),
            serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
            _ => None,
        }
    }

    /// Writes into objects only. Arrays and scalars have no keyed fields
    /// and are left untouched, so they are never stamped.
    fn set_field(&mut self, key: &str, value: FieldValue) {
        if let serde_json::Value::Object(map) = self {
            map.insert(key.to_string(), value.into());
        }
    }

    /// Any non-null value counts, nested objects and arrays included.
    fn has_field(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }
}

impl Shard for BTreeMap<String, FieldValue> {
    fn field(&self, key: &str) -> Option<FieldValue> {
        self.get(key).cloned()
    }

    fn set_field(&mut self, key: &str, value: FieldValue) {
        self.insert(key.to_string(), value);
    }
}
