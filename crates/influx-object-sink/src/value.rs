// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagged record values.
//!
//! Records arrive already decoded as JSON. Every field is lifted into a
//! [`FieldValue`] so that classification is a plain `match` on the variant.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// A single record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Signed integer (JSON numbers that fit in `i64`).
    Integer(i64),
    /// Floating point (every other JSON number).
    Float(f64),
    /// UTF-8 string. Nested arrays and objects are kept as compact JSON text.
    String(String),
    /// Boolean.
    Boolean(bool),
    /// JSON `null`.
    Null,
}

/// A numeric measurement value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Float(f64),
}

impl FieldValue {
    /// Lift a decoded JSON value.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FieldValue::String(s.clone()),
            nested => FieldValue::String(nested.to_string()),
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_numeric(&self) -> Option<Numeric> {
        match self {
            FieldValue::Integer(i) => Some(Numeric::Integer(*i)),
            FieldValue::Float(f) => Some(Numeric::Float(*f)),
            _ => None,
        }
    }

    /// String representation used for tag values. `Null` renders empty and
    /// whole floats keep their decimal point (`2.0`).
    pub fn to_tag_string(&self) -> String {
        match self {
            FieldValue::String(s) => s.clone(),
            FieldValue::Null => String::new(),
            FieldValue::Float(v) if v.is_finite() && v.fract() == 0.0 => format!("{:.1}", v),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::String(s) => f.write_str(s),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Null => f.write_str("null"),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Integer(i) => write!(f, "{}", i),
            Numeric::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A structured record: field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl RawRecord {
    /// Build a record from a decoded JSON value.
    ///
    /// Returns `None` when the value is not a JSON object.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(
            object
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, FieldValue)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match v {
                FieldValue::String(s) => write!(f, "{:?}: {:?}", k, s)?,
                other => write!(f, "{:?}: {}", k, other)?,
            }
        }
        f.write_str("}")
    }
}

/// One inbound chunk entry: the host-assigned fallback time and the decoded record.
#[derive(Debug, Clone)]
pub struct ChunkEntry {
    pub time: DateTime<Utc>,
    pub record: serde_json::Value,
}

impl ChunkEntry {
    pub fn new(time: DateTime<Utc>, record: serde_json::Value) -> Self {
        Self { time, record }
    }
}
