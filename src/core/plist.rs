//! Property-list values for generated `Info.plist` files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::errors::BuildError;

/// A property-list value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlistValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<PlistValue>),
    Dict(BTreeMap<String, PlistValue>),
}

impl PlistValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlistValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a TOML value. Datetimes become strings.
    pub fn from_toml(value: &toml::Value) -> Self {
        match value {
            toml::Value::Boolean(b) => PlistValue::Bool(*b),
            toml::Value::Integer(i) => PlistValue::Integer(*i),
            toml::Value::Float(f) => PlistValue::Float(*f),
            toml::Value::String(s) => PlistValue::String(s.clone()),
            toml::Value::Datetime(d) => PlistValue::String(d.to_string()),
            toml::Value::Array(items) => {
                PlistValue::Array(items.iter().map(PlistValue::from_toml).collect())
            }
            toml::Value::Table(table) => PlistValue::Dict(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), PlistValue::from_toml(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for PlistValue {
    fn from(v: bool) -> Self {
        PlistValue::Bool(v)
    }
}

impl From<i64> for PlistValue {
    fn from(v: i64) -> Self {
        PlistValue::Integer(v)
    }
}

impl From<&str> for PlistValue {
    fn from(v: &str) -> Self {
        PlistValue::String(v.to_string())
    }
}

impl From<String> for PlistValue {
    fn from(v: String) -> Self {
        PlistValue::String(v)
    }
}

/// An ordered property-list dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plist(BTreeMap<String, PlistValue>);

impl Plist {
    pub fn new() -> Self {
        Plist::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PlistValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PlistValue)> {
        self.0.iter()
    }

    /// Insert every key of `other`, replacing colliding top-level keys
    /// wholesale. Nested dictionaries are not merged.
    pub fn merge(&mut self, other: Plist) {
        self.0.extend(other.0);
    }

    /// Build a plist from a TOML table.
    pub fn from_toml_table(table: &toml::Table) -> Self {
        Plist(
            table
                .iter()
                .map(|(k, v)| (k.clone(), PlistValue::from_toml(v)))
                .collect(),
        )
    }

    /// Decode a plist from a JSON object.
    pub fn from_json(value: serde_json::Value) -> Result<Self, BuildError> {
        serde_json::from_value(value).map_err(|e| BuildError::Decoding {
            what: "plist entries".to_string(),
            message: e.to_string(),
        })
    }
}

impl FromIterator<(String, PlistValue)> for Plist {
    fn from_iter<T: IntoIterator<Item = (String, PlistValue)>>(iter: T) -> Self {
        Plist(iter.into_iter().collect())
    }
}
