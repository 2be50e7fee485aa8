//! Typed key/value parameters.
//!
//! Keys are of the form `Section/key`, e.g. `MapParticlesNewton/newton_tol`. When parameters are
//! read from TOML, nested tables produce the section prefix:
//!
//! ```
//! # use particle_mesh::config::ParameterStore;
//! let params = ParameterStore::from_toml_str(
//!     r#"
//!     [MapParticlesNewton]
//!     newton_tol = 1e-10
//!     newton_max_iteration = 20
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(params.get_or("MapParticlesNewton/newton_tol", 1e-8), 1e-10);
//! assert_eq!(params.get_or("MapParticlesNewton/newton_max_iteration", 51usize), 20);
//! assert_eq!(params.get_or("CompositeIntersection/newton_tol", 1e-8), 1e-8);
//! ```
use std::error::Error;
use std::fmt;
use std::fmt::Display;

use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A single parameter value.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    Real(f64),
}

impl Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Int(value) => write!(f, "{}", value),
            ParameterValue::Real(value) => write!(f, "{:e}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A value could not be converted to the requested type.
    TypeMismatch { key: String, value: ParameterValue },
    /// The input contained a value that is neither an integer, a float nor a boolean.
    UnsupportedValue { key: String, kind: &'static str },
}

impl Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::TypeMismatch { key, value } => {
                write!(f, "Parameter {} has value {} of incompatible type", key, value)
            }
            ParameterError::UnsupportedValue { key, kind } => {
                write!(f, "Parameter {} has unsupported type {}", key, kind)
            }
        }
    }
}

impl Error for ParameterError {}

/// Types that can be stored in a [`ParameterStore`].
pub trait Parameter: Sized + Copy {
    fn from_value(value: ParameterValue) -> Option<Self>;
    fn into_value(self) -> ParameterValue;
}

impl Parameter for f64 {
    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Real(x) => Some(x),
            ParameterValue::Int(i) => Some(i as f64),
        }
    }

    fn into_value(self) -> ParameterValue {
        ParameterValue::Real(self)
    }
}

impl Parameter for i64 {
    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Int(i) => Some(i),
            ParameterValue::Real(_) => None,
        }
    }

    fn into_value(self) -> ParameterValue {
        ParameterValue::Int(self)
    }
}

impl Parameter for usize {
    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Int(i) => usize::try_from(i).ok(),
            ParameterValue::Real(_) => None,
        }
    }

    fn into_value(self) -> ParameterValue {
        ParameterValue::Int(self as i64)
    }
}

/// Flags are stored as integers, nonzero meaning `true`.
impl Parameter for bool {
    fn from_value(value: ParameterValue) -> Option<Self> {
        match value {
            ParameterValue::Int(i) => Some(i != 0),
            ParameterValue::Real(_) => None,
        }
    }

    fn into_value(self) -> ParameterValue {
        ParameterValue::Int(self as i64)
    }
}

/// A flat store of named parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterStore {
    values: FxHashMap<String, ParameterValue>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set<V: Parameter>(&mut self, key: impl Into<String>, value: V) {
        self.values.insert(key.into(), value.into_value());
    }

    pub fn with<V: Parameter>(mut self, key: impl Into<String>, value: V) -> Self {
        self.set(key, value);
        self
    }

    /// Returns the stored value, `None` if absent, or an error if it has an incompatible type.
    pub fn try_get<V: Parameter>(&self, key: &str) -> Result<Option<V>, ParameterError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(&value) => V::from_value(value)
                .map(Some)
                .ok_or_else(|| ParameterError::TypeMismatch {
                    key: key.to_string(),
                    value,
                }),
        }
    }

    /// Returns the stored value, or `default` if the key is absent or holds an incompatible value.
    pub fn get_or<V: Parameter>(&self, key: &str, default: V) -> V {
        match self.try_get(key) {
            Ok(value) => value.unwrap_or(default),
            Err(err) => {
                warn!("{}. Falling back to default.", err);
                default
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn from_toml_str(input: &str) -> eyre::Result<Self> {
        let table: toml::Table = toml::from_str(input)?;
        let mut store = Self::new();
        store.insert_table("", &table)?;
        Ok(store)
    }

    fn insert_table(&mut self, prefix: &str, table: &toml::Table) -> Result<(), ParameterError> {
        for (name, value) in table {
            let key = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", prefix, name)
            };
            match value {
                toml::Value::Integer(i) => self.set(key, *i),
                toml::Value::Float(x) => self.set(key, *x),
                toml::Value::Boolean(b) => self.set(key, *b),
                toml::Value::Table(nested) => self.insert_table(&key, nested)?,
                other => {
                    return Err(ParameterError::UnsupportedValue {
                        key,
                        kind: other.type_str(),
                    })
                }
            }
        }
        Ok(())
    }
}
