//! Endpoint catalog
//!
//! This module turns the `[[endpoint]]` tables of the configuration into
//! immutable [`EndpointDescriptor`]s and resolves them into absolute URLs.

mod resolve;

pub use resolve::resolve_url;

use crate::config::Config;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// A scalar value used to fill a path template placeholder
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::String(value) => f.write_str(value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// A named, parameterized template describing one collectible URL
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    /// Unique, human-readable identifier (stored with every row)
    pub name: String,

    /// Path with `{placeholder}` segments, relative to the base URL
    pub path_template: String,

    /// Values substituted into the placeholders
    pub params: BTreeMap<String, ParamValue>,
}

impl EndpointDescriptor {
    pub fn new(name: impl Into<String>, path_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path_template: path_template.into(),
            params: BTreeMap::new(),
        }
    }

    /// Adds a placeholder value, builder style
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Builds the endpoint catalog from a validated configuration
///
/// Order follows the configuration file.
pub fn build_catalog(config: &Config) -> Vec<EndpointDescriptor> {
    config
        .endpoints
        .iter()
        .map(|entry| EndpointDescriptor {
            name: entry.name.clone(),
            path_template: entry.path_template.clone(),
            params: entry.params.clone(),
        })
        .collect()
}
