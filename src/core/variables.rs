// core/variables.rs

//! # Variables File
//!
//! Loads the YAML file that names the stack and carries its parameters, tags
//! and capabilities.
//!
//! ```yaml
//! StackName: web-prod
//! parameters:
//!   - InstanceType: t3.micro
//!   - Subnets: [subnet-a, subnet-b]
//! tags:
//!   - Team: platform
//! capabilities:
//!   - CAPABILITY_IAM
//! ```
//!
//! `parameters` and `tags` are sequences of single-key maps; they are flattened
//! into ordered key/value lists in the order they appear in the file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::cloud::KeyValue;

/// Errors that can occur when loading a variables file.
#[derive(Error, Debug)]
pub enum VariablesError {
    #[error("Failed to read variables file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse variables file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),
}

pub type VariablesResult<T> = Result<T, VariablesError>;

/// Raw shape of the variables file.
#[derive(Debug, Deserialize)]
struct RawVariables {
    #[serde(rename = "StackName")]
    stack_name: Option<String>,

    parameters: Option<Vec<Mapping>>,

    tags: Option<Vec<Mapping>>,

    capabilities: Option<Vec<String>>,
}

/// Parsed and flattened variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variables {
    pub stack_name: String,
    pub parameters: Vec<KeyValue>,
    pub tags: Vec<KeyValue>,
    pub capabilities: Vec<String>,
}

impl Variables {
    pub fn load_from_file(path: &Path) -> VariablesResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> VariablesResult<Self> {
        let raw: RawVariables = serde_yaml::from_str(content)?;

        let stack_name = raw
            .stack_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| VariablesError::MissingField("StackName".to_string()))?;

        let parameters = raw
            .parameters
            .ok_or_else(|| VariablesError::MissingField("parameters".to_string()))?;

        Ok(Self {
            stack_name,
            parameters: flatten_pairs("parameters", &parameters)?,
            tags: flatten_pairs("tags", &raw.tags.unwrap_or_default())?,
            capabilities: raw.capabilities.unwrap_or_default(),
        })
    }
}

/// Flattens a sequence of maps into key/value pairs, keeping file order.
///
/// Maps are expected to hold one key each; extra keys are taken in the order
/// they are written.
pub fn flatten_pairs(section: &str, entries: &[Mapping]) -> VariablesResult<Vec<KeyValue>> {
    let mut pairs = Vec::new();
    for entry in entries {
        for (key, value) in entry {
            let key = scalar_to_string(key).ok_or_else(|| {
                VariablesError::InvalidField(format!("{}: keys must be scalars", section))
            })?;
            let value = value_to_string(value).ok_or_else(|| {
                VariablesError::InvalidField(format!(
                    "{}: value for '{}' must be a scalar or a list of scalars",
                    section, key
                ))
            })?;
            pairs.push(KeyValue::new(key, value));
        }
    }
    Ok(pairs)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Scalars are stringified; a list becomes a comma separated value.
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(",")),
        other => scalar_to_string(other),
    }
}
