// core/request.rs

//! # Stack Request
//!
//! Validates command-line input and builds the immutable [`StackRequest`] the
//! driver executes. Every check here runs before any remote call is made.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::cloud::{KeyValue, StackInput};
use crate::core::variables::Variables;
use crate::error::AppError;

/// What to do with the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create the stack, or update it if it already exists.
    Create,
    Delete,
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Operation::Create),
            "delete" => Ok(Operation::Delete),
            _ => Err("Invalid option -o. Use 'create' or 'delete'".to_string()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Change set phase for a create operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a change set and show it.
    Plan,
    /// Execute a previously planned change set.
    Apply,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan" => Ok(Action::Plan),
            "apply" => Ok(Action::Apply),
            _ => Err("Invalid option -a. Use 'plan' or 'apply'".to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Plan => f.write_str("plan"),
            Self::Apply => f.write_str("apply"),
        }
    }
}

/// Unvalidated command-line values.
#[derive(Debug, Default, Clone)]
pub struct RawRequest<'a> {
    pub operation: &'a str,
    pub action: Option<&'a str>,
    pub change_set: Option<&'a str>,
    pub template: &'a str,
    pub variables: &'a str,
}

/// A validated request, built once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
    pub operation: Operation,
    pub action: Option<Action>,
    pub change_set_name: Option<String>,
    pub template_body: String,
    pub stack_name: String,
    pub parameters: Vec<KeyValue>,
    pub tags: Vec<KeyValue>,
    pub capabilities: Vec<String>,
}

impl StackRequest {
    /// Validates the raw input, then reads the template and variables files.
    pub fn from_raw(raw: &RawRequest) -> Result<Self, AppError> {
        let operation = raw.operation.parse::<Operation>().map_err(AppError::Validation)?;

        let action = match raw.action {
            Some(value) => Some(value.parse::<Action>().map_err(AppError::Validation)?),
            None => None,
        };

        if operation == Operation::Delete && action.is_some() {
            return Err(AppError::Validation(
                "Option -a is only valid with '-o create'".to_string(),
            ));
        }

        let change_set_name = raw
            .change_set
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        match (action, &change_set_name) {
            (Some(action), None) => {
                return Err(AppError::Validation(format!(
                    "Option -c is required with '-a {}'",
                    action
                )))
            }
            (None, Some(_)) => {
                return Err(AppError::Validation(
                    "Option -c is only valid together with -a".to_string(),
                ))
            }
            _ => {}
        }

        let template_path = Path::new(raw.template);
        if !template_path.exists() {
            return Err(AppError::Validation(format!(
                "Template file {} does not exist.",
                raw.template
            )));
        }

        let variables_path = Path::new(raw.variables);
        if !variables_path.exists() {
            return Err(AppError::Validation(format!(
                "Variables file {} does not exist.",
                raw.variables
            )));
        }

        let template_body = fs::read_to_string(template_path)?;
        let variables = Variables::load_from_file(variables_path)?;
        debug!(
            "Loaded {} parameters and {} tags for stack {}",
            variables.parameters.len(),
            variables.tags.len(),
            variables.stack_name
        );

        Ok(Self {
            operation,
            action,
            change_set_name,
            template_body,
            stack_name: variables.stack_name,
            parameters: variables.parameters,
            tags: variables.tags,
            capabilities: variables.capabilities,
        })
    }

    /// The payload for create, update and create-change-set calls.
    pub fn stack_input(&self) -> StackInput {
        StackInput {
            stack_name: self.stack_name.clone(),
            template_body: self.template_body.clone(),
            parameters: self.parameters.clone(),
            tags: self.tags.clone(),
            capabilities: self.capabilities.clone(),
        }
    }
}
