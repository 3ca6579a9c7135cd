// core/changeset.rs

//! # Change Set Model
//!
//! In-memory description of a change set as returned by the remote API.
//! A descriptor is produced by a plan request, rendered or executed, then
//! dropped; nothing here is persisted.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::core::status::{ChangeSetStatus, ExecutionStatus};

/// Kind of change set to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSetKind {
    /// The stack has never been deployed.
    Create,
    /// The stack exists and the change set diffs against it.
    Update,
}

impl fmt::Display for ChangeSetKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Create => f.write_str("CREATE"),
            Self::Update => f.write_str("UPDATE"),
        }
    }
}

/// What a change does to one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeAction {
    Add,
    Modify,
    Remove,
    Import,
    Dynamic,
    Other(String),
}

impl From<&str> for ChangeAction {
    fn from(s: &str) -> Self {
        match s {
            "Add" => Self::Add,
            "Modify" => Self::Modify,
            "Remove" => Self::Remove,
            "Import" => Self::Import,
            "Dynamic" => Self::Dynamic,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Add => f.write_str("Add"),
            Self::Modify => f.write_str("Modify"),
            Self::Remove => f.write_str("Remove"),
            Self::Import => f.write_str("Import"),
            Self::Dynamic => f.write_str("Dynamic"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Whether applying a change destroys and recreates the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    True,
    False,
    Conditional,
    /// Not reported, e.g. for `Add` and `Remove`.
    NotApplicable,
}

impl From<&str> for Replacement {
    fn from(s: &str) -> Self {
        match s {
            "True" => Self::True,
            "False" => Self::False,
            "Conditional" => Self::Conditional,
            _ => Self::NotApplicable,
        }
    }
}

impl fmt::Display for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::True => f.write_str("True"),
            Self::False => f.write_str("False"),
            Self::Conditional => f.write_str("Conditional"),
            Self::NotApplicable => f.write_str("-"),
        }
    }
}

/// One line of a change set diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChange {
    pub action: ChangeAction,
    pub logical_id: String,
    /// Empty for resources that do not exist yet.
    pub physical_id: String,
    pub resource_type: String,
    pub replacement: Replacement,
}

/// A proposed change to a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetDescriptor {
    pub stack_name: String,
    pub change_set_name: String,
    pub change_set_id: String,
    pub execution_status: ExecutionStatus,
    pub status: ChangeSetStatus,
    pub status_reason: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub changes: Vec<ResourceChange>,
}

impl ChangeSetDescriptor {
    /// Creation failed only because the template and parameters match the
    /// deployed stack.
    pub fn is_empty_failure(&self) -> bool {
        self.status == ChangeSetStatus::Failed
            && self.status_reason.as_deref().is_some_and(|reason| {
                reason.contains("didn't contain changes")
                    || reason.contains("No updates are to be performed")
            })
    }

    pub fn is_executable(&self) -> bool {
        self.execution_status == ExecutionStatus::Available
    }
}
