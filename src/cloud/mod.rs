// cloud/mod.rs

//! # Stack Management Client
//!
//! The capability the poller and driver use to talk to CloudFormation. The
//! production implementation lives in [`aws`]; tests substitute a scripted
//! fake so the state machine can be exercised without a network.

pub mod aws;
#[cfg(test)]
pub mod fake;

use thiserror::Error;

use crate::core::changeset::{ChangeSetDescriptor, ChangeSetKind};
use crate::core::status::StackStatus;

/// Errors reported by a [`StackManagementClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The stack or change set does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An update was rejected because it would not change anything.
    #[error("{0}")]
    NoChanges(String),

    /// Any other error returned by the service.
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    /// The request never got a service response.
    #[error("request failed: {0}")]
    Transport(String),
}

/// A key/value pair forwarded to the remote API, used for both stack
/// parameters and tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Everything a create, update or create-change-set call needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackInput {
    pub stack_name: String,
    pub template_body: String,
    pub parameters: Vec<KeyValue>,
    pub tags: Vec<KeyValue>,
    pub capabilities: Vec<String>,
}

/// The remote operations this tool consumes.
///
/// Calls are blocking. `describe_stack` returns `Ok(None)` when the stack does
/// not exist; every other method reports a missing stack as
/// [`ClientError::NotFound`].
pub trait StackManagementClient {
    fn describe_stack(&self, stack_name: &str) -> Result<Option<StackStatus>, ClientError>;

    /// Returns the stack id.
    fn create_stack(&self, input: &StackInput) -> Result<String, ClientError>;

    /// Returns the stack id.
    fn update_stack(&self, input: &StackInput) -> Result<String, ClientError>;

    fn delete_stack(&self, stack_name: &str) -> Result<(), ClientError>;

    /// Returns the change set id.
    fn create_change_set(
        &self,
        input: &StackInput,
        change_set_name: &str,
        kind: ChangeSetKind,
    ) -> Result<String, ClientError>;

    fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetDescriptor, ClientError>;

    fn execute_change_set(&self, stack_name: &str, change_set_name: &str)
        -> Result<(), ClientError>;
}
