// cloud/aws.rs

//! # AWS CloudFormation Client
//!
//! Blocking [`StackManagementClient`] backed by `aws-sdk-cloudformation`.
//! The SDK is async, so the client owns a current-thread Tokio runtime and
//! drives every request to completion with `block_on`. Nothing else in the
//! crate sees async code.
//!
//! ## Example Usage
//! ```rust
//! use crate::cloud::aws::AwsStackClient;
//!
//! let client = AwsStackClient::connect()?;
//! let status = client.describe_stack("my-stack")?;
//! ```

use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{Capability, ChangeSetType, OnFailure, Parameter, Tag};
use aws_sdk_cloudformation::Client;
use chrono::{DateTime, TimeZone, Utc};
use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::runtime::{Builder, Runtime};
use uuid::Uuid;

use crate::cloud::{ClientError, KeyValue, StackInput, StackManagementClient};
use crate::core::changeset::{
    ChangeAction, ChangeSetDescriptor, ChangeSetKind, Replacement, ResourceChange,
};
use crate::core::status::{ChangeSetStatus, ExecutionStatus, StackStatus};
use crate::error::AppError;
use crate::globals::{aws_profile, aws_region};

/// Message CloudFormation returns from `DescribeStacks` for an unknown stack.
static MISSING_STACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Stack( with id)? \S+ does not exist").expect("missing-stack pattern is valid")
});

/// CloudFormation client bound to a private single-threaded runtime.
pub struct AwsStackClient {
    runtime: Runtime,
    client: Client,
}

impl AwsStackClient {
    /// Builds a client from the default AWS credential chain, honouring the
    /// region and profile stored in [`crate::globals`].
    pub fn connect() -> Result<Self, AppError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = aws_region() {
            loader = loader.region(Region::new(region.to_string()));
        }
        if let Some(profile) = aws_profile() {
            loader = loader.profile_name(profile);
        }

        let config = runtime.block_on(loader.load());
        match config.region() {
            Some(region) => debug!("Using AWS region: {}", region),
            None => {
                return Err(AppError::Client(
                    "no AWS region configured, pass --region or set AWS_REGION".to_string(),
                ))
            }
        }

        Ok(Self {
            runtime,
            client: Client::new(&config),
        })
    }
}

impl StackManagementClient for AwsStackClient {
    fn describe_stack(&self, stack_name: &str) -> Result<Option<StackStatus>, ClientError> {
        // A named stack always fits on the first page, so `NextToken` is not followed.
        let output = self
            .runtime
            .block_on(self.client.describe_stacks().stack_name(stack_name).send())
            .map_err(classify_sdk_error)?;

        let status = output
            .stacks()
            .first()
            .and_then(|stack| stack.stack_status())
            .map(|status| StackStatus::from(status.as_str()));
        trace!("DescribeStacks [{}] -> {:?}", stack_name, status);
        Ok(status)
    }

    fn create_stack(&self, input: &StackInput) -> Result<String, ClientError> {
        let request = self
            .client
            .create_stack()
            .stack_name(&input.stack_name)
            .template_body(&input.template_body)
            .set_parameters(Some(parameters(&input.parameters)))
            .set_tags(Some(tags(&input.tags)))
            .set_capabilities(capabilities(&input.capabilities))
            .on_failure(OnFailure::Rollback)
            .client_request_token(request_token());

        let output = self
            .runtime
            .block_on(request.send())
            .map_err(classify_sdk_error)?;
        Ok(output.stack_id().unwrap_or(&input.stack_name).to_string())
    }

    fn update_stack(&self, input: &StackInput) -> Result<String, ClientError> {
        let request = self
            .client
            .update_stack()
            .stack_name(&input.stack_name)
            .template_body(&input.template_body)
            .set_parameters(Some(parameters(&input.parameters)))
            .set_tags(Some(tags(&input.tags)))
            .set_capabilities(capabilities(&input.capabilities))
            .client_request_token(request_token());

        let output = self
            .runtime
            .block_on(request.send())
            .map_err(classify_sdk_error)?;
        Ok(output.stack_id().unwrap_or(&input.stack_name).to_string())
    }

    fn delete_stack(&self, stack_name: &str) -> Result<(), ClientError> {
        let request = self
            .client
            .delete_stack()
            .stack_name(stack_name)
            .client_request_token(request_token());

        self.runtime
            .block_on(request.send())
            .map_err(classify_sdk_error)?;
        Ok(())
    }

    fn create_change_set(
        &self,
        input: &StackInput,
        change_set_name: &str,
        kind: ChangeSetKind,
    ) -> Result<String, ClientError> {
        let change_set_type = match kind {
            ChangeSetKind::Create => ChangeSetType::Create,
            ChangeSetKind::Update => ChangeSetType::Update,
        };

        let request = self
            .client
            .create_change_set()
            .stack_name(&input.stack_name)
            .change_set_name(change_set_name)
            .change_set_type(change_set_type)
            .template_body(&input.template_body)
            .set_parameters(Some(parameters(&input.parameters)))
            .set_tags(Some(tags(&input.tags)))
            .set_capabilities(capabilities(&input.capabilities));

        let output = self
            .runtime
            .block_on(request.send())
            .map_err(classify_sdk_error)?;
        Ok(output.id().unwrap_or(change_set_name).to_string())
    }

    fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetDescriptor, ClientError> {
        let mut next_token: Option<String> = None;
        let mut descriptor: Option<ChangeSetDescriptor> = None;

        loop {
            let output = self
                .runtime
                .block_on(
                    self.client
                        .describe_change_set()
                        .stack_name(stack_name)
                        .change_set_name(change_set_name)
                        .set_next_token(next_token.take())
                        .send(),
                )
                .map_err(classify_sdk_error)?;

            let changes = output.changes().iter().filter_map(|change| {
                change.resource_change().map(|rc| ResourceChange {
                    action: rc
                        .action()
                        .map(|a| ChangeAction::from(a.as_str()))
                        .unwrap_or(ChangeAction::Other(String::new())),
                    logical_id: rc.logical_resource_id().unwrap_or_default().to_string(),
                    physical_id: rc.physical_resource_id().unwrap_or_default().to_string(),
                    resource_type: rc.resource_type().unwrap_or_default().to_string(),
                    replacement: rc
                        .replacement()
                        .map(|r| Replacement::from(r.as_str()))
                        .unwrap_or(Replacement::NotApplicable),
                })
            });

            match descriptor.as_mut() {
                Some(existing) => existing.changes.extend(changes),
                None => {
                    descriptor = Some(ChangeSetDescriptor {
                        stack_name: output.stack_name().unwrap_or(stack_name).to_string(),
                        change_set_name: output
                            .change_set_name()
                            .unwrap_or(change_set_name)
                            .to_string(),
                        change_set_id: output.change_set_id().unwrap_or_default().to_string(),
                        execution_status: output
                            .execution_status()
                            .map(|s| ExecutionStatus::from(s.as_str()))
                            .unwrap_or(ExecutionStatus::Unavailable),
                        status: output
                            .status()
                            .map(|s| ChangeSetStatus::from(s.as_str()))
                            .unwrap_or(ChangeSetStatus::CreatePending),
                        status_reason: output.status_reason().map(str::to_string),
                        creation_time: output.creation_time().and_then(|t| {
                            to_utc(t.secs(), t.subsec_nanos())
                        }),
                        changes: changes.collect(),
                    });
                }
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        descriptor.ok_or_else(|| {
            ClientError::NotFound(format!(
                "Change set {} for stack {} not found",
                change_set_name, stack_name
            ))
        })
    }

    fn execute_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<(), ClientError> {
        let request = self
            .client
            .execute_change_set()
            .stack_name(stack_name)
            .change_set_name(change_set_name)
            .client_request_token(request_token());

        self.runtime
            .block_on(request.send())
            .map_err(classify_sdk_error)?;
        Ok(())
    }
}

fn parameters(values: &[KeyValue]) -> Vec<Parameter> {
    values
        .iter()
        .map(|kv| {
            Parameter::builder()
                .parameter_key(&kv.key)
                .parameter_value(&kv.value)
                .build()
        })
        .collect()
}

fn tags(values: &[KeyValue]) -> Vec<Tag> {
    values
        .iter()
        .map(|kv| Tag::builder().key(&kv.key).value(&kv.value).build())
        .collect()
}

fn capabilities(values: &[String]) -> Option<Vec<Capability>> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().map(|c| Capability::from(c.as_str())).collect())
    }
}

fn request_token() -> String {
    format!("{}-{}", crate::app::APP_NAME, Uuid::new_v4())
}

fn to_utc(secs: i64, nanos: u32) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, nanos).single()
}

/// Converts an SDK error into a [`ClientError`], keeping the service error
/// code when there is one.
fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> ClientError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if let Some(service_error) = err.as_service_error() {
        return classify_service_error(
            service_error.code().unwrap_or("Unknown"),
            service_error.message().unwrap_or_default(),
        );
    }
    ClientError::Transport(DisplayErrorContext(err).to_string())
}

/// CloudFormation reports most conditions as `ValidationError`; the message
/// tells them apart.
fn classify_service_error(code: &str, message: &str) -> ClientError {
    if code.starts_with("ChangeSetNotFound") {
        return ClientError::NotFound(message.to_string());
    }
    if code == "ValidationError" {
        if MISSING_STACK.is_match(message) {
            return ClientError::NotFound(message.to_string());
        }
        if message.contains("No updates are to be performed") {
            return ClientError::NoChanges(message.to_string());
        }
    }
    ClientError::Api {
        code: code.to_string(),
        message: message.to_string(),
    }
}
