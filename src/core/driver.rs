// core/driver.rs

//! # Operation Driver
//!
//! Decides which remote mutation a request needs given the stack's current
//! state, submits it, and waits for the stack to settle.
//!
//! | operation | stack     | action | mutation                        | waits for         |
//! |-----------|-----------|--------|---------------------------------|-------------------|
//! | create    | absent    | -      | create stack                    | `CREATE_COMPLETE` |
//! | create    | deployed  | -      | update stack                    | `UPDATE_COMPLETE` |
//! | create    | absent    | plan   | create change set (`CREATE`)    | change set ready  |
//! | create    | deployed  | plan   | create change set (`UPDATE`)    | change set ready  |
//! | create    | absent    | apply  | execute change set              | `CREATE_COMPLETE` |
//! | create    | deployed  | apply  | execute change set              | `UPDATE_COMPLETE` |
//! | delete    | absent    | -      | none                            | -                 |
//! | delete    | present   | -      | delete stack                    | `DELETE_COMPLETE` |
//!
//! No mutation is ever submitted while the stack is in a transitional status:
//! the driver drains any running operation first.

use std::time::Duration;

use log::{debug, info, warn};

use crate::cloud::{ClientError, StackManagementClient};
use crate::core::changeset::{ChangeSetDescriptor, ChangeSetKind};
use crate::core::poller::{
    CancellationToken, ChangeSetOutcome, PollOutcome, PollPolicy, Sleeper, StatusPoller,
};
use crate::core::request::{Action, Operation, StackRequest};
use crate::core::status::{ChangeSetStatus, StackState, StackStatus};
use crate::error::AppError;
use crate::print_info;

/// Poll budgets and delays for one run.
#[derive(Debug, Clone, Copy)]
pub struct DriverSettings {
    /// Draining, direct create, update and delete.
    pub stack_policy: PollPolicy,
    /// Change set creation and execution.
    pub change_set_policy: PollPolicy,
    /// Pause between a mutation and the first poll.
    pub settle_delay: Duration,
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Created,
    Updated,
    /// The update was rejected because nothing would change.
    UpToDate,
    Deleted,
    AlreadyAbsent,
    Planned(ChangeSetDescriptor),
    /// The change set was computed but holds no changes.
    PlannedNoChanges(ChangeSetDescriptor),
    Applied(ChangeSetKind),
}

pub struct OperationDriver<'a> {
    client: &'a dyn StackManagementClient,
    sleeper: &'a dyn Sleeper,
    poller: StatusPoller<'a>,
    cancel: CancellationToken,
    settings: DriverSettings,
}

impl<'a> OperationDriver<'a> {
    pub fn new(
        client: &'a dyn StackManagementClient,
        sleeper: &'a dyn Sleeper,
        cancel: CancellationToken,
        settings: DriverSettings,
    ) -> Self {
        Self {
            client,
            sleeper,
            poller: StatusPoller::new(client, sleeper, cancel.clone()),
            cancel,
            settings,
        }
    }

    /// Runs the request to completion.
    pub fn run(&self, request: &StackRequest) -> Result<Completion, AppError> {
        let stack = request.stack_name.as_str();
        let state = self.settled_state(stack)?;
        self.ensure_not_cancelled(stack)?;
        debug!(
            "Dispatching {} (action: {:?}) for stack {} in state {}",
            request.operation, request.action, stack, state
        );

        match (request.operation, request.action) {
            (Operation::Create, None) if state.is_deployed() => self.update(request),
            (Operation::Create, None) => self.create(request),
            (Operation::Create, Some(Action::Plan)) => self.plan(request, &state),
            (Operation::Create, Some(Action::Apply)) => self.apply(request, &state),
            (Operation::Delete, _) => self.delete(stack, &state),
        }
    }

    /// Reads the stack state, draining any running operation first.
    fn settled_state(&self, stack: &str) -> Result<StackState, AppError> {
        let mut state = self.query(stack)?;
        while state.is_transitional() {
            print_info!("Stack {} is still in action, wait till it is stable..", stack);
            let outcome = self.poller.drain(stack, self.settings.stack_policy);
            into_result(stack, "drain", outcome)?;
            state = self.query(stack)?;
        }
        Ok(state)
    }

    /// Refuses to start new remote work once the user has interrupted.
    fn ensure_not_cancelled(&self, stack: &str) -> Result<(), AppError> {
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled {
                stack: stack.to_string(),
            });
        }
        Ok(())
    }

    fn query(&self, stack: &str) -> Result<StackState, AppError> {
        self.poller
            .current_state(stack)
            .map_err(|source| AppError::Query {
                stack: stack.to_string(),
                source,
            })
    }

    fn create(&self, request: &StackRequest) -> Result<Completion, AppError> {
        let stack = request.stack_name.as_str();
        self.ensure_not_cancelled(stack)?;
        print_info!("Creating stack ...");
        let stack_id = self
            .client
            .create_stack(&request.stack_input())
            .map_err(|source| submit_error(stack, "creation", source))?;
        debug!("CreateStack accepted: {}", stack_id);

        self.confirm(stack, "creation", StackStatus::CreateComplete, self.settings.stack_policy)?;
        Ok(Completion::Created)
    }

    fn update(&self, request: &StackRequest) -> Result<Completion, AppError> {
        let stack = request.stack_name.as_str();
        self.ensure_not_cancelled(stack)?;
        print_info!("Updating stack ...");
        match self.client.update_stack(&request.stack_input()) {
            Ok(stack_id) => debug!("UpdateStack accepted: {}", stack_id),
            Err(ClientError::NoChanges(message)) => {
                info!("UpdateStack for {} made no changes: {}", stack, message);
                return Ok(Completion::UpToDate);
            }
            Err(source) => return Err(submit_error(stack, "update", source)),
        }

        self.confirm(stack, "update", StackStatus::UpdateComplete, self.settings.stack_policy)?;
        Ok(Completion::Updated)
    }

    fn delete(&self, stack: &str, state: &StackState) -> Result<Completion, AppError> {
        if *state == StackState::Absent {
            return Ok(Completion::AlreadyAbsent);
        }

        self.ensure_not_cancelled(stack)?;
        print_info!("Deleting stack ...");
        match self.client.delete_stack(stack) {
            Ok(()) => {}
            Err(ClientError::NotFound(message)) => {
                info!("Stack {} disappeared before delete: {}", stack, message);
                return Ok(Completion::Deleted);
            }
            Err(source) => return Err(submit_error(stack, "delete", source)),
        }

        self.confirm(stack, "delete", StackStatus::DeleteComplete, self.settings.stack_policy)?;
        Ok(Completion::Deleted)
    }

    fn plan(&self, request: &StackRequest, state: &StackState) -> Result<Completion, AppError> {
        let stack = request.stack_name.as_str();
        let name = change_set_name(request)?;
        let kind = if state.is_deployed() {
            ChangeSetKind::Update
        } else {
            ChangeSetKind::Create
        };

        self.ensure_not_cancelled(stack)?;
        print_info!("Creating change set {} ({}) for stack {} ...", name, kind, stack);
        let change_set_id = self
            .client
            .create_change_set(&request.stack_input(), name, kind)
            .map_err(|source| submit_error(stack, "change set creation", source))?;
        debug!("CreateChangeSet accepted: {}", change_set_id);

        let outcome = self
            .poller
            .await_change_set(stack, name, self.settings.change_set_policy);
        let descriptor = match outcome {
            ChangeSetOutcome::Ready(descriptor) => descriptor,
            ChangeSetOutcome::QueryError(source) => {
                return Err(AppError::Query {
                    stack: stack.to_string(),
                    source,
                })
            }
            ChangeSetOutcome::Timeout { attempts, last } => {
                return Err(AppError::Timeout {
                    stack: stack.to_string(),
                    operation: "change set creation".to_string(),
                    attempts,
                    last: last.to_string(),
                })
            }
            ChangeSetOutcome::Cancelled => {
                return Err(AppError::Cancelled {
                    stack: stack.to_string(),
                })
            }
        };

        if descriptor.status != ChangeSetStatus::Failed {
            return Ok(Completion::Planned(descriptor));
        }
        if descriptor.is_empty_failure() {
            return Ok(Completion::PlannedNoChanges(descriptor));
        }
        Err(AppError::OperationFailed {
            stack: stack.to_string(),
            operation: "change set creation".to_string(),
            status: with_reason(descriptor.status.as_str(), descriptor.status_reason.as_deref()),
        })
    }

    fn apply(&self, request: &StackRequest, state: &StackState) -> Result<Completion, AppError> {
        let stack = request.stack_name.as_str();
        let name = change_set_name(request)?;
        let (kind, expected) = if state.is_deployed() {
            (ChangeSetKind::Update, StackStatus::UpdateComplete)
        } else {
            (ChangeSetKind::Create, StackStatus::CreateComplete)
        };

        let descriptor = self
            .client
            .describe_change_set(stack, name)
            .map_err(|source| AppError::Query {
                stack: stack.to_string(),
                source,
            })?;
        if !descriptor.is_executable() {
            return Err(AppError::OperationFailed {
                stack: stack.to_string(),
                operation: "change set execution".to_string(),
                status: with_reason(
                    &format!(
                        "change set {} is {} / {}",
                        name, descriptor.status, descriptor.execution_status
                    ),
                    descriptor.status_reason.as_deref(),
                ),
            });
        }

        self.ensure_not_cancelled(stack)?;
        print_info!("Executing change set {} on stack {} ...", name, stack);
        self.client
            .execute_change_set(stack, name)
            .map_err(|source| submit_error(stack, "change set execution", source))?;

        let operation = match kind {
            ChangeSetKind::Create => "creation",
            ChangeSetKind::Update => "update",
        };
        self.confirm(stack, operation, expected, self.settings.change_set_policy)?;
        Ok(Completion::Applied(kind))
    }

    /// Waits for `expected` after a mutation was accepted.
    fn confirm(
        &self,
        stack: &str,
        operation: &str,
        expected: StackStatus,
        policy: PollPolicy,
    ) -> Result<(), AppError> {
        self.sleeper.sleep(self.settings.settle_delay);
        let outcome = self.poller.await_operation(stack, expected, policy);
        into_result(stack, operation, outcome).map(|_| ())
    }
}

fn change_set_name(request: &StackRequest) -> Result<&str, AppError> {
    request
        .change_set_name
        .as_deref()
        .ok_or_else(|| AppError::Validation("A change set name (-c) is required".to_string()))
}

fn submit_error(stack: &str, operation: &str, source: ClientError) -> AppError {
    warn!("{} request for stack {} rejected: {}", operation, stack, source);
    AppError::Submit {
        stack: stack.to_string(),
        operation: operation.to_string(),
        source,
    }
}

fn with_reason(status: &str, reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("{}: {}", status, reason),
        _ => status.to_string(),
    }
}

/// Maps a poll outcome onto the driver's error taxonomy.
fn into_result(stack: &str, operation: &str, outcome: PollOutcome) -> Result<StackState, AppError> {
    match outcome {
        PollOutcome::Success(state) => Ok(state),
        PollOutcome::Failure(state) => Err(AppError::OperationFailed {
            stack: stack.to_string(),
            operation: operation.to_string(),
            status: state.to_string(),
        }),
        PollOutcome::Timeout { attempts, last } => Err(AppError::Timeout {
            stack: stack.to_string(),
            operation: operation.to_string(),
            attempts,
            last: last.to_string(),
        }),
        PollOutcome::QueryError(source) => Err(AppError::Query {
            stack: stack.to_string(),
            source,
        }),
        PollOutcome::Cancelled => Err(AppError::Cancelled {
            stack: stack.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::fake::{change_set, Call, FakeStackClient};
    use crate::cloud::KeyValue;
    use crate::core::poller::RecordingSleeper;

    fn settings() -> DriverSettings {
        DriverSettings {
            stack_policy: PollPolicy::new(10, Duration::from_secs(5)),
            change_set_policy: PollPolicy::new(20, Duration::from_secs(5)),
            settle_delay: Duration::from_secs(2),
        }
    }

    fn request(operation: Operation, action: Option<Action>) -> StackRequest {
        StackRequest {
            operation,
            action,
            change_set_name: action.map(|_| "cs1".to_string()),
            template_body: "Resources: {}".to_string(),
            stack_name: "web".to_string(),
            parameters: vec![KeyValue::new("A", "1")],
            tags: vec![KeyValue::new("Team", "platform")],
            capabilities: Vec::new(),
        }
    }

    fn run(client: &FakeStackClient, request: &StackRequest) -> Result<Completion, AppError> {
        let sleeper = RecordingSleeper::default();
        let driver = OperationDriver::new(client, &sleeper, CancellationToken::new(), settings());
        driver.run(request)
    }

    #[test]
    fn test_create_on_absent_stack() {
        let client = FakeStackClient::new().with_statuses(&[
            None,
            Some("CREATE_IN_PROGRESS"),
            Some("CREATE_IN_PROGRESS"),
            Some("CREATE_COMPLETE"),
        ]);

        let completion = run(&client, &request(Operation::Create, None)).unwrap();

        assert_eq!(completion, Completion::Created);
        assert_eq!(client.count(&Call::CreateStack), 1);
        assert_eq!(client.stack_mutations(), 1);
        assert_eq!(client.count(&Call::DescribeStack), 4);
    }

    #[test]
    fn test_create_on_existing_stack_updates() {
        let client = FakeStackClient::new().with_statuses(&[
            Some("CREATE_COMPLETE"),
            Some("UPDATE_IN_PROGRESS"),
            Some("UPDATE_COMPLETE"),
        ]);

        let completion = run(&client, &request(Operation::Create, None)).unwrap();

        assert_eq!(completion, Completion::Updated);
        assert_eq!(client.calls()[1], Call::UpdateStack);
        assert_eq!(client.stack_mutations(), 1);
    }

    #[test]
    fn test_update_with_no_changes_is_up_to_date() {
        let client = FakeStackClient::new()
            .with_statuses(&[Some("UPDATE_COMPLETE")])
            .with_mutation_error(ClientError::NoChanges(
                "No updates are to be performed.".to_string(),
            ));

        let completion = run(&client, &request(Operation::Create, None)).unwrap();

        assert_eq!(completion, Completion::UpToDate);
        assert_eq!(client.count(&Call::DescribeStack), 1);
    }

    #[test]
    fn test_create_rollback_is_failure() {
        let client = FakeStackClient::new().with_statuses(&[
            None,
            Some("CREATE_IN_PROGRESS"),
            Some("ROLLBACK_IN_PROGRESS"),
            Some("ROLLBACK_COMPLETE"),
        ]);

        let err = run(&client, &request(Operation::Create, None)).unwrap_err();

        match err {
            AppError::OperationFailed {
                stack,
                operation,
                status,
            } => {
                assert_eq!(stack, "web");
                assert_eq!(operation, "creation");
                assert_eq!(status, "ROLLBACK_COMPLETE");
            }
            other => panic!("Expected OperationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_create_timeout() {
        let client = FakeStackClient::new().with_statuses(&[None, Some("CREATE_IN_PROGRESS")]);

        let err = run(&client, &request(Operation::Create, None)).unwrap_err();

        assert!(matches!(err, AppError::Timeout { attempts: 10, .. }));
        // initial describe + 10 polls
        assert_eq!(client.count(&Call::DescribeStack), 11);
    }

    #[test]
    fn test_rejected_submission_is_reported() {
        let client = FakeStackClient::new()
            .with_statuses(&[None])
            .with_mutation_error(ClientError::Api {
                code: "InsufficientCapabilitiesException".to_string(),
                message: "Requires capabilities : [CAPABILITY_IAM]".to_string(),
            });

        let err = run(&client, &request(Operation::Create, None)).unwrap_err();

        assert!(matches!(err, AppError::Submit { ref operation, .. } if operation == "creation"));
        assert_eq!(client.count(&Call::DescribeStack), 1);
    }

    #[test]
    fn test_initial_query_error_is_not_absent() {
        let client = FakeStackClient::new().with_describe_error(ClientError::Transport(
            "dispatch failure".to_string(),
        ));

        let err = run(&client, &request(Operation::Delete, None)).unwrap_err();

        assert!(matches!(err, AppError::Query { .. }));
        assert_eq!(client.stack_mutations(), 0);
    }

    #[test]
    fn test_delete_on_absent_stack_is_noop() {
        let client = FakeStackClient::new().with_statuses(&[None]);

        let completion = run(&client, &request(Operation::Delete, None)).unwrap();

        assert_eq!(completion, Completion::AlreadyAbsent);
        assert_eq!(client.stack_mutations(), 0);
    }

    #[test]
    fn test_delete_complete_counts_as_absent() {
        let client = FakeStackClient::new().with_statuses(&[Some("DELETE_COMPLETE")]);

        let completion = run(&client, &request(Operation::Delete, None)).unwrap();

        assert_eq!(completion, Completion::AlreadyAbsent);
        assert_eq!(client.stack_mutations(), 0);
    }

    #[test]
    fn test_delete_succeeds_when_stack_disappears() {
        let client = FakeStackClient::new()
            .with_statuses(&[Some("CREATE_COMPLETE"), Some("DELETE_IN_PROGRESS")])
            .with_describe_error(ClientError::NotFound(
                "Stack with id web does not exist".to_string(),
            ));

        let completion = run(&client, &request(Operation::Delete, None)).unwrap();

        assert_eq!(completion, Completion::Deleted);
        assert_eq!(client.count(&Call::DeleteStack), 1);
    }

    #[test]
    fn test_delete_failed_is_failure() {
        let client = FakeStackClient::new()
            .with_statuses(&[Some("UPDATE_COMPLETE"), Some("DELETE_IN_PROGRESS"), Some("DELETE_FAILED")]);

        let err = run(&client, &request(Operation::Delete, None)).unwrap_err();

        assert!(matches!(err, AppError::OperationFailed { ref status, .. } if status == "DELETE_FAILED"));
    }

    #[test]
    fn test_transitional_stack_is_drained_before_mutation() {
        let client = FakeStackClient::new().with_statuses(&[
            Some("UPDATE_IN_PROGRESS"),
            Some("UPDATE_IN_PROGRESS"),
            Some("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS"),
            Some("UPDATE_COMPLETE"),
            Some("UPDATE_COMPLETE"),
            Some("DELETE_IN_PROGRESS"),
            Some("DELETE_COMPLETE"),
        ]);

        let completion = run(&client, &request(Operation::Delete, None)).unwrap();

        assert_eq!(completion, Completion::Deleted);
        assert_eq!(client.rejected_while_transitional(), 0);
        let delete_at = client
            .calls()
            .iter()
            .position(|c| *c == Call::DeleteStack)
            .unwrap();
        assert_eq!(delete_at, 5);
    }

    #[test]
    fn test_no_mutation_while_transitional_for_any_request() {
        let requests = [
            request(Operation::Create, None),
            request(Operation::Create, Some(Action::Plan)),
            request(Operation::Create, Some(Action::Apply)),
            request(Operation::Delete, None),
        ];

        for req in &requests {
            let client = FakeStackClient::new()
                .with_statuses(&[
                    Some("UPDATE_ROLLBACK_IN_PROGRESS"),
                    Some("UPDATE_ROLLBACK_IN_PROGRESS"),
                    Some("UPDATE_ROLLBACK_COMPLETE"),
                    Some("UPDATE_ROLLBACK_COMPLETE"),
                ])
                .with_change_sets(vec![change_set("CREATE_COMPLETE", "AVAILABLE")]);

            let _ = run(&client, req);

            assert_eq!(
                client.rejected_while_transitional(),
                0,
                "mutation submitted while transitional for {:?}",
                req.action
            );
            assert!(client.calls().len() > 3);
        }
    }

    #[test]
    fn test_drain_timeout_stops_before_mutation() {
        let client = FakeStackClient::new().with_statuses(&[Some("DELETE_IN_PROGRESS")]);

        let err = run(&client, &request(Operation::Create, None)).unwrap_err();

        match err {
            AppError::Timeout {
                operation, last, ..
            } => {
                assert_eq!(operation, "drain");
                assert_eq!(last, "DELETE_IN_PROGRESS");
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
        assert_eq!(client.stack_mutations(), 0);
    }

    #[test]
    fn test_plan_on_existing_stack_creates_update_change_set() {
        let client = FakeStackClient::new()
            .with_statuses(&[Some("UPDATE_COMPLETE")])
            .with_change_sets(vec![
                change_set("CREATE_PENDING", "UNAVAILABLE"),
                change_set("CREATE_PENDING", "UNAVAILABLE"),
                change_set("CREATE_COMPLETE", "AVAILABLE"),
            ]);

        let completion = run(&client, &request(Operation::Create, Some(Action::Plan))).unwrap();

        match completion {
            Completion::Planned(descriptor) => {
                assert_eq!(descriptor.status, ChangeSetStatus::CreateComplete)
            }
            other => panic!("Expected Planned, got {:?}", other),
        }
        assert_eq!(
            client.calls(),
            vec![
                Call::DescribeStack,
                Call::CreateChangeSet(ChangeSetKind::Update),
                Call::DescribeChangeSet,
                Call::DescribeChangeSet,
                Call::DescribeChangeSet,
            ]
        );
        assert_eq!(client.stack_mutations(), 0);
    }

    #[test]
    fn test_plan_on_absent_stack_creates_create_change_set() {
        let client = FakeStackClient::new()
            .with_statuses(&[None])
            .with_change_sets(vec![change_set("CREATE_COMPLETE", "AVAILABLE")]);

        let completion = run(&client, &request(Operation::Create, Some(Action::Plan))).unwrap();

        assert!(matches!(completion, Completion::Planned(_)));
        assert_eq!(client.count(&Call::CreateChangeSet(ChangeSetKind::Create)), 1);
    }

    #[test]
    fn test_plan_on_review_placeholder_uses_create_type() {
        let client = FakeStackClient::new()
            .with_statuses(&[Some("REVIEW_IN_PROGRESS")])
            .with_change_sets(vec![change_set("CREATE_COMPLETE", "AVAILABLE")]);

        run(&client, &request(Operation::Create, Some(Action::Plan))).unwrap();

        assert_eq!(client.count(&Call::CreateChangeSet(ChangeSetKind::Create)), 1);
        // the placeholder is not drained
        assert_eq!(client.count(&Call::DescribeStack), 1);
    }

    #[test]
    fn test_plan_without_changes_is_informational() {
        let mut empty = change_set("FAILED", "UNAVAILABLE");
        empty.status_reason = Some(
            "The submitted information didn't contain changes. Submit different information to create a change set."
                .to_string(),
        );
        let client = FakeStackClient::new()
            .with_statuses(&[Some("UPDATE_COMPLETE")])
            .with_change_sets(vec![empty]);

        let completion = run(&client, &request(Operation::Create, Some(Action::Plan))).unwrap();

        assert!(matches!(completion, Completion::PlannedNoChanges(_)));
    }

    #[test]
    fn test_plan_with_failed_change_set_is_failure() {
        let mut broken = change_set("FAILED", "UNAVAILABLE");
        broken.status_reason = Some("Template format error: unresolved resource".to_string());
        let client = FakeStackClient::new()
            .with_statuses(&[Some("UPDATE_COMPLETE")])
            .with_change_sets(vec![broken]);

        let err = run(&client, &request(Operation::Create, Some(Action::Plan))).unwrap_err();

        match err {
            AppError::OperationFailed { status, .. } => {
                assert_eq!(status, "FAILED: Template format error: unresolved resource")
            }
            other => panic!("Expected OperationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_on_existing_stack() {
        let client = FakeStackClient::new()
            .with_statuses(&[
                Some("UPDATE_COMPLETE"),
                Some("UPDATE_IN_PROGRESS"),
                Some("UPDATE_COMPLETE"),
            ])
            .with_change_sets(vec![change_set("CREATE_COMPLETE", "AVAILABLE")]);

        let completion = run(&client, &request(Operation::Create, Some(Action::Apply))).unwrap();

        assert_eq!(completion, Completion::Applied(ChangeSetKind::Update));
        assert_eq!(client.count(&Call::ExecuteChangeSet), 1);
        assert_eq!(client.stack_mutations(), 1);
    }

    #[test]
    fn test_apply_on_review_placeholder_waits_for_create_complete() {
        let client = FakeStackClient::new()
            .with_statuses(&[
                Some("REVIEW_IN_PROGRESS"),
                Some("CREATE_IN_PROGRESS"),
                Some("CREATE_COMPLETE"),
            ])
            .with_change_sets(vec![change_set("CREATE_COMPLETE", "AVAILABLE")]);

        let completion = run(&client, &request(Operation::Create, Some(Action::Apply))).unwrap();

        assert_eq!(completion, Completion::Applied(ChangeSetKind::Create));
    }

    #[test]
    fn test_apply_failure_exits_with_failure() {
        let client = FakeStackClient::new()
            .with_statuses(&[
                Some("UPDATE_COMPLETE"),
                Some("UPDATE_IN_PROGRESS"),
                Some("UPDATE_FAILED"),
            ])
            .with_change_sets(vec![change_set("CREATE_COMPLETE", "AVAILABLE")]);

        let err = run(&client, &request(Operation::Create, Some(Action::Apply))).unwrap_err();

        assert!(matches!(err, AppError::OperationFailed { ref status, .. } if status == "UPDATE_FAILED"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_apply_refuses_unavailable_change_set() {
        let client = FakeStackClient::new()
            .with_statuses(&[Some("UPDATE_COMPLETE")])
            .with_change_sets(vec![change_set("CREATE_COMPLETE", "OBSOLETE")]);

        let err = run(&client, &request(Operation::Create, Some(Action::Apply))).unwrap_err();

        assert!(matches!(err, AppError::OperationFailed { .. }));
        assert_eq!(client.stack_mutations(), 0);
    }

    #[test]
    fn test_apply_missing_change_set_is_reported() {
        let client = FakeStackClient::new().with_statuses(&[Some("UPDATE_COMPLETE")]);

        let err = run(&client, &request(Operation::Create, Some(Action::Apply))).unwrap_err();

        assert!(matches!(
            err,
            AppError::Query {
                source: ClientError::NotFound(_),
                ..
            }
        ));
        assert_eq!(client.stack_mutations(), 0);
    }

    #[test]
    fn test_plan_timeout_reports_last_change_set_status() {
        let client = FakeStackClient::new()
            .with_statuses(&[Some("UPDATE_COMPLETE")])
            .with_change_sets(vec![
                change_set("CREATE_PENDING", "UNAVAILABLE"),
                change_set("CREATE_IN_PROGRESS", "UNAVAILABLE"),
            ]);

        let err = run(&client, &request(Operation::Create, Some(Action::Plan))).unwrap_err();

        match err {
            AppError::Timeout {
                operation,
                attempts,
                last,
                ..
            } => {
                assert_eq!(operation, "change set creation");
                assert_eq!(attempts, 20);
                assert_eq!(last, "CREATE_IN_PROGRESS");
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_run_reports_cancellation() {
        let client = FakeStackClient::new().with_statuses(&[None, Some("CREATE_IN_PROGRESS")]);
        let sleeper = RecordingSleeper::default();
        let cancel = CancellationToken::new();
        let driver = OperationDriver::new(&client, &sleeper, cancel.clone(), settings());
        cancel.cancel();

        let err = driver.run(&request(Operation::Create, None)).unwrap_err();

        assert!(matches!(err, AppError::Cancelled { .. }));
        assert_eq!(client.stack_mutations(), 0);
        assert_eq!(client.calls(), vec![Call::DescribeStack]);
    }

    #[test]
    fn test_interrupted_run_submits_nothing_for_any_request() {
        let requests = [
            request(Operation::Create, None),
            request(Operation::Create, Some(Action::Plan)),
            request(Operation::Create, Some(Action::Apply)),
            request(Operation::Delete, None),
        ];

        for req in &requests {
            let client = FakeStackClient::new()
                .with_statuses(&[Some("UPDATE_COMPLETE")])
                .with_change_sets(vec![change_set("CREATE_COMPLETE", "AVAILABLE")]);
            let sleeper = RecordingSleeper::default();
            let cancel = CancellationToken::new();
            cancel.cancel();
            let driver = OperationDriver::new(&client, &sleeper, cancel, settings());

            let err = driver.run(req).unwrap_err();

            assert!(matches!(err, AppError::Cancelled { .. }));
            assert_eq!(client.stack_mutations(), 0, "{:?}", req.action);
            assert_eq!(client.count(&Call::CreateChangeSet(ChangeSetKind::Update)), 0);
            assert_eq!(client.count(&Call::ExecuteChangeSet), 0);
        }
    }

    #[test]
    fn test_settle_delay_precedes_polling() {
        let client = FakeStackClient::new().with_statuses(&[None, Some("CREATE_COMPLETE")]);
        let sleeper = RecordingSleeper::default();
        let driver = OperationDriver::new(&client, &sleeper, CancellationToken::new(), settings());

        driver.run(&request(Operation::Create, None)).unwrap();

        assert_eq!(*sleeper.sleeps.borrow(), vec![Duration::from_secs(2)]);
    }
}
