// cloud/fake.rs

//! Scripted in-memory [`StackManagementClient`] for tests.
//!
//! Describe calls replay a queue of responses; once the queue is drained the
//! last status sticks. Every call is recorded, and mutating calls made while
//! the current status is transitional are rejected the way CloudFormation
//! rejects them.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use crate::cloud::{ClientError, StackInput, StackManagementClient};
use crate::core::changeset::{ChangeSetDescriptor, ChangeSetKind};
use crate::core::status::{ChangeSetStatus, ExecutionStatus, StackStatus};

/// One recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DescribeStack,
    CreateStack,
    UpdateStack,
    DeleteStack,
    CreateChangeSet(ChangeSetKind),
    DescribeChangeSet,
    ExecuteChangeSet,
}

impl Call {
    /// Calls that change the stack itself.
    pub fn is_stack_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateStack | Call::UpdateStack | Call::DeleteStack | Call::ExecuteChangeSet
        )
    }
}

pub type DescribeResponse = Result<Option<StackStatus>, ClientError>;

#[derive(Default)]
pub struct FakeStackClient {
    describes: RefCell<VecDeque<DescribeResponse>>,
    current: RefCell<Option<StackStatus>>,
    change_sets: RefCell<VecDeque<ChangeSetDescriptor>>,
    last_change_set: RefCell<Option<ChangeSetDescriptor>>,
    mutation_error: RefCell<Option<ClientError>>,
    calls: RefCell<Vec<Call>>,
    rejected_while_transitional: Cell<usize>,
}

impl FakeStackClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues describe results, replayed in order.
    pub fn with_statuses(self, statuses: &[Option<&str>]) -> Self {
        {
            let mut queue = self.describes.borrow_mut();
            for status in statuses {
                queue.push_back(Ok(status.map(StackStatus::from)));
            }
        }
        self
    }

    /// Queues a describe error.
    pub fn with_describe_error(self, error: ClientError) -> Self {
        self.describes.borrow_mut().push_back(Err(error));
        self
    }

    /// Queues change set descriptions, replayed in order.
    pub fn with_change_sets(self, descriptors: Vec<ChangeSetDescriptor>) -> Self {
        self.change_sets.borrow_mut().extend(descriptors);
        self
    }

    /// Makes every mutating call fail with `error`.
    pub fn with_mutation_error(self, error: ClientError) -> Self {
        *self.mutation_error.borrow_mut() = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.borrow().iter().filter(|c| *c == call).count()
    }

    pub fn stack_mutations(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.is_stack_mutation())
            .count()
    }

    pub fn rejected_while_transitional(&self) -> usize {
        self.rejected_while_transitional.get()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn mutate(&self, stack_name: &str) -> Result<(), ClientError> {
        if let Some(status) = self.current.borrow().as_ref() {
            if status.is_transitional() {
                self.rejected_while_transitional
                    .set(self.rejected_while_transitional.get() + 1);
                return Err(ClientError::Api {
                    code: "ValidationError".to_string(),
                    message: format!(
                        "Stack:{} is in {} state and can not be updated.",
                        stack_name, status
                    ),
                });
            }
        }
        match self.mutation_error.borrow().as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// A change set description with the given statuses and no changes.
pub fn change_set(status: &str, execution: &str) -> ChangeSetDescriptor {
    ChangeSetDescriptor {
        stack_name: "web".to_string(),
        change_set_name: "cs1".to_string(),
        change_set_id: "arn:aws:cloudformation:changeSet/cs1".to_string(),
        execution_status: ExecutionStatus::from(execution),
        status: ChangeSetStatus::from(status),
        status_reason: None,
        creation_time: None,
        changes: Vec::new(),
    }
}

impl StackManagementClient for FakeStackClient {
    fn describe_stack(&self, _stack_name: &str) -> Result<Option<StackStatus>, ClientError> {
        self.record(Call::DescribeStack);
        let next = self.describes.borrow_mut().pop_front();
        match next {
            Some(Ok(status)) => {
                *self.current.borrow_mut() = status.clone();
                Ok(status)
            }
            Some(Err(error)) => Err(error),
            None => Ok(self.current.borrow().clone()),
        }
    }

    fn create_stack(&self, input: &StackInput) -> Result<String, ClientError> {
        self.record(Call::CreateStack);
        self.mutate(&input.stack_name)?;
        Ok(format!("arn:aws:cloudformation:stack/{}", input.stack_name))
    }

    fn update_stack(&self, input: &StackInput) -> Result<String, ClientError> {
        self.record(Call::UpdateStack);
        self.mutate(&input.stack_name)?;
        Ok(format!("arn:aws:cloudformation:stack/{}", input.stack_name))
    }

    fn delete_stack(&self, stack_name: &str) -> Result<(), ClientError> {
        self.record(Call::DeleteStack);
        self.mutate(stack_name)
    }

    fn create_change_set(
        &self,
        input: &StackInput,
        change_set_name: &str,
        kind: ChangeSetKind,
    ) -> Result<String, ClientError> {
        self.record(Call::CreateChangeSet(kind));
        self.mutate(&input.stack_name)?;
        Ok(format!("arn:aws:cloudformation:changeSet/{}", change_set_name))
    }

    fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetDescriptor, ClientError> {
        self.record(Call::DescribeChangeSet);
        let next = self.change_sets.borrow_mut().pop_front();
        if let Some(descriptor) = next {
            *self.last_change_set.borrow_mut() = Some(descriptor);
        }
        self.last_change_set.borrow().clone().ok_or_else(|| {
            ClientError::NotFound(format!(
                "ChangeSet [{}] does not exist for stack {}",
                change_set_name, stack_name
            ))
        })
    }

    fn execute_change_set(
        &self,
        stack_name: &str,
        _change_set_name: &str,
    ) -> Result<(), ClientError> {
        self.record(Call::ExecuteChangeSet);
        self.mutate(stack_name)
    }
}
