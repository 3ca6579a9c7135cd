// core/poller.rs

//! # Status Poller
//!
//! Reads the remote stack status and blocks until an operation settles.
//!
//! Polling is expressed as a [`PollPolicy`] (attempt budget plus fixed
//! interval) driving a probe closure that classifies each observation. Sleeps
//! go through the [`Sleeper`] trait so tests run without real delays, and a
//! [`CancellationToken`] lets Ctrl-C stop a wait early. Cancelling only stops
//! the local wait; the remote operation keeps running.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::cloud::{ClientError, StackManagementClient};
use crate::core::changeset::ChangeSetDescriptor;
use crate::core::status::{ChangeSetStatus, StackState, StackStatus};

// ============================
// Cancellation
// ============================

/// Shared flag set when the user asks to stop waiting.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes any sleeper. Idempotent.
    pub fn cancel(&self) {
        let (flag, signal) = &*self.inner;
        let mut cancelled = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *cancelled = true;
        signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Blocks for up to `duration`, returning early if cancelled.
    ///
    /// Returns `true` when cancellation was requested.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (flag, signal) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (cancelled, _) = signal
            .wait_timeout_while(guard, duration, |cancelled| !*cancelled)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cancelled
    }
}

// ============================
// Sleeping
// ============================

/// Pauses the poll loop between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Real sleeper that wakes up early when the token is cancelled.
pub struct ThreadSleeper {
    cancel: CancellationToken,
}

impl ThreadSleeper {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        self.cancel.wait_timeout(duration);
    }
}

// ============================
// Poll Policy
// ============================

/// Attempt budget and interval for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Calls `probe` until it resolves, sleeping `interval` between calls.
    ///
    /// The probe receives the 1-based attempt number. Exactly `max_attempts`
    /// probes run before giving up with [`Polled::Exhausted`]; there is no
    /// sleep after the last one. Cancellation is checked before every probe.
    pub fn run<T, F>(
        &self,
        sleeper: &dyn Sleeper,
        cancel: &CancellationToken,
        mut probe: F,
    ) -> Polled<T>
    where
        F: FnMut(u32) -> Probe<T>,
    {
        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Polled::Cancelled;
            }
            match probe(attempt) {
                Probe::Done(value) => return Polled::Done(value),
                Probe::Abort(error) => return Polled::Aborted(error),
                Probe::Pending => {
                    if attempt < self.max_attempts {
                        sleeper.sleep(self.interval);
                    }
                }
            }
        }
        Polled::Exhausted {
            attempts: self.max_attempts,
        }
    }
}

/// Classification of one observation.
pub enum Probe<T> {
    Done(T),
    Pending,
    Abort(ClientError),
}

/// Result of running a [`PollPolicy`].
#[derive(Debug, PartialEq, Eq)]
pub enum Polled<T> {
    Done(T),
    Aborted(ClientError),
    Exhausted { attempts: u32 },
    Cancelled,
}

// ============================
// Stack Outcomes
// ============================

/// How a wait on a stack ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Reached a status in the expected set.
    Success(StackState),
    /// Reached a status in the explicit failure set.
    Failure(StackState),
    /// `attempts` polls ran without resolving.
    Timeout { attempts: u32, last: StackState },
    /// A describe call failed.
    QueryError(ClientError),
    Cancelled,
}

/// How a wait on a change set ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSetOutcome {
    /// Creation is no longer pending; the descriptor may still be `FAILED`.
    Ready(ChangeSetDescriptor),
    Timeout {
        attempts: u32,
        last: ChangeSetStatus,
    },
    QueryError(ClientError),
    Cancelled,
}

// ============================
// Status Poller
// ============================

pub struct StatusPoller<'a> {
    client: &'a dyn StackManagementClient,
    sleeper: &'a dyn Sleeper,
    cancel: CancellationToken,
}

impl<'a> StatusPoller<'a> {
    pub fn new(
        client: &'a dyn StackManagementClient,
        sleeper: &'a dyn Sleeper,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            sleeper,
            cancel,
        }
    }

    /// One describe call.
    ///
    /// A missing stack and `DELETE_COMPLETE` both yield `Absent`; any other
    /// failure is returned as an error so callers never mistake a failed query
    /// for a missing stack.
    pub fn current_state(&self, stack_name: &str) -> Result<StackState, ClientError> {
        match self.client.describe_stack(stack_name) {
            Ok(status) => Ok(StackState::from_status(status)),
            Err(ClientError::NotFound(message)) => {
                debug!("Stack [{}] not found: {}", stack_name, message);
                Ok(StackState::Absent)
            }
            Err(error) => Err(error),
        }
    }

    /// Polls until the stack reaches a status in `expected` or `failures`.
    ///
    /// An absent stack matches as `DELETE_COMPLETE`. Statuses in neither set
    /// (transitional or unrecognised) keep the wait going until the policy's
    /// attempt budget is spent.
    pub fn await_terminal_status(
        &self,
        stack_name: &str,
        expected: &[StackStatus],
        failures: &[StackStatus],
        policy: PollPolicy,
    ) -> PollOutcome {
        let started = Instant::now();
        let mut last = StackState::Absent;

        let polled = policy.run(self.sleeper, &self.cancel, |attempt| {
            let state = match self.current_state(stack_name) {
                Ok(state) => state,
                Err(error) => return Probe::Abort(error),
            };
            let status = state.effective_status();
            last = state.clone();

            if expected.contains(&status) {
                Probe::Done(PollOutcome::Success(state))
            } else if failures.contains(&status) {
                Probe::Done(PollOutcome::Failure(state))
            } else {
                info!(
                    " - waiting for Stack {}: {} (attempt {}/{}, {} seconds elapsed)",
                    stack_name,
                    state,
                    attempt,
                    policy.max_attempts,
                    started.elapsed().as_secs()
                );
                Probe::Pending
            }
        });

        match polled {
            Polled::Done(outcome) => outcome,
            Polled::Aborted(error) => PollOutcome::QueryError(error),
            Polled::Exhausted { attempts } => PollOutcome::Timeout { attempts, last },
            Polled::Cancelled => PollOutcome::Cancelled,
        }
    }

    /// Waits for a single operation: `expected` is success and every other
    /// terminal status is failure.
    pub fn await_operation(
        &self,
        stack_name: &str,
        expected: StackStatus,
        policy: PollPolicy,
    ) -> PollOutcome {
        let failures = StackStatus::terminal_except(&expected);
        self.await_terminal_status(stack_name, &[expected], &failures, policy)
    }

    /// Waits out whatever operation is running, without judging its result.
    pub fn drain(&self, stack_name: &str, policy: PollPolicy) -> PollOutcome {
        let mut settled = StackStatus::TERMINAL.to_vec();
        // A review placeholder will not move on by itself.
        settled.push(StackStatus::ReviewInProgress);
        self.await_terminal_status(stack_name, &settled, &[], policy)
    }

    /// Polls a change set until its creation is no longer pending.
    pub fn await_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
        policy: PollPolicy,
    ) -> ChangeSetOutcome {
        let mut last = ChangeSetStatus::CreatePending;

        let polled = policy.run(self.sleeper, &self.cancel, |attempt| {
            match self.client.describe_change_set(stack_name, change_set_name) {
                Ok(descriptor) if descriptor.status.is_pending() => {
                    info!(
                        " - waiting for change set {}: {} (attempt {}/{})",
                        change_set_name, descriptor.status, attempt, policy.max_attempts
                    );
                    last = descriptor.status;
                    Probe::Pending
                }
                Ok(descriptor) => Probe::Done(descriptor),
                Err(error) => Probe::Abort(error),
            }
        });

        match polled {
            Polled::Done(descriptor) => ChangeSetOutcome::Ready(descriptor),
            Polled::Aborted(error) => ChangeSetOutcome::QueryError(error),
            Polled::Exhausted { attempts } => ChangeSetOutcome::Timeout { attempts, last },
            Polled::Cancelled => ChangeSetOutcome::Cancelled,
        }
    }
}

/// Records requested sleeps instead of blocking.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: std::cell::RefCell<Vec<Duration>>,
}

#[cfg(test)]
impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}
