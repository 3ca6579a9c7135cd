// commands/deploy.rs

//! # Deploy Command Module
//!
//! The single command of the CLI: validates the request, connects to
//! CloudFormation and hands over to the operation driver.
//!
//! ## Example Usage
//! ```bash
//! ./cfn-stack -o create -t stack.yml -v vars/prod.yml
//! ./cfn-stack -o create -t stack.yml -v vars/prod.yml -a plan -c release-42
//! ./cfn-stack -o create -t stack.yml -v vars/prod.yml -a apply -c release-42
//! ./cfn-stack -o delete -t stack.yml -v vars/prod.yml
//! ```

use clap::{ArgMatches, Command};
use log::debug;

use crate::cloud::aws::AwsStackClient;
use crate::commands::common_args::{
    action, change_set, change_set_max_attempts, driver_settings_from_matches, max_attempts,
    operation, poll_interval, template, variables,
};
use crate::core::changeset::ChangeSetKind;
use crate::core::driver::{Completion, OperationDriver};
use crate::core::poller::{CancellationToken, ThreadSleeper};
use crate::core::request::{Action, Operation, RawRequest, StackRequest};
use crate::error::AppError;
use crate::utils::display::{print_change_set, print_unicode_box};
use crate::{print_info, print_success, print_warning};

/// Adds the deploy arguments to the root command.
pub fn command(root: Command) -> Command {
    root.arg(operation())
        .arg(template())
        .arg(variables())
        .arg(action())
        .arg(change_set())
        .arg(poll_interval())
        .arg(max_attempts())
        .arg(change_set_max_attempts())
}

/// Reads the raw request values out of the parsed arguments.
pub fn raw_request(matches: &ArgMatches) -> RawRequest<'_> {
    let value = |id: &str| matches.get_one::<String>(id).map(String::as_str);
    RawRequest {
        operation: value("operation").unwrap_or_default(),
        action: value("action"),
        change_set: value("change-set"),
        template: value("template").unwrap_or_default(),
        variables: value("variables").unwrap_or_default(),
    }
}

/// Executes the request against CloudFormation.
pub fn execute(matches: &ArgMatches, cancel: CancellationToken) -> Result<(), AppError> {
    let request = StackRequest::from_raw(&raw_request(matches))?;
    let settings = driver_settings_from_matches(matches);
    debug!("Driver settings: {:?}", settings);

    print_unicode_box(&banner(&request));

    let client = AwsStackClient::connect()?;
    let sleeper = ThreadSleeper::new(cancel.clone());
    let driver = OperationDriver::new(&client, &sleeper, cancel, settings);

    let completion = driver.run(&request)?;
    report(&request, &completion);
    Ok(())
}

fn banner(request: &StackRequest) -> String {
    let verb = match (request.operation, request.action) {
        (Operation::Delete, _) => "Deleting",
        (Operation::Create, None) => "Deploying",
        (Operation::Create, Some(Action::Plan)) => "Planning",
        (Operation::Create, Some(Action::Apply)) => "Applying",
    };
    match &request.change_set_name {
        Some(name) => format!("🚀 {} stack: [{}] change set: [{}]", verb, request.stack_name, name),
        None => format!("🚀 {} stack: [{}]", verb, request.stack_name),
    }
}

fn report(request: &StackRequest, completion: &Completion) {
    let stack = &request.stack_name;
    match completion {
        Completion::Created => print_success!("Stack {} created.", stack),
        Completion::Updated => print_success!("Stack {} updated.", stack),
        Completion::UpToDate => print_info!("Stack {} is already up to date.", stack),
        Completion::Deleted => print_success!("Stack {} deleted.", stack),
        Completion::AlreadyAbsent => {
            print_info!("Stack {} does not exist, nothing to delete.", stack)
        }
        Completion::Planned(descriptor) => {
            print_change_set(descriptor);
            print_info!(
                "Run with -a apply -c {} to execute this change set.",
                descriptor.change_set_name
            );
        }
        Completion::PlannedNoChanges(descriptor) => print_warning!(
            "Change set {} contains no changes; stack {} already matches the template.",
            descriptor.change_set_name,
            stack
        ),
        Completion::Applied(kind) => {
            let outcome = match kind {
                ChangeSetKind::Create => "created",
                ChangeSetKind::Update => "updated",
            };
            print_success!("Change set executed, stack {} {}.", stack, outcome);
        }
    }
}
