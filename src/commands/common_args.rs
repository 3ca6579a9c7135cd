// commands/common_args.rs

//! # Common Command Arguments
//!
//! Argument definitions shared by the CLI, plus the poll settings read back
//! from them.

use std::time::Duration;

use clap::{value_parser, Arg, ArgAction, ArgMatches};

use crate::app::{
    DEFAULT_CHANGE_SET_MAX_ATTEMPTS, DEFAULT_CHANGE_SET_MAX_ATTEMPTS_STR, DEFAULT_ENV_FILE,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_INTERVAL_SECS_STR, DEFAULT_STACK_MAX_ATTEMPTS,
    DEFAULT_STACK_MAX_ATTEMPTS_STR, SETTLE_DELAY_SECS,
};
use crate::core::driver::DriverSettings;
use crate::core::poller::PollPolicy;

// Request arguments
/// Operation to run: `create` or `delete`
pub fn operation() -> Arg {
    Arg::new("operation")
        .short('o')
        .long("operation")
        .required(true)
        .help("Operation to run: 'create' or 'delete'")
        .action(ArgAction::Set)
}

/// Path to the CloudFormation template
pub fn template() -> Arg {
    Arg::new("template")
        .short('t')
        .long("template")
        .required(true)
        .help("Path to the CloudFormation template file")
        .action(ArgAction::Set)
}

/// Path to the variables file
pub fn variables() -> Arg {
    Arg::new("variables")
        .short('v')
        .long("variables")
        .required(true)
        .help("Path to the YAML file with StackName, parameters and tags")
        .action(ArgAction::Set)
}

/// Change set phase
pub fn action() -> Arg {
    Arg::new("action")
        .short('a')
        .long("action")
        .help("Change set phase for '-o create': 'plan' or 'apply'")
        .action(ArgAction::Set)
}

/// Change set name
pub fn change_set() -> Arg {
    Arg::new("change-set")
        .short('c')
        .long("changeset")
        .alias("change-set")
        .help("Change set name, required with -a")
        .action(ArgAction::Set)
}

// Polling arguments
pub fn poll_interval() -> Arg {
    Arg::new("poll-interval")
        .long("poll-interval")
        .help("Seconds between status polls")
        .value_parser(value_parser!(u64).range(1..))
        .default_value(DEFAULT_POLL_INTERVAL_SECS_STR)
        .action(ArgAction::Set)
}

pub fn max_attempts() -> Arg {
    Arg::new("max-attempts")
        .long("max-attempts")
        .help("Polls before giving up on a stack create, update, delete or drain")
        .value_parser(value_parser!(u32).range(1..))
        .default_value(DEFAULT_STACK_MAX_ATTEMPTS_STR)
        .action(ArgAction::Set)
}

pub fn change_set_max_attempts() -> Arg {
    Arg::new("change-set-max-attempts")
        .long("change-set-max-attempts")
        .help("Polls before giving up on a change set")
        .value_parser(value_parser!(u32).range(1..))
        .default_value(DEFAULT_CHANGE_SET_MAX_ATTEMPTS_STR)
        .action(ArgAction::Set)
}

// Environment arguments
/// Common argument for specifying an environment file
pub fn env_file() -> Arg {
    Arg::new("env-file")
        .long("env-file")
        .help("Environment variables file")
        .default_value(DEFAULT_ENV_FILE)
}

/// Common argument for setting additional environment variables
pub fn env_var() -> Arg {
    Arg::new("env")
        .short('e')
        .long("env")
        .help("Set additional environment variables (format: KEY=VALUE)")
        .action(ArgAction::Append)
}

pub fn region() -> Arg {
    Arg::new("region")
        .long("region")
        .help("AWS region, overrides AWS_REGION and the profile's region")
        .action(ArgAction::Set)
}

pub fn profile() -> Arg {
    Arg::new("profile")
        .long("profile")
        .help("Named AWS profile to load credentials from")
        .action(ArgAction::Set)
}

/// Builds driver settings from the polling arguments.
pub fn driver_settings_from_matches(matches: &ArgMatches) -> DriverSettings {
    let interval = Duration::from_secs(
        matches
            .get_one::<u64>("poll-interval")
            .copied()
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
    );
    let stack_attempts = matches
        .get_one::<u32>("max-attempts")
        .copied()
        .unwrap_or(DEFAULT_STACK_MAX_ATTEMPTS);
    let change_set_attempts = matches
        .get_one::<u32>("change-set-max-attempts")
        .copied()
        .unwrap_or(DEFAULT_CHANGE_SET_MAX_ATTEMPTS);

    DriverSettings {
        stack_policy: PollPolicy::new(stack_attempts, interval),
        change_set_policy: PollPolicy::new(change_set_attempts, interval),
        settle_delay: Duration::from_secs(SETTLE_DELAY_SECS),
    }
}
