// app.rs

//! # Application Constants
//!
//! Names, defaults and poll budgets shared by the CLI definition and the
//! operation driver. Every value here can be overridden from the command line
//! unless noted otherwise.

/// Binary name shown in `--help` and `--version`.
pub const APP_NAME: &str = "cfn-stack";

/// Crate version, taken from `Cargo.toml`.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short description for the CLI.
pub const APP_DESCRIPTION: &str = "Managing AWS CloudFormation stacks.";

/// Default logging level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Accepted values for `--log-level`.
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Default `.env` file consulted before the AWS client is built.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Seconds between two status polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_POLL_INTERVAL_SECS_STR: &str = "5";

/// Poll budget for draining and for direct create, update and delete calls.
pub const DEFAULT_STACK_MAX_ATTEMPTS: u32 = 60;
pub const DEFAULT_STACK_MAX_ATTEMPTS_STR: &str = "60";

/// Poll budget for change set creation and execution.
pub const DEFAULT_CHANGE_SET_MAX_ATTEMPTS: u32 = 120;
pub const DEFAULT_CHANGE_SET_MAX_ATTEMPTS_STR: &str = "120";

/// Pause between submitting a mutation and the first status poll.
///
/// Not exposed on the command line.
pub const SETTLE_DELAY_SECS: u64 = 2;
