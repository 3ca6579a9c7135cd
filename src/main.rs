// main.rs

//! # cfn-stack - Main Entry Point
//!
//! Creates, updates, previews and deletes a CloudFormation stack from a
//! template and a YAML variables file, waiting for every operation to settle.
//!
//! ## Global Arguments
//!
//! - `--region` - AWS region (default: SDK credential chain).
//! - `--profile` - Named AWS profile.
//! - `--env-file` - `.env` file loaded before connecting (default: `.env`).
//! - `-e`, `--env` - Extra `KEY=VALUE` environment variables.
//! - `--log-level` - The logging level (default: `info`). Possible values: `error`, `warn`, `info`, `debug`, `trace`.
//!
//! ## Example Usage
//! ```bash
//! ./cfn-stack -o create -t stack.yml -v vars/prod.yml --region eu-west-1
//! ./cfn-stack -o create -t stack.yml -v vars/prod.yml -a plan -c release-42
//! ./cfn-stack -o delete -t stack.yml -v vars/prod.yml --profile ops
//! ```
//!
//! Exit code is `0` on success and `1` on any failure.

mod app;
mod cloud;
mod commands;
mod core;
mod error;
mod globals;
mod utils;

use std::process;
use std::thread;

use clap::{Arg, ArgAction, Command};
use log::{debug, warn};

use crate::app::{APP_DESCRIPTION, APP_NAME, APP_VERSION, DEFAULT_LOG_LEVEL, LOG_LEVELS};
use crate::commands::common_args::{env_file, env_var, profile, region};
use crate::core::env::load_env_vars;
use crate::core::poller::CancellationToken;
use crate::utils::logging::initialize_logger;

/// Main function that initializes the CLI and runs the request.
fn main() {
    let root = Command::new(APP_NAME)
        .version(APP_VERSION)
        .about(APP_DESCRIPTION)
        // ====================
        // Global Flags
        // ====================
        .arg(region())
        .arg(profile())
        .arg(env_file())
        .arg(env_var())
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .help("Set the logging level")
                .value_parser(clap::builder::PossibleValuesParser::new(LOG_LEVELS))
                .ignore_case(true)
                .default_value(DEFAULT_LOG_LEVEL)
                .action(ArgAction::Set),
        )
        .arg_required_else_help(true);

    let matches = commands::deploy::command(root).get_matches();

    // ====================
    // Initialize Logger
    // ====================
    let log_level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or(DEFAULT_LOG_LEVEL);
    initialize_logger(log_level);

    debug!("Logger initialized with level: {}", log_level);

    // ====================
    // Environment and Globals
    // ====================
    let env_file = matches
        .get_one::<String>("env-file")
        .map(String::as_str)
        .unwrap_or(app::DEFAULT_ENV_FILE);
    let overrides: Vec<String> = matches
        .get_many::<String>("env")
        .map(|vals| vals.cloned().collect())
        .unwrap_or_default();
    load_env_vars(env_file, &overrides);

    let region = matches.get_one::<String>("region").cloned();
    let profile = matches.get_one::<String>("profile").cloned();
    debug!("Region: {:?}, Profile: {:?}", region, profile);
    globals::init_globals(region, profile);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    // ====================
    // Command Execution
    // ====================
    if let Err(e) = commands::deploy::execute(&matches, cancel) {
        print_error!("{}", e);
        process::exit(e.exit_code());
    }
}

/// First Ctrl-C stops waiting; a second one exits immediately.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    let spawned = thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!("Ctrl-C handling unavailable: {}", e);
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    print_warning!(
                        "Interrupted, stopping the wait. The remote operation keeps running."
                    );
                    cancel.cancel();
                }
                if tokio::signal::ctrl_c().await.is_ok() {
                    process::exit(1);
                }
            });
        });

    if let Err(e) = spawned {
        warn!("Could not start Ctrl-C handler: {}", e);
    }
}
