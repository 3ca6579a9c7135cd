// core/env.rs

//! # Environment Variable Handling
//!
//! Loads variables from a `.env` file and `-e KEY=VALUE` overrides into the
//! process environment, so the AWS SDK picks up `AWS_*` settings from them.
//! Variables already set in the shell are never replaced by the file; `-e`
//! overrides always win.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use log::{debug, warn};

/// Reads the `.env` file and CLI overrides into an ordered map.
///
/// # Arguments
/// * `env_file` - Path to the .env file (relative to cwd)
/// * `overrides` - Additional KEY=VALUE pairs from `-e` CLI flags
pub fn collect_env_vars(env_file: &str, overrides: &[String]) -> BTreeMap<String, String> {
    let mut env_vars = BTreeMap::new();

    let dotenv_path = Path::new(env_file);
    if dotenv_path.exists() {
        debug!("Loading environment variables from: {}", env_file);
        match dotenvy::from_path_iter(dotenv_path) {
            Ok(iter) => {
                for item in iter {
                    match item {
                        Ok((key, value)) => {
                            debug!("  Loaded env var: {}", key);
                            env_vars.insert(key, value);
                        }
                        Err(e) => warn!("Skipping malformed line in {}: {}", env_file, e),
                    }
                }
            }
            Err(e) => warn!("Could not load env file {}: {}", env_file, e),
        }
    } else {
        debug!("No .env file found at: {}", env_file);
    }

    for override_str in overrides {
        match parse_env_var(override_str) {
            Some((key, value)) => {
                debug!("  Override env var: {}", key);
                env_vars.insert(key, value);
            }
            None => warn!("Ignoring -e {}: expected KEY=VALUE", override_str),
        }
    }

    env_vars
}

/// Applies the `.env` file and overrides to the process environment.
///
/// Must run before any other thread is spawned.
pub fn load_env_vars(env_file: &str, overrides: &[String]) {
    let from_cli: Vec<String> = overrides
        .iter()
        .filter_map(|o| parse_env_var(o).map(|(key, _)| key))
        .collect();

    for (key, value) in collect_env_vars(env_file, overrides) {
        if env::var_os(&key).is_some() && !from_cli.contains(&key) {
            debug!("  Keeping {} from the shell environment", key);
            continue;
        }
        env::set_var(key, value);
    }
}

/// Parse a single KEY=VALUE environment variable string.
fn parse_env_var(s: &str) -> Option<(String, String)> {
    let (key, value) = s.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}
