// utils/logging.rs

use env_logger;
use log::LevelFilter;

/// Sets the logger level based on the provided argument.
///
/// The AWS SDK crates log request internals at debug level; they are capped
/// at `warn` unless `trace` is requested.
pub fn initialize_logger(log_level: &str) {
    let level = parse_level(log_level);

    let mut builder = env_logger::Builder::new();
    builder.filter(None, level);
    if level < LevelFilter::Trace {
        for noisy in ["aws_config", "aws_smithy_runtime", "aws_smithy_http", "hyper", "rustls"] {
            builder.filter(Some(noisy), level.min(LevelFilter::Warn));
        }
    }
    builder.init();
}

fn parse_level(log_level: &str) -> LevelFilter {
    match log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info, // Default to Info if unrecognized
    }
}
