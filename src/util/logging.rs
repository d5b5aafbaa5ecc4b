// PRISM - util/logging.rs
//
// Structured logging with runtime-selectable debug mode.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - CLI flag: --debug
//   - Config file: [logging] level = "debug"
//
// Output: stderr always. Optionally also to a file named in config.toml,
// written without ANSI colour codes.

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the level filter.
///
/// Priority: RUST_LOG env var > CLI --debug flag > config level > default "info".
fn build_filter(debug_flag: bool, config_level: Option<&str>) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(super::constants::DEFAULT_LOG_LEVEL)
    }
}

/// Initialise the logging subsystem.
///
/// `debug_flag` is true when the user passed --debug on the CLI.
/// `config_level` is the level from config.toml (if present).
/// `log_file` is the optional log file path from config.toml; if it cannot
/// be opened a warning is printed and logging continues on stderr only.
pub fn init(debug_flag: bool, config_level: Option<&str>, log_file: Option<&str>) {
    let filter = build_filter(debug_flag, config_level);

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            ),
            Err(e) => {
                eprintln!("Warning: cannot open log file '{path}': {e}. Logging to stderr only.");
                None
            }
        }
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    tracing::debug!(
        app = super::constants::APP_NAME,
        version = super::constants::APP_VERSION,
        log_file = log_file.unwrap_or(""),
        "Logging initialised"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_selects_debug_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let filter = build_filter(true, Some("warn"));
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn test_config_level_used_without_flag() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let filter = build_filter(false, Some("warn"));
        assert_eq!(filter.to_string(), "warn");
    }
}
