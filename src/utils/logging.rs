use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{EstimatorError, Result};

/// Environment variable overriding the log filter, e.g. `AZCOST_LOG=azcost=trace`
pub const LOG_ENV: &str = "AZCOST_LOG";

/// Filter used when `AZCOST_LOG` is unset
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "azcost=debug,info"
    } else {
        "info"
    }
}

/// Install the global subscriber: compact lines on stderr, plus
/// timestamped plain-text lines appended to `log_file` when given.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let stderr_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| EstimatorError::Config(format!("failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        for verbose in [false, true] {
            assert!(EnvFilter::try_new(default_filter(verbose)).is_ok());
        }
        assert!(default_filter(true).contains("debug"));
    }
}
