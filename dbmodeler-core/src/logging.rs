//! Logging setup for the dbmodeler binary.

use crate::Result;
use tracing_subscriber::EnvFilter;

/// Level selected by the command line flags.
///
/// `quiet` wins over any verbosity: 0 is INFO, 1 is DEBUG, 2 and above TRACE.
pub fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Initializes structured logging to stderr.
///
/// `RUST_LOG` overrides the flag-derived level when set.
///
/// # Example
/// ```rust,no_run
/// use dbmodeler_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
///
/// # Errors
/// Returns a configuration error when a global subscriber is already set.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = level_for(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| {
            crate::error::DbModelerError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // a global subscriber can only be installed once per process, so only
    // the level selection is exercised here

    #[test]
    fn test_verbosity_levels() {
        let cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::INFO),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
            ((false, 10), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in cases {
            assert_eq!(
                level_for(verbose, quiet),
                expected,
                "Failed for quiet={}, verbose={}",
                quiet,
                verbose
            );
        }
    }
}
