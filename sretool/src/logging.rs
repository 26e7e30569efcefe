//! Tracing setup for the CLI.

use crate::context::VerbosityLevel;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Builds the filter: `RUST_LOG` when set, otherwise the `-v` level.
pub fn env_filter(rust_log: Option<&str>, verbosity: VerbosityLevel) -> EnvFilter {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(verbosity.log_directive()),
    }
}

/// Installs the global subscriber, writing to stderr.
pub fn init(verbosity: VerbosityLevel) {
    let rust_log = std::env::var("RUST_LOG").ok();

    // A second init (tests) is harmless
    let _ = tracing_subscriber::registry()
        .with(env_filter(rust_log.as_deref(), verbosity))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
