//! Application context that holds resolved configuration
//!
//! The configuration file is picked in this order:
//! 1. `--config <PATH>` (or `$SRETOOL_CONFIG`, which clap maps onto it)
//! 2. `<config_dir>/sretool/config.yaml`, when it exists
//! 3. Built-in defaults
//!
//! Once built, the context is passed as read-only throughout the application.

use libsretool::Config;
use libsretool::retry::RetryPolicy;
use std::path::{Path, PathBuf};

/// How chatty the CLI is, from the number of `-v` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    Normal,
    Verbose,
    VeryVerbose,
    Trace,
}

impl VerbosityLevel {
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::VeryVerbose,
            _ => Self::Trace,
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_directive(&self) -> &'static str {
        match self {
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::VeryVerbose => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Application context with resolved configuration and runtime state
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Resolved configuration
    pub config: Config,
    /// File the configuration came from, if any
    pub config_path: Option<PathBuf>,
    pub verbosity: VerbosityLevel,
}

impl AppContext {
    /// Resolves and loads the configuration file.
    ///
    /// An explicitly named file must exist; the default location is optional.
    pub fn build(cli_config: Option<&Path>, verbosity: VerbosityLevel) -> Result<Self, String> {
        let config_path = match cli_config {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };

        let config = Config::load(config_path.as_deref()).map_err(|e| e.to_string())?;

        Ok(Self {
            config,
            config_path,
            verbosity,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.retry.max_attempts, self.config.retry.backoff())
    }
}

/// `<config_dir>/sretool/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sretool").join("config.yaml"))
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
