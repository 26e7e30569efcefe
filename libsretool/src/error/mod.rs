//! Error types for sretool
//!
//! Two error kinds surface from the image reference model:
//!
//! - [`ParseError`] for malformed reference strings. Always local, never worth
//!   retrying, and always carries the offending substring.
//! - [`LookupError`] for registry failures, split into not-found,
//!   authentication and transport kinds so callers can decide whether to retry.
//!
//! Everything else in the library reports through the crate-wide [`Error`].

use thiserror::Error;


/// Malformed image reference input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input was empty (or only whitespace).
    #[error("image reference cannot be empty")]
    Empty,

    /// A character outside `[a-z0-9._-/:@]` was found.
    #[error("invalid character {ch:?} at position {position} in '{segment}'")]
    InvalidCharacter {
        ch: char,
        position: usize,
        segment: String,
    },

    /// The `@` suffix is not a well-formed `algorithm:hex` digest.
    #[error("invalid digest '{digest}': {reason}")]
    InvalidDigest { digest: String, reason: String },

    /// A path component (or the registry host) is empty or malformed.
    #[error("invalid path component '{component}' in image reference")]
    InvalidComponent { component: String },

    /// The tag is empty, too long, or starts with a separator.
    #[error("invalid tag '{tag}'")]
    InvalidTag { tag: String },
}

impl ParseError {
    /// Returns the part of the input that caused the failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::ImageReference;
    ///
    /// let err = ImageReference::parse("quay.io/Org/app").unwrap_err();
    /// assert_eq!(err.offending(), "Org");
    /// ```
    pub fn offending(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::InvalidCharacter { segment, .. } => segment,
            Self::InvalidDigest { digest, .. } => digest,
            Self::InvalidComponent { component } => component,
            Self::InvalidTag { tag } => tag,
        }
    }
}

/// Broad category of a [`LookupError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupErrorKind {
    NotFound,
    AuthFailed,
    Transport,
}

/// Registry lookup failure.
#[derive(Error, Debug)]
pub enum LookupError {
    /// The repository or tag does not exist (404).
    #[error("{reference} not found")]
    NotFound { reference: String },

    /// The registry rejected our credentials or token (401, 403).
    #[error("authentication failed (status: {status_code:?}): {message}")]
    AuthFailed {
        message: String,
        status_code: Option<u16>,
    },

    /// Connection failures, timeouts, unexpected statuses and bad responses.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl LookupError {
    /// Creates a not-found error for the given reference.
    pub fn not_found<S: Into<String>>(reference: S) -> Self {
        Self::NotFound {
            reference: reference.into(),
        }
    }

    /// Creates an authentication error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::error::{LookupError, LookupErrorKind};
    ///
    /// let err = LookupError::auth_failed("invalid credentials", Some(401));
    /// assert_eq!(err.kind(), LookupErrorKind::AuthFailed);
    /// ```
    pub fn auth_failed<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::AuthFailed {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport error without an underlying cause.
    pub fn transport<S: Into<String>>(message: S, status_code: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status_code,
            source: None,
        }
    }

    /// Creates a transport error wrapping the underlying cause.
    pub fn transport_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            status_code: None,
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> LookupErrorKind {
        match self {
            Self::NotFound { .. } => LookupErrorKind::NotFound,
            Self::AuthFailed { .. } => LookupErrorKind::AuthFailed,
            Self::Transport { .. } => LookupErrorKind::Transport,
        }
    }

    /// Only transport failures are worth another attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::error::LookupError;
    ///
    /// assert!(LookupError::transport("connection reset", None).is_retryable());
    /// assert!(!LookupError::not_found("quay.io/org/app:v1").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        self.kind() == LookupErrorKind::Transport
    }

    /// HTTP status the registry answered with, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::AuthFailed { status_code, .. } | Self::Transport { status_code, .. } => {
                *status_code
            }
        }
    }
}

/// Main error type for sretool operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Malformed data from a registry or a caller (bad manifest, bad header).
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Two images (or an index and a member) cannot be compared.
    #[error("Comparison error: {message}")]
    Comparison { message: String },

    /// A by-digest reference was asked for a tag.
    #[error("Can't determine a unique tag for image: {reference}")]
    NoTag { reference: String },

    /// Configuration errors (invalid config file, missing settings)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An external command failed to start or exited non-zero.
    #[error("Command error: {message} (exit code: {exit_code:?})")]
    Command {
        message: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

/// Result type alias for sretool operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new validation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::error::Error;
    ///
    /// let err = Error::validation("invalid manifest format");
    /// assert!(matches!(err, Error::Validation { .. }));
    /// ```
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new validation error with a source error.
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn comparison<S: Into<String>>(message: S) -> Self {
        Self::Comparison {
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::error::Error;
    ///
    /// let err = Error::config("invalid config file", Some("/etc/sretool/config.yaml"));
    /// assert!(matches!(err, Error::Config { .. }));
    /// ```
    pub fn config<S: Into<String>>(message: S, path: Option<S>) -> Self {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: None,
        }
    }

    /// Creates a new configuration error with a source error.
    pub fn config_with_source<S, E>(message: S, path: Option<S>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            path: path.map(|p| p.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new command error.
    pub fn command<S: Into<String>>(message: S, exit_code: Option<i32>, stderr: S) -> Self {
        Self::Command {
            message: message.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::config_with_source("Configuration error", None, e)
    }
}
