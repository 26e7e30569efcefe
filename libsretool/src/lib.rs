//! libsretool - container image toolbox for SRE automation
//!
//! Parses container image references, resolves their tags to manifest
//! digests through the registry v2 API, and compares images by digest or by
//! manifest content.
//!
//! # Quick Start
//!
//! ```no_run
//! use libsretool::{Config, ImageReference, Registry};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::from_config(&Config::default())?;
//!
//!     let mut image = ImageReference::parse("quay.io/app-sre/qontract-reconcile:latest")?;
//!     let digest = image.resolve(&registry)?.clone();
//!     println!("{} -> {}", image.tag_url()?, digest);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Main Types
//!
//! - [`ImageReference`] - Parsed image reference with lazy digest resolution
//! - [`Digest`] - Content digest validation and handling
//! - [`Registry`] - Registry access used to resolve references
//! - [`Credentials`] - Authentication credentials
//! - [`Config`] - Settings loaded from YAML
//!
//! Supporting modules cover manifest comparison ([`oci`]), retries
//! ([`retry`]), the `skopeo` wrapper ([`skopeo`]) and deep value
//! substitution ([`transform`]).

#![warn(clippy::all)]

/// Returns the libsretool crate version.
///
/// # Examples
///
/// ```
/// let version = libsretool::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// Re-export commonly used types for convenience
pub use auth::Credentials;
pub use config::Config;
pub use digest::Digest;
pub use error::{Error, LookupError, ParseError, Result};
pub use oci::Manifest;
pub use reference::{DigestSource, ImageReference};
pub use registry::Registry;

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod digest;
pub mod error;
pub mod oci;
pub mod reference;
pub mod registry;
pub mod retry;
pub mod skopeo;
pub mod transform;
