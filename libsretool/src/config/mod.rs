//! Application configuration.
//!
//! Settings are read from a YAML file layered over built-in defaults, so a
//! file only needs to name what it changes.

use crate::auth::{CredentialStore, Credentials};
use crate::error::{Error, Result};
use config::{Config as ConfigRs, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;


/// Root configuration structure.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub cache: Cache,
    #[serde(default)]
    pub retry: Retry,
    #[serde(default)]
    pub skopeo: Skopeo,
    #[serde(default)]
    pub registries: Vec<Registry>,
}

impl Config {
    /// Parses a `Config` from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let builder = ConfigRs::builder()
            .add_source(ConfigRs::try_from(&Config::default())?)
            .add_source(File::from_str(s, FileFormat::Yaml));

        Self::from_builder(builder, None)
    }

    /// Loads a `Config` from an optional file path.
    ///
    /// Without a path the defaults are returned. A path that does not exist
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigRs::builder().add_source(ConfigRs::try_from(&Config::default())?);

        if let Some(p) = path {
            if !p.is_file() {
                return Err(Error::config(
                    "Configuration file not found".to_string(),
                    Some(p.display().to_string()),
                ));
            }
            builder = builder.add_source(File::from(p).format(FileFormat::Yaml).required(true));
        }

        Self::from_builder(builder, path)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        path: Option<&Path>,
    ) -> Result<Self> {
        builder
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| {
                Error::config_with_source(
                    "Failed to deserialize configuration".to_string(),
                    path.map(|p| p.display().to_string()),
                    e,
                )
            })
    }

    /// Credentials for every registry that has a username configured.
    pub fn credential_store(&self) -> CredentialStore {
        let mut store = CredentialStore::new();
        for registry in &self.registries {
            if let Some(credentials) = registry.credentials() {
                store.insert(registry.host.clone(), credentials);
            }
        }
        store
    }

    /// Hosts configured with `insecure: true`.
    pub fn insecure_registries(&self) -> Vec<String> {
        self.registries
            .iter()
            .filter(|r| r.insecure)
            .map(|r| r.host.clone())
            .collect()
    }
}

/// Network settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Network {
    /// Request timeout in seconds.
    #[serde(default = "default_network_timeout")]
    pub timeout: u64,

    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            timeout: default_network_timeout(),
            verify_tls: true,
        }
    }
}

fn default_network_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Manifest cache settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Cache {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of manifests held in memory.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Manifests larger than this many bytes are not cached.
    #[serde(default = "default_cache_max_item_size")]
    pub max_item_size: usize,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_cache_capacity(),
            max_item_size: default_cache_max_item_size(),
        }
    }
}

fn default_cache_capacity() -> usize {
    crate::cache::DEFAULT_CAPACITY
}

fn default_cache_max_item_size() -> usize {
    crate::cache::DEFAULT_MAX_ITEM_SIZE
}

/// Retry settings for registry lookups.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Retry {
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,

    /// Base delay between attempts; attempt `n` waits `n` times this.
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl Retry {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

fn default_retry_max_attempts() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

/// Skopeo invocation settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Skopeo {
    #[serde(default = "default_skopeo_binary")]
    pub binary: String,

    #[serde(default)]
    pub dry_run: bool,
}

impl Default for Skopeo {
    fn default() -> Self {
        Self {
            binary: default_skopeo_binary(),
            dry_run: false,
        }
    }
}

fn default_skopeo_binary() -> String {
    "skopeo".to_string()
}

/// Per-registry settings.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Registry {
    /// Registry host with optional port, as it appears in image references.
    pub host: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Reach the registry over plain HTTP.
    #[serde(default)]
    pub insecure: bool,
}

impl Registry {
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.username.as_ref()?;
        Some(Credentials::basic(
            username.clone(),
            self.password.clone().unwrap_or_default(),
        ))
    }
}
