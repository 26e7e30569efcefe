//! High-level registry operations.
//!
//! A [`Registry`] ties the HTTP client to the credentials for each registry
//! host and to the optional manifest cache. It is also the [`DigestSource`]
//! that image references resolve against.

use crate::auth::{CredentialStore, Credentials};
use crate::cache::ManifestCache;
use crate::client::{Client, ClientConfig, ManifestResponse};
use crate::config::Config;
use crate::digest::Digest;
use crate::error::{LookupError, Result};
use crate::oci::Manifest;
use crate::reference::{DigestSource, ImageReference};
use std::num::NonZeroUsize;
use tracing::debug;


pub struct Registry {
    client: Client,
    cache: Option<ManifestCache>,
    credentials: CredentialStore,
}

impl Registry {
    pub fn new(client: Client, cache: Option<ManifestCache>, credentials: CredentialStore) -> Self {
        Self {
            client,
            cache,
            credentials,
        }
    }

    /// Builds a registry from the network, cache and credential settings.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client_config = ClientConfig::new()
            .with_timeout(config.network.timeout)
            .with_verify_tls(config.network.verify_tls);
        for host in config.insecure_registries() {
            client_config = client_config.with_insecure_registry(host);
        }
        let client = Client::with_config(client_config)?;

        let cache = match NonZeroUsize::new(config.cache.capacity) {
            Some(capacity) if config.cache.enabled => {
                Some(ManifestCache::new(capacity, config.cache.max_item_size))
            }
            _ => None,
        };

        Ok(Self::new(client, cache, config.credential_store()))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn cache(&self) -> Option<&ManifestCache> {
        self.cache.as_ref()
    }

    pub fn set_credentials(&mut self, registry: impl Into<String>, credentials: Credentials) {
        self.credentials.insert(registry, credentials);
    }

    /// Credentials to present to the registry hosting `reference`.
    pub fn credentials_for(&self, reference: &ImageReference) -> Option<&Credentials> {
        self.credentials.get(reference.registry())
    }

    pub fn clear_credentials(&mut self, registry: &str) {
        self.credentials.remove(registry);
    }

    /// Fetches the raw manifest, going through the cache when there is one.
    ///
    /// With a cache, a HEAD request learns the digest first so that a cached
    /// manifest costs no download.
    pub fn manifest_response(
        &self,
        reference: &ImageReference,
    ) -> std::result::Result<ManifestResponse, LookupError> {
        let credentials = self.credentials_for(reference);

        let Some(cache) = &self.cache else {
            return self.client.fetch_manifest(reference, credentials);
        };

        let known = match reference.digest() {
            Some(digest) if reference.tag_override() => Some(digest.clone()),
            _ => self.head_digest(reference, credentials)?,
        };

        if let Some(digest) = &known
            && let Some(cached) = cache.get(digest)
        {
            return Ok(cached);
        }

        self.fetch_and_cache(reference, credentials)
    }

    /// HEAD for the digest, treating a registry that refuses HEAD like one
    /// that sends no digest header.
    fn head_digest(
        &self,
        reference: &ImageReference,
        credentials: Option<&Credentials>,
    ) -> std::result::Result<Option<Digest>, LookupError> {
        match self.client.head_manifest(reference, credentials) {
            Err(e) if head_unsupported(&e) => {
                debug!(%reference, status = ?e.status_code(), "HEAD not supported");
                Ok(None)
            }
            result => result,
        }
    }

    fn fetch_and_cache(
        &self,
        reference: &ImageReference,
        credentials: Option<&Credentials>,
    ) -> std::result::Result<ManifestResponse, LookupError> {
        let response = self.client.fetch_manifest(reference, credentials)?;
        if let Some(cache) = &self.cache {
            cache.insert(&response);
        }
        Ok(response)
    }

    /// Fetches and parses the manifest `reference` points to.
    pub fn manifest(&self, reference: &ImageReference) -> Result<Manifest> {
        let response = self.manifest_response(reference)?;
        Manifest::from_response(&response)
    }

    /// Lists all tags of the repository.
    pub fn tags(
        &self,
        reference: &ImageReference,
    ) -> std::result::Result<Vec<String>, LookupError> {
        self.client
            .fetch_tags(reference, self.credentials_for(reference))
    }

    /// Whether the repository has `tag`.
    pub fn has_tag(
        &self,
        reference: &ImageReference,
        tag: &str,
    ) -> std::result::Result<bool, LookupError> {
        Ok(self.tags(reference)?.iter().any(|t| t == tag))
    }

    /// Whether the manifest `reference` points to exists.
    ///
    /// Only a 404 means "no"; any other failure is returned.
    pub fn exists(&self, reference: &ImageReference) -> std::result::Result<bool, LookupError> {
        let credentials = self.credentials_for(reference);
        let found = match self.client.head_manifest(reference, credentials) {
            Err(e) if head_unsupported(&e) => self
                .client
                .fetch_manifest(reference, credentials)
                .map(|_| ()),
            result => result.map(|_| ()),
        };

        match found {
            Ok(()) => Ok(true),
            Err(LookupError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl DigestSource for Registry {
    fn manifest_digest(
        &self,
        reference: &ImageReference,
    ) -> std::result::Result<Digest, LookupError> {
        let credentials = self.credentials_for(reference);

        if let Some(digest) = self.head_digest(reference, credentials)? {
            return Ok(digest);
        }

        debug!(%reference, "no digest on HEAD, fetching manifest");
        Ok(self.fetch_and_cache(reference, credentials)?.digest)
    }
}

/// 405 and 501: the registry does not implement HEAD on manifests.
fn head_unsupported(error: &LookupError) -> bool {
    matches!(
        error,
        LookupError::Transport {
            status_code: Some(405 | 501),
            ..
        }
    )
}
