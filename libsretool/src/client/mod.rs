//! Blocking HTTP client for the registry v2 API.
//!
//! The client speaks to whichever registry a reference names. It handles the
//! bearer token exchange on `401` and maps HTTP failures onto
//! [`LookupError`]. It never retries on its own; callers decide that with
//! [`crate::retry`].

use crate::auth::{AuthChallenge, Credentials, TokenResponse};
use crate::digest::Digest;
use crate::error::{Error, LookupError, Result};
use crate::reference::ImageReference;
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE, LINK, WWW_AUTHENTICATE};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};


/// Docker schema 1 manifest (signed).
pub const MEDIA_TYPE_DOCKER_V1_SIGNED: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";
/// Docker schema 1 manifest.
pub const MEDIA_TYPE_DOCKER_V1: &str = "application/vnd.docker.distribution.manifest.v1+json";
/// Docker schema 2 single-arch manifest.
pub const MEDIA_TYPE_DOCKER_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
/// Docker schema 2 manifest list.
pub const MEDIA_TYPE_DOCKER_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
/// OCI single-arch image manifest.
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
/// OCI image index.
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";

const DIGEST_HEADER: &str = "Docker-Content-Digest";

/// Page size requested from the tags endpoint.
pub const TAGS_PAGE_SIZE: usize = 50;

/// Response from the tags list API endpoint.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    /// Some registries send `null` for a repository without tags.
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Error body defined by the distribution API.
#[derive(Debug, Deserialize)]
struct RegistryErrors {
    errors: Vec<RegistryErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct RegistryErrorEntry {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A manifest as served by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestResponse {
    /// Raw manifest body, byte for byte.
    pub bytes: Vec<u8>,
    /// From `Docker-Content-Digest`, or the sha256 of `bytes`.
    pub digest: Digest,
    /// Media type without parameters, when the registry sent one.
    pub content_type: Option<String>,
}

/// Configuration for the HTTP client.
///
/// # Examples
///
/// ```
/// use libsretool::client::ClientConfig;
///
/// let config = ClientConfig::new()
///     .with_timeout(60)
///     .with_verify_tls(false);
/// assert_eq!(config.timeout_seconds, 60);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// Whether to validate TLS certificates (default: true)
    pub verify_tls: bool,
    /// Value of the `User-Agent` header
    pub user_agent: String,
    /// Registries reached over plain HTTP instead of HTTPS
    pub insecure_registries: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            verify_tls: true,
            user_agent: format!("sretool/{}", crate::version()),
            insecure_registries: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Talk plain HTTP to `registry` (host with optional port).
    pub fn with_insecure_registry(mut self, registry: impl Into<String>) -> Self {
        self.insecure_registries.push(registry.into());
        self
    }
}

/// HTTP client for registry operations.
///
/// Bearer tokens obtained from auth challenges are cached per registry, so
/// the exchange happens once per registry rather than once per request.
#[derive(Debug)]
pub struct Client {
    http_client: HttpClient,
    insecure_registries: Vec<String>,
    tokens: Mutex<HashMap<String, String>>,
}

impl Client {
    /// Creates a client with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .danger_accept_invalid_certs(!config.verify_tls)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| Error::validation_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            http_client,
            insecure_registries: config.insecure_registries,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    /// Base URL of the v2 API serving `reference`.
    pub fn base_url(&self, reference: &ImageReference) -> String {
        if self.insecure_registries.iter().any(|r| r == reference.registry()) {
            format!("http://{}", reference.registry())
        } else {
            reference.api_base_url()
        }
    }

    fn manifest_url(&self, reference: &ImageReference) -> String {
        format!(
            "{}/v2/{}/manifests/{}",
            self.base_url(reference),
            reference.repository(),
            reference.manifest_reference()
        )
    }

    /// Fetches the manifest `reference` points to.
    ///
    /// # Errors
    ///
    /// [`LookupError::NotFound`] when the repository or tag does not exist,
    /// [`LookupError::AuthFailed`] on 401/403 after the token exchange, and
    /// [`LookupError::Transport`] for everything else.
    pub fn fetch_manifest(
        &self,
        reference: &ImageReference,
        credentials: Option<&Credentials>,
    ) -> std::result::Result<ManifestResponse, LookupError> {
        let url = self.manifest_url(reference);
        debug!(%url, "fetching manifest");

        let response = self.send(reference.registry(), credentials, || {
            self.http_client.get(&url).header(ACCEPT, manifest_accept())
        })?;
        let response = check_response_status(response, reference)?;

        let header_digest = digest_header(response.headers())?;
        let content_type = content_type(response.headers());
        let bytes = response
            .bytes()
            .map_err(|e| LookupError::transport_with_source("Failed to read manifest body", e))?
            .to_vec();

        let digest = header_digest.unwrap_or_else(|| Digest::sha256_of(&bytes));

        Ok(ManifestResponse {
            bytes,
            digest,
            content_type,
        })
    }

    /// Asks for the manifest digest without downloading the body.
    ///
    /// Returns `None` when the registry does not send `Docker-Content-Digest`
    /// on HEAD, in which case the caller has to fall back to a GET.
    pub fn head_manifest(
        &self,
        reference: &ImageReference,
        credentials: Option<&Credentials>,
    ) -> std::result::Result<Option<Digest>, LookupError> {
        let url = self.manifest_url(reference);
        debug!(%url, "checking manifest");

        let response = self.send(reference.registry(), credentials, || {
            self.http_client.head(&url).header(ACCEPT, manifest_accept())
        })?;
        let response = check_response_status(response, reference)?;

        digest_header(response.headers())
    }

    /// Lists every tag of the repository, following `Link` pagination.
    pub fn fetch_tags(
        &self,
        reference: &ImageReference,
        credentials: Option<&Credentials>,
    ) -> std::result::Result<Vec<String>, LookupError> {
        let base_url = self.base_url(reference);
        let mut url = format!(
            "{}/v2/{}/tags/list?n={}",
            base_url,
            reference.repository(),
            TAGS_PAGE_SIZE
        );
        let mut all_tags = Vec::new();
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(url.clone()) {
                warn!(%url, "tags pagination points back to a visited page, stopping");
                break;
            }
            debug!(%url, "fetching tags");
            let response = self.send(reference.registry(), credentials, || {
                self.http_client.get(&url)
            })?;

            // Extract Link header for pagination before consuming response
            let next = extract_next_link(response.headers());
            let response = check_response_status(response, reference)?;

            let page: TagsResponse = response.json().map_err(|e| {
                LookupError::transport_with_source("Failed to parse tags response", e)
            })?;
            all_tags.extend(page.tags.unwrap_or_default());

            match next {
                Some(link) if link.starts_with("http://") || link.starts_with("https://") => {
                    url = link
                }
                Some(path) => url = format!("{}{}", base_url, path),
                None => break,
            }
        }

        Ok(all_tags)
    }

    /// Drops the cached bearer token for `registry`.
    pub fn forget_token(&self, registry: &str) {
        self.tokens.lock().remove(registry);
    }

    /// Sends a request, answering one bearer challenge if the registry asks.
    fn send<F>(
        &self,
        registry: &str,
        credentials: Option<&Credentials>,
        build: F,
    ) -> std::result::Result<Response, LookupError>
    where
        F: Fn() -> RequestBuilder,
    {
        let cached_token = self.tokens.lock().get(registry).cloned();
        let authorization = match cached_token {
            Some(token) => Credentials::bearer(token).to_header_value(),
            None => credentials.and_then(Credentials::to_header_value),
        };

        let mut request = build();
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        let response = request.send().map_err(|e| translate_reqwest_error(e, registry))?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(challenge) = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| AuthChallenge::parse(v).ok())
            .filter(AuthChallenge::is_bearer)
        else {
            return Ok(response);
        };

        warn!(registry, realm = %challenge.realm, "registry requested a bearer token");
        let token = self.request_token(&challenge, credentials)?;
        self.tokens
            .lock()
            .insert(registry.to_string(), token.clone());

        build()
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .map_err(|e| translate_reqwest_error(e, registry))
    }

    /// Exchanges credentials for a token at the challenge's realm.
    ///
    /// Rejected credentials are retried anonymously, since public
    /// repositories grant pull tokens to anyone.
    fn request_token(
        &self,
        challenge: &AuthChallenge,
        credentials: Option<&Credentials>,
    ) -> std::result::Result<String, LookupError> {
        let query = challenge.token_query();
        debug!(realm = %challenge.realm, ?query, "requesting token");

        let mut request = self.http_client.get(&challenge.realm).query(&query);
        let basic = match credentials {
            Some(Credentials::Basic { username, password }) => Some((username, password)),
            _ => None,
        };
        if let Some((username, password)) = basic {
            request = request.basic_auth(username, Some(password));
        }

        let mut response = request
            .send()
            .map_err(|e| translate_reqwest_error(e, &challenge.realm))?;

        if response.status() == StatusCode::UNAUTHORIZED && basic.is_some() {
            warn!(realm = %challenge.realm, "credentials rejected, requesting anonymous token");
            response = self
                .http_client
                .get(&challenge.realm)
                .query(&query)
                .send()
                .map_err(|e| translate_reqwest_error(e, &challenge.realm))?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response);
            return Err(LookupError::auth_failed(
                format!("Token request to {} failed: {}", challenge.realm, body),
                Some(status.as_u16()),
            ));
        }

        let token: TokenResponse = response.json().map_err(|e| {
            LookupError::transport_with_source("Failed to parse token response", e)
        })?;

        token.into_token().ok_or_else(|| {
            LookupError::auth_failed(
                format!("Token response from {} carried no token", challenge.realm),
                Some(status.as_u16()),
            )
        })
    }
}

/// Accept header listing every manifest format the tool understands.
fn manifest_accept() -> String {
    [
        MEDIA_TYPE_DOCKER_V1_SIGNED,
        MEDIA_TYPE_DOCKER_V1,
        MEDIA_TYPE_DOCKER_V2,
        MEDIA_TYPE_DOCKER_LIST,
        MEDIA_TYPE_OCI_MANIFEST,
        MEDIA_TYPE_OCI_INDEX,
    ]
    .join(", ")
}

fn digest_header(headers: &HeaderMap) -> std::result::Result<Option<Digest>, LookupError> {
    let Some(value) = headers.get(DIGEST_HEADER) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|e| LookupError::transport_with_source("Unreadable Docker-Content-Digest", e))?;

    Digest::from_str(value.trim())
        .map(Some)
        .map_err(|e| LookupError::transport_with_source("Invalid Docker-Content-Digest", e))
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let media_type = value.split(';').next()?.trim();
    (!media_type.is_empty()).then(|| media_type.to_string())
}

/// Extracts the target of `Link: <...>; rel="next"`.
fn extract_next_link(headers: &HeaderMap) -> Option<String> {
    let link_str = headers.get(LINK)?.to_str().ok()?;

    for link_part in link_str.split(',') {
        let link_part = link_part.trim();

        if link_part.contains("rel=\"next\"") || link_part.contains("rel='next'") {
            if let Some(start) = link_part.find('<')
                && let Some(end) = link_part.find('>')
                && start < end
            {
                return Some(link_part[start + 1..end].to_string());
            }
        }
    }

    None
}

fn translate_reqwest_error(error: reqwest::Error, target: &str) -> LookupError {
    if error.is_timeout() {
        LookupError::transport_with_source(format!("Request to {} timed out", target), error)
    } else if error.is_connect() {
        LookupError::transport_with_source(format!("Failed to connect to {}", target), error)
    } else {
        LookupError::transport_with_source(
            format!("Network error communicating with {}", target),
            error,
        )
    }
}

/// Reads the registry's error body, preferring its structured messages.
fn error_body(response: Response) -> String {
    let text = response
        .text()
        .unwrap_or_else(|_| String::from("(unable to read response body)"));

    match serde_json::from_str::<RegistryErrors>(&text) {
        Ok(parsed) if !parsed.errors.is_empty() => parsed
            .errors
            .into_iter()
            .filter_map(|e| e.message.or(e.code))
            .collect::<Vec<_>>()
            .join("; "),
        _ => text.trim().to_string(),
    }
}

fn check_response_status(
    response: Response,
    reference: &ImageReference,
) -> std::result::Result<Response, LookupError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = error_body(response);

    match status {
        StatusCode::UNAUTHORIZED => Err(LookupError::auth_failed(
            format!("Authentication required for {}: {}", url, body),
            Some(401),
        )),
        StatusCode::FORBIDDEN => Err(LookupError::auth_failed(
            format!("Access forbidden for {}: {}", url, body),
            Some(403),
        )),
        StatusCode::NOT_FOUND => Err(LookupError::not_found(reference.to_string())),
        _ => Err(LookupError::transport(
            format!("HTTP {} from {}: {}", status.as_u16(), url, body),
            Some(status.as_u16()),
        )),
    }
}
