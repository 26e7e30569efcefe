//! Authentication handling for container registries.
//!
//! Registries answer unauthenticated requests with `401` and a
//! `WWW-Authenticate` challenge. For the `Bearer` scheme the client trades its
//! (optional) basic credentials for a short-lived token at the challenge's
//! realm, then repeats the request with that token.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

#[cfg(test)]
mod tests;

/// Credentials for registry authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// No authentication required (anonymous access)
    Anonymous,

    /// HTTP Basic authentication with username and password
    Basic {
        /// Username for authentication
        username: String,
        /// Password for authentication
        password: String,
    },

    /// Bearer token authentication (OAuth2-style)
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl Credentials {
    /// Creates anonymous credentials.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Creates Basic authentication credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::auth::Credentials;
    ///
    /// let creds = Credentials::basic("username", "password");
    /// ```
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates Bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    /// Returns the Authorization header value for these credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::auth::Credentials;
    ///
    /// let creds = Credentials::basic("user", "pass");
    /// assert_eq!(creds.to_header_value().unwrap(), "Basic dXNlcjpwYXNz");
    /// ```
    pub fn to_header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::Basic { username, password } => {
                use base64::{Engine as _, engine::general_purpose};
                let credentials = format!("{}:{}", username, password);
                let encoded = general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {}", encoded))
            }
            Self::Bearer { token } => Some(format!("Bearer {}", token)),
        }
    }
}

/// Credentials keyed by registry host.
///
/// Credentials are only ever handed out for the registry they were
/// registered for, so a token request for one registry never leaks the
/// password of another.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    credentials: HashMap<String, Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers credentials for `registry` (host with optional port).
    pub fn insert(&mut self, registry: impl Into<String>, credentials: Credentials) {
        self.credentials.insert(registry.into(), credentials);
    }

    /// Credentials registered for `registry`, if any.
    pub fn get(&self, registry: &str) -> Option<&Credentials> {
        self.credentials.get(registry)
    }

    pub fn remove(&mut self, registry: &str) -> Option<Credentials> {
        self.credentials.remove(registry)
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

/// Information parsed from a WWW-Authenticate header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// The authentication scheme (e.g., "Bearer")
    pub scheme: String,

    /// The authentication realm
    pub realm: String,

    /// The service identifier
    pub service: Option<String>,

    /// The scope being requested
    pub scope: Option<String>,
}

impl AuthChallenge {
    /// Parses a WWW-Authenticate header value.
    ///
    /// Example header: `Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:alpine:pull"`
    ///
    /// Quoted values may contain commas (`scope="repository:app:pull,push"`).
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::auth::AuthChallenge;
    ///
    /// let header = r#"Bearer realm="https://auth.example.com/token",service="registry""#;
    /// let challenge = AuthChallenge::parse(header).unwrap();
    /// assert_eq!(challenge.scheme, "Bearer");
    /// ```
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();

        // Split scheme from parameters
        let (scheme, params) = header
            .split_once(' ')
            .ok_or_else(|| Error::validation("Invalid WWW-Authenticate header format"))?;

        let mut realm = None;
        let mut service = None;
        let mut scope = None;

        for (key, value) in parse_auth_params(params) {
            match key.as_str() {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {} // Ignore unknown parameters
            }
        }

        let realm = realm.ok_or_else(|| {
            Error::validation("WWW-Authenticate header missing required 'realm' parameter")
        })?;

        Ok(Self {
            scheme: scheme.to_string(),
            realm,
            service,
            scope,
        })
    }

    pub fn is_bearer(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("bearer")
    }

    /// Query parameters for the token request at `realm`.
    pub fn token_query(&self) -> Vec<(&'static str, &str)> {
        let mut query = Vec::new();
        if let Some(service) = &self.service {
            query.push(("service", service.as_str()));
        }
        if let Some(scope) = &self.scope {
            query.push(("scope", scope.as_str()));
        }
        query
    }
}

/// Body returned by a token realm. Docker Hub sends both fields, other
/// registries only one of them.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl TokenResponse {
    pub fn into_token(self) -> Option<String> {
        self.token.or(self.access_token)
    }
}

/// Splits `key="value", key2=value2` pairs, honouring quotes.
fn parse_auth_params(params: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut chars = params.chars().peekable();

    loop {
        while chars.next_if(|c| *c == ',' || c.is_whitespace()).is_some() {}

        let key: String = std::iter::from_fn(|| chars.next_if(|c| *c != '=' && *c != ','))
            .collect();
        if key.trim().is_empty() {
            break;
        }
        if chars.next_if_eq(&'=').is_none() {
            continue;
        }

        let value: String = if chars.next_if_eq(&'"').is_some() {
            let quoted: String = std::iter::from_fn(|| chars.next_if(|c| *c != '"')).collect();
            chars.next();
            quoted
        } else {
            std::iter::from_fn(|| chars.next_if(|c| *c != ',')).collect()
        };

        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }

    pairs
}
