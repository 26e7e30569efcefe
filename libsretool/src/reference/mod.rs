//! Container image reference parsing, comparison and digest resolution.
//!
//! References follow the usual container grammar:
//!
//! ```text
//! [docker://][registry[:port]/]path[:tag][@algorithm:hex]
//! ```
//!
//! The first path component is only treated as a registry host when more
//! components follow it and it contains a `.` or a `:`, or is `localhost`.
//! Otherwise the reference points at Docker Hub, where single-component
//! repositories live under `library/`.

use crate::digest::Digest;
use crate::error::{Error, LookupError, ParseError};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[cfg(test)]
mod tests;

/// Registry used when the reference names none.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Tag used when the reference has neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

const DOCKER_TRANSPORT: &str = "docker://";
const DOCKER_HUB_LEGACY: &str = "index.docker.io";
const DOCKER_HUB_API: &str = "https://registry-1.docker.io";
const LIBRARY_NAMESPACE: &str = "library";
const MAX_TAG_LEN: usize = 128;

/// Anything that can map a tag reference to the digest of its manifest.
///
/// [`Registry`](crate::registry::Registry) is the production implementation.
pub trait DigestSource {
    /// Looks up the manifest digest `reference`'s tag currently points to.
    fn manifest_digest(&self, reference: &ImageReference) -> Result<Digest, LookupError>;
}

/// Where a reference stands in its resolution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// Tag only, digest not looked up yet.
    Unresolved,
    /// Digest looked up from the registry and memoized.
    Resolved,
    /// Digest supplied in the reference string. Never changes.
    Pinned,
}

/// A parsed container image reference.
///
/// Parsing never touches the network. The digest of a tag reference is
/// looked up with [`ImageReference::resolve`] and memoized on the object, so
/// repeated calls cost nothing. Once set (supplied or resolved) the digest
/// never changes.
///
/// Resolution takes `&mut self`. Callers that share one reference between
/// threads and want a single lookup must provide their own locking.
///
/// # Equality
///
/// Two references are equal when registry and repository match and either
/// both carry the same digest, or neither carries a digest and the tags
/// match. A reference with a digest is never equal to one without: resolve
/// first, or use [`ImageReference::same_image`].
///
/// # Examples
///
/// ```
/// use libsretool::ImageReference;
///
/// let image = ImageReference::parse("quay.io/org/app:v1").unwrap();
/// assert_eq!(image.registry(), "quay.io");
/// assert_eq!(image.repository(), "org/app");
/// assert_eq!(image.tag(), Some("v1"));
/// assert!(image.digest().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ImageReference {
    registry: String,
    repository: String,
    tag: Option<String>,
    digest: Option<Digest>,
    tag_override: bool,
}

impl ImageReference {
    /// Parses an image reference string.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] carrying the offending substring when the
    /// input is empty, contains characters outside `[a-z0-9._-/:@]`, has a
    /// malformed digest, an empty or malformed path component, or a bad tag.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let reference = input.strip_prefix(DOCKER_TRANSPORT).unwrap_or(input);

        if reference.is_empty() {
            return Err(ParseError::Empty);
        }

        check_characters(reference)?;

        // Digest first: whatever follows '@' is never tag-parsed
        let (name, digest) = match reference.split_once('@') {
            Some((name, digest)) => (name, Some(Digest::from_str(digest)?)),
            None => (reference, None),
        };

        let (name, tag) = split_tag(name);
        if let Some(tag) = tag {
            check_tag(tag)?;
        }

        let (registry, path) = split_registry(name);
        if let Some(registry) = registry {
            check_registry(registry)?;
        }
        for component in path.split('/') {
            check_path_component(component)?;
        }

        let registry = match registry {
            None | Some(DOCKER_HUB_LEGACY) => DEFAULT_REGISTRY,
            Some(host) => host,
        };

        let repository = if registry == DEFAULT_REGISTRY && !path.contains('/') {
            format!("{}/{}", LIBRARY_NAMESPACE, path)
        } else {
            path.to_string()
        };

        let tag = match (tag, &digest) {
            (None, None) => Some(DEFAULT_TAG.to_string()),
            (tag, _) => tag.map(str::to_string),
        };

        Ok(Self {
            registry: registry.to_string(),
            repository,
            tag,
            tag_override: digest.is_some(),
            digest,
        })
    }

    /// Returns a new, unresolved reference to the same repository at `tag`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::ImageReference;
    ///
    /// let image = ImageReference::parse("quay.io/org/app:v1").unwrap();
    /// let other = image.with_tag("v2").unwrap();
    /// assert_eq!(other.to_string(), "quay.io/org/app:v2");
    /// ```
    pub fn with_tag(&self, tag: &str) -> Result<Self, ParseError> {
        check_tag(tag)?;
        Ok(Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: Some(tag.to_string()),
            digest: None,
            tag_override: false,
        })
    }

    /// Registry host, with port when one was given.
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Full repository path, e.g. `library/fedora` or `org/team/app`.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Everything before the last path component, if anything.
    pub fn namespace(&self) -> Option<&str> {
        self.repository.rsplit_once('/').map(|(namespace, _)| namespace)
    }

    /// Last path component (the image name).
    pub fn name(&self) -> &str {
        self.repository
            .rsplit_once('/')
            .map_or(self.repository.as_str(), |(_, name)| name)
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Digest supplied in the reference or resolved since.
    pub fn digest(&self) -> Option<&Digest> {
        self.digest.as_ref()
    }

    /// True when the digest came from the reference string itself.
    pub fn tag_override(&self) -> bool {
        self.tag_override
    }

    pub fn state(&self) -> ResolutionState {
        match (&self.digest, self.tag_override) {
            (None, _) => ResolutionState::Unresolved,
            (Some(_), false) => ResolutionState::Resolved,
            (Some(_), true) => ResolutionState::Pinned,
        }
    }

    /// Tag or digest to address the manifest endpoint with.
    ///
    /// A pinned digest wins over the tag; otherwise the tag is used so that
    /// looking up a tag always reflects what the registry serves now.
    pub fn manifest_reference(&self) -> String {
        match (&self.tag, &self.digest) {
            (_, Some(digest)) if self.tag_override => digest.to_string(),
            (Some(tag), _) => tag.clone(),
            (None, Some(digest)) => digest.to_string(),
            (None, None) => DEFAULT_TAG.to_string(),
        }
    }

    /// Base URL of the registry's v2 API.
    ///
    /// Docker Hub serves its API from a different host than its name.
    pub fn api_base_url(&self) -> String {
        if self.registry == DEFAULT_REGISTRY {
            DOCKER_HUB_API.to_string()
        } else {
            format!("https://{}", self.registry)
        }
    }

    /// `registry/repository:tag`, always fully qualified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoTag`] for by-digest references, since a digest may
    /// be reachable through any number of tags.
    pub fn tag_url(&self) -> crate::error::Result<String> {
        match &self.tag {
            Some(tag) => Ok(format!("{}/{}:{}", self.registry, self.repository, tag)),
            None => Err(Error::NoTag {
                reference: self.to_string(),
            }),
        }
    }

    /// `registry/repository@digest`, once a digest is known.
    pub fn digest_url(&self) -> Option<String> {
        self.digest
            .as_ref()
            .map(|digest| format!("{}/{}@{}", self.registry, self.repository, digest))
    }

    /// Resolves the tag to a manifest digest, memoizing the result.
    ///
    /// A reference that already carries a digest returns it without calling
    /// `source`. On failure the reference is left unresolved.
    pub fn resolve<S>(&mut self, source: &S) -> Result<&Digest, LookupError>
    where
        S: DigestSource + ?Sized,
    {
        let digest = match self.digest.take() {
            Some(digest) => digest,
            None => {
                let digest = source.manifest_digest(self)?;
                debug!("Resolved {} to {}", self, digest);
                digest
            }
        };
        Ok(&*self.digest.insert(digest))
    }

    /// Resolves both references as needed and compares their digests.
    ///
    /// References to different repositories are never the same image and
    /// cost no lookup.
    pub fn same_image<S>(&mut self, other: &mut Self, source: &S) -> Result<bool, LookupError>
    where
        S: DigestSource + ?Sized,
    {
        if !self.same_repository(other) {
            return Ok(false);
        }
        let mine = self.resolve(source)?.clone();
        let theirs = other.resolve(source)?;
        Ok(&mine == theirs)
    }

    /// Registry and repository match, whatever the tag or digest.
    pub fn same_repository(&self, other: &Self) -> bool {
        self.registry == other.registry && self.repository == other.repository
    }
}

impl PartialEq for ImageReference {
    fn eq(&self, other: &Self) -> bool {
        if !self.same_repository(other) {
            return false;
        }
        match (&self.digest, &other.digest) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.tag == other.tag,
            _ => false,
        }
    }
}

impl Eq for ImageReference {}

impl FromStr for ImageReference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short_path = self
            .repository
            .strip_prefix("library/")
            .filter(|rest| !rest.contains('/'))
            .unwrap_or(self.repository.as_str());
        let first_component = short_path.split('/').next().unwrap_or_default();

        // Dropping the registry must not turn the first component into a host
        if self.registry == DEFAULT_REGISTRY && !looks_like_host(first_component) {
            f.write_str(short_path)?;
        } else {
            write!(f, "{}/{}", self.registry, self.repository)?;
        }

        if let Some(tag) = &self.tag
            && !(tag == DEFAULT_TAG && self.digest.is_none())
        {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_' | '/' | ':' | '@')
}

fn check_characters(reference: &str) -> Result<(), ParseError> {
    match reference.char_indices().find(|(_, c)| !is_allowed_char(*c)) {
        None => Ok(()),
        Some((position, ch)) => {
            let start = reference[..position].rfind('/').map_or(0, |i| i + 1);
            let end = reference[position..]
                .find('/')
                .map_or(reference.len(), |i| position + i);
            Err(ParseError::InvalidCharacter {
                ch,
                position,
                segment: reference[start..end].to_string(),
            })
        }
    }
}

/// Splits at the last ':' after the last '/', so a registry port is kept.
fn split_tag(name: &str) -> (&str, Option<&str>) {
    let last_slash = name.rfind('/');
    match name.rfind(':') {
        Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
            (&name[..colon], Some(&name[colon + 1..]))
        }
        _ => (name, None),
    }
}

fn split_registry(name: &str) -> (Option<&str>, &str) {
    match name.split_once('/') {
        Some((first, rest)) if looks_like_host(first) => (Some(first), rest),
        _ => (None, name),
    }
}

fn looks_like_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn starts_and_ends_alphanumeric(s: &str) -> bool {
    let alnum = |c: char| c.is_ascii_alphanumeric();
    s.chars().next().is_some_and(alnum) && s.chars().last().is_some_and(alnum)
}

fn check_registry(registry: &str) -> Result<(), ParseError> {
    let invalid = || ParseError::InvalidComponent {
        component: registry.to_string(),
    };

    let (host, port) = match registry.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (registry, None),
    };

    if !host
        .split('.')
        .all(|label| starts_and_ends_alphanumeric(label) && !label.contains('_'))
    {
        return Err(invalid());
    }

    if let Some(port) = port
        && (port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(invalid());
    }

    Ok(())
}

/// Alphanumeric runs joined by `.`, `_`, `__` or any number of `-`.
fn check_path_component(component: &str) -> Result<(), ParseError> {
    let separators_valid = component
        .split(|c: char| c.is_ascii_alphanumeric())
        .filter(|run| !run.is_empty())
        .all(|run| matches!(run, "." | "_" | "__") || run.chars().all(|c| c == '-'));

    if !starts_and_ends_alphanumeric(component) || !separators_valid {
        return Err(ParseError::InvalidComponent {
            component: component.to_string(),
        });
    }
    Ok(())
}

fn check_tag(tag: &str) -> Result<(), ParseError> {
    let valid_start = tag
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let valid_chars = tag
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'));

    if !valid_start || !valid_chars || tag.len() > MAX_TAG_LEN {
        return Err(ParseError::InvalidTag {
            tag: tag.to_string(),
        });
    }
    Ok(())
}
