use crate::format::{self, Formattable};
use libsretool::oci;
use libsretool::retry::{RetryPolicy, retry};
use libsretool::{DigestSource, Error, ImageReference, Registry, Result};
use serde::Serialize;
use tracing::warn;

pub mod handlers;

/// Parsed fields of an image reference
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ImageInfo {
    /// Canonical rendering
    pub reference: String,
    pub registry: String,
    pub repository: String,
    pub namespace: Option<String>,
    pub name: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
    /// Whether the digest came from the input rather than a lookup
    pub tag_override: bool,
}

impl From<&ImageReference> for ImageInfo {
    fn from(image: &ImageReference) -> Self {
        Self {
            reference: image.to_string(),
            registry: image.registry().to_string(),
            repository: image.repository().to_string(),
            namespace: image.namespace().map(str::to_string),
            name: image.name().to_string(),
            tag: image.tag().map(str::to_string),
            digest: image.digest().map(|d| d.to_string()),
            tag_override: image.tag_override(),
        }
    }
}

impl Formattable for ImageInfo {
    fn format_pretty(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Image:      {}\n", self.reference));
        output.push_str(&format!("Registry:   {}\n", self.registry));
        output.push_str(&format!("Repository: {}\n", self.repository));
        if let Some(namespace) = &self.namespace {
            output.push_str(&format!("Namespace:  {}\n", namespace));
        }
        output.push_str(&format!("Name:       {}\n", self.name));
        output.push_str(&format!("Tag:        {}\n", self.tag.as_deref().unwrap_or("-")));
        output.push_str(&format!(
            "Digest:     {}\n",
            self.digest.as_deref().unwrap_or("-")
        ));
        output
    }
}

/// A reference resolved to its manifest digest
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DigestInfo {
    pub reference: String,
    pub digest: String,
}

impl Formattable for DigestInfo {
    fn format_pretty(&self) -> String {
        self.digest.clone()
    }
}

/// How two images were compared
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    Digest,
    Content,
}

/// Outcome of comparing two images
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CompareResult {
    pub first: String,
    pub second: String,
    pub mode: CompareMode,
    pub same: bool,
}

impl Formattable for CompareResult {
    fn format_pretty(&self) -> String {
        if self.same {
            format!(
                "{} {} and {} are the same image",
                format::checkmark(),
                self.first,
                self.second
            )
        } else {
            format!(
                "{} {} and {} differ",
                format::error_mark(),
                self.first,
                self.second
            )
        }
    }
}

/// A single repository tag
#[derive(Debug, Serialize, PartialEq, Eq, tabled::Tabled)]
pub struct TagItem {
    #[tabled(rename = "TAG")]
    pub tag: String,
}

impl Formattable for TagItem {
    fn format_pretty(&self) -> String {
        self.tag.clone()
    }
}

/// Whether an error is worth another attempt.
pub fn is_retryable(error: &Error) -> bool {
    matches!(error, Error::Lookup(lookup) if lookup.is_retryable())
}

/// Runs a registry operation under the configured retry policy.
pub fn with_retry<T, F>(policy: &RetryPolicy, op: F) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    retry(
        policy,
        is_retryable,
        |e, attempt| warn!(attempt, error = %e, "registry lookup failed, retrying"),
        op,
    )
}

/// Parses `input` without touching the network.
pub fn parse_image(input: &str) -> Result<ImageInfo> {
    let image = ImageReference::parse(input)?;
    Ok(ImageInfo::from(&image))
}

/// Resolves `input` to its manifest digest.
pub fn resolve_digest<S>(source: &S, policy: &RetryPolicy, input: &str) -> Result<DigestInfo>
where
    S: DigestSource + ?Sized,
{
    let mut image = ImageReference::parse(input)?;
    let digest = with_retry(policy, || Ok(image.resolve(source)?.clone()))?;

    Ok(DigestInfo {
        reference: image.to_string(),
        digest: digest.to_string(),
    })
}

/// Compares two references by manifest digest.
pub fn compare_digests<S>(
    source: &S,
    policy: &RetryPolicy,
    first: &str,
    second: &str,
) -> Result<CompareResult>
where
    S: DigestSource + ?Sized,
{
    let mut a = ImageReference::parse(first)?;
    let mut b = ImageReference::parse(second)?;

    let same = with_retry(policy, || Ok(a.same_image(&mut b, source)?))?;

    Ok(CompareResult {
        first: a.to_string(),
        second: b.to_string(),
        mode: CompareMode::Digest,
        same,
    })
}

/// Compares two references by manifest content (layers or member
/// manifests), which also matches images across repositories.
pub fn compare_content(
    registry: &Registry,
    policy: &RetryPolicy,
    first: &str,
    second: &str,
) -> Result<CompareResult> {
    let a = ImageReference::parse(first)?;
    let b = ImageReference::parse(second)?;

    let manifest_a = with_retry(policy, || registry.manifest(&a))?;
    let manifest_b = with_retry(policy, || registry.manifest(&b))?;

    Ok(CompareResult {
        first: a.to_string(),
        second: b.to_string(),
        mode: CompareMode::Content,
        same: oci::same_content(&manifest_a, &manifest_b)?,
    })
}

/// Lists the tags of the repository `input` names.
pub fn list_tags(registry: &Registry, policy: &RetryPolicy, input: &str) -> Result<Vec<TagItem>> {
    let image = ImageReference::parse(input)?;
    let tags = with_retry(policy, || Ok(registry.tags(&image)?))?;

    Ok(tags.into_iter().map(|tag| TagItem { tag }).collect())
}
