//! Manifest parsing and comparison.
//!
//! Registries serve two shapes of manifest: a single-arch image manifest
//! listing layers, and a multi-arch index (Docker "manifest list") listing
//! per-platform manifests. Both the OCI and Docker schema 2 flavours parse
//! into the `oci-spec` types. Docker schema 1 is not supported.

pub use oci_spec::image::{Descriptor, ImageIndex, ImageManifest};

use crate::client::{
    MEDIA_TYPE_DOCKER_LIST, MEDIA_TYPE_DOCKER_V1, MEDIA_TYPE_DOCKER_V1_SIGNED,
    MEDIA_TYPE_DOCKER_V2, MEDIA_TYPE_OCI_INDEX, MEDIA_TYPE_OCI_MANIFEST, ManifestResponse,
};
use crate::digest::Digest;
use crate::error::{Error, Result};


#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum ManifestOrIndex {
    Manifest(ImageManifest),
    Index(ImageIndex),
}

impl ManifestOrIndex {
    /// Parses a manifest body, picking the shape from `mediaType` or, when
    /// that is absent, from the fields present.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::validation_with_source("Failed to parse manifest JSON", e))?;

        let media_type = value
            .get("mediaType")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        if is_schema1(media_type) || value.get("fsLayers").is_some() {
            return Err(Error::comparison(
                "Docker schema 1 manifests are not supported",
            ));
        }

        let is_index = if media_type.is_empty() {
            value.get("manifests").is_some()
        } else {
            is_multi_arch(media_type)
        };

        if is_index {
            let index: ImageIndex = serde_json::from_slice(bytes)
                .map_err(|e| Error::validation_with_source("Failed to parse image index", e))?;
            Ok(Self::Index(index))
        } else if !media_type.is_empty()
            || value.get("layers").is_some()
            || value.get("config").is_some()
        {
            let manifest: ImageManifest = serde_json::from_slice(bytes)
                .map_err(|e| Error::validation_with_source("Failed to parse image manifest", e))?;
            Ok(Self::Manifest(manifest))
        } else {
            Err(Error::validation(
                "Unable to determine if content is a manifest or index",
            ))
        }
    }

    pub fn is_manifest(&self) -> bool {
        matches!(self, Self::Manifest(_))
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    pub fn as_manifest(&self) -> Option<&ImageManifest> {
        match self {
            Self::Manifest(m) => Some(m),
            Self::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<&ImageIndex> {
        match self {
            Self::Manifest(_) => None,
            Self::Index(i) => Some(i),
        }
    }
}

/// A parsed manifest together with how the registry described it.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub content_type: String,
    pub digest: Digest,
    pub body: ManifestOrIndex,
}

impl Manifest {
    /// Parses a registry response.
    ///
    /// The content type comes from the response header, falling back to the
    /// body's `mediaType`.
    pub fn from_response(response: &ManifestResponse) -> Result<Self> {
        let body = ManifestOrIndex::from_bytes(&response.bytes)?;

        let content_type = match &response.content_type {
            Some(content_type) if !content_type.is_empty() => {
                if is_schema1(content_type) {
                    return Err(Error::comparison(
                        "Docker schema 1 manifests are not supported",
                    ));
                }
                content_type.clone()
            }
            _ => embedded_media_type(&body),
        };

        Ok(Self {
            content_type,
            digest: response.digest.clone(),
            body,
        })
    }

    pub fn is_multi_arch(&self) -> bool {
        self.body.is_index()
    }

    /// Layer digests of a single-arch manifest, in order.
    pub fn layer_digests(&self) -> Result<Vec<String>> {
        match &self.body {
            ManifestOrIndex::Manifest(m) => Ok(digests(m.layers())),
            ManifestOrIndex::Index(_) => Err(Error::comparison(format!(
                "{} is a multi-arch index and has no layers",
                self.digest
            ))),
        }
    }

    /// Member manifest digests of a multi-arch index, in order.
    pub fn manifest_digests(&self) -> Result<Vec<String>> {
        match &self.body {
            ManifestOrIndex::Index(i) => Ok(digests(i.manifests())),
            ManifestOrIndex::Manifest(_) => Err(Error::comparison(format!(
                "{} is a single-arch manifest and has no member manifests",
                self.digest
            ))),
        }
    }
}

/// Whether two manifests describe the same image content.
///
/// Manifests of different content types never match. Single-arch manifests
/// match on their layer list, multi-arch indexes on their member list.
///
/// # Errors
///
/// Returns [`Error::Comparison`] for content types that cannot be compared.
pub fn same_content(a: &Manifest, b: &Manifest) -> Result<bool> {
    if a.content_type != b.content_type {
        return Ok(false);
    }

    if !is_comparable(&a.content_type) {
        return Err(Error::comparison(format!(
            "Unsupported content type: {}",
            a.content_type
        )));
    }

    match (&a.body, &b.body) {
        (ManifestOrIndex::Manifest(x), ManifestOrIndex::Manifest(y)) => {
            Ok(digests(x.layers()) == digests(y.layers()))
        }
        (ManifestOrIndex::Index(x), ManifestOrIndex::Index(y)) => {
            Ok(digests(x.manifests()) == digests(y.manifests()))
        }
        _ => Ok(false),
    }
}

/// Whether the multi-arch `index` lists `member_digest`.
///
/// # Errors
///
/// [`Error::Comparison`] unless `index` is multi-arch and `member` is
/// single-arch.
pub fn index_contains(index: &Manifest, member_digest: &Digest, member: &Manifest) -> Result<bool> {
    let ManifestOrIndex::Index(list) = &index.body else {
        return Err(Error::comparison(format!(
            "{} is not a multi-arch image",
            index.digest
        )));
    };
    if member.is_multi_arch() {
        return Err(Error::comparison(format!(
            "{} is not a single-arch image",
            member.digest
        )));
    }

    let wanted = member_digest.to_string();
    Ok(list
        .manifests()
        .iter()
        .any(|descriptor| descriptor.digest().to_string() == wanted))
}

/// Whether `image` was built on top of `base`: every layer of `base`
/// appears in `image`.
pub fn is_based_on(image: &Manifest, base: &Manifest) -> Result<bool> {
    let image_layers = image.layer_digests()?;
    let base_layers = base.layer_digests()?;

    Ok(base_layers.iter().all(|layer| image_layers.contains(layer)))
}

fn digests(descriptors: &[Descriptor]) -> Vec<String> {
    descriptors
        .iter()
        .map(|descriptor| descriptor.digest().to_string())
        .collect()
}

fn is_schema1(media_type: &str) -> bool {
    media_type == MEDIA_TYPE_DOCKER_V1 || media_type == MEDIA_TYPE_DOCKER_V1_SIGNED
}

fn is_multi_arch(media_type: &str) -> bool {
    media_type == MEDIA_TYPE_DOCKER_LIST
        || media_type == MEDIA_TYPE_OCI_INDEX
        || media_type.contains("index")
        || media_type.contains("list")
}

fn is_comparable(media_type: &str) -> bool {
    [
        MEDIA_TYPE_DOCKER_V2,
        MEDIA_TYPE_DOCKER_LIST,
        MEDIA_TYPE_OCI_MANIFEST,
        MEDIA_TYPE_OCI_INDEX,
    ]
    .contains(&media_type)
}

fn embedded_media_type(body: &ManifestOrIndex) -> String {
    let declared = match body {
        ManifestOrIndex::Manifest(m) => m.media_type().as_ref().map(|t| t.to_string()),
        ManifestOrIndex::Index(i) => i.media_type().as_ref().map(|t| t.to_string()),
    };

    declared.unwrap_or_else(|| match body {
        ManifestOrIndex::Manifest(_) => MEDIA_TYPE_OCI_MANIFEST.to_string(),
        ManifestOrIndex::Index(_) => MEDIA_TYPE_OCI_INDEX.to_string(),
    })
}
