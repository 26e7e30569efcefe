use crate::format::Formattable;
use libsretool::auth::CredentialStore;
use libsretool::skopeo::{CommandRunner, CopyOptions, Skopeo, creds_arg};
use libsretool::{Error, ImageReference, Result};
use serde::Serialize;

pub mod handlers;

const DOCKER_TRANSPORT: &str = "docker://";

/// Transports that do not name a registry image.
const LOCAL_TRANSPORTS: &[&str] = &[
    "containers-storage:",
    "dir:",
    "docker-archive:",
    "docker-daemon:",
    "oci:",
    "oci-archive:",
];

/// A skopeo image argument and the registry image it names, if any.
#[derive(Debug, PartialEq, Eq)]
pub struct ImageArg {
    pub arg: String,
    pub image: Option<ImageReference>,
}

/// Normalizes a skopeo image argument.
///
/// Registry references get the `docker://` transport when they lack one and
/// are validated; local transports pass through unchanged.
pub fn image_arg(input: &str) -> Result<ImageArg> {
    if LOCAL_TRANSPORTS.iter().any(|t| input.starts_with(t)) {
        return Ok(ImageArg {
            arg: input.to_string(),
            image: None,
        });
    }

    let image = ImageReference::parse(input)?;
    let bare = input.strip_prefix(DOCKER_TRANSPORT).unwrap_or(input);

    Ok(ImageArg {
        arg: format!("{}{}", DOCKER_TRANSPORT, bare),
        image: Some(image),
    })
}

fn creds_for(store: &CredentialStore, arg: &ImageArg) -> Option<String> {
    let image = arg.image.as_ref()?;
    store.get(image.registry()).and_then(creds_arg)
}

/// Outcome of a copy
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CopyResult {
    pub source: String,
    pub destination: String,
    pub dry_run: bool,
}

impl Formattable for CopyResult {
    fn format_pretty(&self) -> String {
        if self.dry_run {
            format!("Would copy {} to {}", self.source, self.destination)
        } else {
            format!("Copied {} to {}", self.source, self.destination)
        }
    }
}

/// Copies `src` to `dst`, passing the configured credentials of each side.
pub fn copy_image<R: CommandRunner>(
    skopeo: &Skopeo<R>,
    store: &CredentialStore,
    src: &str,
    dst: &str,
    all: bool,
) -> Result<CopyResult> {
    let src = image_arg(src)?;
    let dst = image_arg(dst)?;

    let options = CopyOptions {
        src_creds: creds_for(store, &src),
        dest_creds: creds_for(store, &dst),
        all,
    };
    skopeo.copy(&src.arg, &dst.arg, &options)?;

    Ok(CopyResult {
        source: src.arg,
        destination: dst.arg,
        dry_run: skopeo.dry_run(),
    })
}

/// Inspects `image`, returning skopeo's JSON document.
pub fn inspect_image<R: CommandRunner>(
    skopeo: &Skopeo<R>,
    store: &CredentialStore,
    image: &str,
) -> Result<serde_json::Value> {
    let image = image_arg(image)?;
    let creds = creds_for(store, &image);

    let output = skopeo.inspect(&image.arg, creds.as_deref())?;
    serde_json::from_str(&output).map_err(|e| {
        Error::validation_with_source(format!("Unexpected skopeo output for {}", image.arg), e)
    })
}
