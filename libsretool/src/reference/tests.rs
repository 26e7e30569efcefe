use super::*;
use crate::error::LookupErrorKind;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

const HEX_A: &str = "7173b809ca12ec5dee4506cd86be934c4596dd234ee82c0662eac04a8c2c71dc";
const HEX_B: &str = "9834876dcfb05cb167a5c24953eba58c4ac89b1adf57f28f2f9d09af107ee8f0";

fn digest(hex: &str) -> Digest {
    Digest::from_str(&format!("sha256:{}", hex)).unwrap()
}

/// Registry stand-in that serves tag -> digest from a map and counts lookups.
struct FakeRegistry {
    digests: RefCell<HashMap<String, Digest>>,
    calls: Cell<usize>,
}

impl FakeRegistry {
    fn new() -> Self {
        Self {
            digests: RefCell::new(HashMap::new()),
            calls: Cell::new(0),
        }
    }

    fn serve(&self, tag: &str, hex: &str) {
        self.digests
            .borrow_mut()
            .insert(tag.to_string(), digest(hex));
    }
}

impl DigestSource for FakeRegistry {
    fn manifest_digest(&self, reference: &ImageReference) -> Result<Digest, LookupError> {
        self.calls.set(self.calls.get() + 1);
        self.digests
            .borrow()
            .get(reference.tag().unwrap_or(DEFAULT_TAG))
            .cloned()
            .ok_or_else(|| LookupError::not_found(reference.to_string()))
    }
}

struct FailingRegistry;

impl DigestSource for FailingRegistry {
    fn manifest_digest(&self, _reference: &ImageReference) -> Result<Digest, LookupError> {
        Err(LookupError::transport("connection reset", None))
    }
}

#[test]
fn test_parse_bare_name_uses_docker_hub_defaults() {
    let image = ImageReference::parse("fedora").unwrap();
    assert_eq!(image.registry(), "docker.io");
    assert_eq!(image.repository(), "library/fedora");
    assert_eq!(image.namespace(), Some("library"));
    assert_eq!(image.name(), "fedora");
    assert_eq!(image.tag(), Some("latest"));
    assert!(image.digest().is_none());
    assert!(!image.tag_override());
    assert_eq!(image.state(), ResolutionState::Unresolved);
}

#[test]
fn test_parse_registry_namespace_and_tag() {
    let image = ImageReference::parse("quay.io/org/app:v1").unwrap();
    assert_eq!(image.registry(), "quay.io");
    assert_eq!(image.repository(), "org/app");
    assert_eq!(image.namespace(), Some("org"));
    assert_eq!(image.name(), "app");
    assert_eq!(image.tag(), Some("v1"));
}

#[test]
fn test_parse_by_digest_sets_tag_override() {
    let input = format!("quay.io/org/app@sha256:{}", HEX_A);
    let image = ImageReference::parse(&input).unwrap();
    assert_eq!(image.digest(), Some(&digest(HEX_A)));
    assert!(image.tag_override());
    assert_eq!(image.tag(), None);
    assert_eq!(image.state(), ResolutionState::Pinned);
}

#[test]
fn test_parse_tag_and_digest() {
    let input = format!("quay.io/org/app:v1@sha256:{}", HEX_A);
    let image = ImageReference::parse(&input).unwrap();
    assert_eq!(image.tag(), Some("v1"));
    assert_eq!(image.digest(), Some(&digest(HEX_A)));
    assert!(image.tag_override());
}

#[test]
fn test_parse_registry_with_port() {
    let image = ImageReference::parse("registry.example.com:5000/repo01/centos:7").unwrap();
    assert_eq!(image.registry(), "registry.example.com:5000");
    assert_eq!(image.repository(), "repo01/centos");
    assert_eq!(image.tag(), Some("7"));
}

#[test]
fn test_parse_registry_port_without_tag() {
    let image = ImageReference::parse("localhost:5000/app").unwrap();
    assert_eq!(image.registry(), "localhost:5000");
    assert_eq!(image.repository(), "app");
    assert_eq!(image.namespace(), None);
    assert_eq!(image.tag(), Some("latest"));
}

#[test]
fn test_parse_localhost_registry() {
    let image = ImageReference::parse("localhost/app:dev").unwrap();
    assert_eq!(image.registry(), "localhost");
    assert_eq!(image.repository(), "app");
}

#[test]
fn test_parse_numeric_tag_is_not_a_port() {
    // No '/' follows, so "localhost" is a repository and "5000" its tag
    let image = ImageReference::parse("localhost:5000").unwrap();
    assert_eq!(image.registry(), "docker.io");
    assert_eq!(image.repository(), "library/localhost");
    assert_eq!(image.tag(), Some("5000"));
}

#[test]
fn test_parse_namespace_without_registry() {
    let image = ImageReference::parse("org/app:v1").unwrap();
    assert_eq!(image.registry(), "docker.io");
    assert_eq!(image.repository(), "org/app");
}

#[test]
fn test_parse_deep_repository_path() {
    let image = ImageReference::parse("ghcr.io/org/team/app:1.2.3").unwrap();
    assert_eq!(image.repository(), "org/team/app");
    assert_eq!(image.namespace(), Some("org/team"));
    assert_eq!(image.name(), "app");
}

#[test]
fn test_parse_strips_docker_transport() {
    let image = ImageReference::parse("docker://quay.io/app-sre/qontract-reconcile").unwrap();
    assert_eq!(image.registry(), "quay.io");
    assert_eq!(image.repository(), "app-sre/qontract-reconcile");
    assert_eq!(image.tag(), Some("latest"));
}

#[test]
fn test_parse_canonicalizes_legacy_docker_hub_host() {
    let image = ImageReference::parse("index.docker.io/library/fedora:31").unwrap();
    assert_eq!(image, ImageReference::parse("fedora:31").unwrap());
}

#[test]
fn test_parse_empty_fails() {
    assert_eq!(ImageReference::parse("").unwrap_err(), ParseError::Empty);
    assert_eq!(
        ImageReference::parse("docker://").unwrap_err(),
        ParseError::Empty
    );
}

#[test]
fn test_parse_uppercase_and_space_fails() {
    let err = ImageReference::parse("UPPERCASE/bad ref").unwrap_err();
    assert!(matches!(err, ParseError::InvalidCharacter { ch: 'U', .. }));
    assert_eq!(err.offending(), "UPPERCASE");
}

#[test]
fn test_parse_space_reports_segment() {
    let err = ImageReference::parse("org/bad ref").unwrap_err();
    assert!(matches!(
        err,
        ParseError::InvalidCharacter {
            ch: ' ',
            position: 7,
            ..
        }
    ));
    assert_eq!(err.offending(), "bad ref");
}

#[test]
fn test_parse_bad_digest_algorithm_fails() {
    let err = ImageReference::parse(&format!("org/app@md5:{}", HEX_A)).unwrap_err();
    assert!(matches!(err, ParseError::InvalidDigest { .. }));
    assert!(err.offending().starts_with("md5:"));
}

#[test]
fn test_parse_non_hex_digest_fails() {
    let bad = "z".repeat(64);
    let err = ImageReference::parse(&format!("org/app@sha256:{}", bad)).unwrap_err();
    assert!(matches!(err, ParseError::InvalidDigest { .. }));
}

#[test]
fn test_parse_double_at_fails() {
    let input = format!("org/app@sha256:{}@sha256:{}", HEX_A, HEX_B);
    assert!(matches!(
        ImageReference::parse(&input).unwrap_err(),
        ParseError::InvalidDigest { .. }
    ));
}

#[test]
fn test_parse_empty_tag_fails() {
    let err = ImageReference::parse("quay.io/org/app:").unwrap_err();
    assert_eq!(err, ParseError::InvalidTag { tag: String::new() });
}

#[test]
fn test_parse_empty_component_fails() {
    let err = ImageReference::parse("quay.io//app").unwrap_err();
    assert!(matches!(err, ParseError::InvalidComponent { .. }));
}

#[test]
fn test_parse_surrounding_whitespace_fails() {
    let err = ImageReference::parse(" fedora").unwrap_err();
    assert!(matches!(
        err,
        ParseError::InvalidCharacter {
            ch: ' ',
            position: 0,
            ..
        }
    ));
    assert_eq!(err.offending(), " fedora");

    let err = ImageReference::parse("fedora\n").unwrap_err();
    assert!(matches!(
        err,
        ParseError::InvalidCharacter {
            ch: '\n',
            position: 6,
            ..
        }
    ));

    let err = ImageReference::parse("   ").unwrap_err();
    assert!(matches!(err, ParseError::InvalidCharacter { ch: ' ', .. }));
}

#[test]
fn test_parse_component_separator_runs() {
    for valid in [
        "quay.io/a.b/app",
        "quay.io/a_b/app",
        "quay.io/a__b/app",
        "quay.io/a---b/app",
    ] {
        assert!(ImageReference::parse(valid).is_ok(), "{}", valid);
    }

    for (invalid, component) in [
        ("quay.io/a..b/app", "a..b"),
        ("quay.io/a___b/app", "a___b"),
        ("quay.io/a.-b/app", "a.-b"),
        ("quay.io/org/a_.b", "a_.b"),
    ] {
        let err = ImageReference::parse(invalid).unwrap_err();
        assert!(matches!(err, ParseError::InvalidComponent { .. }), "{}", invalid);
        assert_eq!(err.offending(), component);
    }
}

#[test]
fn test_parse_component_with_leading_separator_fails() {
    let err = ImageReference::parse("quay.io/-org/app").unwrap_err();
    assert_eq!(err.offending(), "-org");
}

#[test]
fn test_parse_tag_too_long_fails() {
    let input = format!("org/app:{}", "a".repeat(129));
    assert!(matches!(
        ImageReference::parse(&input).unwrap_err(),
        ParseError::InvalidTag { .. }
    ));
}

#[test]
fn test_parse_bad_port_fails() {
    let err = ImageReference::parse("registry.example.com:/app").unwrap_err();
    assert!(matches!(err, ParseError::InvalidComponent { .. }));
}

#[test]
fn test_from_str_matches_parse() {
    let image: ImageReference = "quay.io/org/app:v1".parse().unwrap();
    assert_eq!(image, ImageReference::parse("quay.io/org/app:v1").unwrap());
}

#[test]
fn test_display_omits_defaults() {
    let image = ImageReference::parse("docker.io/library/fedora:latest").unwrap();
    assert_eq!(image.to_string(), "fedora");

    let image = ImageReference::parse("docker.io/org/app:v1").unwrap();
    assert_eq!(image.to_string(), "org/app:v1");
}

#[test]
fn test_display_keeps_non_default_registry() {
    let image = ImageReference::parse("quay.io/org/app").unwrap();
    assert_eq!(image.to_string(), "quay.io/org/app");
}

#[test]
fn test_display_keeps_registry_when_namespace_looks_like_host() {
    let image = ImageReference::parse("docker.io/my.org/app").unwrap();
    assert_eq!(image.to_string(), "docker.io/my.org/app");
}

#[test]
fn test_display_keeps_library_prefix_for_nested_path() {
    let image = ImageReference::parse("library/team/app:v1").unwrap();
    assert_eq!(image.to_string(), "library/team/app:v1");
}

#[test]
fn test_display_by_digest() {
    let input = format!("quay.io/org/app@sha256:{}", HEX_A);
    let image = ImageReference::parse(&input).unwrap();
    assert_eq!(image.to_string(), input);
}

#[test]
fn test_display_round_trip() {
    let inputs = [
        "fedora".to_string(),
        "fedora:31".to_string(),
        "docker.io/library/fedora".to_string(),
        "org/app:v1".to_string(),
        "quay.io/org/app:v1".to_string(),
        "registry.example.com:5000/repo01/centos:latest".to_string(),
        "localhost:5000".to_string(),
        "docker.io/my.org/app".to_string(),
        format!("quay.io/org/app@sha256:{}", HEX_A),
        format!("fedora:latest@sha256:{}", HEX_B),
    ];

    for input in inputs {
        let parsed = ImageReference::parse(&input).unwrap();
        let reparsed = ImageReference::parse(&parsed.to_string()).unwrap();
        assert_eq!(parsed, reparsed, "round trip of {}", input);
        assert_eq!(parsed.tag(), reparsed.tag(), "tag of {}", input);
        assert_eq!(parsed.registry(), reparsed.registry(), "registry of {}", input);
    }
}

#[test]
fn test_with_tag_replaces_tag_and_drops_digest() {
    let input = format!("quay.io/foo/bar:latest@sha256:{}", HEX_A);
    let image = ImageReference::parse(&input).unwrap();
    let other = image.with_tag("current").unwrap();
    assert_eq!(other.tag(), Some("current"));
    assert!(other.digest().is_none());
    assert!(!other.tag_override());
    assert!(other.same_repository(&image));
}

#[test]
fn test_with_tag_rejects_invalid_tag() {
    let image = ImageReference::parse("quay.io/foo/bar").unwrap();
    assert!(image.with_tag("").is_err());
    assert!(image.with_tag("-bad").is_err());
}

#[test]
fn test_tag_url_and_digest_url() {
    let image = ImageReference::parse("fedora:31").unwrap();
    assert_eq!(image.tag_url().unwrap(), "docker.io/library/fedora:31");
    assert_eq!(image.digest_url(), None);

    let input = format!("quay.io/foo/bar@sha256:{}", HEX_A);
    let image = ImageReference::parse(&input).unwrap();
    assert!(matches!(image.tag_url().unwrap_err(), Error::NoTag { .. }));
    assert_eq!(image.digest_url().unwrap(), input);
}

#[test]
fn test_api_base_url() {
    let hub = ImageReference::parse("fedora").unwrap();
    assert_eq!(hub.api_base_url(), "https://registry-1.docker.io");

    let quay = ImageReference::parse("quay.io/org/app").unwrap();
    assert_eq!(quay.api_base_url(), "https://quay.io");
}

#[test]
fn test_manifest_reference_prefers_pinned_digest() {
    let input = format!("quay.io/org/app:v1@sha256:{}", HEX_A);
    let pinned = ImageReference::parse(&input).unwrap();
    assert_eq!(pinned.manifest_reference(), format!("sha256:{}", HEX_A));

    let tagged = ImageReference::parse("quay.io/org/app:v1").unwrap();
    assert_eq!(tagged.manifest_reference(), "v1");
}

#[test]
fn test_equal_tag_references() {
    let a = ImageReference::parse("org/app:v1").unwrap();
    let b = ImageReference::parse("org/app:v1").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_different_tags_are_not_equal() {
    let a = ImageReference::parse("org/app:v1").unwrap();
    let b = ImageReference::parse("org/app:v2").unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_different_registries_are_not_equal() {
    let a = ImageReference::parse("quay.io/org/app:v1").unwrap();
    let b = ImageReference::parse("org/app:v1").unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_digest_reference_never_equals_unresolved_tag() {
    let registry = FakeRegistry::new();
    registry.serve("v1", HEX_A);

    let pinned = ImageReference::parse(&format!("org/app@sha256:{}", HEX_A)).unwrap();
    let mut tagged = ImageReference::parse("org/app:v1").unwrap();
    assert_ne!(pinned, tagged);

    tagged.resolve(&registry).unwrap();
    assert_eq!(pinned, tagged);
}

#[test]
fn test_equality_follows_resolved_digests() {
    let registry = FakeRegistry::new();
    registry.serve("v1", HEX_A);

    let mut a = ImageReference::parse("org/app:v1").unwrap();
    let mut b = ImageReference::parse("org/app:v1").unwrap();
    a.resolve(&registry).unwrap();
    b.resolve(&registry).unwrap();
    assert_eq!(a, b);

    // The tag moves on the registry; a fresh reference sees the new digest
    registry.serve("v1", HEX_B);
    let mut c = ImageReference::parse("org/app:v1").unwrap();
    c.resolve(&registry).unwrap();
    assert_ne!(a, c);
}

#[test]
fn test_resolve_is_memoized() {
    let registry = FakeRegistry::new();
    registry.serve("v1", HEX_A);

    let mut image = ImageReference::parse("org/app:v1").unwrap();
    let first = image.resolve(&registry).unwrap().clone();
    let second = image.resolve(&registry).unwrap().clone();

    assert_eq!(first, second);
    assert_eq!(registry.calls.get(), 1);
    assert_eq!(image.state(), ResolutionState::Resolved);
    assert!(!image.tag_override());
}

#[test]
fn test_resolve_pinned_makes_no_call() {
    let registry = FakeRegistry::new();
    let mut image = ImageReference::parse(&format!("org/app@sha256:{}", HEX_A)).unwrap();

    let resolved = image.resolve(&registry).unwrap();
    assert_eq!(resolved, &digest(HEX_A));
    assert_eq!(registry.calls.get(), 0);
}

#[test]
fn test_resolve_failure_leaves_reference_unresolved() {
    let mut image = ImageReference::parse("org/app:v1").unwrap();
    let err = image.resolve(&FailingRegistry).unwrap_err();

    assert_eq!(err.kind(), LookupErrorKind::Transport);
    assert!(image.digest().is_none());
    assert_eq!(image.state(), ResolutionState::Unresolved);
}

#[test]
fn test_resolve_not_found_is_distinguishable() {
    let registry = FakeRegistry::new();
    let mut image = ImageReference::parse("org/app:missing").unwrap();
    let err = image.resolve(&registry).unwrap_err();
    assert_eq!(err.kind(), LookupErrorKind::NotFound);
}

#[test]
fn test_same_image_resolves_both_sides() {
    let registry = FakeRegistry::new();
    registry.serve("v1", HEX_A);
    registry.serve("stable", HEX_A);

    let mut a = ImageReference::parse("org/app:v1").unwrap();
    let mut b = ImageReference::parse("org/app:stable").unwrap();
    assert!(a.same_image(&mut b, &registry).unwrap());
    assert_eq!(registry.calls.get(), 2);
}

#[test]
fn test_same_image_skips_lookup_for_other_repository() {
    let registry = FakeRegistry::new();
    let mut a = ImageReference::parse("org/app:v1").unwrap();
    let mut b = ImageReference::parse("org/other:v1").unwrap();
    assert!(!a.same_image(&mut b, &registry).unwrap());
    assert_eq!(registry.calls.get(), 0);
}
