use super::*;
use std::str::FromStr;

const SHA256: &str = "sha256:7173b809ca12ec5dee4506cd86be934c4596dd234ee82c0662eac04a8c2c71dc";

#[test]
fn test_digest_from_valid_string_succeeds() {
    let digest = Digest::from_str(SHA256).unwrap();
    assert_eq!(digest.algorithm(), DigestAlgorithm::Sha256);
    assert_eq!(
        digest.hex(),
        "7173b809ca12ec5dee4506cd86be934c4596dd234ee82c0662eac04a8c2c71dc"
    );
}

#[test]
fn test_digest_sha512_accepted() {
    let digest_str = format!("sha512:{}", "ab".repeat(64));
    let digest = Digest::from_str(&digest_str).unwrap();
    assert_eq!(digest.algorithm(), DigestAlgorithm::Sha512);
}

#[test]
fn test_digest_from_invalid_string_fails() {
    let digest = Digest::from_str("sha256:invalid-digest");
    assert!(matches!(
        digest.unwrap_err(),
        ParseError::InvalidDigest { .. }
    ));
}

#[test]
fn test_digest_unknown_algorithm_fails() {
    let err = Digest::from_str(&format!("md5:{}", "a".repeat(32))).unwrap_err();
    assert!(err.to_string().contains("unsupported algorithm"));
}

#[test]
fn test_digest_missing_separator_fails() {
    assert!(Digest::from_str("7173b809ca12ec5dee4506cd86be934c").is_err());
}

#[test]
fn test_digest_wrong_length_fails() {
    let err = Digest::from_str("sha256:7173b809").unwrap_err();
    assert!(err.to_string().contains("64 hex characters"));
}

#[test]
fn test_digest_uppercase_hex_fails() {
    let upper = SHA256.to_uppercase().replace("SHA256", "sha256");
    assert!(Digest::from_str(&upper).is_err());
}

#[test]
fn test_digest_display_trait() {
    let digest = Digest::from_str(SHA256).unwrap();
    assert_eq!(digest.to_string(), SHA256);
}

#[test]
fn test_sha256_of_matches_known_value() {
    let digest = Digest::sha256_of(b"hello");
    assert_eq!(
        digest.to_string(),
        "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
}
