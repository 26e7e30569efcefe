//! Content digest validation and manipulation.
//!
//! A digest is written `algorithm:hex`. Only the algorithms registered by the
//! OCI image spec are accepted: `sha256` (64 hex characters) and `sha512`
//! (128 hex characters), both lowercase.

use crate::error::ParseError;
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
mod tests;

/// Hash algorithm of a [`Digest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the hex-encoded hash for this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable content digest such as `sha256:9834876d...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    hex: String,
}

impl Digest {
    /// Computes the sha256 digest of `bytes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use libsretool::Digest;
    ///
    /// let digest = Digest::sha256_of(b"");
    /// assert_eq!(
    ///     digest.to_string(),
    ///     "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    /// );
    /// ```
    pub fn sha256_of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self {
            algorithm: DigestAlgorithm::Sha256,
            hex: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Returns the hex-encoded hash without the algorithm prefix.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl FromStr for Digest {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ParseError::InvalidDigest {
            digest: s.to_string(),
            reason,
        };

        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected 'algorithm:hex'".to_string()))?;

        let algorithm = match algorithm {
            "sha256" => DigestAlgorithm::Sha256,
            "sha512" => DigestAlgorithm::Sha512,
            other => return Err(invalid(format!("unsupported algorithm '{}'", other))),
        };

        if hex.len() != algorithm.hex_len() {
            return Err(invalid(format!(
                "{} requires {} hex characters, got {}",
                algorithm,
                algorithm.hex_len(),
                hex.len()
            )));
        }

        if !hex
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(invalid("must contain only lowercase hex characters".to_string()));
        }

        Ok(Self {
            algorithm,
            hex: hex.to_string(),
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}
