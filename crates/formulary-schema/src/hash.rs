//! SHA-256 checksums: declared in manifests and computed from artifacts.

use serde::{Deserialize, Deserializer, Serialize};

/// Length of a hex-encoded SHA-256 digest.
pub const SHA256_HEX_LEN: usize = 64;

fn is_lower_hex(s: &str) -> bool {
    s.len() == SHA256_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Newtype for a SHA256 checksum as declared in a manifest.
///
/// Deserialization accepts any string so that a malformed checksum surfaces
/// as a validation failure rather than a parse error. Use
/// [`Sha256Hash::validated`] or [`Sha256Hash::is_well_formed`] to check it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Create a new `Sha256Hash` without validation.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Create a validated `Sha256Hash` (64 lowercase hex characters).
    ///
    /// # Errors
    ///
    /// Returns an error string if `s` is not exactly 64 lowercase hex characters.
    pub fn validated(s: &str) -> Result<Self, String> {
        if is_lower_hex(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!(
                "Invalid SHA256 hash: expected 64 lowercase hex chars, got '{s}'"
            ))
        }
    }

    /// Whether the checksum is exactly 64 lowercase hex characters.
    pub fn is_well_formed(&self) -> bool {
        is_lower_hex(&self.0)
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this declared checksum equals a computed digest.
    pub fn matches(&self, digest: &Sha256Digest) -> bool {
        self.0 == digest.as_str()
    }
}

impl std::fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Sha256Hash {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Sha256Hash {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A validated SHA256 digest (64 lowercase hex characters).
///
/// Produced by hashing artifact bytes. Unlike [`Sha256Hash`] this type can
/// only hold a well-formed digest, including when deserialized from a
/// receipt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Create a new `Sha256Digest`, validating the input.
    ///
    /// Accepts strings with or without a `sha256:` prefix; hex digits are
    /// normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the hex portion is not exactly 64 ASCII hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, String> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s).to_lowercase();

        if hex.len() != SHA256_HEX_LEN {
            return Err(format!(
                "Invalid SHA256 digest: expected 64 hex characters, got {} in '{s}'",
                hex.len(),
            ));
        }
        if !is_lower_hex(&hex) {
            return Err(format!(
                "Invalid SHA256 digest: contains non-hex characters in '{s}'"
            ));
        }

        Ok(Self(hex))
    }

    /// Build a digest from the raw 32 output bytes of a SHA-256 hasher.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Sha256Digest> for Sha256Hash {
    fn from(digest: Sha256Digest) -> Self {
        Sha256Hash::new(digest.0)
    }
}
