use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content digest of the form `algorithm:hex` (e.g. `sha256:deadbeef...`).
///
/// Digests identify images and blobs. Two images with the same digest are the
/// same image, which is what makes layer deduplication by digest safe.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Parse and validate a digest string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidDigest {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected algorithm:hex"))?;
        if algorithm.is_empty() {
            return Err(invalid("empty algorithm"));
        }
        if !algorithm
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-'))
        {
            return Err(invalid("algorithm contains invalid characters"));
        }
        if hex.is_empty() {
            return Err(invalid("empty hex part"));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("hex part contains non-hex characters"));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns `true` if `s` parses as a digest.
    pub fn is_digest(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    /// The algorithm component (e.g. `sha256`).
    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map(|(a, _)| a).unwrap_or_default()
    }

    /// The hex component.
    pub fn hex(&self) -> &str {
        self.0.split_once(':').map(|(_, h)| h).unwrap_or_default()
    }

    /// Short form: algorithm plus the first 12 hex characters.
    pub fn short(&self) -> String {
        let hex = self.hex();
        let end = hex.len().min(12);
        format!("{}:{}", self.algorithm(), &hex[..end])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns `true` if the image name `image` is addressed by `id`.
///
/// `id` matches when it equals `image`, when it is a prefix of `image`, or,
/// for digest-form images, when it is a prefix of the hex component.
pub fn matches_id(image: &str, id: &str) -> bool {
    if id.is_empty() || image.is_empty() {
        return false;
    }
    if image.starts_with(id) {
        return true;
    }
    match Digest::parse(image) {
        Ok(digest) => digest.hex().starts_with(id),
        Err(_) => false,
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Digest {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}
