//! Content hashing for generated artifacts
//!
//! [`ContentHash`] fingerprints candidate and emitted artifacts so that
//! byte-identical snapshots can be recognised without keeping every string
//! around, and so log lines can name a snapshot compactly.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content hash (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Compute Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self(*hash.as_bytes())
    }

    /// Hash of a text snapshot
    #[inline]
    #[must_use]
    pub fn of_text(text: &str) -> Self {
        Self::compute(text.as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let actual = bytes.len();
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: 32,
            actual,
        })?;
        Ok(Self(bytes))
    }
}

// Hex on the wire; emitted events are read by humans and browsers.
impl serde::Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when working with content hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_wrong_length() {
        let result = "01".repeat(31).parse::<ContentHash>();
        assert!(matches!(
            result,
            Err(HashError::InvalidLength {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!(matches!(
            "zz".repeat(32).parse::<ContentHash>(),
            Err(HashError::HexDecode(_))
        ));
    }

    #[test]
    fn text_hash_is_deterministic() {
        let h1 = ContentHash::of_text("export default function App() {}");
        let h2 = ContentHash::of_text("export default function App() {}");
        assert_eq!(h1, h2);
    }

    #[test]
    fn single_character_change_changes_hash() {
        let h1 = ContentHash::of_text("return (<div/>)");
        let h2 = ContentHash::of_text("return (<div />)");
        assert_ne!(h1, h2);
    }

    #[test]
    fn display_and_parse() {
        let hash = ContentHash::of_text("snapshot");
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn short_is_display_prefix() {
        let hash = ContentHash::of_text("snapshot");
        let short = hash.short();
        assert_eq!(short.len(), 16);
        assert!(hash.to_string().starts_with(&short));
    }

    #[test]
    fn serde_json_uses_hex() {
        let hash = ContentHash::of_text("snapshot");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{hash}\""));
        let decoded: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, decoded);
    }
}
