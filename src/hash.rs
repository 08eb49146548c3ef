//! Domain-separated SHA-256 content hashes
//!
//! Every hash in the blob tree is produced by one of three functions, each
//! prefixing a fixed ASCII separator before the data:
//!
//! - chunks: `icfs-chunk/` || chunk bytes
//! - metadata: `icfs-metadata/` || sorted `"key: value\n"` header lines
//! - tree nodes: `ynode/` || left || right (an absent child is `UNBALANCED`)
//!
//! The only textual form is `sha256:<64 hex chars>`, produced by
//! [`ContentHash::to_sha_string`] and accepted by [`ContentHash::parse`].

use crate::error::{Result, StorageError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Prefix of the canonical textual hash form
pub const SHA256_PREFIX: &str = "sha256:";

const DOMAIN_SEPARATOR_FOR_CHUNKS: &[u8] = b"icfs-chunk/";
const DOMAIN_SEPARATOR_FOR_METADATA: &[u8] = b"icfs-metadata/";
const DOMAIN_SEPARATOR_FOR_NODES: &[u8] = b"ynode/";

/// Stands in for a missing child when hashing a tree node.
const UNBALANCED_SENTINEL: &[u8] = b"UNBALANCED";

/// Metadata headers attached to a blob, keyed by header name.
pub type Headers = BTreeMap<String, String>;

/// 32-byte SHA-256 digest identifying a chunk, a header set or a tree node.
///
/// Deliberately has no `Display` impl: use [`ContentHash::to_sha_string`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build from a byte slice, which must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            StorageError::Format(format!(
                "ContentHash must be exactly 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash a chunk of blob data.
    pub fn from_chunk(data: &[u8]) -> Self {
        digest(&[DOMAIN_SEPARATOR_FOR_CHUNKS, data])
    }

    /// Hash a header set.
    ///
    /// Keys and values are trimmed, rendered as `"key: value\n"`, and the lines
    /// sorted before hashing, so insertion order never matters.
    pub fn from_headers(headers: &Headers) -> Self {
        let mut lines: Vec<String> = headers
            .iter()
            .map(|(key, value)| format!("{}: {}\n", key.trim(), value.trim()))
            .collect();
        lines.sort();

        digest(&[DOMAIN_SEPARATOR_FOR_METADATA, lines.concat().as_bytes()])
    }

    /// Hash an internal tree node from its children.
    pub fn from_nodes(left: Option<&ContentHash>, right: Option<&ContentHash>) -> Self {
        let left = left.map_or(UNBALANCED_SENTINEL, |h| h.0.as_slice());
        let right = right.map_or(UNBALANCED_SENTINEL, |h| h.0.as_slice());
        digest(&[DOMAIN_SEPARATOR_FOR_NODES, left, right])
    }

    /// Parse the canonical `sha256:<hex>` form.
    pub fn parse(s: &str) -> Result<Self> {
        validate_hash_format(s, "ContentHash::parse")?;
        Self::from_hex(&s[SHA256_PREFIX.len()..])
    }

    /// Decode 64 hex characters (no prefix).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| StorageError::Format(format!("Invalid hex '{}': {}", hex_str, e)))?;
        Self::from_slice(&bytes)
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Canonical `sha256:<hex>` form.
    pub fn to_sha_string(&self) -> String {
        format!("{}{}", SHA256_PREFIX, self.to_hex())
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContentHash").field(&self.to_sha_string()).finish()
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_sha_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ContentHash::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn digest(parts: &[&[u8]]) -> ContentHash {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    ContentHash(hasher.finalize().into())
}

/// Check that `hash` is `sha256:` followed by exactly 64 hex characters.
///
/// `context` is prepended to the error message to say which value failed.
pub fn validate_hash_format(hash: &str, context: &str) -> Result<()> {
    if hash.is_empty() {
        return Err(StorageError::Format(format!(
            "{}: Hash cannot be empty",
            context
        )));
    }

    let Some(hex_part) = hash.strip_prefix(SHA256_PREFIX) else {
        return Err(StorageError::Format(format!(
            "{}: Invalid hash format. Expected format: {}<64-char-hex>, got: {}",
            context, SHA256_PREFIX, hash
        )));
    };

    if hex_part.len() != 64 {
        return Err(StorageError::Format(format!(
            "{}: Invalid hash format. Expected 64 hex characters after {}, got {} characters: {}",
            context,
            SHA256_PREFIX,
            hex_part.len(),
            hash
        )));
    }

    if !hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(StorageError::Format(format!(
            "{}: Invalid hash format. Hash must contain only hex characters (0-9, a-f), got: {}",
            context, hash
        )));
    }

    Ok(())
}
